//! Password-based encryption with the PDF Standard Security Handler.
//!
//! Implements revision 3 of the standard handler with 128-bit RC4
//! (`/V 2 /R 3 /Length 128`). Every string and stream of the document is
//! encrypted with a per-object key derived from the file key.

use crate::error::{PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use rc4::consts::U16;
use rc4::{KeyInit, Rc4, StreamCipher};
use std::path::Path;
use tracing::{debug, info};

/// Something that can encrypt a finished PDF in place.
pub trait PdfEncryptor: Send + Sync {
    /// Encrypt the file at `path` with `password`. On error the file must
    /// be left as it was.
    fn encrypt(&self, path: &Path, password: &str) -> Result<()>;
}

/// Padding string from the standard security handler.
const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// All permissions granted.
const PERMISSIONS: i32 = -4;
const KEY_LEN: usize = 16;

/// RC4 128-bit, revision 3.
#[derive(Debug, Clone, Default)]
pub struct Rc4Encryptor {
    /// Owner password; the user password is reused when unset.
    pub owner_password: Option<String>,
}

impl Rc4Encryptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PdfEncryptor for Rc4Encryptor {
    fn encrypt(&self, path: &Path, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(PdfError::Encryption("empty password".to_string()));
        }
        let original = std::fs::read(path).map_err(|e| PdfError::io(path, e))?;
        let source = Document::load_mem(&original)?;
        if source.is_encrypted() {
            return Err(PdfError::Encryption("document is already encrypted".to_string()));
        }

        let mut doc = copy_pages(source)?;
        let file_id = Md5::digest(&original).to_vec();
        let owner = self.owner_password.as_deref().unwrap_or(password);
        let handler = SecurityHandler::new(password.as_bytes(), owner.as_bytes(), &file_id);

        let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
        for id in ids {
            if let Some(object) = doc.objects.get_mut(&id) {
                handler.encrypt_object(id, object)?;
            }
        }

        let encrypt_id = doc.add_object(handler.dictionary());
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
        let id_string = Object::String(file_id, StringFormat::Hexadecimal);
        doc.trailer
            .set("ID", Object::Array(vec![id_string.clone(), id_string]));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::Encryption(e.to_string()))?;

        // Write beside the target and rename so a failure never leaves a
        // half-written artifact.
        let tmp = path.with_extension("pdf.tmp");
        std::fs::write(&tmp, &buffer).map_err(|e| PdfError::io(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(PdfError::io(path, e));
        }

        info!(
            path = %path.display(),
            objects = doc.objects.len(),
            "PDF encrypted (RC4-128, R3)"
        );
        Ok(())
    }
}

/// Rebuild the page tree of `source` under a fresh catalog, dropping
/// anything no longer reachable from it.
fn copy_pages(mut source: Document) -> Result<Document> {
    let pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(PdfError::Encryption("document has no pages".to_string()));
    }
    let pages_id = source.new_object_id();
    for page_id in &pages {
        let page = source
            .get_object_mut(*page_id)
            .and_then(Object::as_dict_mut)?;
        page.set("Parent", Object::Reference(pages_id));
    }
    source.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => pages.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = source.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    let mut trailer = Dictionary::new();
    trailer.set("Root", Object::Reference(catalog_id));
    if let Ok(info) = source.trailer.get(b"Info") {
        trailer.set("Info", info.clone());
    }
    source.trailer = trailer;
    let pruned = source.prune_objects();
    debug!(pages = pages.len(), pruned = pruned.len(), "copied page tree");
    Ok(source)
}

/// Key material for one document.
struct SecurityHandler {
    key: [u8; KEY_LEN],
    owner_entry: [u8; 32],
    user_entry: [u8; 32],
}

impl SecurityHandler {
    fn new(user: &[u8], owner: &[u8], file_id: &[u8]) -> Self {
        let owner_entry = owner_entry(user, owner);
        let key = file_key(user, &owner_entry, file_id);
        let user_entry = user_entry(&key, file_id);
        Self {
            key,
            owner_entry,
            user_entry,
        }
    }

    fn dictionary(&self) -> Dictionary {
        dictionary! {
            "Filter" => "Standard",
            "V" => 2i64,
            "R" => 3i64,
            "Length" => 128i64,
            "P" => PERMISSIONS as i64,
            "O" => Object::String(self.owner_entry.to_vec(), StringFormat::Hexadecimal),
            "U" => Object::String(self.user_entry.to_vec(), StringFormat::Hexadecimal),
        }
    }

    fn object_key(&self, (num, gen): ObjectId) -> [u8; KEY_LEN] {
        let mut hasher = Md5::new();
        hasher.update(self.key);
        hasher.update(&num.to_le_bytes()[..3]);
        hasher.update(&gen.to_le_bytes()[..2]);
        hasher.finalize().into()
    }

    fn encrypt_object(&self, id: ObjectId, object: &mut Object) -> Result<()> {
        let key = self.object_key(id);
        encrypt_in_place(&key, object)
    }

    /// True when `password` opens the document as the user.
    #[cfg(test)]
    fn authenticate_user(&self, password: &[u8], file_id: &[u8]) -> bool {
        let key = file_key(password, &self.owner_entry, file_id);
        user_entry(&key, file_id)[..16] == self.user_entry[..16]
    }
}

fn encrypt_in_place(key: &[u8; KEY_LEN], object: &mut Object) -> Result<()> {
    match object {
        Object::String(bytes, format) => {
            rc4(key, bytes)?;
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => {
            for item in items {
                encrypt_in_place(key, item)?;
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_in_place(key, value)?;
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                encrypt_in_place(key, value)?;
            }
            let mut content = std::mem::take(&mut stream.content);
            rc4(key, &mut content)?;
            stream.set_content(content);
        }
        _ => {}
    }
    Ok(())
}

fn rc4(key: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = Rc4::<U16>::new_from_slice(key)
        .map_err(|e| PdfError::Encryption(format!("RC4 key: {e}")))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Apply RC4 twenty times with the key XORed by 0..=19.
fn rc4_rounds(key: &[u8; KEY_LEN], data: &mut [u8]) {
    for round in 0u8..20 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
        // 16-byte keys always fit the cipher.
        if let Ok(mut cipher) = Rc4::<U16>::new_from_slice(&round_key) {
            cipher.apply_keystream(data);
        }
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let n = password.len().min(32);
    padded[..n].copy_from_slice(&password[..n]);
    padded[n..].copy_from_slice(&PAD[..32 - n]);
    padded
}

/// MD5 hashed 51 times in total, truncated to the key length.
fn stretched_md5(first: [u8; 16]) -> [u8; KEY_LEN] {
    let mut digest = first;
    for _ in 0..50 {
        digest = Md5::digest(&digest[..KEY_LEN]).into();
    }
    digest
}

/// The `/O` entry.
fn owner_entry(user: &[u8], owner: &[u8]) -> [u8; 32] {
    let key = stretched_md5(Md5::digest(pad_password(owner)).into());
    let mut entry = pad_password(user);
    rc4_rounds(&key, &mut entry);
    entry
}

/// The file encryption key.
fn file_key(user: &[u8], owner_entry: &[u8; 32], file_id: &[u8]) -> [u8; KEY_LEN] {
    let mut hasher = Md5::new();
    hasher.update(pad_password(user));
    hasher.update(owner_entry);
    hasher.update(PERMISSIONS.to_le_bytes());
    hasher.update(file_id);
    stretched_md5(hasher.finalize().into())
}

/// The `/U` entry: 16 meaningful bytes plus padding.
fn user_entry(key: &[u8; KEY_LEN], file_id: &[u8]) -> [u8; 32] {
    let mut hasher = Md5::new();
    hasher.update(PAD);
    hasher.update(file_id);
    let mut digest: [u8; 16] = hasher.finalize().into();
    rc4_rounds(key, &mut digest);
    let mut entry = [0u8; 32];
    entry[..16].copy_from_slice(&digest);
    entry[16..].copy_from_slice(&PAD[..16]);
    entry
}
