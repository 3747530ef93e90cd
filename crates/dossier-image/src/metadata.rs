//! Embedded metadata detection.
//!
//! A shallow container walk: JPEG segments, PNG chunks and WebP RIFF chunks
//! are visited without decoding pixel data. Truncated or malformed containers
//! stop the walk and report what was seen up to that point.
//!
//! EXIF payloads get one level deeper: the TIFF directory is read far enough
//! to name the privacy-relevant tags it carries (camera, time, location).

use serde::{Deserialize, Serialize};

/// Kind of embedded metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Exif,
    Xmp,
    Iptc,
    Comment,
    /// PNG textual chunks (`tEXt`, `iTXt`, `zTXt`).
    Text,
}

/// EXIF tags that identify a device, a moment or a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExifTag {
    Make,
    Model,
    Orientation,
    Software,
    DateTime,
    Artist,
    DateTimeOriginal,
    GPSInfo,
    GPSLatitude,
    GPSLongitude,
    GPSAltitude,
}

impl ExifTag {
    fn from_ifd0(tag: u16) -> Option<Self> {
        Some(match tag {
            0x010F => ExifTag::Make,
            0x0110 => ExifTag::Model,
            0x0112 => ExifTag::Orientation,
            0x0131 => ExifTag::Software,
            0x0132 => ExifTag::DateTime,
            0x013B => ExifTag::Artist,
            0x8825 => ExifTag::GPSInfo,
            _ => return None,
        })
    }

    fn from_exif_ifd(tag: u16) -> Option<Self> {
        (tag == 0x9003).then_some(ExifTag::DateTimeOriginal)
    }

    fn from_gps_ifd(tag: u16) -> Option<Self> {
        Some(match tag {
            0x0002 => ExifTag::GPSLatitude,
            0x0004 => ExifTag::GPSLongitude,
            0x0006 => ExifTag::GPSAltitude,
            _ => return None,
        })
    }
}

/// Metadata found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataReport {
    /// Kinds found, in file order, each listed once.
    pub kinds: Vec<MetadataKind>,
    /// Total payload bytes across all metadata blocks.
    pub bytes: usize,
    /// Sensitive EXIF tags, each listed once.
    #[serde(default)]
    pub exif_tags: Vec<ExifTag>,
}

impl MetadataReport {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn has(&self, kind: MetadataKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn has_tag(&self, tag: ExifTag) -> bool {
        self.exif_tags.contains(&tag)
    }

    /// Whether the file carries coordinates or a GPS directory.
    pub fn has_location(&self) -> bool {
        self.exif_tags.iter().any(|t| {
            matches!(
                t,
                ExifTag::GPSInfo | ExifTag::GPSLatitude | ExifTag::GPSLongitude | ExifTag::GPSAltitude
            )
        })
    }

    fn record(&mut self, kind: MetadataKind, len: usize) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self.bytes += len;
    }

    fn record_exif(&mut self, tiff: &[u8]) {
        self.record(MetadataKind::Exif, tiff.len());
        for tag in exif_tags(tiff) {
            if !self.exif_tags.contains(&tag) {
                self.exif_tags.push(tag);
            }
        }
    }
}

/// Byte order declared by a TIFF header.
#[derive(Clone, Copy)]
enum Endian {
    Little,
    Big,
}

struct Tiff<'a> {
    data: &'a [u8],
    endian: Endian,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let endian = match data.get(0..2)? {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return None,
        };
        let tiff = Tiff { data, endian };
        (tiff.u16_at(2)? == 42).then_some(tiff)
    }

    fn u16_at(&self, pos: usize) -> Option<u16> {
        let b: [u8; 2] = self.data.get(pos..pos.checked_add(2)?)?.try_into().ok()?;
        Some(match self.endian {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        })
    }

    fn u32_at(&self, pos: usize) -> Option<u32> {
        let b: [u8; 4] = self.data.get(pos..pos.checked_add(4)?)?.try_into().ok()?;
        Some(match self.endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        })
    }

    /// `(tag, value-or-offset)` for every entry of the directory at `offset`.
    fn entries(&self, offset: usize) -> Vec<(u16, u32)> {
        let Some(count) = self.u16_at(offset) else {
            return Vec::new();
        };
        (0..count as usize)
            .map_while(|i| {
                let entry = offset + 2 + i * 12;
                Some((self.u16_at(entry)?, self.u32_at(entry + 8)?))
            })
            .collect()
    }
}

const EXIF_IFD_POINTER: u16 = 0x8769;
const GPS_IFD_POINTER: u16 = 0x8825;

/// Sensitive tags in IFD0 and the Exif and GPS sub-directories it points to.
///
/// `tiff` starts at the byte-order mark. Unreadable structure yields whatever
/// was collected before it.
pub fn exif_tags(tiff: &[u8]) -> Vec<ExifTag> {
    let Some(tiff) = Tiff::parse(tiff) else {
        return Vec::new();
    };
    let Some(ifd0) = tiff.u32_at(4) else {
        return Vec::new();
    };

    let mut tags = Vec::new();
    let mut push = |tag: Option<ExifTag>| {
        if let Some(tag) = tag {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    };

    for (tag, value) in tiff.entries(ifd0 as usize) {
        push(ExifTag::from_ifd0(tag));
        match tag {
            EXIF_IFD_POINTER => {
                for (sub, _) in tiff.entries(value as usize) {
                    push(ExifTag::from_exif_ifd(sub));
                }
            }
            GPS_IFD_POINTER => {
                for (sub, _) in tiff.entries(value as usize) {
                    push(ExifTag::from_gps_ifd(sub));
                }
            }
            _ => {}
        }
    }
    tags
}

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Scan an encoded image for metadata blocks.
pub fn scan(bytes: &[u8]) -> MetadataReport {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        scan_jpeg(bytes)
    } else if bytes.starts_with(PNG_SIGNATURE) {
        scan_png(bytes)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        scan_webp(bytes)
    } else {
        MetadataReport::default()
    }
}

fn scan_jpeg(bytes: &[u8]) -> MetadataReport {
    let mut report = MetadataReport::default();
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        let marker = bytes[pos + 1];
        // Fill bytes and standalone markers carry no length.
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        // Start of scan or end of image: entropy-coded data follows.
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > bytes.len() {
            break;
        }
        let payload = &bytes[pos + 4..pos + 2 + len];

        match marker {
            0xE1 if payload.starts_with(EXIF_HEADER) => {
                report.record_exif(&payload[EXIF_HEADER.len()..])
            }
            0xE1 if payload.starts_with(XMP_HEADER) => {
                report.record(MetadataKind::Xmp, payload.len())
            }
            0xED if payload.starts_with(PHOTOSHOP_HEADER) => {
                report.record(MetadataKind::Iptc, payload.len())
            }
            0xFE => report.record(MetadataKind::Comment, payload.len()),
            _ => {}
        }

        pos += 2 + len;
    }

    report
}

fn scan_png(bytes: &[u8]) -> MetadataReport {
    let mut report = MetadataReport::default();
    let mut pos = PNG_SIGNATURE.len();

    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
            as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let Some(end) = pos.checked_add(12).and_then(|p| p.checked_add(len)) else {
            break;
        };
        if end > bytes.len() {
            break;
        }

        match kind {
            b"eXIf" => report.record_exif(&bytes[pos + 8..pos + 8 + len]),
            b"tEXt" | b"zTXt" => report.record(MetadataKind::Text, len),
            b"iTXt" => {
                let data = &bytes[pos + 8..pos + 8 + len];
                if data.starts_with(b"XML:com.adobe.xmp\0") {
                    report.record(MetadataKind::Xmp, len);
                } else {
                    report.record(MetadataKind::Text, len);
                }
            }
            b"IEND" => break,
            _ => {}
        }

        pos = end;
    }

    report
}

fn scan_webp(bytes: &[u8]) -> MetadataReport {
    let mut report = MetadataReport::default();
    let mut pos = 12;

    while pos + 8 <= bytes.len() {
        let fourcc = &bytes[pos..pos + 4];
        let len = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
            as usize;
        match fourcc {
            b"EXIF" => match pos.checked_add(8 + len).and_then(|end| bytes.get(pos + 8..end)) {
                Some(data) => report.record_exif(data.strip_prefix(EXIF_HEADER).unwrap_or(data)),
                None => report.record(MetadataKind::Exif, len),
            },
            b"XMP " => report.record(MetadataKind::Xmp, len),
            _ => {}
        }
        // Chunks are padded to even length.
        let Some(next) = pos
            .checked_add(8)
            .and_then(|p| p.checked_add(len + (len & 1)))
        else {
            break;
        };
        pos = next;
    }

    report
}
