//! PDF generator implementation.

use crate::embed::{self, EmbeddedImage};
use crate::encrypt::{PdfEncryptor, Rc4Encryptor};
use crate::error::{PdfError, Result};
use crate::layout::{Item, LayoutEngine, Page, PageGeometry, CHAR_WIDTH_EM};
use crate::markup::{self, Block};
use dossier_config::PdfConfig;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FOOTER_SIZE: f32 = 8.0;
const WATERMARK_GRAY: f32 = 0.5;

/// Per-call generation flags.
#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    /// Overlay text; `None` means no watermark.
    pub watermark: Option<String>,
    pub encrypt: bool,
    pub password: Option<String>,
}

/// A finished PDF on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfArtifact {
    pub path: PathBuf,
    pub file_size: u64,
    /// SHA-256 of the final file, hex.
    pub file_hash: String,
    pub page_count: usize,
    /// True only if encryption actually succeeded.
    pub is_encrypted: bool,
    /// Why encryption was requested but not applied.
    pub encryption_error: Option<String>,
}

/// Turns rendered report markup into a paginated PDF.
pub struct PdfGenerator {
    config: PdfConfig,
    redaction_class: String,
    encryptor: Box<dyn PdfEncryptor>,
}

impl PdfGenerator {
    /// Create a generator using the RC4 standard security handler.
    pub fn new(config: PdfConfig, redaction_class: impl Into<String>) -> Self {
        Self {
            config,
            redaction_class: redaction_class.into(),
            encryptor: Box::new(Rc4Encryptor::new()),
        }
    }

    /// Swap the encryption backend.
    pub fn with_encryptor(mut self, encryptor: Box<dyn PdfEncryptor>) -> Self {
        self.encryptor = encryptor;
        self
    }

    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    fn geometry(&self) -> PageGeometry {
        PageGeometry::a4([
            self.config.margin_top_cm,
            self.config.margin_bottom_cm,
            self.config.margin_left_cm,
            self.config.margin_right_cm,
        ])
    }

    /// Render markup to PDF bytes. Returns the bytes and the page count.
    pub fn render_bytes(&self, markup: &str, watermark: Option<&str>) -> Result<(Vec<u8>, usize)> {
        let blocks = markup::parse(markup, &self.redaction_class);
        let images = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Image { src, .. } => Some(embed::load(src)),
                _ => None,
            })
            .collect::<Result<Vec<EmbeddedImage>>>()?;
        let sizes: Vec<(f32, f32)> = images.iter().map(|i| i.size_at(self.config.dpi)).collect();

        let engine = LayoutEngine::new(self.geometry(), self.config.body_font_size);
        let pages = engine.layout(&blocks, &sizes);
        debug!(
            blocks = blocks.len(),
            images = images.len(),
            pages = pages.len(),
            "layout complete"
        );

        let mut doc = self.build_document(&pages, &images, watermark)?;
        if self.config.compress {
            doc.compress();
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(PdfError::Serialize)?;
        Ok((bytes, pages.len()))
    }

    /// Render markup to `output`, then encrypt it if asked.
    ///
    /// Encryption failure is not an error: the unencrypted file stays in
    /// place and the artifact reports `is_encrypted = false`.
    pub fn generate(&self, markup: &str, output: &Path, options: &PdfOptions) -> Result<PdfArtifact> {
        let (bytes, page_count) = self.render_bytes(markup, options.watermark.as_deref())?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PdfError::io(parent, e))?;
        }
        std::fs::write(output, &bytes).map_err(|e| PdfError::io(output, e))?;

        let mut is_encrypted = false;
        let mut encryption_error = None;
        if options.encrypt {
            let outcome = match options.password.as_deref().filter(|p| !p.is_empty()) {
                Some(password) => self.encryptor.encrypt(output, password),
                None => Err(PdfError::Encryption("no password supplied".to_string())),
            };
            match outcome {
                Ok(()) => is_encrypted = true,
                Err(e) => {
                    warn!(
                        path = %output.display(),
                        error = %e,
                        "PDF encryption failed; keeping unencrypted artifact"
                    );
                    encryption_error = Some(e.to_string());
                }
            }
        }

        let final_bytes = std::fs::read(output).map_err(|e| PdfError::io(output, e))?;
        let artifact = PdfArtifact {
            path: output.to_path_buf(),
            file_size: final_bytes.len() as u64,
            file_hash: hex::encode(Sha256::digest(&final_bytes)),
            page_count,
            is_encrypted,
            encryption_error,
        };

        info!(
            path = %output.display(),
            pages = page_count,
            bytes = artifact.file_size,
            encrypted = is_encrypted,
            "PDF written"
        );
        Ok(artifact)
    }

    fn build_document(
        &self,
        pages: &[Page],
        images: &[EmbeddedImage],
        watermark: Option<&str>,
    ) -> Result<Document> {
        let geometry = self.geometry();
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(font("Courier"));
        let bold = doc.add_object(font("Courier-Bold"));
        let opacity = self.config.watermark_opacity;
        let gs = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => opacity,
            "CA" => opacity,
        });

        let mut xobjects = Dictionary::new();
        for (index, image) in images.iter().enumerate() {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => if image.gray { "DeviceGray" } else { "DeviceRGB" },
                    "BitsPerComponent" => 8i64,
                    "Filter" => "DCTDecode",
                },
                image.data.clone(),
            );
            let id = doc.add_object(stream);
            xobjects.set(format!("Im{index}"), Object::Reference(id));
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold },
            "ExtGState" => dictionary! { "GS1" => gs },
            "XObject" => xobjects,
        });

        let total = pages.len();
        let mut kids = Vec::with_capacity(total);
        for (index, page) in pages.iter().enumerate() {
            let mut ops = Vec::new();
            if let Some(text) = watermark.filter(|t| !t.trim().is_empty()) {
                ops.extend(self.watermark_ops(&geometry, text));
            }
            ops.push(Operation::new("g", vec![0i64.into()]));
            for item in &page.items {
                ops.extend(item_ops(item));
            }
            let footer = format!("Page {} of {}", index + 1, total);
            let footer_x = (geometry.width - footer.len() as f32 * FOOTER_SIZE * CHAR_WIDTH_EM) / 2.0;
            ops.extend(text_ops(
                footer_x,
                geometry.margin_bottom / 2.0,
                FOOTER_SIZE,
                false,
                &footer,
            ));

            let content = Content { operations: ops };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0i64.into(), 0i64.into(), geometry.width.into(), geometry.height.into()],
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("dossier ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        Ok(doc)
    }

    /// Rotated, translucent text centred on the page.
    fn watermark_ops(&self, geometry: &PageGeometry, text: &str) -> Vec<Operation> {
        let size = self.config.watermark_font_size;
        let angle = self.config.watermark_angle.to_radians();
        let (sin, cos) = angle.sin_cos();
        let half_width = text.chars().count() as f32 * size * CHAR_WIDTH_EM / 2.0;
        let rise = size * 0.35;
        let x = geometry.width / 2.0 - half_width * cos + rise * sin;
        let y = geometry.height / 2.0 - half_width * sin - rise * cos;

        vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec!["GS1".into()]),
            Operation::new("g", vec![WATERMARK_GRAY.into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F2".into(), size.into()]),
            Operation::new(
                "Tm",
                vec![cos.into(), sin.into(), (-sin).into(), cos.into(), x.into(), y.into()],
            ),
            Operation::new("Tj", vec![pdf_string(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]
    }
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn item_ops(item: &Item) -> Vec<Operation> {
    match item {
        Item::Text {
            x,
            y,
            size,
            bold,
            text,
        } => text_ops(*x, *y, *size, *bold, text),
        Item::Redaction { x, y, w, h } => rect_ops(*x, *y, *w, *h),
        Item::Fill { x, y, w, h, rgb } => {
            let mut ops = vec![Operation::new(
                "rg",
                vec![rgb[0].into(), rgb[1].into(), rgb[2].into()],
            )];
            ops.extend(rect_ops(*x, *y, *w, *h));
            ops.push(Operation::new("g", vec![0i64.into()]));
            ops
        }
        Item::Line { x1, y1, x2, y2 } => vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![0.5f32.into()]),
            Operation::new("G", vec![0.6f32.into()]),
            Operation::new("m", vec![(*x1).into(), (*y1).into()]),
            Operation::new("l", vec![(*x2).into(), (*y2).into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ],
        Item::Image { index, x, y, w, h } => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (*w).into(),
                    0i64.into(),
                    0i64.into(),
                    (*h).into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(format!("Im{index}").into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
}

fn text_ops(x: f32, y: f32, size: f32, bold: bool, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![(if bold { "F2" } else { "F1" }).into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![pdf_string(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn rect_ops(x: f32, y: f32, w: f32, h: f32) -> Vec<Operation> {
    vec![
        Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]),
        Operation::new("f", vec![]),
    ]
}

fn pdf_string(text: &str) -> Object {
    Object::String(win_ansi(text), StringFormat::Literal)
}

/// Encode for the standard fonts' WinAnsiEncoding; anything outside it
/// prints as `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
