//! Image sanitizer for dossier attachments.
//!
//! Photos attached to a report are re-encoded before they are embedded so that
//! camera, location and editing metadata never reach the generated PDF.
//!
//! # Key Features
//!
//! - **Detection**: [`metadata::scan`] walks JPEG, PNG and WebP containers for
//!   EXIF, XMP, IPTC and text blocks, naming camera, time and GPS tags.
//! - **Stripping**: pixels are copied into a fresh buffer and re-encoded, so
//!   nothing from the source container survives.
//! - **Normalization**: alpha is flattened onto white, oversized images are
//!   shrunk with Lanczos3 and the result is written as JPEG.
//! - **Evidence**: every artifact carries the SHA-256 of the original bytes.
//!
//! # Example
//!
//! ```no_run
//! use dossier_config::ImageConfig;
//! use dossier_image::ImageSanitizer;
//! use std::path::Path;
//!
//! let sanitizer = ImageSanitizer::new(ImageConfig::default(), "output/images");
//! let artifact = sanitizer.process(Path::new("photo.jpg"), true)?;
//! assert!(artifact.exif_stripped || !artifact.has_exif);
//! # Ok::<(), dossier_image::ImageError>(())
//! ```

pub mod error;
pub mod metadata;
pub mod sanitizer;

pub use error::{ImageError, Result};
pub use metadata::{ExifTag, MetadataKind, MetadataReport};
pub use sanitizer::{ImageArtifact, ImageBatchReport, ImageFailure, ImageInfo, ImageSanitizer};
