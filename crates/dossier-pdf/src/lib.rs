//! PDF output for dossier reports.
//!
//! Turns the controlled markup produced by `dossier-render` into a
//! paginated A4 document set in Courier.
//!
//! # Features
//!
//! - **Redaction bars**: redacted spans are painted as opaque black bars;
//!   their text is never written to the file
//! - **Watermark**: translucent, rotated overlay painted beneath the content
//!   of every page
//! - **Images**: embedded as JPEG (`DCTDecode`) and scaled by `72/dpi`
//! - **Encryption**: the finished file is reopened, its pages copied into a
//!   new container and encrypted with the standard security handler
//!   (RC4 128-bit, revision 3). Failure leaves the unencrypted file and is
//!   reported, not raised
//!
//! # Example
//!
//! ```no_run
//! use dossier_config::PdfConfig;
//! use dossier_pdf::{PdfGenerator, PdfOptions};
//! use std::path::Path;
//!
//! let generator = PdfGenerator::new(PdfConfig::default(), "redacted");
//! let options = PdfOptions {
//!     watermark: Some("CONFIDENTIAL".to_string()),
//!     encrypt: true,
//!     password: Some("CLASSIFIED".to_string()),
//! };
//! let artifact = generator
//!     .generate("<h1>Report</h1>", Path::new("report.pdf"), &options)
//!     .unwrap();
//! println!("{} pages, encrypted: {}", artifact.page_count, artifact.is_encrypted);
//! ```

pub mod embed;
pub mod encrypt;
pub mod error;
pub mod generator;
pub mod inspect;
pub mod layout;
pub mod markup;

pub use encrypt::{PdfEncryptor, Rc4Encryptor};
pub use error::{PdfError, Result};
pub use generator::{PdfArtifact, PdfGenerator, PdfOptions};
pub use inspect::{inspect, PdfInfo};
pub use markup::{parse as parse_markup, Block};
