//! The sanitizing pipeline: strip, flatten, shrink, grayscale, encode.

use crate::error::{ImageError, Result};
use crate::metadata::{self, ExifTag, MetadataKind, MetadataReport};
use chrono::{DateTime, Utc};
use dossier_config::ImageConfig;
use dossier_validate::{validate_image_dimensions, validate_image_file, ImageLimits};
use image::codecs::jpeg::JpegEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A sanitized image written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// File name of the processed output.
    pub filename: String,
    pub original_size: u64,
    pub processed_size: u64,
    /// Dimensions after processing.
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    /// Container format of the input.
    pub format: String,
    /// Whether the input carried any metadata block.
    pub has_exif: bool,
    /// Whether metadata was present and the rebuild stage removed it.
    pub exif_stripped: bool,
    #[serde(default)]
    pub metadata_kinds: Vec<MetadataKind>,
    /// Sensitive EXIF tags the input carried.
    #[serde(default)]
    pub exif_tags: Vec<ExifTag>,
    /// SHA-256 (hex) of the original input bytes.
    pub content_hash: String,
    pub processed_at: DateTime<Utc>,
}

/// Read-only facts about an image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub metadata: MetadataReport,
    pub content_hash: String,
    /// Advisory findings such as out-of-range dimensions.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One image that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch; failures never abort the rest of the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBatchReport {
    pub artifacts: Vec<ImageArtifact>,
    pub failures: Vec<ImageFailure>,
}

impl ImageBatchReport {
    pub fn total(&self) -> usize {
        self.artifacts.len() + self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Re-encodes attachments into metadata-free JPEGs.
#[derive(Debug, Clone)]
pub struct ImageSanitizer {
    config: ImageConfig,
    output_dir: PathBuf,
}

impl ImageSanitizer {
    pub fn new(config: ImageConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File-level limits derived from the configuration.
    pub fn limits(&self) -> ImageLimits {
        ImageLimits {
            max_file_bytes: self.config.max_file_size_mb * 1024 * 1024,
            allowed_extensions: self
                .config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            min_dimension: self.config.min_input_dimension,
            max_dimension: self.config.max_input_dimension,
        }
    }

    /// Sanitize one image and write it to the output directory.
    pub fn process(&self, input: &Path, strip_exif: bool) -> Result<ImageArtifact> {
        if !input.exists() {
            return Err(ImageError::NotFound(input.to_path_buf()));
        }
        let precheck = validate_image_file(input, &self.limits());
        if !precheck.is_valid {
            return Err(ImageError::Rejected {
                path: input.to_path_buf(),
                reasons: precheck.errors,
            });
        }

        let bytes = std::fs::read(input).map_err(|e| ImageError::io(input, e))?;
        let content_hash = hex::encode(Sha256::digest(&bytes));
        let found = metadata::scan(&bytes);
        let has_exif = !found.is_empty();

        let format = image::guess_format(&bytes).map_err(|e| decode_err(input, e))?;
        let mut img = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| decode_err(input, e))?;
        let (original_width, original_height) = (img.width(), img.height());

        let exif_stripped = strip_exif && has_exif;
        if strip_exif {
            img = rebuild_without_metadata(&img, self.config.intermediate_quality)?;
            debug!(
                path = %input.display(),
                kinds = ?found.kinds,
                tags = ?found.exif_tags,
                "metadata rebuild done"
            );
        }

        let mut img = DynamicImage::ImageRgb8(flatten_onto_white(&img));

        let max = self.config.max_dimension;
        if img.width() > max || img.height() > max {
            img = img.resize(max, max, FilterType::Lanczos3);
        }

        if self.config.grayscale {
            img = img.grayscale();
        }

        let encoded = encode_jpeg(&img, self.config.output_quality)?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ImageError::io(&self.output_dir, e))?;
        let output_path = self.output_path_for(input);
        std::fs::write(&output_path, &encoded).map_err(|e| ImageError::io(&output_path, e))?;

        let artifact = ImageArtifact {
            source_path: input.to_path_buf(),
            filename: output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output_path,
            original_size: bytes.len() as u64,
            processed_size: encoded.len() as u64,
            width: img.width(),
            height: img.height(),
            original_width,
            original_height,
            format: format_name(format),
            has_exif,
            exif_stripped,
            metadata_kinds: found.kinds,
            exif_tags: found.exif_tags,
            content_hash,
            processed_at: Utc::now(),
        };

        info!(
            source = %input.display(),
            output = %artifact.output_path.display(),
            width = artifact.width,
            height = artifact.height,
            has_exif,
            exif_stripped,
            "image sanitized"
        );
        Ok(artifact)
    }

    /// Process several images; each failure is recorded and the batch goes on.
    pub fn process_batch(&self, inputs: &[PathBuf], strip_exif: bool) -> ImageBatchReport {
        let mut report = ImageBatchReport::default();
        for input in inputs {
            match self.process(input, strip_exif) {
                Ok(artifact) => report.artifacts.push(artifact),
                Err(err) => {
                    warn!(path = %input.display(), error = %err, "image processing failed");
                    report.failures.push(ImageFailure {
                        path: input.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        info!(
            total = report.total(),
            failed = report.failures.len(),
            "image batch complete"
        );
        report
    }

    /// Describe an image without modifying it. Only headers are decoded.
    pub fn inspect(&self, path: &Path) -> Result<ImageInfo> {
        if !path.exists() {
            return Err(ImageError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|e| ImageError::io(path, e))?;
        let format = image::guess_format(&bytes).map_err(|e| decode_err(path, e))?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| decode_err(path, e))?;

        let mut warnings = validate_image_dimensions(width, height, &self.limits()).errors;
        let metadata = metadata::scan(&bytes);
        if metadata.has_location() {
            warnings.push("Image carries GPS location data".to_string());
        }

        Ok(ImageInfo {
            path: path.to_path_buf(),
            file_size: bytes.len() as u64,
            format: format_name(format),
            width,
            height,
            metadata,
            content_hash: hex::encode(Sha256::digest(&bytes)),
            warnings,
        })
    }

    /// `<stem>_processed_<timestamp>.jpg`, with a counter on collision.
    fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");

        let base = format!("{stem}_processed_{stamp}");
        let mut candidate = self.output_dir.join(format!("{base}.jpg"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.output_dir.join(format!("{base}_{n}.jpg"));
            n += 1;
        }
        candidate
    }
}

fn decode_err(path: &Path, source: image::ImageError) -> ImageError {
    ImageError::Decode {
        path: path.to_path_buf(),
        source,
    }
}

fn dimension_mismatch() -> ImageError {
    ImageError::Encode(image::ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
    )))
}

/// Copy raw pixels into a fresh buffer and round-trip through an encoder so
/// no byte of the source container is carried forward.
///
/// Images with alpha go through PNG since JPEG cannot hold transparency.
fn rebuild_without_metadata(img: &DynamicImage, quality: u8) -> Result<DynamicImage> {
    let (w, h) = (img.width(), img.height());
    let mut out = Cursor::new(Vec::new());

    if img.color().has_alpha() {
        let raw = img.to_rgba8().into_raw();
        let fresh = RgbaImage::from_raw(w, h, raw).ok_or_else(dimension_mismatch)?;
        DynamicImage::ImageRgba8(fresh)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(ImageError::Encode)?;
    } else {
        let raw = img.to_rgb8().into_raw();
        let fresh = RgbImage::from_raw(w, h, raw).ok_or_else(dimension_mismatch)?;
        DynamicImage::ImageRgb8(fresh)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
            .map_err(ImageError::Encode)?;
    }

    image::load_from_memory(&out.into_inner()).map_err(ImageError::Encode)
}

/// Composite onto an opaque white background.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(ImageError::Encode)?;
    Ok(out.into_inner())
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_flatten_transparent_is_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_flatten_half_alpha() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 128]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        let v = flat.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&v), "got {v}");
    }

    #[test]
    fn test_rebuild_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 5, Rgb([1, 2, 3])));
        let rebuilt = rebuild_without_metadata(&img, 95).unwrap();
        assert_eq!((rebuilt.width(), rebuilt.height()), (7, 5));
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_name(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_limits_from_config() {
        let sanitizer = ImageSanitizer::new(ImageConfig::default(), "/tmp/out");
        let limits = sanitizer.limits();
        assert_eq!(limits.max_file_bytes, 50 * 1024 * 1024);
        assert!(limits.allowed_extensions.contains(&"png".to_string()));
    }
}
