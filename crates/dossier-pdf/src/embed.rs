//! Loading images for `DCTDecode` embedding.

use crate::error::{PdfError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use std::path::Path;
use tracing::debug;

/// JPEG quality used when a non-JPEG source has to be transcoded.
const TRANSCODE_QUALITY: u8 = 90;

/// JPEG bytes ready to drop into an image XObject.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub gray: bool,
}

impl EmbeddedImage {
    /// Size in points when printed at `dpi`.
    pub fn size_at(&self, dpi: u32) -> (f32, f32) {
        let scale = 72.0 / dpi.max(1) as f32;
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

/// Load `src` and make sure it is a baseline gray or RGB JPEG.
pub fn load(src: &str) -> Result<EmbeddedImage> {
    let fail = |reason: String| PdfError::Image {
        src: src.to_string(),
        reason,
    };

    let bytes = std::fs::read(Path::new(src)).map_err(|e| fail(e.to_string()))?;
    let format = image::guess_format(&bytes).map_err(|e| fail(e.to_string()))?;
    let decoded =
        image::load_from_memory_with_format(&bytes, format).map_err(|e| fail(e.to_string()))?;
    let gray = !decoded.color().has_color();
    let (width, height) = (decoded.width(), decoded.height());

    let passthrough =
        format == ImageFormat::Jpeg && matches!(decoded.color(), ColorType::L8 | ColorType::Rgb8);
    let data = if passthrough {
        bytes
    } else {
        let flat = if gray {
            DynamicImage::ImageLuma8(decoded.to_luma8())
        } else {
            DynamicImage::ImageRgb8(decoded.to_rgb8())
        };
        let mut out = Vec::new();
        flat.write_with_encoder(JpegEncoder::new_with_quality(&mut out, TRANSCODE_QUALITY))
            .map_err(|e| fail(e.to_string()))?;
        out
    };

    debug!(src, width, height, gray, passthrough, "image loaded for embedding");
    Ok(EmbeddedImage {
        data,
        width,
        height,
        gray,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_png_is_transcoded_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbaImage::from_pixel(30, 20, Rgba([10, 200, 30, 255]))
            .save(&path)
            .unwrap();
        let img = load(path.to_str().unwrap()).unwrap();
        assert_eq!((img.width, img.height), (30, 20));
        assert!(!img.gray);
        assert_eq!(image::guess_format(&img.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_size_at_dpi() {
        let img = EmbeddedImage {
            data: Vec::new(),
            width: 300,
            height: 600,
            gray: true,
        };
        assert_eq!(img.size_at(300), (72.0, 144.0));
        assert_eq!(img.size_at(72), (300.0, 600.0));
    }

    #[test]
    fn test_missing_file_is_image_error() {
        let err = load("/nonexistent/dir/x.jpg").unwrap_err();
        assert!(matches!(err, PdfError::Image { .. }));
    }
}
