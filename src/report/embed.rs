//! Image preparation for markdown embedding.
//!
//! Screenshots can be large PNG captures; embedding them verbatim would blow
//! up report size. Images wider than the configured maximum are resized
//! (preserving aspect ratio) and everything is re-encoded as JPEG at the
//! configured quality before base64 encoding.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// A processed image ready to embed as a data URI.
pub struct EmbeddedImage {
    pub data_uri: String,
    pub original_bytes: u64,
    pub encoded_bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// Resize an image to at most `max_width` pixels wide, keeping aspect ratio.
/// Images already narrow enough are returned unchanged.
pub fn resize_to_max_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    if img.width() <= max_width {
        return img;
    }

    let ratio = f64::from(max_width) / f64::from(img.width());
    let new_height = (f64::from(img.height()) * ratio) as u32;
    debug!(
        "Resizing image from {}x{} to {}x{}",
        img.width(),
        img.height(),
        max_width,
        new_height
    );
    img.resize(max_width, new_height.max(1), FilterType::Lanczos3)
}

/// Encode an image as JPEG bytes at the given quality. RGBA inputs are
/// flattened to RGB first since JPEG has no alpha channel.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .context("Failed to encode image as JPEG")?;
    Ok(buffer)
}

/// Load, resize, re-encode and base64-encode an image for embedding.
pub fn process_for_embedding(
    image_path: &Path,
    max_width: u32,
    jpeg_quality: u8,
) -> Result<EmbeddedImage> {
    let original_bytes = std::fs::metadata(image_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let img = image::open(image_path)
        .with_context(|| format!("Failed to open image {}", image_path.display()))?;

    let resized = resize_to_max_width(img, max_width);
    let jpeg = encode_jpeg(&resized, jpeg_quality)?;
    let encoded = BASE64.encode(&jpeg);

    Ok(EmbeddedImage {
        data_uri: format!("data:image/jpeg;base64,{encoded}"),
        original_bytes,
        encoded_bytes: jpeg.len(),
        width: resized.width(),
        height: resized.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn test_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([120, 40, 200, 255]);
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_resize_preserves_small_images() {
        let img = resize_to_max_width(test_image(800, 600), 1200);
        assert_eq!(img.width(), 800);
        assert_eq!(img.height(), 600);
    }

    #[test]
    fn test_resize_caps_width_and_keeps_ratio() {
        let img = resize_to_max_width(test_image(2400, 1200), 1200);
        assert!(img.width() <= 1200);
        assert_eq!(img.height(), img.width() / 2);
    }

    #[test]
    fn test_encode_jpeg_produces_valid_jpeg() {
        let bytes = encode_jpeg(&test_image(64, 64), 85).unwrap();
        // JPEG magic number.
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
    }

    #[test]
    fn test_encode_jpeg_flattens_alpha() {
        let mut img = RgbaImage::new(8, 8);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([255, 0, 0, 128]);
        }
        let bytes = encode_jpeg(&DynamicImage::ImageRgba8(img), 85).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn test_process_for_embedding_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        test_image(2000, 1000).save(&path).unwrap();

        let embedded = process_for_embedding(&path, 1200, 85).unwrap();
        assert!(embedded.width <= 1200);
        assert!(embedded.data_uri.starts_with("data:image/jpeg;base64,"));
        assert!(embedded.encoded_bytes > 0);
        assert!(embedded.original_bytes > 0);
    }

    #[test]
    fn test_process_missing_file_errors() {
        let result = process_for_embedding(Path::new("/nonexistent/shot.png"), 1200, 85);
        assert!(result.is_err());
    }
}
