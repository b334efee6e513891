use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder as JpegWriter;
use image::DynamicImage;
use std::fs;
use std::path::Path;

use crate::errors::{AppError, AppResult};
use crate::media_source::PickedImage;
use crate::security::InputValidator;

/// Maximum JPEG quality; the only quality this app ever encodes at.
pub const JPEG_QUALITY: u8 = 100;

/// Edge length of the selection preview tiles.
pub const PREVIEW_DIMENSION: u32 = 100;

/// Turns a picked image into bytes that can leave the process.
pub trait Encoder: Send + Sync {
    fn encode(&self, image: &PickedImage) -> AppResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder;

impl Encoder for JpegEncoder {
    fn encode(&self, image: &PickedImage) -> AppResult<Vec<u8>> {
        let bytes = encode_jpeg(image.pixels())?;
        log::debug!(
            "Encoded {} ({}x{}) to {} JPEG bytes",
            image.source(),
            image.pixels().width(),
            image.pixels().height(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Rasterize to JPEG at [`JPEG_QUALITY`]. Alpha is dropped since JPEG has none.
pub fn encode_jpeg(img: &DynamicImage) -> AppResult<Vec<u8>> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AppError::validation(
            "image",
            "Image has no pixels to rasterize",
        ));
    }

    let rgb = img.to_rgb8();
    let mut output = Vec::new();
    let writer = JpegWriter::new_with_quality(&mut output, JPEG_QUALITY);
    rgb.write_with_encoder(writer)?;

    Ok(output)
}

/// Standard padded base64, embedded verbatim in form bodies.
pub fn to_base64_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Validate and decode an image file into a pick.
pub fn load_image(file_path: &Path) -> AppResult<PickedImage> {
    InputValidator::validate_image_path(file_path)?;

    let file_size = fs::metadata(file_path)?.len();
    const LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024; // 50MB
    if file_size > LARGE_FILE_THRESHOLD {
        log::warn!(
            "Large image file picked: {} ({} MB)",
            file_path.display(),
            file_size / 1024 / 1024
        );
    }

    let img = image::open(file_path)?;
    log::debug!(
        "Decoded {} ({}x{}, {} bytes)",
        file_path.display(),
        img.width(),
        img.height(),
        file_size
    );

    Ok(PickedImage::new(file_path.to_string_lossy(), img))
}

/// Scaled-to-fit preview for the selection strip.
pub fn generate_thumbnail(image: &PickedImage, max_dimension: u32) -> DynamicImage {
    let thumbnail = image.pixels().thumbnail(max_dimension, max_dimension);

    log::debug!(
        "Thumbnail for {}: {}x{} -> {}x{}",
        image.source(),
        image.pixels().width(),
        image.pixels().height(),
        thumbnail.width(),
        thumbnail.height()
    );

    thumbnail
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> PickedImage {
        PickedImage::new(
            "solid",
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10]))),
        )
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let bytes = JpegEncoder.encode(&solid(8, 4)).unwrap();

        // SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let image = solid(5, 5);
        assert_eq!(
            JpegEncoder.encode(&image).unwrap(),
            JpegEncoder.encode(&image).unwrap()
        );
    }

    #[test]
    fn test_encode_flattens_alpha() {
        let rgba = PickedImage::new(
            "rgba",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]))),
        );
        assert!(JpegEncoder.encode(&rgba).is_ok());
    }

    #[test]
    fn test_encode_rejects_empty_image() {
        let empty = PickedImage::new("empty", DynamicImage::new_rgb8(0, 0));
        assert!(matches!(
            JpegEncoder.encode(&empty),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_to_base64_text() {
        assert_eq!(to_base64_text(b""), "");
        assert_eq!(to_base64_text(b"foob"), "Zm9vYg==");
        assert_eq!(to_base64_text(&[0xFF, 0xD8, 0xFF]), "/9j/");
    }

    #[test]
    fn test_load_image_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"This is not an image").unwrap();

        assert!(matches!(load_image(&path), Err(AppError::Image(_))));
        assert!(load_image(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_load_image_decodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        RgbImage::from_pixel(1, 1, Rgb([1, 2, 3])).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.dimensions(), (1, 1));
        assert!(image.source().ends_with("pixel.png"));
    }

    #[test]
    fn test_generate_thumbnail_fits_box() {
        let thumb = generate_thumbnail(&solid(400, 200), PREVIEW_DIMENSION);
        assert_eq!((thumb.width(), thumb.height()), (100, 50));
    }
}
