//! Image preprocessing: best-effort sharpening before extraction.
//!
//! Phone photos of result cards are routinely soft and low-contrast; an
//! unsharp mask plus a contrast boost measurably improves how reliably the
//! vision model reads small grade tables.
//!
//! This stage must never fail the request. A corrupt or exotically-encoded
//! image simply passes through unchanged — the extraction call decides
//! whether the original bytes are usable.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// Unsharp-mask sigma. Matches a "2x sharpness" enhancement.
const SHARPEN_SIGMA: f32 = 2.0;
/// Unsharp-mask threshold: 0 sharpens every pixel.
const SHARPEN_THRESHOLD: i32 = 0;
/// Contrast boost in percent above neutral.
const CONTRAST_BOOST: f32 = 25.0;
/// JPEG re-encode quality. High enough that text edges survive.
const JPEG_QUALITY: u8 = 95;

/// Enhance an image buffer for extraction, falling back to the original
/// bytes on any internal failure.
///
/// Returns the enhanced bytes and the content type they carry: enhanced
/// output is always JPEG, a fallback keeps the caller-supplied type.
pub fn enhance(image_bytes: &[u8], content_type: &str) -> (Vec<u8>, String) {
    match try_enhance(image_bytes) {
        Ok(enhanced) => {
            debug!(
                original_bytes = image_bytes.len(),
                enhanced_bytes = enhanced.len(),
                "image enhanced for extraction"
            );
            (enhanced, "image/jpeg".to_string())
        }
        Err(err) => {
            warn!("image enhancement failed, using original bytes: {err}");
            (image_bytes.to_vec(), content_type.to_string())
        }
    }
}

fn try_enhance(image_bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(image_bytes)?;

    // RGB8 first: JPEG cannot encode alpha or 16-bit channels.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let enhanced = rgb
        .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
        .adjust_contrast(CONTRAST_BOOST);

    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    enhanced.write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_fixture() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn enhances_valid_png_to_jpeg() {
        let original = png_fixture();
        let (out, content_type) = enhance(&original, "image/png");
        assert_eq!(content_type, "image/jpeg");
        // Output must itself be a decodable image.
        let decoded = image::load_from_memory(&out).expect("enhanced output decodes");
        assert_eq!(decoded.width(), 32);
        // JPEG magic bytes.
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn corrupt_bytes_pass_through_unchanged() {
        let garbage = b"definitely not an image".to_vec();
        let (out, content_type) = enhance(&garbage, "image/png");
        assert_eq!(out, garbage);
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn empty_input_passes_through() {
        let (out, _) = enhance(&[], "image/jpeg");
        assert!(out.is_empty());
    }
}
