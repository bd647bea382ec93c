//! Image decoding for the OCR pipeline.
//!
//! Turns raw byte payloads into in-memory pixel data. Empty and corrupt
//! buffers are rejected deterministically; there is no partial output.

use crate::core::{OcrError, OcrResult};
use image::DynamicImage;

/// Decodes a raw byte buffer into a [`DynamicImage`].
///
/// Accepts any raster format the `image` crate understands (JPEG and PNG
/// being the common cases for scanned documents).
///
/// # Arguments
///
/// * `bytes` - The raw image payload as received from the transport layer.
///
/// # Errors
///
/// Returns [`OcrError::EmptyImage`] for an empty buffer and
/// [`OcrError::Decode`] for a buffer that cannot be decoded.
pub fn decode_image(bytes: &[u8]) -> OcrResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(OcrError::EmptyImage);
    }
    image::load_from_memory(bytes).map_err(OcrError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([250, 250, 250]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_valid_png() {
        let decoded = decode_image(&png_bytes(32, 24)).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(matches!(decode_image(&[]), Err(OcrError::EmptyImage)));
    }

    #[test]
    fn rejects_arbitrary_bytes() {
        let garbage: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        assert!(matches!(decode_image(&garbage), Err(OcrError::Decode(_))));
    }
}
