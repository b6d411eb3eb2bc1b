//! Source normalization.
//!
//! Every channel funnels into one canonical representation: an 8-bit RGB
//! image. Spreadsheet cells get classified first (data URI, bare base64,
//! empty) and decoded second, so an empty cell never turns into a decode
//! error.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageReader, RgbImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unsupported or corrupt image data: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode image: {0}")]
    Encoding(String),
}

/// A decoded image in fixed 8-bit RGB channel order.
///
/// Transient per-request value; never persisted.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    inner: RgbImage,
}

impl CanonicalImage {
    /// Decode arbitrary image bytes, guessing the container format from the
    /// content, and convert whatever color mode arrives (grayscale, RGBA,
    /// palette) to RGB8.
    pub fn decode(bytes: &[u8]) -> Result<Self, NormalizeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| NormalizeError::UnsupportedFormat(err.to_string()))?;
        let dynamic = reader
            .decode()
            .map_err(|err| NormalizeError::UnsupportedFormat(err.to_string()))?;
        Ok(Self {
            inner: dynamic.to_rgb8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn as_rgb8(&self) -> &RgbImage {
        &self.inner
    }

    /// PNG-encode for transport to the inference backend.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, NormalizeError> {
        let mut buf = Cursor::new(Vec::new());
        self.inner
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|err| NormalizeError::Encoding(err.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// Shape of a spreadsheet cell's text content, decided before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// `data:<mime>;base64,<payload>`
    DataUri { payload: String },
    /// Raw base64 with no data-URI envelope.
    BareBase64 { payload: String },
    /// Empty or whitespace-only.
    Empty,
}

/// Classify a cell's text without decoding it.
pub fn classify_cell(value: &str) -> CellValue {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if trimmed.starts_with("data:") {
        // Payload follows the first comma; a missing comma leaves the whole
        // suffix as the payload and fails at decode time.
        let payload = match trimmed.split_once(',') {
            Some((_, payload)) => payload,
            None => trimmed,
        };
        return CellValue::DataUri {
            payload: payload.to_string(),
        };
    }
    CellValue::BareBase64 {
        payload: trimmed.to_string(),
    }
}

/// Outcome of turning one cell into image bytes.
#[derive(Debug)]
pub enum CellOutcome {
    /// Decodable base64 payload; bytes still need image decoding.
    Image(Vec<u8>),
    /// Empty cell. Not an error; the row simply carries no image.
    NoImage,
    /// Malformed payload. Reported for this row only.
    Invalid(String),
}

/// Extract raw image bytes from a cell. Never returns an error; malformed
/// content degrades to [`CellOutcome::Invalid`] so sibling rows proceed.
pub fn image_from_cell(value: &str) -> CellOutcome {
    let payload = match classify_cell(value) {
        CellValue::Empty => return CellOutcome::NoImage,
        CellValue::DataUri { payload } | CellValue::BareBase64 { payload } => payload,
    };
    match BASE64.decode(payload.as_bytes()) {
        Ok(bytes) if bytes.is_empty() => CellOutcome::Invalid("Empty image payload".to_string()),
        Ok(bytes) => CellOutcome::Image(bytes),
        Err(err) => CellOutcome::Invalid(format!("Invalid base64 image data: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, RgbaImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_rgba_converts_to_rgb8() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            3,
            image::Rgba([10, 20, 30, 128]),
        ));
        let canonical = CanonicalImage::decode(&png_bytes(rgba)).unwrap();
        assert_eq!((canonical.width(), canonical.height()), (4, 3));
        // Alpha is dropped, not blended
        assert_eq!(canonical.as_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_decode_grayscale_converts_to_rgb8() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, image::Luma([77])));
        let canonical = CanonicalImage::decode(&png_bytes(gray)).unwrap();
        let px = canonical.as_rgb8().get_pixel(0, 0);
        assert_eq!(px.0, [77, 77, 77]);
    }

    #[test]
    fn test_decode_is_idempotent_on_rgb8() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, image::Rgb([1, 2, 3])));
        let first = CanonicalImage::decode(&png_bytes(rgb)).unwrap();
        let second = CanonicalImage::decode(&first.to_png_bytes().unwrap()).unwrap();
        assert_eq!(first.as_rgb8(), second.as_rgb8());
    }

    #[test]
    fn test_decode_garbage_is_unsupported_format() {
        let err = CanonicalImage::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_classify_cell_variants() {
        assert_eq!(classify_cell(""), CellValue::Empty);
        assert_eq!(classify_cell("   \t"), CellValue::Empty);
        assert_eq!(
            classify_cell("data:image/png;base64,AAAA"),
            CellValue::DataUri {
                payload: "AAAA".to_string()
            }
        );
        assert_eq!(
            classify_cell("AAAA"),
            CellValue::BareBase64 {
                payload: "AAAA".to_string()
            }
        );
    }

    #[test]
    fn test_image_from_cell_data_uri() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, image::Rgb([9, 9, 9])));
        let encoded = BASE64.encode(png_bytes(rgb));
        let cell = format!("data:image/png;base64,{}", encoded);
        match image_from_cell(&cell) {
            CellOutcome::Image(bytes) => {
                CanonicalImage::decode(&bytes).unwrap();
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_image_from_cell_empty_is_no_image() {
        assert!(matches!(image_from_cell("  "), CellOutcome::NoImage));
    }

    #[test]
    fn test_image_from_cell_bad_base64_is_invalid_not_error() {
        assert!(matches!(
            image_from_cell("!!not base64!!"),
            CellOutcome::Invalid(_)
        ));
    }
}
