// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Upload validation: size, format signature and dimension checks
//!
//! Runs before any expensive decode or inference work. Format is determined
//! by byte signature, never by filename or declared MIME type.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use thiserror::Error;

use crate::config::VisionConfig;

/// Errors for rejected uploads; all are client-correctable
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Upload exceeds the configured byte limit
    #[error("Image data is too large: {size} bytes (max: {max} bytes)")]
    SizeExceeded { size: usize, max: usize },

    /// Leading bytes match none of the supported format signatures
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// Image dimensions are below the configured minimum
    #[error("Image is too small: {width}x{height} (min: {min}x{min})")]
    TooSmall { width: u32, height: u32, min: u32 },

    /// Image dimensions are above the configured maximum
    #[error("Image is too large: {width}x{height} (max: {max}x{max})")]
    TooLarge { width: u32, height: u32, max: u32 },

    /// Upload is empty
    #[error("Image data is empty")]
    EmptyData,

    /// Header parse failed on data that carried a valid signature
    #[error("Failed to read image header: {0}")]
    HeaderUnreadable(String),
}

/// A validated upload: the original bytes plus verified dimensions
///
/// Created only by [`ImageValidator::validate`], never mutated, and dropped
/// with the request that received it.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedImage<'a> {
    /// The original upload bytes
    pub bytes: &'a [u8],
    /// Verified width in pixels
    pub width: u32,
    /// Verified height in pixels
    pub height: u32,
    /// Format detected from the byte signature
    pub format: ImageFormat,
}

/// Validates raw upload buffers against size, format and dimension limits
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_bytes: usize,
    min_dimension: u32,
    max_dimension: u32,
}

impl ImageValidator {
    /// Create a validator from pipeline configuration
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            max_bytes: config.max_image_bytes,
            min_dimension: config.min_dimension,
            max_dimension: config.max_dimension,
        }
    }

    /// Validate an upload buffer
    ///
    /// Pure function of the input bytes: checks the byte budget, sniffs the
    /// format signature, then parses only the header for dimensions.
    pub fn validate<'a>(&self, bytes: &'a [u8]) -> Result<ValidatedImage<'a>, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyData);
        }

        if bytes.len() > self.max_bytes {
            return Err(ValidationError::SizeExceeded {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        let format = detect_format(bytes)?;

        // Header-only dimension probe; full decode happens in preprocessing
        let (width, height) = dimensions(bytes, format)?;

        if width < self.min_dimension || height < self.min_dimension {
            return Err(ValidationError::TooSmall {
                width,
                height,
                min: self.min_dimension,
            });
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ValidationError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        Ok(ValidatedImage {
            bytes,
            width,
            height,
            format,
        })
    }
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ValidationError> {
    if bytes.len() < 12 {
        return Err(ValidationError::UnsupportedFormat);
    }

    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        _ => Err(ValidationError::UnsupportedFormat),
    }
}

fn dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), ValidationError> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    reader.set_format(format);
    reader
        .into_dimensions()
        .map_err(|e| ValidationError::HeaderUnreadable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn validator() -> ImageValidator {
        ImageValidator::new(&VisionConfig::default())
    }

    #[test]
    fn test_validate_accepts_minimum_sized_png() {
        let bytes = encode_png(224, 224);
        let validated = validator().validate(&bytes).unwrap();
        assert_eq!(validated.width, 224);
        assert_eq!(validated.height, 224);
        assert_eq!(validated.format, ImageFormat::Png);
    }

    #[test]
    fn test_validate_rejects_empty_buffer() {
        let result = validator().validate(&[]);
        assert!(matches!(result.unwrap_err(), ValidationError::EmptyData));
    }

    #[test]
    fn test_validate_rejects_oversized_buffer_regardless_of_content() {
        let config = VisionConfig::default();
        // Not even a valid signature; the byte budget is checked first
        let huge = vec![0u8; config.max_image_bytes + 1];
        let result = validator().validate(&huge);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::SizeExceeded { .. }
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_signature() {
        let garbage = vec![0x00u8; 64];
        let result = validator().validate(&garbage);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::UnsupportedFormat
        ));
    }

    #[test]
    fn test_validate_rejects_below_minimum_dimension() {
        let bytes = encode_png(100, 300);
        let result = validator().validate(&bytes);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::TooSmall {
                width: 100,
                height: 300,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_above_maximum_dimension() {
        let bytes = encode_png(8000, 300);
        let result = validator().validate(&bytes);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::TooLarge { width: 8000, .. }
        ));
    }

    #[test]
    fn test_validate_ignores_declared_type_uses_signature() {
        // JPEG magic with truncated body: signature passes, header read fails
        let fake = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01];
        let result = validator().validate(&fake);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::HeaderUnreadable(_)
        ));
    }

    #[test]
    fn test_detect_format_jpeg() {
        let header = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
        ];
        assert_eq!(detect_format(&header).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_format_webp() {
        let header = [
            0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50,
        ];
        assert_eq!(detect_format(&header).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_detect_format_rejects_gif() {
        // GIF is not an accepted upload format for listings
        let header = [
            0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00,
        ];
        assert!(detect_format(&header).is_err());
    }

    #[test]
    fn test_custom_limits_are_honored() {
        let config = VisionConfig {
            min_dimension: 64,
            ..VisionConfig::default()
        };
        let bytes = encode_png(100, 100);
        let validated = ImageValidator::new(&config).validate(&bytes).unwrap();
        assert_eq!(validated.width, 100);
    }
}
