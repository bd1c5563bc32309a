// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the furniture classifier
//!
//! Steps:
//! 1. Full decode of the validated bytes
//! 2. Resize with aspect ratio preservation, pad to square with neutral gray
//! 3. Convert to RGB (strips alpha)
//! 4. Per-channel linear contrast stretch (2nd-98th percentile)
//! 5. Canonical JPEG re-encode at fixed quality for downstream services

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, GenericImageView, Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::config::VisionConfig;
use crate::image::validator::ValidatedImage;

/// Padding fill for the square fit
const PAD_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Percentile clipped on each side by the contrast stretch
const STRETCH_CLIP_PERCENT: f32 = 2.0;

/// Errors from the decode/normalize stage
///
/// These cover corrupt data that passed signature checks; the underlying
/// cause is attached, not swallowed.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// Full decode failed after the signature check accepted the buffer
    #[error("Failed to decode image: {source}")]
    DecodeFailed {
        #[source]
        source: image::ImageError,
    },

    /// Canonical JPEG re-encode failed
    #[error("Failed to re-encode image: {source}")]
    EncodeFailed {
        #[source]
        source: image::ImageError,
    },
}

/// A normalized image ready for tensor encoding
///
/// Owned exclusively by the recognition call that created it.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Square RGB pixel data at `size` x `size`
    pub rgb: RgbImage,
    /// Canonical JPEG bytes at the configured quality
    pub encoded: Vec<u8>,
    /// Side length of the square output
    pub size: u32,
    /// Whether the contrast stretch actually changed the histogram
    pub contrast_stretched: bool,
}

/// Normalize a validated image into classifier-ready form
pub fn preprocess(
    validated: &ValidatedImage<'_>,
    config: &VisionConfig,
) -> Result<NormalizedImage, PreprocessError> {
    let img = image::load_from_memory_with_format(validated.bytes, validated.format)
        .map_err(|source| PreprocessError::DecodeFailed { source })?;

    let padded = resize_with_padding(&img, config.target_size);
    let (rgb, contrast_stretched) = stretch_contrast(padded);

    let encoded = encode_jpeg(&rgb, config.jpeg_quality)?;
    debug!(
        size = config.target_size,
        stretched = contrast_stretched,
        encoded_bytes = encoded.len(),
        "image normalized"
    );

    Ok(NormalizedImage {
        rgb,
        encoded,
        size: config.target_size,
        contrast_stretched,
    })
}

/// Resize with aspect ratio preservation and neutral gray padding
///
/// The image is scaled to fit within `target_size` x `target_size` without
/// distortion, then centered on a gray canvas to reach the exact target.
pub fn resize_with_padding(image: &DynamicImage, target_size: u32) -> RgbImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return RgbImage::from_pixel(target_size, target_size, PAD_COLOR);
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(1);

    let resized = image
        .resize_exact(new_w, new_h, imageops::FilterType::Lanczos3)
        .to_rgb8();

    let mut output = RgbImage::from_pixel(target_size, target_size, PAD_COLOR);
    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    for y in 0..new_h {
        for x in 0..new_w {
            output.put_pixel(x + offset_x, y + offset_y, *resized.get_pixel(x, y));
        }
    }

    output
}

/// Per-channel linear contrast stretch over the 2nd-98th percentile
///
/// Returns the stretched image and whether any channel actually changed.
/// An already well-spread histogram maps onto itself and is left untouched.
pub fn stretch_contrast(image: RgbImage) -> (RgbImage, bool) {
    let pixel_count = (image.width() * image.height()) as u64;
    if pixel_count == 0 {
        return (image, false);
    }

    let mut bounds = [(0u8, 255u8); 3];
    let clip = ((pixel_count as f32) * STRETCH_CLIP_PERCENT / 100.0) as u64;

    for c in 0..3 {
        let mut histogram = [0u64; 256];
        for pixel in image.pixels() {
            histogram[pixel[c] as usize] += 1;
        }
        bounds[c] = percentile_bounds(&histogram, clip);
    }

    let identity = bounds.iter().all(|&(lo, hi)| lo == 0 && hi == 255);
    if identity {
        return (image, false);
    }

    let mut output = image;
    for pixel in output.pixels_mut() {
        for c in 0..3 {
            let (lo, hi) = bounds[c];
            let range = (hi as f32 - lo as f32).max(1.0);
            let stretched = (pixel[c].saturating_sub(lo) as f32) * 255.0 / range;
            pixel[c] = stretched.min(255.0) as u8;
        }
    }

    (output, true)
}

fn percentile_bounds(histogram: &[u64; 256], clip: u64) -> (u8, u8) {
    let mut lo = 0u8;
    let mut acc = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        acc += count;
        if acc > clip {
            lo = value as u8;
            break;
        }
    }

    let mut hi = 255u8;
    let mut acc = 0u64;
    for (value, &count) in histogram.iter().enumerate().rev() {
        acc += count;
        if acc > clip {
            hi = value as u8;
            break;
        }
    }

    if hi <= lo {
        (0, 255)
    } else {
        (lo, hi)
    }
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|source| PreprocessError::EncodeFailed { source })?;
    Ok(buf.into_inner())
}
