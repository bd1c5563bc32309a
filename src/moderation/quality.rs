// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Local image-quality fallback
//!
//! When the external quality assessor is unreachable, moderation falls back
//! to a coarse local estimate: mean luma for brightness, Laplacian variance
//! for sharpness, both mapped onto the same 0-100 scale the external
//! service reports.

use image::GrayImage;
use tracing::warn;

use super::QualityScores;
use crate::image::validator::ValidatedImage;

/// Laplacian variance treated as "fully sharp" on the 0-100 scale
const SHARPNESS_FULL_SCALE: f32 = 500.0;

/// Estimate brightness/sharpness locally from the validated bytes
///
/// A decode failure here is not fatal, but it fails toward zero scores:
/// an image we cannot even decode must not pass the quality gate, and the
/// caller's degraded flag tells the workflow to re-check once the external
/// assessor recovers.
pub fn local_estimate(validated: &ValidatedImage<'_>) -> QualityScores {
    let image = match image::load_from_memory_with_format(validated.bytes, validated.format) {
        Ok(image) => image.to_luma8(),
        Err(e) => {
            warn!(error = %e, "local quality estimate could not decode image, failing scores");
            return QualityScores {
                brightness: 0.0,
                sharpness: 0.0,
            };
        }
    };

    QualityScores {
        brightness: brightness_score(&image),
        sharpness: sharpness_score(&image),
    }
}

/// Mean luma scaled to 0-100
fn brightness_score(gray: &GrayImage) -> f32 {
    let pixel_count = (gray.width() * gray.height()) as f64;
    if pixel_count == 0.0 {
        return 0.0;
    }
    let sum: f64 = gray.pixels().map(|p| p[0] as f64).sum();
    (sum / pixel_count / 255.0 * 100.0) as f32
}

/// Variance of the 4-neighbor Laplacian, clamped onto 0-100
fn sharpness_score(gray: &GrayImage) -> f32 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0.0f64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let laplacian = 4.0 * center
                - gray.get_pixel(x - 1, y)[0] as f64
                - gray.get_pixel(x + 1, y)[0] as f64
                - gray.get_pixel(x, y - 1)[0] as f64
                - gray.get_pixel(x, y + 1)[0] as f64;
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1.0;
        }
    }

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0) as f32;
    (variance / SHARPNESS_FULL_SCALE * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisionConfig;
    use crate::image::validator::ImageValidator;
    use image::{DynamicImage, ImageFormat, Luma};
    use std::io::Cursor;

    #[test]
    fn test_brightness_of_white_image() {
        let white = GrayImage::from_pixel(32, 32, Luma([255]));
        assert!((brightness_score(&white) - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_brightness_of_black_image() {
        let black = GrayImage::from_pixel(32, 32, Luma([0]));
        assert!(brightness_score(&black) < 0.5);
    }

    #[test]
    fn test_flat_image_has_no_sharpness() {
        let flat = GrayImage::from_pixel(32, 32, Luma([128]));
        assert_eq!(sharpness_score(&flat), 0.0);
    }

    #[test]
    fn test_undecodable_image_fails_toward_zero_scores() {
        // Valid PNG truncated past the header: dimensions parse, decode fails
        let img = DynamicImage::new_rgb8(300, 300);
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        let mut bytes = bytes.into_inner();
        bytes.truncate(40);

        let config = VisionConfig::default();
        let validated = ImageValidator::new(&config).validate(&bytes).unwrap();

        let scores = local_estimate(&validated);
        assert_eq!(scores.brightness, 0.0);
        assert_eq!(scores.sharpness, 0.0);
        // An undecodable image must never clear the default quality gate
        assert!(scores.brightness < config.quality_min_score);
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let mut board = GrayImage::new(32, 32);
        for (x, y, pixel) in board.enumerate_pixels_mut() {
            *pixel = if (x + y) % 2 == 0 { Luma([255]) } else { Luma([0]) };
        }
        assert!(sharpness_score(&board) > 90.0);
    }
}
