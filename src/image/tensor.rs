// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Tensor encoding and scoped buffer release
//!
//! [`InputTensor`] owns the classifier input buffer for exactly one
//! recognition call. The buffer is released at most once: either explicitly
//! via [`InputTensor::release`] on the happy path, or by `Drop` on early
//! returns and error paths. Leaked tensors degrade the service over time,
//! so the orchestrator never hands the raw array out of this wrapper.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array4;
use thiserror::Error;
use tracing::trace;

use crate::image::preprocessing::NormalizedImage;

/// Errors from tensor encoding and access
#[derive(Debug, Error)]
pub enum TensorError {
    /// Pixel buffer does not match the declared square size
    #[error("Image shape mismatch: got {width}x{height}, expected {expected}x{expected}")]
    ShapeMismatch {
        width: u32,
        height: u32,
        expected: u32,
    },

    /// The buffer was already released
    #[error("Tensor buffer accessed after release")]
    Released,
}

/// Classifier input buffer with guaranteed single release
///
/// Shape is `[1, H, W, 3]` with values scaled to `[0, 1]`.
pub struct InputTensor {
    data: Option<Array4<f32>>,
    release_tracker: Option<Arc<AtomicUsize>>,
}

impl InputTensor {
    /// Borrow the underlying array for an inference call
    pub fn data(&self) -> Result<&Array4<f32>, TensorError> {
        self.data.as_ref().ok_or(TensorError::Released)
    }

    /// Whether the buffer has been released
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Release the buffer now instead of waiting for drop
    ///
    /// Idempotent: a second call (or the eventual drop) is a no-op, so
    /// release happens exactly once on every exit path.
    pub fn release(&mut self) {
        if self.data.take().is_some() {
            trace!("input tensor released");
            if let Some(tracker) = &self.release_tracker {
                tracker.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Count releases into `tracker`; used by tests to assert exactly-once
    pub fn set_release_tracker(&mut self, tracker: Arc<AtomicUsize>) {
        self.release_tracker = Some(tracker);
    }
}

impl Drop for InputTensor {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for InputTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputTensor")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

/// Encode a normalized image into a `[1, H, W, 3]` tensor in `[0, 1]`
pub fn encode(image: &NormalizedImage) -> Result<InputTensor, TensorError> {
    let (width, height) = image.rgb.dimensions();
    if width != image.size || height != image.size {
        return Err(TensorError::ShapeMismatch {
            width,
            height,
            expected: image.size,
        });
    }

    let size = image.size as usize;
    let mut data = Array4::zeros((1, size, size, 3));
    for y in 0..size {
        for x in 0..size {
            let pixel = image.rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                data[[0, y, x, c]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    Ok(InputTensor {
        data: Some(data),
        release_tracker: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn normalized(size: u32) -> NormalizedImage {
        NormalizedImage {
            rgb: RgbImage::from_pixel(size, size, Rgb([255, 0, 128])),
            encoded: vec![0xFF, 0xD8, 0xFF],
            size,
            contrast_stretched: false,
        }
    }

    #[test]
    fn test_encode_shape_and_range() {
        let tensor = encode(&normalized(224)).unwrap();
        let data = tensor.data().unwrap();
        assert_eq!(data.shape(), &[1, 224, 224, 3]);
        assert!((data[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(data[[0, 0, 0, 1]].abs() < 1e-6);
        for val in data.iter() {
            assert!((0.0..=1.0).contains(val));
        }
    }

    #[test]
    fn test_encode_rejects_shape_mismatch() {
        let mut image = normalized(64);
        image.size = 224;
        let result = encode(&image);
        assert!(matches!(
            result.unwrap_err(),
            TensorError::ShapeMismatch { width: 64, .. }
        ));
    }

    #[test]
    fn test_release_is_exactly_once() {
        let tracker = Arc::new(AtomicUsize::new(0));
        let mut tensor = encode(&normalized(32)).unwrap();
        tensor.set_release_tracker(tracker.clone());

        tensor.release();
        tensor.release();
        drop(tensor);
        assert_eq!(tracker.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_untouched_tensor() {
        let tracker = Arc::new(AtomicUsize::new(0));
        {
            let mut tensor = encode(&normalized(32)).unwrap();
            tensor.set_release_tracker(tracker.clone());
        }
        assert_eq!(tracker.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_access_after_release_fails() {
        let mut tensor = encode(&normalized(32)).unwrap();
        tensor.release();
        assert!(tensor.is_released());
        assert!(matches!(tensor.data(), Err(TensorError::Released)));
    }
}
