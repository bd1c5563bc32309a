// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Local furniture classifier interface
//!
//! The classifier is loaded once at startup and injected into the
//! orchestrator as a shared, read-only handle. Tests substitute a stub
//! implementation of [`FurnitureClassifier`].

pub mod onnx_model;

use async_trait::async_trait;
use ndarray::Array4;
use thiserror::Error;

pub use onnx_model::OnnxFurnitureClassifier;

/// The fixed, ordered class list for the furniture model
///
/// The probability vector returned by [`FurnitureClassifier::predict`] is
/// indexed by this order.
pub const FURNITURE_CLASSES: &[&str] = &[
    "chair", "table", "sofa", "bed", "storage", "desk", "shelf", "lamp", "dresser", "bench",
];

/// Errors from local inference; not client-correctable
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model could not be reached or crashed mid-call
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// Model returned a vector that does not match the class list
    #[error("Invalid classifier output: got {actual} probabilities, expected {expected}")]
    InvalidOutput { expected: usize, actual: usize },

    /// ONNX Runtime failure
    #[error("Inference runtime error: {0}")]
    Runtime(String),
}

/// Trait for the local furniture classification model
///
/// Implementations must be safe for concurrent read-only inference calls;
/// the orchestrator shares one handle across requests.
#[async_trait]
pub trait FurnitureClassifier: Send + Sync {
    /// Run inference on a `[1, H, W, 3]` tensor in `[0, 1]`
    ///
    /// Returns a probability vector over [`class_labels`](Self::class_labels),
    /// summing to ~1.0.
    async fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError>;

    /// The fixed, ordered class list this model predicts over
    fn class_labels(&self) -> &[String];
}
