// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Furniture image recognition and moderation core
//!
//! This crate is the recognition pipeline behind the Furnora marketplace
//! upload flow. It takes a raw photo upload, validates and normalizes it,
//! runs it through a local ONNX furniture classifier cross-validated by an
//! external label service, derives structured furniture attributes, and
//! independently decides whether the image is safe to publish.
//!
//! The HTTP layer, persistence, auth and notifications live in the outer
//! service; this crate exposes the async library API they call into.

pub mod classification;
pub mod classifier;
pub mod config;
pub mod image;
pub mod labels;
pub mod moderation;
pub mod recognition;

// Re-export main pipeline types
pub use classification::{classify, ClassificationResult, FurnitureMetadata};
pub use classifier::{
    ClassifierError, FurnitureClassifier, OnnxFurnitureClassifier, FURNITURE_CLASSES,
};
pub use config::VisionConfig;
pub use image::{
    ImageValidator, InputTensor, NormalizedImage, PreprocessError, TensorError, ValidatedImage,
    ValidationError,
};
pub use labels::{
    DetectedLabel, DisabledLabelDetector, LabelDetector, LabelServiceError, RestLabelClient,
};
pub use moderation::{
    ModerationEngine, ModerationProvider, ModerationResult, ModerationServiceError, QualityScores,
    RestModerationClient,
};
pub use recognition::{
    AnalysisOutcome, RecognitionError, RecognitionOrchestrator, RecognitionResult,
};
