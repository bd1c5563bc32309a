// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Recognition orchestration
//!
//! Drives validation -> preprocessing -> tensor encoding -> dual inference
//! -> result reconciliation. The local classifier call is mandatory; the
//! external cross-validation call is best-effort with a bounded wait and
//! degrades to local-only labels on timeout or error. The input tensor is
//! released exactly once on every exit path.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::classification::{classify, ClassificationResult};
use crate::classifier::{ClassifierError, FurnitureClassifier};
use crate::config::VisionConfig;
use crate::image::preprocessing::{self, PreprocessError};
use crate::image::tensor::{self, TensorError};
use crate::image::validator::{ImageValidator, ValidationError};
use crate::labels::LabelDetector;

/// Failures of a recognition call
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Input rejected before any expensive work; client-correctable
    #[error("Image validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Decode/normalize failure on data that passed signature checks
    #[error("Image preprocessing failed: {0}")]
    Preprocessing(#[from] PreprocessError),

    /// Tensor encoding failure
    #[error("Tensor encoding failed: {0}")]
    Encoding(#[from] TensorError),

    /// Local classifier unavailable or crashed; fatal for this request
    #[error("Local inference failed: {0}")]
    Inference(#[from] ClassifierError),
}

impl RecognitionError {
    /// Machine-readable kind for the HTTP layer's error mapping
    pub fn kind(&self) -> &'static str {
        match self {
            RecognitionError::Validation(_) => "invalid_image",
            RecognitionError::Preprocessing(_) => "preprocessing_failed",
            // Tensor failures are internal bugs, not correctable uploads,
            // so they carry a server-side kind distinct from preprocessing
            RecognitionError::Encoding(_) => "encoding_failed",
            RecognitionError::Inference(_) => "inference_error",
        }
    }

    /// Whether the caller can fix this by correcting their upload
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RecognitionError::Validation(_) | RecognitionError::Preprocessing(_)
        )
    }
}

/// Outcome of a successful recognition run
///
/// `confidence_score` is always the local classifier's maximum class
/// probability scaled to 0-100. `labels` holds the local best guess first,
/// then every cross-validated label above the configured confidence cutoff,
/// deduplicated in insertion order. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    /// The local classifier's arg-max class
    pub primary_category: String,
    /// Arg-max class probability scaled to 0-100
    pub confidence_score: f32,
    /// Merged label set, primary guess first, insertion-ordered, deduplicated
    pub labels: Vec<String>,
    /// False when the cross-validation call was skipped or degraded
    pub cross_validated: bool,
    /// When the pipeline completed
    pub recognized_at: DateTime<Utc>,
}

/// Combined recognition + attribute derivation, matching the upload API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub recognition: RecognitionResult,
    pub classification: ClassificationResult,
}

/// Drives the full recognition pipeline for one image submission
///
/// Holds no cross-request mutable state; the classifier handle is loaded
/// once at startup and shared read-only.
pub struct RecognitionOrchestrator {
    validator: ImageValidator,
    classifier: Arc<dyn FurnitureClassifier>,
    labels: Arc<dyn LabelDetector>,
    config: VisionConfig,
    release_tracker: Option<Arc<AtomicUsize>>,
}

impl RecognitionOrchestrator {
    /// Create an orchestrator with injected collaborators
    pub fn new(
        config: VisionConfig,
        classifier: Arc<dyn FurnitureClassifier>,
        labels: Arc<dyn LabelDetector>,
    ) -> Self {
        Self {
            validator: ImageValidator::new(&config),
            classifier,
            labels,
            config,
            release_tracker: None,
        }
    }

    /// Count tensor releases into `tracker`; used by tests to assert
    /// exactly-once release across success and failure paths
    pub fn with_release_tracker(mut self, tracker: Arc<AtomicUsize>) -> Self {
        self.release_tracker = Some(tracker);
        self
    }

    /// Run the full pipeline on a raw upload
    ///
    /// Fails on validation, preprocessing or local-inference errors. A
    /// cross-validation failure is logged and treated as "no additional
    /// labels": the local classifier result alone is sufficient.
    pub async fn recognize(&self, bytes: &[u8]) -> Result<RecognitionResult, RecognitionError> {
        let validated = self.validator.validate(bytes)?;
        let normalized = preprocessing::preprocess(&validated, &self.config)?;

        let mut input = tensor::encode(&normalized)?;
        if let Some(tracker) = &self.release_tracker {
            input.set_release_tracker(tracker.clone());
        }

        // Local inference and cross-validation are independent; issue them
        // concurrently. Only the cross-validation wait is bounded. The label
        // service receives the original validated bytes, not the tensor.
        let cross_wait = Duration::from_millis(self.config.cross_validation_timeout_ms);
        let (local, cross) = tokio::join!(
            self.classifier.predict(input.data()?),
            timeout(cross_wait, self.labels.detect_labels(validated.bytes)),
        );

        // The predict call has consumed the tensor's usefulness; release it
        // before touching either result so no return path below can leak it.
        input.release();

        let probabilities = local?;
        let classes = self.classifier.class_labels();
        if probabilities.len() != classes.len() {
            return Err(RecognitionError::Inference(ClassifierError::InvalidOutput {
                expected: classes.len(),
                actual: probabilities.len(),
            }));
        }

        let (best_index, best_prob) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or(RecognitionError::Inference(ClassifierError::InvalidOutput {
                expected: classes.len(),
                actual: 0,
            }))?;

        let primary_category = classes[best_index].clone();
        let confidence_score = best_prob * 100.0;

        let mut labels = vec![primary_category.clone()];
        let mut cross_validated = false;
        match cross {
            Ok(Ok(detected)) => {
                cross_validated = true;
                for label in detected {
                    if label.confidence >= self.config.label_min_confidence
                        && !labels.contains(&label.name)
                    {
                        labels.push(label.name);
                    }
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "label cross-validation failed, using local-only result");
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.cross_validation_timeout_ms,
                    "label cross-validation timed out, using local-only result"
                );
            }
        }

        debug!(
            primary = %primary_category,
            confidence = confidence_score,
            labels = labels.len(),
            cross_validated,
            "recognition completed"
        );

        Ok(RecognitionResult {
            primary_category,
            confidence_score,
            labels,
            cross_validated,
            recognized_at: Utc::now(),
        })
    }

    /// Run recognition and attribute derivation in one call
    ///
    /// This is the shape the upload endpoint returns to mobile clients.
    pub async fn analyze(&self, bytes: &[u8]) -> Result<AnalysisOutcome, RecognitionError> {
        let recognition = self.recognize(bytes).await?;
        let classification = classify(&recognition);
        Ok(AnalysisOutcome {
            recognition,
            classification,
        })
    }
}
