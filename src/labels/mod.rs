// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! External label cross-validation service interface
//!
//! The label service is an independent vision-labeling collaborator used to
//! cross-check the local classifier's guess. Calls to it are best-effort:
//! the orchestrator bounds the wait and degrades to local-only results on
//! timeout or error.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::RestLabelClient;

/// A single label returned by the cross-validation service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLabel {
    /// Short content tag, e.g. "Chair" or "Wood"
    pub name: String,
    /// Confidence score in 0-100
    pub confidence: f32,
}

/// Errors from the label cross-validation service
#[derive(Debug, Error)]
pub enum LabelServiceError {
    /// Transport-level failure
    #[error("Label service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Label service error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No endpoint configured for this deployment
    #[error("Label service is not configured")]
    NotConfigured,
}

/// Trait for the external label detection collaborator
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Detect content labels for an image
    ///
    /// Returns a ranked (label, confidence) list; the caller applies the
    /// minimum confidence filter.
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<DetectedLabel>, LabelServiceError>;
}

/// Stand-in detector for deployments without a label service endpoint
///
/// Every call reports [`LabelServiceError::NotConfigured`], which the
/// orchestrator treats as a degraded cross-validation, so recognition keeps
/// working on local-only results.
#[derive(Debug, Default, Clone)]
pub struct DisabledLabelDetector;

#[async_trait]
impl LabelDetector for DisabledLabelDetector {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<DetectedLabel>, LabelServiceError> {
        Err(LabelServiceError::NotConfigured)
    }
}
