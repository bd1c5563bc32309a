// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Publication moderation, independent of furniture recognition
//!
//! Decides approve/reject from content-safety flags and image-quality
//! metrics. Intentionally decoupled from the recognition orchestrator: the
//! calling workflow keeps rejected images away from classification, not
//! this engine. External moderation calls are best-effort; on failure the
//! engine degrades to local estimates rather than blocking publication
//! decisions on a downed collaborator.

pub mod client;
pub mod quality;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::VisionConfig;
use crate::image::validator::{ImageValidator, ValidationError};

pub use client::RestModerationClient;

/// Errors from the external moderation/quality service
#[derive(Debug, Error)]
pub enum ModerationServiceError {
    /// Transport-level failure
    #[error("Moderation service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Moderation service error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No endpoint configured for this deployment
    #[error("Moderation service is not configured")]
    NotConfigured,
}

/// Brightness and sharpness scores in 0-100
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityScores {
    pub brightness: f32,
    pub sharpness: f32,
}

/// Trait for the external moderation collaborator
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Detect content-safety flags; an empty list means clean
    async fn detect_moderation_labels(
        &self,
        image: &[u8],
    ) -> Result<Vec<String>, ModerationServiceError>;

    /// Assess brightness/sharpness of the image
    async fn assess_quality(&self, image: &[u8]) -> Result<QualityScores, ModerationServiceError>;
}

/// Publish/reject decision for one image
///
/// `is_approved` is false exactly when flags are present or a quality score
/// missed the threshold. `reason` is always computed from those inputs,
/// never stored independently, so it cannot drift from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_approved: bool,
    /// Content reason-codes from the moderation service; possibly empty
    pub flags: Vec<String>,
    /// Human-readable summary, computed by priority: content flags first,
    /// then quality failure, else approval
    pub reason: String,
    /// True when an external call failed and defaults/local estimates were
    /// used instead
    pub degraded: bool,
}

/// Runs the moderation decision for one validated image
pub struct ModerationEngine {
    validator: ImageValidator,
    provider: Arc<dyn ModerationProvider>,
    min_quality: f32,
    call_timeout: Duration,
}

impl ModerationEngine {
    /// Create an engine with an injected moderation provider
    pub fn new(config: &VisionConfig, provider: Arc<dyn ModerationProvider>) -> Self {
        Self {
            validator: ImageValidator::new(config),
            provider,
            min_quality: config.quality_min_score,
            call_timeout: Duration::from_millis(config.moderation_timeout_ms),
        }
    }

    /// Decide whether an upload may be published
    ///
    /// Validation failures are the only fatal outcome. The two external
    /// calls run concurrently with bounded waits; either one failing
    /// degrades that half of the decision and marks the result degraded.
    pub async fn moderate(&self, bytes: &[u8]) -> Result<ModerationResult, ValidationError> {
        let validated = self.validator.validate(bytes)?;

        let (flags_outcome, quality_outcome) = tokio::join!(
            timeout(
                self.call_timeout,
                self.provider.detect_moderation_labels(validated.bytes)
            ),
            timeout(self.call_timeout, self.provider.assess_quality(validated.bytes)),
        );

        let mut degraded = false;

        let flags = match flags_outcome {
            Ok(Ok(flags)) => flags,
            Ok(Err(e)) => {
                warn!(error = %e, "moderation label call failed, assuming no flags");
                degraded = true;
                Vec::new()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "moderation label call timed out, assuming no flags"
                );
                degraded = true;
                Vec::new()
            }
        };

        let quality = match quality_outcome {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!(error = %e, "quality assessment failed, using local estimate");
                degraded = true;
                quality::local_estimate(&validated)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "quality assessment timed out, using local estimate"
                );
                degraded = true;
                quality::local_estimate(&validated)
            }
        };

        let quality_ok =
            quality.brightness >= self.min_quality && quality.sharpness >= self.min_quality;
        let is_approved = flags.is_empty() && quality_ok;

        let reason = if !flags.is_empty() {
            format!("Image contains inappropriate content: {}", flags.join(", "))
        } else if !quality_ok {
            format!(
                "Image quality too low (brightness {:.0}, sharpness {:.0}, minimum {:.0})",
                quality.brightness, quality.sharpness, self.min_quality
            )
        } else {
            "Image approved".to_string()
        };

        debug!(is_approved, flags = flags.len(), degraded, "moderation decided");

        Ok(ModerationResult {
            is_approved,
            flags,
            reason,
            degraded,
        })
    }
}
