// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the recognition and moderation pipeline

use std::env;

/// Configuration for the vision pipeline
///
/// All numeric thresholds are configuration rather than hard-coded behavior;
/// in particular the cross-validation label confidence cutoff and the
/// moderation quality minimum are both overridable via environment.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Maximum accepted upload size in bytes
    pub max_image_bytes: usize,
    /// Minimum accepted width/height in pixels
    pub min_dimension: u32,
    /// Maximum accepted width/height in pixels
    pub max_dimension: u32,
    /// Side length of the square classifier input
    pub target_size: u32,
    /// Quality for the canonical JPEG re-encode (1-100)
    pub jpeg_quality: u8,
    /// Minimum confidence (0-100) for accepting a cross-validated label
    pub label_min_confidence: f32,
    /// Maximum labels requested per cross-validation call
    pub label_max_results: u32,
    /// Minimum brightness/sharpness score (0-100) for moderation approval
    pub quality_min_score: f32,
    /// Bounded wait for the best-effort cross-validation call, in milliseconds
    pub cross_validation_timeout_ms: u64,
    /// Bounded wait for each external moderation call, in milliseconds
    pub moderation_timeout_ms: u64,
    /// Label cross-validation service endpoint
    pub label_service_url: Option<String>,
    /// Label cross-validation service API key
    pub label_service_api_key: Option<String>,
    /// Moderation/quality service endpoint
    pub moderation_service_url: Option<String>,
    /// Moderation/quality service API key
    pub moderation_service_api_key: Option<String>,
    /// Path to the furniture classifier ONNX model
    pub model_path: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024,
            min_dimension: 224,
            max_dimension: 4096,
            target_size: 224,
            jpeg_quality: 85,
            label_min_confidence: 70.0,
            label_max_results: 10,
            quality_min_score: 80.0,
            cross_validation_timeout_ms: 3000,
            moderation_timeout_ms: 3000,
            label_service_url: None,
            label_service_api_key: None,
            moderation_service_url: None,
            moderation_service_api_key: None,
            model_path: "/workspace/models/furnora-classifier/model.onnx".to_string(),
        }
    }
}

impl VisionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_image_bytes: env::var("VISION_MAX_IMAGE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_image_bytes),
            min_dimension: env::var("VISION_MIN_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_dimension),
            max_dimension: env::var("VISION_MAX_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_dimension),
            target_size: env::var("VISION_TARGET_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.target_size),
            jpeg_quality: env::var("VISION_JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
            label_min_confidence: env::var("VISION_LABEL_MIN_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.label_min_confidence),
            label_max_results: env::var("VISION_LABEL_MAX_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.label_max_results),
            quality_min_score: env::var("VISION_QUALITY_MIN_SCORE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quality_min_score),
            cross_validation_timeout_ms: env::var("VISION_CROSS_VALIDATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cross_validation_timeout_ms),
            moderation_timeout_ms: env::var("VISION_MODERATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.moderation_timeout_ms),
            label_service_url: env::var("LABEL_SERVICE_URL").ok(),
            label_service_api_key: env::var("LABEL_SERVICE_API_KEY").ok(),
            moderation_service_url: env::var("MODERATION_SERVICE_URL").ok(),
            moderation_service_api_key: env::var("MODERATION_SERVICE_API_KEY").ok(),
            model_path: env::var("FURNITURE_MODEL_PATH").unwrap_or(defaults.model_path),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_image_bytes == 0 {
            return Err("Maximum image size must be greater than 0".to_string());
        }
        if self.min_dimension == 0 || self.min_dimension >= self.max_dimension {
            return Err("Minimum dimension must be nonzero and below the maximum".to_string());
        }
        if self.target_size == 0 {
            return Err("Target size must be greater than 0".to_string());
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("JPEG quality must be in 1-100".to_string());
        }
        if !(0.0..=100.0).contains(&self.label_min_confidence) {
            return Err("Label confidence threshold must be in 0-100".to_string());
        }
        if self.label_max_results == 0 {
            return Err("Label request cap must be greater than 0".to_string());
        }
        if !(0.0..=100.0).contains(&self.quality_min_score) {
            return Err("Quality score threshold must be in 0-100".to_string());
        }
        if self.cross_validation_timeout_ms == 0 || self.moderation_timeout_ms == 0 {
            return Err("External call timeouts must be greater than 0".to_string());
        }
        Ok(())
    }
}
