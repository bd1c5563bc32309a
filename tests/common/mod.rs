// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Shared stub collaborators and image fixtures for pipeline tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use ndarray::Array4;

use furnora_vision_node::{
    ClassifierError, DetectedLabel, FurnitureClassifier, LabelDetector, LabelServiceError,
    ModerationProvider, ModerationServiceError, QualityScores, FURNITURE_CLASSES,
};

/// Route pipeline logs through the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn large_png_bytes() -> Vec<u8> {
    // Grayscale keeps the 8000x8000 fixture cheap; only the header is read
    let img = DynamicImage::new_luma8(8000, 8000);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

/// Stub local classifier with a canned probability vector
pub struct StubClassifier {
    pub probabilities: Vec<f32>,
    pub classes: Vec<String>,
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
}

impl StubClassifier {
    pub fn with_probabilities(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            classes: FURNITURE_CLASSES.iter().map(|s| s.to_string()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    /// Probability vector with `p` on `class_name` and the rest spread evenly
    pub fn favoring(class_name: &str, p: f32) -> Self {
        let index = FURNITURE_CLASSES
            .iter()
            .position(|c| *c == class_name)
            .expect("known class");
        let rest = (1.0 - p) / (FURNITURE_CLASSES.len() - 1) as f32;
        let probabilities = (0..FURNITURE_CLASSES.len())
            .map(|i| if i == index { p } else { rest })
            .collect();
        Self::with_probabilities(probabilities)
    }

    pub fn failing() -> Self {
        let mut stub = Self::with_probabilities(vec![]);
        stub.fail = true;
        stub
    }
}

#[async_trait]
impl FurnitureClassifier for StubClassifier {
    async fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ClassifierError::Unavailable("stub model down".into()));
        }
        Ok(self.probabilities.clone())
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }
}

/// Stub label service with canned labels, optional failure or delay
pub struct StubLabelService {
    pub labels: Vec<DetectedLabel>,
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl StubLabelService {
    pub fn with_labels(labels: &[(&str, f32)]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(name, confidence)| DetectedLabel {
                    name: name.to_string(),
                    confidence: *confidence,
                })
                .collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
            delay: None,
        }
    }

    pub fn unreachable() -> Self {
        let mut stub = Self::with_labels(&[]);
        stub.fail = true;
        stub
    }

    pub fn slow(labels: &[(&str, f32)], delay: Duration) -> Self {
        let mut stub = Self::with_labels(labels);
        stub.delay = Some(delay);
        stub
    }
}

#[async_trait]
impl LabelDetector for StubLabelService {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<DetectedLabel>, LabelServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(LabelServiceError::Api {
                status: 503,
                message: "stub label service down".into(),
            });
        }
        Ok(self.labels.clone())
    }
}

/// Stub moderation provider with canned flags and quality scores
pub struct StubModerationService {
    pub flags: Vec<String>,
    pub quality: QualityScores,
    pub calls: Arc<AtomicUsize>,
    pub fail_labels: bool,
    pub fail_quality: bool,
}

impl StubModerationService {
    pub fn clean(brightness: f32, sharpness: f32) -> Self {
        Self {
            flags: Vec::new(),
            quality: QualityScores {
                brightness,
                sharpness,
            },
            calls: Arc::new(AtomicUsize::new(0)),
            fail_labels: false,
            fail_quality: false,
        }
    }

    pub fn flagged(flags: &[&str], brightness: f32, sharpness: f32) -> Self {
        let mut stub = Self::clean(brightness, sharpness);
        stub.flags = flags.iter().map(|f| f.to_string()).collect();
        stub
    }
}

#[async_trait]
impl ModerationProvider for StubModerationService {
    async fn detect_moderation_labels(
        &self,
        _image: &[u8],
    ) -> Result<Vec<String>, ModerationServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_labels {
            return Err(ModerationServiceError::Api {
                status: 503,
                message: "stub moderation service down".into(),
            });
        }
        Ok(self.flags.clone())
    }

    async fn assess_quality(&self, _image: &[u8]) -> Result<QualityScores, ModerationServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_quality {
            return Err(ModerationServiceError::Api {
                status: 503,
                message: "stub quality assessor down".into(),
            });
        }
        Ok(self.quality)
    }
}
