// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! ONNX furniture classifier
//!
//! Wraps an ONNX Runtime session over the furniture classification model.
//! The session is loaded once at process startup, validated with a probe
//! inference against the fixed class list, and shared read-only thereafter.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::info;

use super::{ClassifierError, FurnitureClassifier, FURNITURE_CLASSES};

/// ONNX-based furniture classifier
///
/// # Thread Safety
/// The session is wrapped in `Arc<Mutex>` for cheap cloning and thread-safe
/// shared access across concurrent recognition calls.
#[derive(Clone)]
pub struct OnnxFurnitureClassifier {
    session: Arc<Mutex<Session>>,
    classes: Vec<String>,
    input_size: u32,
}

impl std::fmt::Debug for OnnxFurnitureClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxFurnitureClassifier")
            .field("classes", &self.classes.len())
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxFurnitureClassifier {
    /// Load the classifier from an ONNX model file
    ///
    /// Runs a probe inference to validate that the model's output width
    /// matches the fixed class list before the handle is shared.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        let mut session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load ONNX model from {}",
                model_path.display()
            ))?;

        let classes: Vec<String> = FURNITURE_CLASSES.iter().map(|s| s.to_string()).collect();

        // Probe inference: the model must emit one probability per class.
        // Wrap in a block so outputs are dropped before moving the session.
        {
            let size = input_size as usize;
            let probe = Array4::<f32>::zeros((1, size, size, 3));
            let outputs = session
                .run(ort::inputs!["image" => Value::from_array(probe)?])
                .context("Probe inference failed")?;
            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract probe output tensor")?;
            let width = *output.shape().last().unwrap_or(&0);
            if width != classes.len() {
                anyhow::bail!(
                    "Model outputs {} classes, expected {}",
                    width,
                    classes.len()
                );
            }
        }

        info!(
            model = %model_path.display(),
            classes = classes.len(),
            input_size,
            "furniture classifier loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            classes,
            input_size,
        })
    }
}

#[async_trait]
impl FurnitureClassifier for OnnxFurnitureClassifier {
    async fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let value = Value::from_array(input.clone())
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;
        let outputs = session
            .run(ort::inputs!["image" => value])
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let logits: Vec<f32> = output.iter().copied().collect();
        if logits.len() != self.classes.len() {
            return Err(ClassifierError::InvalidOutput {
                expected: self.classes.len(),
                actual: logits.len(),
            });
        }

        Ok(softmax(&logits))
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }
}

/// Numerically stable softmax over raw logits
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / sum.max(f32::MIN_POSITIVE)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-5);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_load_missing_model_fails() {
        let result = OnnxFurnitureClassifier::load("/nonexistent/model.onnx", 224);
        assert!(result.is_err());
    }
}
