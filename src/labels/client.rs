// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! REST client for the label cross-validation service

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use tracing::{debug, info};

use super::{DetectedLabel, LabelDetector, LabelServiceError};

// --- wire format ---

#[derive(serde::Serialize)]
struct DetectLabelsRequest {
    image: String,
    max_labels: u32,
}

#[derive(serde::Deserialize)]
struct DetectLabelsResponse {
    labels: Vec<LabelEntry>,
}

#[derive(serde::Deserialize)]
struct LabelEntry {
    name: String,
    confidence: f32,
}

/// Client for the external vision-labeling service
pub struct RestLabelClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_labels: u32,
}

impl RestLabelClient {
    /// Create a new label service client
    ///
    /// `max_labels` caps how many labels are requested per call; it comes
    /// from [`VisionConfig::label_max_results`](crate::config::VisionConfig)
    /// like every other pipeline tunable.
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
        max_labels: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Label service client configured: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key,
            max_labels,
        })
    }
}

#[async_trait]
impl LabelDetector for RestLabelClient {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<DetectedLabel>, LabelServiceError> {
        let request = DetectLabelsRequest {
            image: STANDARD.encode(image),
            max_labels: self.max_labels,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/labels/detect", self.endpoint))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LabelServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DetectLabelsResponse = response.json().await?;
        debug!(count = body.labels.len(), "label service responded");

        Ok(body
            .labels
            .into_iter()
            .map(|entry| DetectedLabel {
                name: entry.name,
                confidence: entry.confidence,
            })
            .collect())
    }
}
