// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! REST client for the moderation and image-quality service

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use tracing::{debug, info};

use super::{ModerationProvider, ModerationServiceError, QualityScores};

// --- wire format ---

#[derive(serde::Serialize)]
struct ImageRequest {
    image: String,
}

#[derive(serde::Deserialize)]
struct ModerationLabelsResponse {
    flags: Vec<String>,
}

#[derive(serde::Deserialize)]
struct QualityResponse {
    brightness: f32,
    sharpness: f32,
}

/// Client for the external moderation/quality collaborator
pub struct RestModerationClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestModerationClient {
    /// Create a new moderation service client
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Moderation service client configured: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn post_image<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        image: &[u8],
    ) -> Result<T, ModerationServiceError> {
        let request = ImageRequest {
            image: STANDARD.encode(image),
        };

        let mut builder = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModerationServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ModerationProvider for RestModerationClient {
    async fn detect_moderation_labels(
        &self,
        image: &[u8],
    ) -> Result<Vec<String>, ModerationServiceError> {
        let body: ModerationLabelsResponse =
            self.post_image("/v1/moderation/labels", image).await?;
        debug!(flags = body.flags.len(), "moderation labels received");
        Ok(body.flags)
    }

    async fn assess_quality(&self, image: &[u8]) -> Result<QualityScores, ModerationServiceError> {
        let body: QualityResponse = self.post_image("/v1/moderation/quality", image).await?;
        Ok(QualityScores {
            brightness: body.brightness,
            sharpness: body.sharpness,
        })
    }
}
