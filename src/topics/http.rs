//! Topic extraction over HTTP
//!
//! POSTs the request JSON to a model service and reads the response JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{ExtractorError, TopicExtractor, TopicRequest, TopicResponse};

/// HTTP client for a remote topic model
pub struct HttpExtractor {
    client: Client,
    endpoint: String,
}

impl HttpExtractor {
    /// Create a client with a per-request timeout
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("zeitgeist/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TopicExtractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract(&self, request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExtractorError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        if body.trim().is_empty() {
            return Err(ExtractorError::EmptyOutput);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            bytes = body.len(),
            "Received topic extraction response"
        );

        Ok(serde_json::from_str(&body)?)
    }
}
