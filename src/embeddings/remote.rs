//! HTTP client for a remote sentence-encoder service.

use crate::embeddings::Encoder;
use crate::types::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    model: &'a str,
    input: serde_json::Value, // String or Vec<String>
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    data: Vec<EncodeData>,
}

#[derive(Debug, Deserialize)]
struct EncodeData {
    embedding: Vec<f32>,
}

/// Encoder backed by an HTTP embedding service.
pub struct RemoteEncoder {
    endpoint: String,
    model: String,
    dim: usize,
    client: Client,
}

impl RemoteEncoder {
    /// Create a client for the service at `endpoint`.
    ///
    /// `model` is forwarded in each request and doubles as the cache model
    /// id; `dim` is the dimensionality the service is expected to return.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dim: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            dim,
            client: Client::new(),
        }
    }

    async fn call_api(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let request = EncodeRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(format!("encoder request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EngineError::Embedding(format!(
                "encoder service error ({}): {}",
                status, body
            )));
        }

        let decoded: EncodeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Embedding(format!("invalid encoder response: {}", e)))?;

        Ok(decoded.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Encoder for RemoteEncoder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.call_api(serde_json::json!(text)).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("no embedding returned".to_string()))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.call_api(serde_json::json!(texts)).await
    }
}
