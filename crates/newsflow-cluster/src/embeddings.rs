//! HTTP client for a TEI-compatible text embeddings service.

use std::time::Duration;

use serde::Serialize;

use crate::error::ClusterError;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

/// Client for a text-embeddings endpoint speaking the TEI protocol.
pub struct EmbeddingsClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
}

impl EmbeddingsClient {
    /// Create a new client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Embeddings`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClusterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClusterError::Embeddings(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/embed", base_url.trim_end_matches('/')),
        })
    }

    /// Generate embeddings for a batch of texts.
    ///
    /// Texts are batched into groups of [`BATCH_SIZE`] (64) per request.
    /// Returns one embedding vector per input text, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Embeddings`] if any request fails, the
    /// response cannot be parsed, or the vector count does not match the
    /// input count.
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ClusterError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest { inputs: chunk };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ClusterError::Embeddings(format!("embed request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(ClusterError::Embeddings(format!(
                    "embeddings service returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
                ClusterError::Embeddings(format!("embed response parse error: {e}"))
            })?;

            if embeddings.len() != chunk.len() {
                return Err(ClusterError::Embeddings(format!(
                    "embeddings service returned {} vectors for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}
