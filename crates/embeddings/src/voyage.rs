//! Voyage AI embeddings client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};
use crate::params::{EmbeddingParameters, InputType};

pub const VOYAGE_API_BASE_URL: &str = "https://api.voyageai.com/v1";

/// Embedding generation seam. The production implementation talks to the
/// Voyage HTTP API; tests substitute deterministic stubs.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed all `inputs` in one batched request. The returned vectors are
    /// positionally aligned with the inputs.
    async fn generate(
        &self,
        inputs: &[String],
        params: &EmbeddingParameters,
        input_type: InputType,
    ) -> Result<Vec<Vec<f64>>>;
}

pub struct VoyageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'a str,
    output_dimension: u32,
    output_dtype: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f64>,
}

impl VoyageClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, VOYAGE_API_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    fn dtype_name(params: &EmbeddingParameters) -> &'static str {
        use crate::params::OutputDtype::*;
        match params.output_dtype {
            Float => "float",
            Int8 => "int8",
            Uint8 => "uint8",
            Binary => "binary",
            Ubinary => "ubinary",
        }
    }
}

#[async_trait]
impl EmbeddingService for VoyageClient {
    async fn generate(
        &self,
        inputs: &[String],
        params: &EmbeddingParameters,
        input_type: InputType,
    ) -> Result<Vec<Vec<f64>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let input_type = match input_type {
            InputType::Document => "document",
            InputType::Query => "query",
        };
        let body = EmbeddingsRequest {
            input: inputs,
            model: params.model.as_str(),
            input_type,
            output_dimension: params.output_dimension,
            output_dtype: Self::dtype_name(params),
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| EmbeddingError::Service(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Service(format!(
                "embedding request failed with status {status}: {detail}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingError::Service(err.to_string()))?;
        if parsed.data.is_empty() {
            return Err(EmbeddingError::Service(
                "embedding service returned an empty response".to_string(),
            ));
        }
        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                requested: inputs.len(),
                returned: parsed.data.len(),
            });
        }

        // The service reports the position of each vector; order by it
        // rather than trusting response order.
        let mut vectors = vec![Vec::new(); inputs.len()];
        for entry in parsed.data {
            let Some(slot) = vectors.get_mut(entry.index) else {
                return Err(EmbeddingError::Service(format!(
                    "embedding response index {} out of range",
                    entry.index
                )));
            };
            *slot = entry.embedding;
        }
        Ok(vectors)
    }
}
