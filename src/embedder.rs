//! Gemini embedding HTTP client.
//!
//! This module provides `GeminiClient` for making synchronous HTTP requests
//! to the Gemini `embedContent` endpoint, along with error types and a
//! builder for configuration. The engine itself never generates embeddings;
//! this thin wrapper exists so the CLI can turn note text into the vectors
//! the store expects.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::{Embedding, EmbeddingError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-embedding-exp-03-07";

/// Errors that can occur when requesting an embedding.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// No API key was configured or found in the environment.
    #[error("Gemini API key must be provided or set as GEMINI_API_KEY")]
    MissingApiKey,

    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Response body did not have the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[source] reqwest::Error),

    /// The service returned a vector of the wrong dimensionality
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Builder for constructing `GeminiClient` instances.
///
/// # Examples
///
/// ```
/// use semnote::embedder::GeminiClientBuilder;
///
/// let client = GeminiClientBuilder::new()
///     .api_key("secret")
///     .model("gemini-embedding-exp-03-07")
///     .build()
///     .expect("failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct GeminiClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
}

impl GeminiClientBuilder {
    /// Creates a new `GeminiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the Gemini API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the embedding model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the `GeminiClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// When not set on the builder, the API key comes from `GEMINI_API_KEY`
    /// (required) and the model from `GEMINI_EMBED_MODEL` (defaulting to
    /// `gemini-embedding-exp-03-07`). The base URL defaults to the public
    /// Gemini endpoint.
    pub fn build(self) -> Result<GeminiClient, GeminiError> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => std::env::var("GEMINI_API_KEY").map_err(|_| GeminiError::MissingApiKey)?,
        };
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = if let Some(m) = self.model {
            m
        } else {
            std::env::var("GEMINI_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string())
        };

        reqwest::Url::parse(&base_url)
            .map_err(|e| GeminiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(GeminiError::Network)?;

        Ok(GeminiClient {
            client,
            base_url,
            model,
            api_key,
        })
    }
}

/// Synchronous HTTP client for the Gemini embedding API.
///
/// Construct with [`GeminiClientBuilder`].
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates an embedding for the given text.
    ///
    /// Returns the validated 3072-dimensional vector, or an error if the
    /// request fails or the service answers with a wrong-dimension vector.
    pub fn embed(&self, text: &str) -> Result<Embedding, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.model
        );

        let body = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(GeminiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeminiError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: EmbedContentResponse =
            response.json().map_err(GeminiError::Serialization)?;

        Ok(Embedding::new(parsed.embedding.values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_uses_explicit_configuration() {
        let client = GeminiClientBuilder::new()
            .base_url("http://localhost:9999")
            .model("custom-model")
            .api_key("secret")
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(client.model(), "custom-model");
    }

    #[test]
    #[serial]
    fn builder_fails_without_api_key() {
        // SAFETY: serialized test; no other thread reads the environment.
        unsafe { std::env::remove_var("GEMINI_API_KEY") };

        let result = GeminiClientBuilder::new().build();
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
    }

    #[test]
    #[serial]
    fn builder_reads_api_key_and_model_from_env() {
        // SAFETY: serialized test; no other thread reads the environment.
        unsafe {
            std::env::set_var("GEMINI_API_KEY", "env-key");
            std::env::set_var("GEMINI_EMBED_MODEL", "env-model");
        }

        let client = GeminiClientBuilder::new().build().unwrap();
        assert_eq!(client.model(), "env-model");

        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
            std::env::remove_var("GEMINI_EMBED_MODEL");
        }
    }

    #[test]
    #[serial]
    fn default_model_applies_when_env_unset() {
        // SAFETY: serialized test; no other thread reads the environment.
        unsafe {
            std::env::remove_var("GEMINI_EMBED_MODEL");
        }

        let client = GeminiClientBuilder::new().api_key("secret").build().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_rejects_invalid_base_url() {
        let result = GeminiClientBuilder::new()
            .api_key("secret")
            .base_url("not a url")
            .build();

        assert!(matches!(result, Err(GeminiError::InvalidUrl(_))));
    }

    #[test]
    fn embed_rejects_unreachable_host_with_network_error() {
        // Reserved TEST-NET address; connect fails fast with the short
        // connect timeout.
        let client = GeminiClientBuilder::new()
            .api_key("secret")
            .base_url("http://192.0.2.1:9")
            .build()
            .unwrap();

        let result = client.embed("hello");
        assert!(matches!(result, Err(GeminiError::Network(_))));
    }
}
