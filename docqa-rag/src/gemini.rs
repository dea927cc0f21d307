//! Gemini embedding and generation over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerativeModel;

/// The default Generative Language API endpoint.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// The dimensionality of `text-embedding-004`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// The default generation model.
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Most texts `batchEmbedContents` accepts in one call.
const MAX_BATCH_TEXTS: usize = 100;

/// The retrieval task an embedding is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// A search query.
    RetrievalQuery,
    /// A passage stored in the index.
    RetrievalDocument,
    /// Symmetric semantic similarity.
    SemanticSimilarity,
}

/// Shared HTTP plumbing for both Gemini capabilities.
#[derive(Clone)]
struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(api_key: String) -> std::result::Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("API key must not be empty".to_string());
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { http, api_key, base_url: GEMINI_BASE_URL.to_string() })
    }

    fn api_key_from_env() -> std::result::Result<String, String> {
        std::env::var(API_KEY_ENV).map_err(|_| format!("{API_KEY_ENV} environment variable not set"))
    }

    /// POST `body` to `models/{model}:{method}` and decode the response.
    async fn call<B, R>(&self, model: &str, method: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/models/{model}:{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json::<R>().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Queries are embedded with [`TaskType::RetrievalQuery`] and document batches
/// with [`TaskType::RetrievalDocument`]. The API accepts at most 100 texts per
/// call, so larger batches go out as consecutive requests of up to 100 texts
/// and the vectors come back in input order.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: usize,
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider with the given API key and `text-embedding-004`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = GeminiClient::new(api_key.into()).map_err(Self::config_err)?;
        Ok(Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            output_dimensionality: None,
        })
    }

    /// Create a new provider using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiClient::api_key_from_env().map_err(Self::config_err)?)
    }

    /// Set the embedding model (without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Truncate output vectors to `dims` dimensions.
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.output_dimensionality = Some(dims);
        self
    }

    /// Override the API base URL (e.g. a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    fn config_err(message: String) -> RagError {
        RagError::ConfigError(format!("Gemini embeddings: {message}"))
    }

    fn provider_err(message: String) -> RagError {
        error!(provider = "Gemini", error = %message, "embedding request failed");
        RagError::EmbeddingError { provider: "Gemini".into(), message }
    }

    fn request<'a>(&self, text: &'a str, task_type: TaskType) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content { role: None, parts: vec![Part { text }] },
            task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }

    /// Split `texts` into `batchEmbedContents` bodies of at most
    /// [`MAX_BATCH_TEXTS`] documents, in input order.
    fn batch_requests<'a>(&self, texts: &[&'a str]) -> Vec<BatchEmbedContentsRequest<'a>> {
        texts
            .chunks(MAX_BATCH_TEXTS)
            .map(|group| BatchEmbedContentsRequest {
                requests: group
                    .iter()
                    .map(|&text| self.request(text, TaskType::RetrievalDocument))
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding query");

        let response: EmbedContentResponse = self
            .client
            .call(&self.model, "embedContent", &self.request(text, TaskType::RetrievalQuery))
            .await
            .map_err(Self::provider_err)?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Gemini", batch_size = texts.len(), model = %self.model, "embedding batch");

        let mut vectors = Vec::with_capacity(texts.len());
        for body in self.batch_requests(texts) {
            let expected = body.requests.len();
            let response: BatchEmbedContentsResponse = self
                .client
                .call(&self.model, "batchEmbedContents", &body)
                .await
                .map_err(Self::provider_err)?;

            if response.embeddings.len() != expected {
                return Err(Self::provider_err(format!(
                    "expected {expected} embeddings, got {}",
                    response.embeddings.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`GenerativeModel`] backed by Gemini `generateContent`.
///
/// The prompt is sent as a single user turn; the text parts of the first
/// candidate are concatenated and returned verbatim.
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiModel {
    /// Create a new model client with the given API key and `gemini-2.0-flash`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = GeminiClient::new(api_key.into()).map_err(Self::config_err)?;
        Ok(Self {
            client,
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: None,
            max_output_tokens: None,
        })
    }

    /// Create a new model client using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiClient::api_key_from_env().map_err(Self::config_err)?)
    }

    /// Set the model name (without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the number of generated tokens.
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Override the API base URL (e.g. a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    fn config_err(message: String) -> RagError {
        RagError::ConfigError(format!("Gemini model: {message}"))
    }

    fn provider_err(message: String) -> RagError {
        error!(provider = "Gemini", error = %message, "generation request failed");
        RagError::GenerationError { provider: "Gemini".into(), message }
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "generating");

        let generation_config = (self.temperature.is_some() || self.max_output_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            });
        let body = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config,
        };

        let response: GenerateContentResponse = self
            .client
            .call(&self.model, "generateContent", &body)
            .await
            .map_err(Self::provider_err)?;

        if let Some(reason) = response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            return Err(Self::provider_err(format!("prompt blocked: {reason}")));
        }

        let text = response.into_text();
        if text.is_empty() {
            return Err(Self::provider_err("response contained no text".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        assert!(matches!(GeminiEmbeddingProvider::new("  "), Err(RagError::ConfigError(_))));
        assert!(matches!(GeminiModel::new(""), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn embed_request_uses_camel_case_and_task_type() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap().with_output_dimensionality(256);
        let value =
            serde_json::to_value(provider.request("hello", TaskType::RetrievalDocument)).unwrap();

        assert_eq!(value["model"], "models/text-embedding-004");
        assert_eq!(value["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(value["outputDimensionality"], 256);
        assert_eq!(value["content"]["parts"][0]["text"], "hello");
        assert_eq!(provider.dimensions(), 256);
    }

    #[test]
    fn oversized_batches_split_into_ordered_requests() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap();
        let texts: Vec<String> = (0..250).map(|i| format!("passage {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let bodies = provider.batch_requests(&refs);

        let sizes: Vec<usize> = bodies.iter().map(|b| b.requests.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        let sent: Vec<&str> =
            bodies.iter().flat_map(|b| &b.requests).map(|r| r.content.parts[0].text).collect();
        assert_eq!(sent, refs);
        assert_eq!(provider.batch_requests(&refs[..100]).len(), 1);
    }

    #[test]
    fn generation_response_text_parts_are_concatenated() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_text(), "Hello, world");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_text().is_empty());
    }
}
