#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Stage-internal collaborator contracts (§6).
//!
//! The engine treats text generation, embeddings, URL validation, sitemap
//! lookups, image generation, and storage as external collaborators: stages
//! call through these traits, the engine never calls an SDK directly. This
//! keeps the orchestrator policy-free — prompt content and the quality
//! rubric live on the other side of these interfaces.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Output of an [`LlmClient::generate`] call: either free text or a value
/// conforming to the caller-supplied JSON schema.
#[derive(Debug, Clone)]
pub enum GenerationOutput {
    /// Free-text completion.
    Text(String),
    /// Structured output validated against the requested schema.
    Structured(Value),
}

impl GenerationOutput {
    /// Borrow the text payload, if this is a `Text` variant.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GenerationOutput::Text(s) => Some(s),
            GenerationOutput::Structured(_) => None,
        }
    }

    /// Borrow the structured payload, if this is a `Structured` variant.
    #[must_use]
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            GenerationOutput::Structured(v) => Some(v),
            GenerationOutput::Text(_) => None,
        }
    }
}

/// A tool definition offered to the LLM for tool-use generation.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// JSON schema describing the tool's parameters.
    pub parameters_schema: Value,
}

/// Text generation with optional response-schema constraining and tool use.
/// Used by Stages 2, 3b, and parts of 4/5/8.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text or a structured value from a prompt.
    async fn generate(
        &self,
        prompt: &str,
        response_schema: Option<&Value>,
        system_instruction: Option<&str>,
        tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationOutput>;
}

/// Embedding generation. Used by Stage 12 (SimilarityChecker).
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed `text` into a fixed-dimension vector (commonly `D = 768`).
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Result of an HTTP `HEAD` probe against a citation URL.
#[derive(Debug, Clone)]
pub struct UrlProbe {
    /// Response status code.
    pub status_code: u16,
    /// Final URL after following redirects.
    pub final_url: String,
}

/// HTTP URL validation. Used during Stage 10's citation linking.
#[async_trait]
pub trait UrlValidator: Send + Sync {
    /// Probe `url` with a `HEAD` request, bounded by `timeout`.
    async fn head(&self, url: &str, timeout: Duration) -> anyhow::Result<UrlProbe>;
}

/// One candidate internal link surfaced by the sitemap provider.
#[derive(Debug, Clone)]
pub struct InternalLinkCandidate {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Phrases in the article body that would make good anchor text.
    pub anchor_phrases: Vec<String>,
}

/// Sitemap / internal-links lookup. Used by Stage 5.
#[async_trait]
pub trait InternalLinksProvider: Send + Sync {
    /// Return internal link candidates relevant to `keyword`.
    async fn candidates(&self, keyword: &str) -> anyhow::Result<Vec<InternalLinkCandidate>>;
}

/// Result of an image generation call.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Hosted image URL.
    pub url: String,
    /// Alt text describing the image.
    pub alt: String,
}

/// Image generation. Used by Stage 9.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate an image from `prompt`.
    async fn generate(&self, prompt: &str) -> anyhow::Result<GeneratedImage>;
}

/// Persistent artifact storage. Used by Stage 11.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `bytes` under `key` within `job_id`'s namespace, returning the
    /// location the artifact can be retrieved from.
    async fn put(&self, job_id: uuid::Uuid, key: &str, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Result of scoring a merged article.
#[derive(Debug, Clone)]
pub struct QualityAssessment {
    /// Composite 0-100 answer-engine-optimization score.
    pub aeo_score: f64,
    /// Human-readable descriptions of issues the scorer flagged as critical.
    pub critical_issues: Vec<String>,
}

/// Answer-engine-optimization scoring, consulted by the post-merge quality
/// gate (§4.5). Kept external per §9's open question so the engine's
/// regeneration policy never has to embody a content rubric itself.
#[async_trait]
pub trait AeoScorer: Send + Sync {
    /// Score a merged article.
    async fn score(&self, article: &apo_core::ValidatedArticle) -> anyhow::Result<QualityAssessment>;
}
