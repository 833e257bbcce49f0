//! Mock collaborator implementations for local development and tests.

use apo_collab_core::{
    AeoScorer, EmbeddingClient, GeneratedImage, GenerationOutput, ImageBackend, InternalLinkCandidate,
    InternalLinksProvider, LlmClient, QualityAssessment, StorageBackend, ToolSpec, UrlProbe, UrlValidator,
};
use apo_core::ValidatedArticle;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

/// An [`LlmClient`] that returns a canned structured article, or canned text
/// when no response schema is requested.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Fixed `aeo_score`-relevant body text returned for every call.
    pub body: String,
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        prompt: &str,
        response_schema: Option<&Value>,
        _system_instruction: Option<&str>,
        _tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationOutput> {
        let body = if self.body.is_empty() {
            format!("mock generated content for: {prompt}")
        } else {
            self.body.clone()
        };
        if response_schema.is_some() {
            Ok(GenerationOutput::Structured(json!({
                "headline": "Mock Headline",
                "teaser": "Mock teaser.",
                "direct_answer": "Mock direct answer.",
                "intro": body,
                "meta_title": "Mock Title",
                "meta_description": "Mock description.",
                "section_01_title": "Overview",
                "section_01_content": "Mock section content.",
                "image_01_url": "https://example.com/image.png",
                "image_01_alt_text": "Mock alt text",
            })))
        } else {
            Ok(GenerationOutput::Text(body))
        }
    }
}

/// An [`EmbeddingClient`] that hashes text into a small deterministic vector.
/// Not semantically meaningful, but stable across calls — sufficient for
/// exercising the cosine-similarity path in tests.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingClient {
    /// Vector dimensionality to produce.
    pub dims: usize,
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let dims = if self.dims == 0 { 8 } else { self.dims };
        let mut v = vec![0.0f32; dims];
        for (i, byte) in text.bytes().enumerate() {
            v[i % dims] += f32::from(byte);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// A [`UrlValidator`] that accepts any syntactically `http(s)` URL and
/// rejects everything else, without performing real network I/O.
#[derive(Debug, Clone, Default)]
pub struct MockUrlValidator;

#[async_trait]
impl UrlValidator for MockUrlValidator {
    async fn head(&self, url: &str, _timeout: Duration) -> anyhow::Result<UrlProbe> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(UrlProbe {
                status_code: 200,
                final_url: url.to_string(),
            })
        } else {
            anyhow::bail!("unsupported scheme: {url}")
        }
    }
}

/// An [`InternalLinksProvider`] returning a fixed, small candidate set.
#[derive(Debug, Clone, Default)]
pub struct MockInternalLinksProvider {
    /// Candidates returned for every keyword.
    pub fixed: Vec<InternalLinkCandidate>,
}

#[async_trait]
impl InternalLinksProvider for MockInternalLinksProvider {
    async fn candidates(&self, keyword: &str) -> anyhow::Result<Vec<InternalLinkCandidate>> {
        if self.fixed.is_empty() {
            Ok(vec![InternalLinkCandidate {
                title: format!("Related: {keyword}"),
                url: "https://example.com/related".into(),
                anchor_phrases: vec![keyword.to_string()],
            }])
        } else {
            Ok(self.fixed.clone())
        }
    }
}

/// An [`ImageBackend`] returning a fixed placeholder image.
#[derive(Debug, Clone, Default)]
pub struct MockImageBackend;

#[async_trait]
impl ImageBackend for MockImageBackend {
    async fn generate(&self, prompt: &str) -> anyhow::Result<GeneratedImage> {
        Ok(GeneratedImage {
            url: "https://example.com/generated.png".into(),
            alt: format!("Generated image for: {prompt}"),
        })
    }
}

/// A [`StorageBackend`] that records puts in memory instead of writing to a
/// real backend.
#[derive(Debug, Default)]
pub struct MockStorageBackend {
    inner: std::sync::Mutex<Vec<(Uuid, String, usize)>>,
}

#[async_trait]
impl StorageBackend for MockStorageBackend {
    async fn put(&self, job_id: Uuid, key: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let location = format!("mock://{job_id}/{key}");
        self.inner
            .lock()
            .unwrap()
            .push((job_id, key.to_string(), bytes.len()));
        Ok(location)
    }
}

impl MockStorageBackend {
    /// Number of `put` calls recorded so far.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// An [`AeoScorer`] returning a fixed score, or a deterministic
/// length-derived one when `fixed_score` is left unset.
#[derive(Debug, Clone, Default)]
pub struct MockAeoScorer {
    /// Score to return for every call; `None` derives a score from the
    /// article body length instead.
    pub fixed_score: Option<f64>,
}

#[async_trait]
impl AeoScorer for MockAeoScorer {
    async fn score(&self, article: &ValidatedArticle) -> anyhow::Result<QualityAssessment> {
        let aeo_score = self.fixed_score.unwrap_or_else(|| {
            let len = article.text_body().len();
            (60.0 + (len as f64 / 20.0)).min(98.0)
        });
        Ok(QualityAssessment {
            aeo_score,
            critical_issues: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn llm_structured_output_has_required_fields() {
        let client = MockLlmClient::default();
        let out = client
            .generate("write an article", Some(&json!({})), None, &[])
            .await
            .unwrap();
        let v = out.as_structured().unwrap();
        assert!(v.get("headline").is_some());
        assert!(v.get("image_01_url").is_some());
    }

    #[tokio::test]
    async fn embedding_is_unit_normalized() {
        let client = MockEmbeddingClient { dims: 16 };
        let v = client.embed("hello world").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn url_validator_rejects_non_http() {
        let v = MockUrlValidator;
        assert!(v.head("ftp://example.com", Duration::from_secs(1)).await.is_err());
        assert!(v.head("https://example.com", Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn storage_records_puts() {
        let store = MockStorageBackend::default();
        store.put(Uuid::nil(), "article.json", b"{}").await.unwrap();
        assert_eq!(store.put_count(), 1);
    }

    fn sample_article() -> ValidatedArticle {
        ValidatedArticle {
            headline: "H".into(),
            teaser: "T".into(),
            direct_answer: "D".into(),
            intro: "I".into(),
            meta_title: "MT".into(),
            meta_description: "MD".into(),
            section_01_title: "S1T".into(),
            section_01_content: "S1C".into(),
            image_01_url: "https://example.com/i.png".into(),
            image_01_alt_text: "alt".into(),
            sections: Vec::new(),
            key_takeaways: Vec::new(),
            paa_items: Vec::new(),
            faq_items: Vec::new(),
            extra_images: Vec::new(),
            sources: Vec::new(),
            toc: Vec::new(),
            internal_links: Vec::new(),
            extra_fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn aeo_scorer_returns_fixed_score_when_set() {
        let scorer = MockAeoScorer { fixed_score: Some(91.0) };
        let assessment = scorer.score(&sample_article()).await.unwrap();
        assert_eq!(assessment.aeo_score, 91.0);
    }

    #[tokio::test]
    async fn aeo_scorer_derives_score_when_unset() {
        let scorer = MockAeoScorer::default();
        let assessment = scorer.score(&sample_article()).await.unwrap();
        assert!(assessment.aeo_score >= 60.0);
    }
}
