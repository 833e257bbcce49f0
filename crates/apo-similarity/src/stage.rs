//! Stage 12: `Similarity` (non-critical, post-merge).

use crate::batch::BatchMemoryRegistry;
use crate::checker::SimilarityChecker;
use apo_core::{ExecutionContext, Stage, StageError, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;

/// Runs the batch-scoped near-duplicate check against the merged article
/// and records the result on the context. Advisory only: a checker failure
/// never fails the job, it simply leaves `similarity_report` unset.
pub struct SimilarityStage {
    registry: BatchMemoryRegistry,
    checker: SimilarityChecker,
}

impl SimilarityStage {
    /// Build the stage against a shared [`BatchMemoryRegistry`] and the
    /// configured [`SimilarityChecker`].
    #[must_use]
    pub fn new(registry: BatchMemoryRegistry, checker: SimilarityChecker) -> Self {
        Self { registry, checker }
    }
}

#[async_trait]
impl Stage for SimilarityStage {
    fn id(&self) -> StageId {
        StageId::Similarity
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let Some(batch_id) = ctx.batch_id else {
            return Ok(());
        };
        let Some(article) = ctx.validated_article.as_ref() else {
            return Ok(());
        };

        let text = article.text_body();
        let batch = self.registry.get_or_create(batch_id);
        let outcome = self.checker.check(&batch, ctx.job_id, &ctx.job_config.keyword, &text).await;

        if let Some(embed_err) = outcome.embed_error {
            let err = PipelineError::new(ErrorCode::AdvisoryStageFailure, embed_err.to_string());
            ctx.record_error(StageError::from_pipeline_error(
                "similarity",
                &err,
                ctx.job_id,
                StageId::Similarity,
                ctx.regeneration_attempts,
            ));
        }

        if outcome.report.hybrid >= crate::checker::DUPLICATE_THRESHOLD {
            tracing::warn!(
                job_id = %ctx.job_id,
                nearest = ?outcome.report.nearest_job_id,
                hybrid = outcome.report.hybrid,
                "near-duplicate content detected in batch"
            );
        }

        ctx.similarity_report = Some(outcome.report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_core::{JobOptions, ValidatedArticle};
    use uuid::Uuid;

    fn article(body: &str) -> ValidatedArticle {
        ValidatedArticle {
            headline: body.into(),
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

    fn ctx_with(batch_id: Option<Uuid>, article_text: &str) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                batch_id,
                ..Default::default()
            },
        );
        ctx.validated_article = Some(article(article_text));
        ctx
    }

    #[tokio::test]
    async fn no_batch_id_is_a_noop() {
        let mut ctx = ctx_with(None, "some body text");
        let stage = SimilarityStage::new(BatchMemoryRegistry::new(), SimilarityChecker::char_only());
        stage.execute(&mut ctx).await.unwrap();
        assert!(ctx.similarity_report.is_none());
    }

    #[tokio::test]
    async fn records_report_and_updates_batch_memory() {
        let batch_id = Uuid::new_v4();
        let registry = BatchMemoryRegistry::new();
        let stage = SimilarityStage::new(registry.clone(), SimilarityChecker::char_only());

        let mut first = ctx_with(Some(batch_id), "unique article one about widgets");
        stage.execute(&mut first).await.unwrap();
        assert!(first.similarity_report.is_some());
        assert_eq!(registry.get_or_create(batch_id).len(), 1);

        let mut second = ctx_with(Some(batch_id), "unique article one about widgets");
        stage.execute(&mut second).await.unwrap();
        let report = second.similarity_report.unwrap();
        assert!(report.hybrid >= crate::checker::DUPLICATE_THRESHOLD);
    }

    struct FailingEmbeddingClient;

    #[async_trait]
    impl apo_collab_core::EmbeddingClient for FailingEmbeddingClient {
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("embedding service down")
        }
    }

    #[tokio::test]
    async fn embed_failure_records_an_advisory_error_but_still_completes() {
        let batch_id = Uuid::new_v4();
        let registry = BatchMemoryRegistry::new();
        let checker = SimilarityChecker::with_embedding(std::sync::Arc::new(FailingEmbeddingClient));
        let stage = SimilarityStage::new(registry, checker);

        let mut ctx = ctx_with(Some(batch_id), "some body text");
        stage.execute(&mut ctx).await.unwrap();

        assert!(ctx.similarity_report.is_some());
        assert_eq!(ctx.errors.len(), 1);
        assert!(!ctx.errors[0].is_critical());
    }
}
