//! Stage 5: `InternalLinks` (parallel fan-out).

use apo_collab_core::InternalLinksProvider;
use apo_core::{ExecutionContext, InternalLink, Stage, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use std::sync::Arc;

/// Surfaces sitemap-derived internal link candidates for the keyword.
pub struct InternalLinksStage {
    provider: Arc<dyn InternalLinksProvider>,
}

impl InternalLinksStage {
    /// Build the stage against an `InternalLinksProvider`.
    #[must_use]
    pub fn new(provider: Arc<dyn InternalLinksProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for InternalLinksStage {
    fn id(&self) -> StageId {
        StageId::InternalLinks
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let candidates = self
            .provider
            .candidates(&ctx.job_config.keyword)
            .await
            .map_err(|e| PipelineError::new(ErrorCode::AdvisoryStageFailure, e.to_string()))?;

        ctx.parallel_results.internal_links_list = candidates
            .into_iter()
            .map(|c| InternalLink {
                url: c.url,
                title: c.title,
            })
            .collect();
        Ok(())
    }
}
