//! Stage 9: `Image` (parallel fan-out).

use crate::timeout_error;
use apo_collab_core::ImageBackend;
use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Generates the hero image via the configured image backend.
pub struct ImageStage {
    backend: Arc<dyn ImageBackend>,
    timeout: Duration,
}

impl ImageStage {
    /// Build the stage against an `ImageBackend` with a call timeout
    /// (default 180s per §5).
    #[must_use]
    pub fn new(backend: Arc<dyn ImageBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

#[async_trait]
impl Stage for ImageStage {
    fn id(&self) -> StageId {
        StageId::Image
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let prompt = format!("hero image for an article about {}", ctx.job_config.keyword);
        let image = tokio::time::timeout(self.timeout, self.backend.generate(&prompt))
            .await
            .map_err(|_| timeout_error(false, format!("image generation exceeded {:?}", self.timeout)))?
            .map_err(|e| crate::collaborator_error(false, e))?;

        ctx.parallel_results.image_url = Some(image.url);
        ctx.parallel_results.image_alt = Some(image.alt);
        Ok(())
    }
}
