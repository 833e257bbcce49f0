//! Stage 7: `Metadata` (parallel fan-out).

use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::PipelineError;
use async_trait::async_trait;

/// Meta title is constrained to 60 characters by the source policy (§6).
const META_TITLE_MAX: usize = 60;
/// Meta description is constrained to 160 characters by the source policy (§6).
const META_DESCRIPTION_MAX: usize = 160;

/// Derives `meta_title`/`meta_description` from `structured_data`'s headline
/// and teaser, truncated to the schema's character limits.
#[derive(Debug, Clone, Default)]
pub struct MetadataStage;

impl MetadataStage {
    /// Construct the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[async_trait]
impl Stage for MetadataStage {
    fn id(&self) -> StageId {
        StageId::Metadata
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let Some(data) = &ctx.structured_data else {
            return Ok(());
        };
        let headline = data.get("headline").and_then(|v| v.as_str()).unwrap_or(&ctx.job_config.keyword);
        let teaser = data.get("teaser").and_then(|v| v.as_str()).unwrap_or_default();

        ctx.parallel_results.metadata.insert(
            "meta_title".into(),
            truncate_chars(headline, META_TITLE_MAX),
        );
        ctx.parallel_results.metadata.insert(
            "meta_description".into(),
            truncate_chars(teaser, META_DESCRIPTION_MAX),
        );
        Ok(())
    }
}
