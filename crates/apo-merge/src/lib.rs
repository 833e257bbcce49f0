//! Stage 10: `MergeAndLink` (critical).
//!
//! The hardest merge step (§4.4): combines `structured_data` with every key
//! of `parallel_results` into the single [`apo_core::ValidatedArticle`]
//! persistence and export consume. This is the only place that assembles
//! the final document.
//!
//! State machine: `Init → Overlay → LinkCitations → SweepMarkers → Flatten
//! → Validate → { Success | CriticalFail }`. Citation linking and marker
//! sweeping are implemented as a single text pass (see
//! [`citations::resolve_citation_markers`]) because a marker newly turned
//! into an anchor still contains the literal `[N]` text inside it — running
//! the sweep as a second independent regex pass over the same text would
//! re-match and strip it. Scanning once, anchor-span-aware, gets both
//! behaviors right in one step.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod citations;
mod flatten;
mod overlay;
mod validate;

use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;

/// Stage 10 implementation. Pure transformation over the context — no
/// external collaborator, unlike every other stage in the pipeline.
#[derive(Debug, Clone, Default)]
pub struct MergeAndLinkStage;

impl MergeAndLinkStage {
    /// Construct the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for MergeAndLinkStage {
    fn id(&self) -> StageId {
        StageId::MergeAndLink
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let base = ctx.structured_data.clone().unwrap_or_default();
        let overlaid = overlay::overlay(base, &ctx.parallel_results);
        let linked = citations::resolve_citation_markers(overlaid, &ctx.parallel_results.citations_list);
        let flattened = flatten::flatten(linked);

        match validate::build_validated_article(flattened) {
            Ok(article) => {
                ctx.validated_article = Some(article);
                Ok(())
            }
            Err(reasons) => Err(PipelineError::new(
                ErrorCode::ValidationMissingField,
                format!("MergeAndLink validation failed: {}", reasons.join("; ")),
            )),
        }
    }
}
