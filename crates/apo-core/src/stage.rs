//! The stage contract: a numeric id, a name, and an asynchronous
//! `execute(ctx)` operation that reads declared inputs from
//! [`crate::ExecutionContext`] and writes declared outputs back.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::ExecutionContext;

/// Stable stage identity. Ids are small and renumbering them is a source
/// change, not a runtime concern: the registry and engine both key off this
/// enum rather than a raw integer or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// 0 — sequential, critical. Resolves job config, company data, language.
    DataFetch,
    /// 1 — sequential. Builds the generation prompt.
    PromptBuild,
    /// 2 — sequential, critical. Calls the LLM for the raw article.
    Generate,
    /// 3 — sequential. Extracts `structured_data` from the raw article.
    Extract,
    /// 3b — conditional, always invoked, advisory on failure.
    Refine,
    /// 4 — parallel fan-out.
    Citations,
    /// 5 — parallel fan-out.
    InternalLinks,
    /// 6 — parallel fan-out.
    Toc,
    /// 7 — parallel fan-out.
    Metadata,
    /// 8 — parallel fan-out.
    FaqPaa,
    /// 9 — parallel fan-out.
    Image,
    /// 10 — sequential, critical. Merge + citation link.
    MergeAndLink,
    /// 11 — sequential, critical. Persist/export.
    Persist,
    /// 12 — sequential. Batch similarity check.
    Similarity,
}

impl StageId {
    /// All stage ids in pipeline order, including the conditional refine slot.
    pub const ALL: [StageId; 14] = [
        StageId::DataFetch,
        StageId::PromptBuild,
        StageId::Generate,
        StageId::Extract,
        StageId::Refine,
        StageId::Citations,
        StageId::InternalLinks,
        StageId::Toc,
        StageId::Metadata,
        StageId::FaqPaa,
        StageId::Image,
        StageId::MergeAndLink,
        StageId::Persist,
        StageId::Similarity,
    ];

    /// The six stage ids that make up the parallel fan-out (§4.2 step 4).
    pub const FAN_OUT: [StageId; 6] = [
        StageId::Citations,
        StageId::InternalLinks,
        StageId::Toc,
        StageId::Metadata,
        StageId::FaqPaa,
        StageId::Image,
    ];

    /// Critical stages per §4.1: failure here terminates the job.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StageId::DataFetch | StageId::Generate | StageId::MergeAndLink | StageId::Persist
        )
    }

    /// `true` for the six stages that run concurrently in the fan-out.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        Self::FAN_OUT.contains(self)
    }

    /// Display name (names are display-only; the enum variant is the stable
    /// identity).
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::DataFetch => "DataFetch",
            StageId::PromptBuild => "PromptBuild",
            StageId::Generate => "Generate",
            StageId::Extract => "Extract",
            StageId::Refine => "Refine",
            StageId::Citations => "Citations",
            StageId::InternalLinks => "InternalLinks",
            StageId::Toc => "ToC",
            StageId::Metadata => "Metadata",
            StageId::FaqPaa => "FAQ/PAA",
            StageId::Image => "Image",
            StageId::MergeAndLink => "MergeAndLink",
            StageId::Persist => "Persist",
            StageId::Similarity => "Similarity",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Unit of work in the pipeline.
///
/// A stage is idempotent by convention: re-running it overwrites its declared
/// outputs. The engine relies on this for regeneration attempts (§4.2 step 6)
/// — a stage implementation must not accumulate state across calls in the
/// context itself, only in its own collaborator.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage identity.
    fn id(&self) -> StageId;

    /// Display name. Defaults to [`StageId::display_name`].
    fn name(&self) -> &str {
        self.id().display_name()
    }

    /// Whether this stage is critical (see [`StageId::is_critical`]).
    fn is_critical(&self) -> bool {
        self.id().is_critical()
    }

    /// Execute the stage against a job's [`ExecutionContext`], writing
    /// declared outputs back onto it.
    ///
    /// Returning `Err` signals an unrecoverable fault; the engine converts it
    /// into a [`crate::StageError`] and classifies it per [`Stage::is_critical`].
    /// Recoverable faults should instead be handled inside the stage, which
    /// may append a [`crate::StageError`] to `ctx.errors` itself and return
    /// `Ok(())` with partially populated outputs.
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), apo_error::PipelineError>;
}
