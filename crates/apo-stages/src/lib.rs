//! Concrete [`apo_core::Stage`] implementations (§4.1).
//!
//! Every stage here is a thin adapter: it reads its declared inputs off
//! [`apo_core::ExecutionContext`], calls through an `apo-collab-core` trait
//! object, and writes its declared outputs back. None of them know anything
//! about prompt content, HTML layout, or scoring — that's policy living on
//! the other side of the collaborator traits.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Stage 0 — resolves job config, company data, and output language.
pub mod data_fetch;
/// Stage 1 — builds the generation prompt.
pub mod prompt_build;
/// Stage 2 — calls the LLM for the raw article.
pub mod generate;
/// Stage 3 — extracts `structured_data` from the raw article.
pub mod extract;
/// Stage 3b — conditional refinement pass over `structured_data`.
pub mod refine;
/// Stage 4 — resolves and formats citations.
pub mod citations;
/// Stage 5 — surfaces internal link candidates.
pub mod internal_links;
/// Stage 6 — builds the table of contents.
pub mod toc;
/// Stage 7 — derives metadata fields.
pub mod metadata;
/// Stage 8 — generates FAQ / "People Also Ask" pairs.
pub mod faq_paa;
/// Stage 9 — generates the hero image.
pub mod image;
/// Stage 11 — persists the validated article.
pub mod persist;

pub use citations::CitationsStage;
pub use data_fetch::DataFetchStage;
pub use extract::ExtractStage;
pub use faq_paa::FaqPaaStage;
pub use generate::GenerateStage;
pub use image::ImageStage;
pub use internal_links::InternalLinksStage;
pub use metadata::MetadataStage;
pub use persist::PersistStage;
pub use prompt_build::PromptBuildStage;
pub use refine::RefineStage;
pub use toc::TocStage;

/// Classify a `tokio::time::error::Elapsed` into the right [`apo_error::ErrorCode`]
/// for the stage's criticality, per §5 ("a timeout is an advisory failure
/// unless the stage is critical, in which case it is critical").
pub(crate) fn timeout_error(stage_critical: bool, message: impl Into<String>) -> apo_error::PipelineError {
    let code = if stage_critical {
        apo_error::ErrorCode::CriticalStageFailure
    } else {
        apo_error::ErrorCode::StageTimeout
    };
    apo_error::PipelineError::new(code, message)
}

/// Classify a collaborator [`anyhow::Error`] into the right error code for a
/// stage's criticality.
pub(crate) fn collaborator_error(stage_critical: bool, err: anyhow::Error) -> apo_error::PipelineError {
    let code = if stage_critical {
        apo_error::ErrorCode::CriticalStageFailure
    } else {
        apo_error::ErrorCode::AdvisoryStageFailure
    };
    apo_error::PipelineError::new(code, err.to_string())
}
