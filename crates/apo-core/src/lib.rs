//! apo-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Stable contract types for the article pipeline orchestrator: [`Job`],
//! [`ExecutionContext`], the [`Stage`] trait, [`ParallelOutputs`], and the
//! [`ValidatedArticle`] schema.
//!
//! If you only take one dependency from this workspace, take this one.

/// Job lifecycle record owned by the job store.
pub mod job;
/// Per-job mutable execution state threaded through the pipeline.
pub mod context;
/// Stage contract: numeric id, criticality, and the async `execute` operation.
pub mod stage;
/// Typed replacement for the fan-out's dynamic `parallel_results` dict.
pub mod parallel;
/// The flat, merged, link-resolved article schema produced by Stage 10.
pub mod article;
/// Failure record appended to `ExecutionContext.errors`.
pub mod stage_error;

pub use article::{Citation, FaqItem, InternalLink, ValidatedArticle};
pub use context::ExecutionContext;
pub use job::{Job, JobOptions, JobStatus};
pub use parallel::ParallelOutputs;
pub use stage::{Stage, StageId};
pub use stage_error::StageError;
