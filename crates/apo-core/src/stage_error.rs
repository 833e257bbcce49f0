//! Failure record appended to [`crate::ExecutionContext::errors`].

use apo_error::ErrorCode;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::StageId;

/// Context captured alongside a [`StageError`]: which job, which stage, which
/// regeneration attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct StageErrorContext {
    /// Job the error occurred in.
    pub job_id: Uuid,
    /// Stage that raised the error.
    pub stage_id: StageId,
    /// 1-based regeneration attempt number in progress when the error occurred.
    pub attempt: u32,
}

/// A single failure record.
///
/// All stage-originated errors are caught by the engine and converted into a
/// `StageError` before being appended to [`crate::ExecutionContext::errors`];
/// the raw `Box<dyn Error>` never escapes a stage boundary. Only
/// [`ErrorCode::is_critical`] errors surface as terminal job failures — every
/// other record is retained for post-mortem only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StageError {
    /// Machine-readable classification.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Module/stage name that produced the error (display purposes).
    pub module: String,
    /// Short summary of the originating cause chain, if any.
    pub traceback_summary: Option<String>,
    /// Job/stage/attempt this error occurred under.
    pub context: StageErrorContext,
    /// When the error was recorded.
    pub timestamp: DateTime<Utc>,
}

impl StageError {
    /// Build a `StageError` from a stage name, a [`apo_error::PipelineError`],
    /// and the job/stage/attempt context it occurred under.
    #[must_use]
    pub fn from_pipeline_error(
        module: impl Into<String>,
        err: &apo_error::PipelineError,
        job_id: Uuid,
        stage_id: StageId,
        attempt: u32,
    ) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            module: module.into(),
            traceback_summary: err.source.as_ref().map(|s| s.to_string()),
            context: StageErrorContext {
                job_id,
                stage_id,
                attempt,
            },
            timestamp: Utc::now(),
        }
    }

    /// `true` if this error's code is part of the critical-failure set.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.code.is_critical()
    }
}
