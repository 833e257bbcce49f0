//! A single article request, owned end-to-end by the job store.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::ValidatedArticle;
use crate::stage::StageId;
use crate::stage_error::StageError;

/// Job lifecycle status (§3). Terminal states (`Completed`/`Failed`) are
/// monotonic: once set, the engine does not further mutate the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, not yet dispatched to the engine.
    Pending,
    /// Currently executing in the workflow engine.
    Running,
    /// Finished successfully (possibly with advisory errors).
    Completed,
    /// Terminated by a critical failure or cancellation.
    Failed,
}

impl JobStatus {
    /// `true` for `Completed`/`Failed` — no further engine mutation follows.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Caller-supplied options accompanying a job submission (§6 `POST /jobs`).
///
/// Only `keyword` and `company_url` are required at the REST boundary; every
/// other field has a policy-defined or engine-defined default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobOptions {
    /// Target keyword/topic for the article.
    pub keyword: String,
    /// Company/site URL providing grounding context.
    pub company_url: String,
    /// Company display name, if known ahead of DataFetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Output language (BCP-47-ish tag); defaults are a DataFetch concern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Target country/market.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Target word count for the generated article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    /// Desired tone/voice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Batch this job belongs to, for shared similarity memory (§4.6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    /// Freeform system prompt overrides, opaque to the engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_prompts: Vec<String>,
}

/// One article generation request and its outcome.
///
/// The job store owns this record; the workflow engine holds a reference for
/// the duration of execution and never retains it past the terminal status
/// transition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job identifier.
    pub job_id: Uuid,
    /// Submitted options.
    pub options: JobOptions,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Progress percentage in `[0, 100]`.
    pub progress: u8,
    /// Stage currently executing, if any (absent before dispatch and after
    /// terminal status).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageId>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Final article, present only on `Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValidatedArticle>,
    /// Critical error message, present only on `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Advisory errors accumulated across the run, regardless of terminal
    /// status (§7: "the response carries the article and an errors[] list").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl Job {
    /// Create a new job in `Pending` status from submitted options.
    #[must_use]
    pub fn new(options: JobOptions) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            options,
            status: JobStatus::Pending,
            progress: 0,
            current_stage: None,
            created_at: Utc::now(),
            result: None,
            error: None,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending() {
        let job = Job::new(JobOptions {
            keyword: "cloud security".into(),
            company_url: "https://example.com".into(),
            ..Default::default()
        });
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.current_stage.is_none());
    }

    #[test]
    fn terminal_status_detection() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
