//! Per-job mutable working memory threaded through every stage.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::article::ValidatedArticle;
use crate::job::JobOptions;
use crate::parallel::ParallelOutputs;
use crate::stage::StageId;
use crate::stage_error::StageError;

/// Resolved job configuration and company grounding data (Stage 0 outputs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyData {
    /// Resolved company/site name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text company description/context gathered from `company_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sitemap or candidate URLs discovered for internal linking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sitemap_urls: Vec<String>,
}

/// Post-merge, pre-gate quality measurement (§4.5).
///
/// The engine does not compute `aeo_score` itself — it is supplied by an
/// external scorer and only consumed for the threshold comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Composite 0-100 quality score.
    pub aeo_score: f64,
    /// Critical issues flagged by the scorer.
    pub critical_issues: Vec<String>,
}

/// Batch-scoped novelty check result (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Character-shingle Jaccard similarity against the nearest prior entry.
    pub char_sim: f64,
    /// Cosine embedding similarity against the nearest prior entry, if an
    /// embedding client was configured and succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sem_sim: Option<f64>,
    /// Weighted hybrid score used for the duplicate-content decision.
    pub hybrid: f64,
    /// Job id of the most similar prior entry, if any entry was compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_job_id: Option<Uuid>,
}

/// Result of persisting the final article (Stage 11).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageResult {
    /// Artifact key → storage location, per the layout in §6.
    pub locations: BTreeMap<String, String>,
    /// When the persist step completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_at: Option<DateTime<Utc>>,
}

/// Progress callback invoked before and after every stage (§4.2).
///
/// `done` is `true` on the post-stage call (or on any terminal failure
/// report); the stage id and percent identify where in the pipeline the
/// callback fired.
pub type ProgressCallback = Arc<dyn Fn(StageId, u8, bool) + Send + Sync>;

/// The per-job working record. Created at dispatch, destroyed after
/// persistence. Never shared across jobs — parallel stages within one job
/// write disjoint fields, so no lock is needed around the context itself
/// (§5 "Shared resources").
pub struct ExecutionContext {
    /// Job this context belongs to.
    pub job_id: Uuid,
    /// Submitted options (read-only input).
    pub job_config: JobOptions,
    /// Stage 0 output.
    pub company_data: Option<CompanyData>,
    /// Stage 0 output: resolved output language.
    pub language: Option<String>,
    /// Stage 1 output.
    pub prompt: Option<String>,
    /// Stage 2 output: raw LLM output before structuring.
    pub raw_article: Option<String>,
    /// Stage 2 output: citations the generator grounded its claims on,
    /// ahead of Stage 4's resolution pass.
    pub grounding_sources: Vec<String>,
    /// Stage 3/3b output: semi-structured article fields as a JSON object,
    /// the base that Stage 10 overlays `parallel_results` onto.
    pub structured_data: Option<Map<String, Value>>,
    /// Outputs of the parallel fan-out (§4.1 ids 4..9).
    pub parallel_results: ParallelOutputs,
    /// Stage 10 output.
    pub validated_article: Option<ValidatedArticle>,
    /// Post-Stage-10 quality measurement (§4.5); absent until the gate runs.
    pub quality_report: Option<QualityReport>,
    /// Stage 12 output.
    pub similarity_report: Option<SimilarityReport>,
    /// Final article handed to the job store on completion; equal to
    /// `validated_article` unless a later export step refines it further.
    pub final_article: Option<ValidatedArticle>,
    /// Stage 11 output.
    pub storage_result: Option<StorageResult>,
    /// Append-only error log (advisory and — until classified — critical).
    pub errors: Vec<StageError>,
    /// Batch this job shares similarity memory with, if any.
    pub batch_id: Option<Uuid>,
    /// Progress reporting sink.
    pub progress_cb: Option<ProgressCallback>,
    /// Set by the quality gate after Stage 10; read by the engine's
    /// regeneration loop (§4.2 step 6).
    pub regeneration_needed: bool,
    /// Set by Stage 3b when it actually rewrote `structured_data`.
    pub refinement_applied: bool,
    /// Number of regeneration attempts taken so far (0 on the first pass).
    pub regeneration_attempts: u32,
}

impl ExecutionContext {
    /// Create a fresh context for a newly dispatched job.
    #[must_use]
    pub fn new(job_id: Uuid, job_config: JobOptions) -> Self {
        let batch_id = job_config.batch_id;
        Self {
            job_id,
            job_config,
            company_data: None,
            language: None,
            prompt: None,
            raw_article: None,
            grounding_sources: Vec::new(),
            structured_data: None,
            parallel_results: ParallelOutputs::empty(),
            validated_article: None,
            quality_report: None,
            similarity_report: None,
            final_article: None,
            storage_result: None,
            errors: Vec::new(),
            batch_id,
            progress_cb: None,
            regeneration_needed: false,
            refinement_applied: false,
            regeneration_attempts: 0,
        }
    }

    /// Attach a progress callback invoked by the engine around every stage.
    pub fn with_progress_cb(mut self, cb: ProgressCallback) -> Self {
        self.progress_cb = Some(cb);
        self
    }

    /// Invoke the progress callback, if any, swallowing the absence of one.
    pub fn report_progress(&self, stage_id: StageId, percent: u8, done: bool) {
        if let Some(cb) = &self.progress_cb {
            cb(stage_id, percent, done);
        }
    }

    /// Append an error to the context's append-only error log.
    pub fn record_error(&mut self, error: StageError) {
        self.errors.push(error);
    }

    /// Reset the overwritable fields ahead of a regeneration pass, without
    /// touching `errors` (append-only) or anything written by Stage 0/1
    /// (DataFetch/PromptBuild are not re-run; regeneration restarts at
    /// Stage 2 per §4.2 step 6).
    pub fn reset_for_regeneration(&mut self) {
        self.raw_article = None;
        self.grounding_sources.clear();
        self.structured_data = None;
        self.parallel_results = ParallelOutputs::empty();
        self.validated_article = None;
        self.quality_report = None;
        self.refinement_applied = false;
        self.regeneration_needed = false;
        self.regeneration_attempts += 1;
    }
}
