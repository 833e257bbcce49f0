// SPDX-License-Identifier: MIT OR Apache-2.0
//! The workflow engine: drives one job's [`ExecutionContext`] through the
//! [`StageRegistry`] in pipeline order, owns the regeneration loop (§4.2 step
//! 6), and writes lifecycle transitions back to the [`JobStore`] (§3).
//!
//! # Concurrency note
//!
//! §5 allows (never requires) the six fan-out stages to run concurrently, and
//! allows Persist and Similarity to overlap. Both permissions assume an
//! `ExecutionContext` whose fields can be mutably borrowed by more than one
//! in-flight stage at once. This engine keeps `ExecutionContext` as a single
//! non-`Sync` record owned by one job (§9: "no lock needed around the context
//! itself") rather than splitting it into independently-lockable pieces, so
//! every stage — fan-out included — runs sequentially against the same
//! `&mut ExecutionContext`. The fan-out stages' disjoint-key-writes invariant
//! holds regardless of execution order, and neither Persist nor Similarity
//! reads a field the other writes, so this is a wall-clock simplification
//! only: it changes nothing about a completed job's contents.

use std::sync::Arc;

use apo_collab_core::AeoScorer;
use apo_core::context::QualityReport;
use apo_core::{ExecutionContext, Job, JobStatus, Stage, StageError, StageId, ValidatedArticle};
use apo_error::PipelineError;
use apo_quality::QualityMonitor;
use apo_store::{JobStore, StoreError};
use thiserror::Error;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::registry::StageRegistry;

/// Failure modes that prevent a job from reaching a terminal `Completed`
/// status with a usable article. Advisory stage failures never surface here
/// — they are folded into `ctx.errors` and the run continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No job exists in the store with the given id.
    #[error("no job found with id {0}")]
    JobNotFound(Uuid),
    /// A critical stage failed; the job is terminated.
    #[error("critical stage {stage} failed: {source}")]
    CriticalStage {
        /// The stage that failed.
        stage: StageId,
        /// The underlying pipeline error.
        #[source]
        source: PipelineError,
    },
    /// The run was cancelled before or during execution.
    #[error("job {0} was cancelled")]
    Cancelled(Uuid),
    /// The job store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates the full pipeline for one job at a time. Stateless beyond its
/// injected dependencies — safe to share across concurrently-running jobs via
/// `Arc<WorkflowEngine>`, since each `run` call owns an independent
/// `ExecutionContext`.
pub struct WorkflowEngine {
    registry: Arc<StageRegistry>,
    config: apo_config::PipelineConfig,
    job_store: JobStore,
    quality_monitor: QualityMonitor,
    scorer: Arc<dyn AeoScorer>,
}

impl WorkflowEngine {
    /// Wire an engine from its dependencies. `registry` must already satisfy
    /// the `StageFactory` contract (built via [`crate::registry::StageRegistryBuilder::build`]);
    /// an engine never validates the registry itself — a bad registry is a
    /// construction-time `ConfigError`, reported before the engine exists.
    #[must_use]
    pub fn new(
        registry: Arc<StageRegistry>,
        config: apo_config::PipelineConfig,
        job_store: JobStore,
        quality_monitor: QualityMonitor,
        scorer: Arc<dyn AeoScorer>,
    ) -> Self {
        Self {
            registry,
            config,
            job_store,
            quality_monitor,
            scorer,
        }
    }

    /// Run a previously-submitted job to completion.
    ///
    /// Looks the job up in the store, transitions it to `Running`, drives it
    /// through every stage, and writes the terminal status back before
    /// returning. A critical stage failure or cancellation is always
    /// reflected in the store as `JobStatus::Failed` *and* surfaced as an
    /// `Err` here, so a caller that only wants the stored job can ignore the
    /// return value and re-read it, while a caller driving the run directly
    /// gets the reason without a second lookup.
    pub async fn run(&self, job_id: Uuid, cancel: CancellationToken) -> Result<(), EngineError> {
        let job = self.job_store.get(job_id).await.ok_or(EngineError::JobNotFound(job_id))?;
        self.job_store.update(job_id, |j| j.status = JobStatus::Running).await?;

        let mut ctx = ExecutionContext::new(job_id, job.options.clone());

        if cancel.is_cancelled() {
            return self.fail_cancelled(job_id, &ctx).await;
        }

        // DataFetch and PromptBuild run once; regeneration restarts at Generate.
        for stage_id in [StageId::DataFetch, StageId::PromptBuild] {
            if let Err(failure) = self.dispatch(&mut ctx, stage_id, &cancel).await {
                return self.fail(job_id, &mut ctx, failure).await;
            }
            if cancel.is_cancelled() {
                return self.fail_cancelled(job_id, &ctx).await;
            }
        }

        let best = match self.regenerate_until_satisfied(&mut ctx, &cancel).await {
            Ok(best) => best,
            Err(failure) => return self.fail(job_id, &mut ctx, failure).await,
        };

        ctx.validated_article = Some(best.article.clone());
        ctx.quality_report = Some(best.report.clone());

        if let Err(failure) = self.dispatch(&mut ctx, StageId::Persist, &cancel).await {
            return self.fail(job_id, &mut ctx, failure).await;
        }
        // Advisory by classification: a Similarity-stage error is never
        // critical (§4.1), so `dispatch` cannot return `Err` for it — but we
        // still let the classifier decide rather than assuming that here.
        let _ = self.dispatch(&mut ctx, StageId::Similarity, &cancel).await;

        // Each attempt already recorded its own score in
        // `regenerate_until_satisfied`; no terminal re-record here.
        ctx.final_article = Some(best.article.clone());

        self.job_store
            .update(job_id, |j| {
                j.status = JobStatus::Completed;
                j.progress = 100;
                j.current_stage = None;
                j.result = ctx.final_article.clone();
                j.errors = ctx.errors.clone();
            })
            .await?;

        Ok(())
    }

    /// Stage 2 → Stage 10 loop, re-attempted under the quality gate (§4.2
    /// step 6, §4.5). Tracks the best-scoring attempt across iterations and
    /// returns it regardless of whether the gate threshold was ever met
    /// (§8 boundary behavior: "Regeneration at max attempts... completes with
    /// the best attempt; no infinite loop").
    ///
    /// Every attempt's score is fed to the [`QualityMonitor`] as it is
    /// computed, not just the eventual best one (§8 scenario 3: "monitor
    /// records both attempts") — see `DESIGN.md` for how this reconciles
    /// with §4.2 step 9's single terminal `record()` call.
    async fn regenerate_until_satisfied(
        &self,
        ctx: &mut ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<BestAttempt, Failure> {
        let mut best: Option<BestAttempt> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(Failure::Cancelled);
            }

            self.dispatch(ctx, StageId::Generate, cancel).await?;
            // Extract/Refine errors are classified advisory by `dispatch`;
            // a resulting gap in `structured_data` is caught by Stage 10's
            // required-field check instead.
            let _ = self.dispatch(ctx, StageId::Extract, cancel).await;
            let _ = self.dispatch(ctx, StageId::Refine, cancel).await;

            for stage_id in StageId::FAN_OUT {
                if cancel.is_cancelled() {
                    return Err(Failure::Cancelled);
                }
                // Any fan-out stage may fail without stopping the others
                // (§4.1); classified advisory by `dispatch`.
                let _ = self.dispatch(ctx, stage_id, cancel).await;
            }

            self.dispatch(ctx, StageId::MergeAndLink, cancel).await?;

            let article = ctx.validated_article.clone().expect("MergeAndLink succeeded without validated_article");
            let report = self.score(&article).await;
            ctx.quality_report = Some(report.clone());
            self.quality_monitor.record(ctx.job_id, report.aeo_score, report.critical_issues.len() as u32);

            let is_better = best.as_ref().is_none_or(|b| report.aeo_score >= b.report.aeo_score);
            if is_better {
                best = Some(BestAttempt { article: article.clone(), report: report.clone() });
            }

            let meets_threshold = report.aeo_score >= self.config.aeo_gate_threshold;
            let attempts_remaining = ctx.regeneration_attempts + 1 < self.config.max_regeneration_attempts;
            if meets_threshold || !attempts_remaining {
                break;
            }
            ctx.reset_for_regeneration();
        }

        Ok(best.expect("loop always runs at least once"))
    }

    /// Score a merged article via the injected [`AeoScorer`]. A scorer
    /// failure is treated as the worst possible score rather than aborting
    /// the run — the quality gate is advisory by design (§7 `QualityUnderflow`
    /// never becomes a terminal failure).
    async fn score(&self, article: &ValidatedArticle) -> QualityReport {
        match self.scorer.score(article).await {
            Ok(assessment) => QualityReport { aeo_score: assessment.aeo_score, critical_issues: assessment.critical_issues },
            Err(err) => QualityReport {
                aeo_score: 0.0,
                critical_issues: vec![format!("aeo scorer unavailable: {err}")],
            },
        }
    }

    /// Run one stage, recording its outcome on the context regardless of
    /// classification (§7 "Propagation policy": every stage exception is
    /// caught and converted into a `StageError`, whether or not it ends up
    /// terminal).
    async fn run_stage(
        &self,
        ctx: &mut ExecutionContext,
        stage_id: StageId,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let stage = self
            .registry
            .get(stage_id)
            .unwrap_or_else(|| panic!("stage {stage_id:?} missing from a registry that passed StageFactory validation"));

        if cancel.is_cancelled() {
            return Err(PipelineError::new(apo_error::ErrorCode::CancelRequested, format!("cancelled before {stage_id}")));
        }

        self.report_progress(ctx.job_id, stage_id, false).await;
        let result = stage.execute(ctx).await;
        self.report_progress(ctx.job_id, stage_id, true).await;

        if let Err(ref err) = result {
            ctx.record_error(StageError::from_pipeline_error(stage.name(), err, ctx.job_id, stage_id, ctx.regeneration_attempts));
        }
        result
    }

    /// Write a stage's progress to the job store, awaited in line with the
    /// rest of the run. A detached `tokio::spawn` here could outlive the
    /// terminal-status write at the end of `run` and race it back to a
    /// non-monotonic `Job` (§3: "once set, the engine does not further
    /// mutate Job") — awaiting keeps every progress write strictly ordered
    /// before whatever `run` does next, including the final transition.
    async fn report_progress(&self, job_id: Uuid, stage_id: StageId, _done: bool) {
        let percent = progress_percent(stage_id);
        let _ = self
            .job_store
            .update(job_id, |j| {
                j.progress = percent;
                j.current_stage = Some(stage_id);
            })
            .await;
    }

    /// Run a stage and classify the result per [`apo_error::ErrorCode::is_critical`]
    /// (§7): a critical error aborts the run, an advisory one has already
    /// been recorded by [`Self::run_stage`] and is swallowed here.
    async fn dispatch(&self, ctx: &mut ExecutionContext, stage_id: StageId, cancel: &CancellationToken) -> Result<(), Failure> {
        match self.run_stage(ctx, stage_id, cancel).await {
            Ok(()) => Ok(()),
            Err(err) if err.code.is_critical() => Err(Failure::Critical(stage_id, err)),
            Err(_) => Ok(()),
        }
    }

    async fn fail(&self, job_id: Uuid, ctx: &mut ExecutionContext, failure: Failure) -> Result<(), EngineError> {
        match failure {
            Failure::Critical(stage_id, err) => self.fail_critical(job_id, ctx, stage_id, err).await,
            Failure::Cancelled => self.fail_cancelled(job_id, ctx).await,
        }
    }

    async fn fail_critical(
        &self,
        job_id: Uuid,
        ctx: &mut ExecutionContext,
        stage_id: StageId,
        err: PipelineError,
    ) -> Result<(), EngineError> {
        tracing::error!(job_id = %job_id, stage = %stage_id, error = %err, "critical stage failure");
        self.job_store
            .update(job_id, |j| {
                j.status = JobStatus::Failed;
                j.current_stage = None;
                j.error = Some(err.message.clone());
                j.errors = ctx.errors.clone();
            })
            .await?;
        Err(EngineError::CriticalStage { stage: stage_id, source: err })
    }

    async fn fail_cancelled(&self, job_id: Uuid, ctx: &ExecutionContext) -> Result<(), EngineError> {
        tracing::warn!(job_id = %job_id, "job cancelled");
        self.job_store
            .update(job_id, |j| {
                j.status = JobStatus::Failed;
                j.current_stage = None;
                j.error = Some("cancelled".to_string());
                j.errors = ctx.errors.clone();
            })
            .await?;
        Err(EngineError::Cancelled(job_id))
    }
}

struct BestAttempt {
    article: ValidatedArticle,
    report: QualityReport,
}

enum Failure {
    Critical(StageId, PipelineError),
    Cancelled,
}

/// Coarse progress percentage for a stage's position in the canonical order,
/// used only for `Job::progress` display (§6). Not spec-normative.
fn progress_percent(stage_id: StageId) -> u8 {
    let position = StageId::ALL.iter().position(|id| *id == stage_id).unwrap_or(0);
    let total = StageId::ALL.len().saturating_sub(1).max(1);
    ((position * 100) / total) as u8
}
