//! Stage 11: `Persist` (critical).

use apo_collab_core::StorageBackend;
use apo_core::context::StorageResult;
use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Writes the validated article and its citations to the storage backend.
///
/// Per §4.2 step 7, this stage reads only `validated_article` — never
/// `quality_report` — so it can run concurrently with the tail of Stage 10's
/// bookkeeping and with Stage 12.
pub struct PersistStage {
    storage: Arc<dyn StorageBackend>,
}

impl PersistStage {
    /// Build the stage against a `StorageBackend`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Stage for PersistStage {
    fn id(&self) -> StageId {
        StageId::Persist
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let article = ctx.validated_article.clone().ok_or_else(|| {
            PipelineError::new(
                ErrorCode::CriticalStageFailure,
                "Persist ran before MergeAndLink produced a validated_article",
            )
        })?;

        let article_json = serde_json::to_vec_pretty(&article)
            .map_err(|e| PipelineError::new(ErrorCode::CriticalStageFailure, e.to_string()))?;
        let citations_json = serde_json::to_vec_pretty(&article.sources)
            .map_err(|e| PipelineError::new(ErrorCode::CriticalStageFailure, e.to_string()))?;

        let mut locations = std::collections::BTreeMap::new();
        for (key, bytes) in [("article.json", &article_json), ("citations.json", &citations_json)] {
            let location = self
                .storage
                .put(ctx.job_id, key, bytes)
                .await
                .map_err(|e| PipelineError::new(ErrorCode::CriticalStageFailure, e.to_string()))?;
            locations.insert(key.to_string(), location);
        }

        ctx.storage_result = Some(StorageResult {
            locations,
            persisted_at: Some(Utc::now()),
        });
        ctx.final_article = Some(article);
        Ok(())
    }
}
