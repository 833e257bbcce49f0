//! Stage 3b: `Refine` (conditional, advisory).

use apo_collab_core::LlmClient;
use apo_core::{ExecutionContext, Stage, StageError, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use std::sync::Arc;

/// Minimum acceptable length, in characters, for the `direct_answer` field
/// before this stage decides a refinement pass is warranted.
const MIN_DIRECT_ANSWER_LEN: usize = 40;

/// Always invoked (§4.2 step 3); decides internally whether `structured_data`
/// needs a rewrite pass. A failed refinement is non-critical — the engine
/// keeps the un-refined data and continues.
pub struct RefineStage {
    client: Arc<dyn LlmClient>,
}

impl RefineStage {
    /// Build the stage against an `LlmClient` used for the rewrite call.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

impl RefineStage {
    fn needs_refinement(data: &serde_json::Map<String, serde_json::Value>) -> bool {
        let direct_answer_len = data
            .get("direct_answer")
            .and_then(|v| v.as_str())
            .map(str::len)
            .unwrap_or(0);
        direct_answer_len < MIN_DIRECT_ANSWER_LEN
    }
}

#[async_trait]
impl Stage for RefineStage {
    fn id(&self) -> StageId {
        StageId::Refine
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let Some(data) = ctx.structured_data.clone() else {
            return Ok(());
        };
        if !Self::needs_refinement(&data) {
            return Ok(());
        }

        let prompt = format!(
            "Rewrite direct_answer to be at least {MIN_DIRECT_ANSWER_LEN} characters and \
             self-contained. Current draft: {}",
            serde_json::Value::Object(data.clone())
        );

        match self.client.generate(&prompt, None, None, &[]).await {
            Ok(output) => {
                if let Some(text) = output.as_text() {
                    let mut refined = data;
                    refined.insert("direct_answer".into(), serde_json::json!(text));
                    ctx.structured_data = Some(refined);
                    ctx.refinement_applied = true;
                }
            }
            Err(e) => {
                let err = PipelineError::new(ErrorCode::AdvisoryStageFailure, e.to_string());
                ctx.record_error(StageError::from_pipeline_error(
                    "refine",
                    &err,
                    ctx.job_id,
                    StageId::Refine,
                    ctx.regeneration_attempts,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_collab_mock::MockLlmClient;
    use apo_core::JobOptions;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx_with(data: serde_json::Map<String, serde_json::Value>) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        ctx.structured_data = Some(data);
        ctx
    }

    #[tokio::test]
    async fn skips_refinement_when_answer_already_long_enough() {
        let mut data = serde_json::Map::new();
        data.insert(
            "direct_answer".into(),
            json!("This is a sufficiently long and self-contained direct answer already."),
        );
        let mut ctx = ctx_with(data);
        RefineStage::new(Arc::new(MockLlmClient::default()))
            .execute(&mut ctx)
            .await
            .unwrap();
        assert!(!ctx.refinement_applied);
    }

    #[tokio::test]
    async fn refines_short_direct_answer() {
        let mut data = serde_json::Map::new();
        data.insert("direct_answer".into(), json!("short"));
        let mut ctx = ctx_with(data);
        RefineStage::new(Arc::new(MockLlmClient {
            body: "a much longer rewritten direct answer goes here".into(),
        }))
        .execute(&mut ctx)
        .await
        .unwrap();
        assert!(ctx.refinement_applied);
        assert!(
            ctx.structured_data.unwrap()["direct_answer"]
                .as_str()
                .unwrap()
                .contains("rewritten")
        );
    }

    #[tokio::test]
    async fn no_structured_data_is_a_noop() {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        RefineStage::new(Arc::new(MockLlmClient::default()))
            .execute(&mut ctx)
            .await
            .unwrap();
        assert!(!ctx.refinement_applied);
    }
}
