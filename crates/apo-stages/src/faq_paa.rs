//! Stage 8: `FAQ/PAA` (parallel fan-out).

use apo_collab_core::LlmClient;
use apo_core::{ExecutionContext, FaqItem, Stage, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Generates FAQ and "People Also Ask" question/answer pairs via the LLM.
pub struct FaqPaaStage {
    client: Arc<dyn LlmClient>,
}

impl FaqPaaStage {
    /// Build the stage against an `LlmClient`.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

fn parse_items(value: &serde_json::Value, key: &str) -> Vec<FaqItem> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|item| {
                    let question = item.get("question")?.as_str()?.to_string();
                    let answer = item.get("answer")?.as_str()?.to_string();
                    Some(FaqItem { question, answer })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Stage for FaqPaaStage {
    fn id(&self) -> StageId {
        StageId::FaqPaa
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let prompt = format!(
            "Generate FAQ and People-Also-Ask question/answer pairs for: {}",
            ctx.job_config.keyword
        );
        let schema = json!({"type": "object", "properties": {"faq_items": {}, "paa_items": {}}});
        let output = self
            .client
            .generate(&prompt, Some(&schema), None, &[])
            .await
            .map_err(|e| PipelineError::new(ErrorCode::AdvisoryStageFailure, e.to_string()))?;

        let Some(value) = output.as_structured() else {
            return Ok(());
        };
        ctx.parallel_results.faq_items = parse_items(value, "faq_items");
        ctx.parallel_results.paa_items = parse_items(value, "paa_items");
        Ok(())
    }
}
