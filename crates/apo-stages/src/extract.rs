//! Stage 3: `Extract`.

use apo_collab_core::LlmClient;
use apo_core::{ExecutionContext, Stage, StageError, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Turns `raw_article` into the semi-structured `structured_data` map that
/// Stage 10 later overlays `parallel_results` onto.
///
/// Not critical: if the LLM's structuring call fails, this stage falls back
/// to a minimal structured document built directly from `raw_article` so the
/// pipeline can still proceed, and records an advisory [`StageError`].
pub struct ExtractStage {
    client: Arc<dyn LlmClient>,
}

impl ExtractStage {
    /// Build the stage against an `LlmClient` used for the structuring call.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn id(&self) -> StageId {
        StageId::Extract
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let raw = ctx.raw_article.clone().unwrap_or_default();
        let schema = json!({"type": "object"});

        match self.client.generate(&raw, Some(&schema), None, &[]).await {
            Ok(output) => {
                let value = output
                    .as_structured()
                    .cloned()
                    .unwrap_or_else(|| Value::Object(fallback_structured_data(&raw)));
                ctx.structured_data = Some(as_object(value));
            }
            Err(e) => {
                let err = PipelineError::new(ErrorCode::AdvisoryStageFailure, e.to_string());
                ctx.record_error(StageError::from_pipeline_error(
                    "extract",
                    &err,
                    ctx.job_id,
                    StageId::Extract,
                    ctx.regeneration_attempts,
                ));
                ctx.structured_data = Some(fallback_structured_data(&raw));
            }
        }
        Ok(())
    }
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("intro".into(), other);
            map
        }
    }
}

fn fallback_structured_data(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("intro".into(), json!(raw));
    map.insert("section_01_content".into(), json!(raw));
    map
}
