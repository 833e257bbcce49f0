//! Stage 2: `Generate` (critical).

use crate::timeout_error;
use apo_collab_core::LlmClient;
use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::{ErrorCode, PipelineError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Calls the LLM client for the raw article body.
///
/// On timeout or collaborator error this stage always returns a critical
/// failure, since `Generate` is on the critical path (§4.1).
pub struct GenerateStage {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl GenerateStage {
    /// Build the stage against an `LlmClient` with a call timeout.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn id(&self) -> StageId {
        StageId::Generate
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let prompt = ctx.prompt.clone().ok_or_else(|| {
            PipelineError::new(ErrorCode::CriticalStageFailure, "Generate ran before a prompt was built")
        })?;

        let system_instruction = (!ctx.job_config.system_prompts.is_empty())
            .then(|| ctx.job_config.system_prompts.join("\n"));

        let output = tokio::time::timeout(
            self.timeout,
            self.client.generate(&prompt, None, system_instruction.as_deref(), &[]),
        )
        .await
        .map_err(|_| timeout_error(true, format!("LLM call exceeded {:?}", self.timeout)))?
        .map_err(|e| PipelineError::new(ErrorCode::CriticalStageFailure, e.to_string()))?;

        let text = output
            .as_text()
            .map(str::to_string)
            .unwrap_or_else(|| output.as_structured().map(|v| v.to_string()).unwrap_or_default());

        ctx.grounding_sources = extract_urls(&text);
        ctx.raw_article = Some(text);
        Ok(())
    }
}

/// Pull bare `http(s)://` URLs out of generated text as a best-effort
/// grounding-sources list; real citation resolution happens in Stage 4.
fn extract_urls(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|tok| tok.starts_with("http://") || tok.starts_with("https://"))
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '.' && c != ':').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_collab_mock::MockLlmClient;
    use apo_core::JobOptions;
    use uuid::Uuid;

    fn ctx_with_prompt() -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "cloud security".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        ctx.prompt = Some("write about cloud security".into());
        ctx
    }

    #[tokio::test]
    async fn populates_raw_article_from_llm() {
        let mut ctx = ctx_with_prompt();
        let stage = GenerateStage::new(Arc::new(MockLlmClient::default()), Duration::from_secs(5));
        stage.execute(&mut ctx).await.unwrap();
        assert!(ctx.raw_article.unwrap().contains("cloud security"));
    }

    #[tokio::test]
    async fn missing_prompt_is_critical_failure() {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        let stage = GenerateStage::new(Arc::new(MockLlmClient::default()), Duration::from_secs(5));
        let err = stage.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CriticalStageFailure);
    }

    #[tokio::test]
    async fn extracts_urls_from_generated_text() {
        let urls = extract_urls("See https://example.com/a and http://foo.org, also bar.");
        assert_eq!(urls, vec!["https://example.com/a", "http://foo.org"]);
    }
}
