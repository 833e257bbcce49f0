//! Stage 4: `Citations` (parallel fan-out).

use apo_collab_core::UrlValidator;
use apo_core::{Citation, ExecutionContext, Stage, StageId};
use apo_error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Validates the URLs surfaced by Stage 2's `grounding_sources` and turns the
/// reachable ones into a numbered citation list.
///
/// Final anchor-building and marker substitution is Stage 10's job (§4.4);
/// this stage only decides which sources are *eligible* citations.
pub struct CitationsStage {
    validator: Arc<dyn UrlValidator>,
    timeout: Duration,
}

impl CitationsStage {
    /// Build the stage against a `UrlValidator` with a per-call timeout.
    #[must_use]
    pub fn new(validator: Arc<dyn UrlValidator>, timeout: Duration) -> Self {
        Self { validator, timeout }
    }
}

#[async_trait]
impl Stage for CitationsStage {
    fn id(&self) -> StageId {
        StageId::Citations
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let mut citations = Vec::new();
        for (i, url) in ctx.grounding_sources.iter().enumerate() {
            let probe = tokio::time::timeout(self.timeout, self.validator.head(url, self.timeout)).await;
            match probe {
                Ok(Ok(probe)) if probe.status_code < 400 => {
                    let title = url::Url::parse(&probe.final_url)
                        .ok()
                        .and_then(|u| u.host_str().map(str::to_string))
                        .unwrap_or_else(|| probe.final_url.clone());
                    citations.push(Citation {
                        n: (i + 1) as u32,
                        title,
                        url: probe.final_url,
                    });
                }
                _ => continue,
            }
        }

        ctx.parallel_results.citations_list = citations;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_collab_mock::MockUrlValidator;
    use apo_core::JobOptions;
    use uuid::Uuid;

    fn ctx_with_sources(sources: Vec<&str>) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        ctx.grounding_sources = sources.into_iter().map(String::from).collect();
        ctx
    }

    #[tokio::test]
    async fn keeps_only_reachable_http_sources() {
        let mut ctx = ctx_with_sources(vec!["https://example.com/a", "ftp://bad.example"]);
        let stage = CitationsStage::new(Arc::new(MockUrlValidator), Duration::from_secs(1));
        stage.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.parallel_results.citations_list.len(), 1);
        assert_eq!(ctx.parallel_results.citations_list[0].n, 1);
    }

    #[tokio::test]
    async fn empty_sources_produce_empty_list() {
        let mut ctx = ctx_with_sources(vec![]);
        let stage = CitationsStage::new(Arc::new(MockUrlValidator), Duration::from_secs(1));
        stage.execute(&mut ctx).await.unwrap();
        assert!(ctx.parallel_results.citations_list.is_empty());
    }
}
