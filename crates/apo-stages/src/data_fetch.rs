//! Stage 0: `DataFetch` (critical).

use apo_core::{ExecutionContext, Stage, StageId};
use apo_core::context::CompanyData;
use async_trait::async_trait;
use apo_error::{ErrorCode, PipelineError};

/// Resolves `job_config` defaults, derives `company_data` from `company_url`,
/// and picks the output `language`.
///
/// No external collaborator is named for this stage in the interface list
/// (§6) — grounding data here is limited to what can be derived from the
/// submitted options themselves. Deeper company research (crawling
/// `company_url`) is delegated to the sitemap/internal-links provider used
/// by Stage 5.
#[derive(Debug, Clone, Default)]
pub struct DataFetchStage;

impl DataFetchStage {
    /// Construct the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for DataFetchStage {
    fn id(&self) -> StageId {
        StageId::DataFetch
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let url = ctx.job_config.company_url.trim();
        let parsed = url::Url::parse(url).map_err(|e| {
            PipelineError::new(
                ErrorCode::CriticalStageFailure,
                format!("company_url is not a valid URL: {e}"),
            )
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PipelineError::new(
                ErrorCode::CriticalStageFailure,
                format!("company_url scheme must be http/https, got {}", parsed.scheme()),
            ));
        }

        let host = parsed.host_str().unwrap_or_default().to_string();
        let name = ctx
            .job_config
            .company_name
            .clone()
            .unwrap_or_else(|| host.clone());

        ctx.company_data = Some(CompanyData {
            name: Some(name),
            description: None,
            sitemap_urls: Vec::new(),
        });
        ctx.language = Some(ctx.job_config.language.clone().unwrap_or_else(|| "en".into()));
        Ok(())
    }
}
