//! Stage 1: `PromptBuild`.

use apo_core::{ExecutionContext, Stage, StageId};
use async_trait::async_trait;
use apo_error::PipelineError;

/// Assembles the generation prompt from the job's keyword, company data,
/// language, and any freeform `system_prompts` overrides.
///
/// Prompt *content* is opaque policy (§1); this stage only concatenates the
/// pieces the engine already has in context, deterministically.
#[derive(Debug, Clone, Default)]
pub struct PromptBuildStage;

impl PromptBuildStage {
    /// Construct the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for PromptBuildStage {
    fn id(&self) -> StageId {
        StageId::PromptBuild
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let mut prompt = format!(
            "Write a long-form article targeting the keyword \"{}\".",
            ctx.job_config.keyword
        );
        if let Some(company) = ctx.company_data.as_ref().and_then(|c| c.name.as_deref()) {
            prompt.push_str(&format!(" Ground the article in the context of {company}."));
        }
        if let Some(lang) = &ctx.language {
            prompt.push_str(&format!(" Write in {lang}."));
        }
        if let Some(tone) = &ctx.job_config.tone {
            prompt.push_str(&format!(" Tone: {tone}."));
        }
        if let Some(words) = ctx.job_config.word_count {
            prompt.push_str(&format!(" Target length: {words} words."));
        }
        for extra in &ctx.job_config.system_prompts {
            prompt.push('\n');
            prompt.push_str(extra);
        }
        ctx.prompt = Some(prompt);
        Ok(())
    }
}
