//! Stage 6: `ToC` (parallel fan-out).

use apo_core::article::TocEntry;
use apo_core::{ExecutionContext, Stage, StageId};
use apo_error::PipelineError;
use async_trait::async_trait;

/// Builds a table of contents from `structured_data`'s section titles.
///
/// Purely derived from context already in hand — no external collaborator.
#[derive(Debug, Clone, Default)]
pub struct TocStage;

impl TocStage {
    /// Construct the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl Stage for TocStage {
    fn id(&self) -> StageId {
        StageId::Toc
    }

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let Some(data) = &ctx.structured_data else {
            return Ok(());
        };
        let mut entries = Vec::new();
        if let Some(title) = data.get("section_01_title").and_then(|v| v.as_str()) {
            entries.push(TocEntry {
                anchor: slug(title),
                label: title.to_string(),
            });
        }
        if let Some(sections) = data.get("sections").and_then(|v| v.as_array()) {
            for s in sections {
                if let Some(title) = s.get("title").and_then(|v| v.as_str()) {
                    entries.push(TocEntry {
                        anchor: slug(title),
                        label: title.to_string(),
                    });
                }
            }
        }
        ctx.parallel_results.toc = entries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_core::JobOptions;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn builds_toc_from_sections() {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        let mut data = serde_json::Map::new();
        data.insert("section_01_title".into(), json!("Getting Started"));
        data.insert(
            "sections".into(),
            json!([{"title": "Advanced Tips"}]),
        );
        ctx.structured_data = Some(data);
        TocStage::new().execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.parallel_results.toc.len(), 2);
        assert_eq!(ctx.parallel_results.toc[0].anchor, "getting-started");
    }

    #[tokio::test]
    async fn no_structured_data_is_noop() {
        let mut ctx = ExecutionContext::new(
            Uuid::new_v4(),
            JobOptions {
                keyword: "k".into(),
                company_url: "https://example.com".into(),
                ..Default::default()
            },
        );
        TocStage::new().execute(&mut ctx).await.unwrap();
        assert!(ctx.parallel_results.toc.is_empty());
    }
}
