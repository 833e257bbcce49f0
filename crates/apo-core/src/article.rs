//! The flat, merged, link-resolved article record produced by Stage 10 and
//! consumed by persistence and rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One resolved citation: `{n, title, url}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Citation {
    /// Citation marker number (`[N]`).
    pub n: u32,
    /// Source title.
    pub title: String,
    /// Absolute, syntactically valid URL.
    pub url: String,
}

/// One table-of-contents entry: `{anchor, label}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TocEntry {
    /// In-page anchor id.
    pub anchor: String,
    /// Display label.
    pub label: String,
}

/// One internal link candidate: `{url, title}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InternalLink {
    /// Target URL.
    pub url: String,
    /// Link/anchor title.
    pub title: String,
}

/// One question/answer pair, used for both FAQ and "People Also Ask" items.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FaqItem {
    /// The question text.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

/// One optional body section beyond the required `section_01`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Section {
    /// Section title.
    pub title: String,
    /// Section HTML/text content.
    pub content: String,
}

/// One optional supplementary image beyond the required `image_01`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ExtraImage {
    /// Image URL.
    pub url: String,
    /// Alt text.
    pub alt_text: String,
}

/// The validated article schema (§6).
///
/// Required fields are non-optional; Stage 10's validation step (§4.4 step 6)
/// rejects any document where a required field is empty, which this type
/// encodes structurally — a `ValidatedArticle` that exists always has its
/// required fields populated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ValidatedArticle {
    // -- Required --
    /// Headline.
    pub headline: String,
    /// Short teaser/summary.
    pub teaser: String,
    /// Direct answer to the target query (answer-engine-optimization lead).
    pub direct_answer: String,
    /// Opening paragraph(s).
    pub intro: String,
    /// Meta title, constrained to 60 characters by the source policy.
    pub meta_title: String,
    /// Meta description, constrained to 160 characters by the source policy.
    pub meta_description: String,
    /// Title of the first required body section.
    pub section_01_title: String,
    /// Content of the first required body section.
    pub section_01_content: String,
    /// URL of the first required image.
    pub image_01_url: String,
    /// Alt text of the first required image.
    pub image_01_alt_text: String,

    // -- Optional --
    /// Up to 9 additional body sections (`section_02`..`section_10`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    /// Up to 3 key takeaways.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_takeaways: Vec<String>,
    /// Up to 4 "People Also Ask" Q/A pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paa_items: Vec<FaqItem>,
    /// Up to 6 FAQ Q/A pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faq_items: Vec<FaqItem>,
    /// Up to two additional images beyond `image_01`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_images: Vec<ExtraImage>,
    /// Resolved citations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Citation>,
    /// Table of contents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toc: Vec<TocEntry>,
    /// Internal link candidates attached to the article.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_links: Vec<InternalLink>,
    /// Flattened `parent_child` keys produced by Stage 10's flatten step for
    /// nested fields that have no first-class representation above.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub extra_fields: std::collections::BTreeMap<String, serde_json::Value>,
}

impl ValidatedArticle {
    /// Names of the required fields, in schema order, paired with an accessor.
    /// Used by Stage 10's accumulate-all-errors validation pass.
    #[must_use]
    pub fn required_field_values(&self) -> [(&'static str, &str); 10] {
        [
            ("headline", &self.headline),
            ("teaser", &self.teaser),
            ("direct_answer", &self.direct_answer),
            ("intro", &self.intro),
            ("meta_title", &self.meta_title),
            ("meta_description", &self.meta_description),
            ("section_01_title", &self.section_01_title),
            ("section_01_content", &self.section_01_content),
            ("image_01_url", &self.image_01_url),
            ("image_01_alt_text", &self.image_01_alt_text),
        ]
    }

    /// Concatenated text body used by the similarity checker and quality
    /// scorer: headline, teaser, intro, and every section's content.
    #[must_use]
    pub fn text_body(&self) -> String {
        let mut body = String::new();
        body.push_str(&self.headline);
        body.push(' ');
        body.push_str(&self.teaser);
        body.push(' ');
        body.push_str(&self.intro);
        body.push(' ');
        body.push_str(&self.section_01_content);
        for s in &self.sections {
            body.push(' ');
            body.push_str(&s.content);
        }
        body
    }
}
