//! Typed replacement for the fan-out's dynamic `parallel_results` dict
//! (§9 design note: "Dynamic key access into parallel_results").
//!
//! Each field corresponds to one declared output of one fan-out stage
//! (§4.1, ids 4..9). Fields are partitioned by writer: stage N only ever
//! writes the fields documented next to it below, so two fan-out stages
//! never race on the same field — this is the structural form of invariant
//! 3 ("no cross-key parallel interference").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::article::{Citation, FaqItem, InternalLink, TocEntry};

/// Outputs of the six parallel fan-out stages (§4.1 ids 4..9), collected by
/// [`crate::ExecutionContext`] for Stage 10 to overlay onto `structured_data`.
///
/// Every field starts `None`/empty and is populated only by its owning
/// stage; a stage that fails advisorily simply leaves its fields at the
/// default, which Stage 10's merge step tolerates by design (§4.4: "missing
/// keys tolerated").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelOutputs {
    /// Stage 4 (Citations): resolved citation list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations_list: Vec<Citation>,
    /// Stage 4 (Citations): pre-rendered HTML fragment, if the stage
    /// produces one directly rather than leaving linking to Stage 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations_html: Option<String>,

    /// Stage 5 (InternalLinks): sitemap-derived internal link candidates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_links_list: Vec<InternalLink>,

    /// Stage 6 (ToC): table-of-contents entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toc: Vec<TocEntry>,

    /// Stage 7 (Metadata): meta title/description and any other scalar
    /// metadata fields, keyed loosely since the schema for this is an
    /// external policy concern.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Stage 8 (FAQ/PAA): FAQ question/answer pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faq_items: Vec<FaqItem>,
    /// Stage 8 (FAQ/PAA): "People Also Ask" question/answer pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paa_items: Vec<FaqItem>,

    /// Stage 9 (Image): generated hero image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Stage 9 (Image): alt text for the hero image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_alt: Option<String>,
}

impl ParallelOutputs {
    /// A fresh, empty set of outputs — used at the start of every fan-out.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}
