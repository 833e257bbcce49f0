//! Validation step (§4.4 step 6): accumulate-all-errors check against the
//! 10 required `ValidatedArticle` fields before constructing the result.

use apo_core::article::{Citation, ExtraImage, FaqItem, InternalLink, Section, TocEntry, ValidatedArticle};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

const REQUIRED_FIELDS: [&str; 10] = [
    "headline",
    "teaser",
    "direct_answer",
    "intro",
    "meta_title",
    "meta_description",
    "section_01_title",
    "section_01_content",
    "image_01_url",
    "image_01_alt_text",
];

fn take_list<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Vec<T> {
    map.remove(key).and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default()
}

/// Builds the final article, collecting every missing/empty required field
/// instead of failing on the first one, so a caller sees the whole problem
/// at once.
pub(crate) fn build_validated_article(mut map: Map<String, Value>) -> Result<ValidatedArticle, Vec<String>> {
    let mut errors = Vec::new();
    let mut required: HashMap<&str, String> = HashMap::new();

    for &field in &REQUIRED_FIELDS {
        let value = map
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty());
        match value {
            Some(v) => {
                required.insert(field, v);
            }
            None => errors.push(format!("missing or empty required field `{field}`")),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    for &field in &REQUIRED_FIELDS {
        map.remove(field);
    }

    let sections: Vec<Section> = take_list(&mut map, "sections");
    let key_takeaways: Vec<String> = take_list(&mut map, "key_takeaways");
    let paa_items: Vec<FaqItem> = take_list(&mut map, "paa_items");
    let faq_items: Vec<FaqItem> = take_list(&mut map, "faq_items");
    let extra_images: Vec<ExtraImage> = take_list(&mut map, "extra_images");
    let sources: Vec<Citation> = take_list(&mut map, "sources");
    let toc: Vec<TocEntry> = take_list(&mut map, "toc");
    let internal_links: Vec<InternalLink> = take_list(&mut map, "internal_links");

    let extra_fields: BTreeMap<String, Value> = map.into_iter().collect();

    Ok(ValidatedArticle {
        headline: required.remove("headline").expect("checked above"),
        teaser: required.remove("teaser").expect("checked above"),
        direct_answer: required.remove("direct_answer").expect("checked above"),
        intro: required.remove("intro").expect("checked above"),
        meta_title: required.remove("meta_title").expect("checked above"),
        meta_description: required.remove("meta_description").expect("checked above"),
        section_01_title: required.remove("section_01_title").expect("checked above"),
        section_01_content: required.remove("section_01_content").expect("checked above"),
        image_01_url: required.remove("image_01_url").expect("checked above"),
        image_01_alt_text: required.remove("image_01_alt_text").expect("checked above"),
        sections,
        key_takeaways,
        paa_items,
        faq_items,
        extra_images,
        sources,
        toc,
        internal_links,
        extra_fields,
    })
}
