//! Overlay step: writes each fan-out stage's fields onto the base document
//! without ever overwriting a key Extract/Refine already populated (§4.4
//! step 2: "explicit keys are disjoint by design; missing keys tolerated").

use apo_core::ParallelOutputs;
use serde_json::{Map, Value};

pub(crate) fn overlay(mut base: Map<String, Value>, parallel: &ParallelOutputs) -> Map<String, Value> {
    insert_list_if_absent(&mut base, "internal_links", &parallel.internal_links_list);
    insert_list_if_absent(&mut base, "toc", &parallel.toc);
    insert_list_if_absent(&mut base, "faq_items", &parallel.faq_items);
    insert_list_if_absent(&mut base, "paa_items", &parallel.paa_items);

    for (key, value) in &parallel.metadata {
        base.entry(key.clone()).or_insert_with(|| Value::String(value.clone()));
    }
    if let Some(url) = &parallel.image_url {
        base.entry("image_01_url".to_string())
            .or_insert_with(|| Value::String(url.clone()));
    }
    if let Some(alt) = &parallel.image_alt {
        base.entry("image_01_alt_text".to_string())
            .or_insert_with(|| Value::String(alt.clone()));
    }
    base
}

fn insert_list_if_absent<T: serde::Serialize>(base: &mut Map<String, Value>, key: &str, value: &[T]) {
    if value.is_empty() || base.contains_key(key) {
        return;
    }
    if let Ok(v) = serde_json::to_value(value) {
        base.insert(key.to_string(), v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apo_core::article::TocEntry;

    #[test]
    fn inserts_missing_keys() {
        let mut parallel = ParallelOutputs::empty();
        parallel.toc.push(TocEntry {
            anchor: "intro".into(),
            label: "Intro".into(),
        });
        let merged = overlay(Map::new(), &parallel);
        assert!(merged.contains_key("toc"));
    }

    #[test]
    fn does_not_overwrite_existing_key() {
        let mut base = Map::new();
        base.insert("meta_title".to_string(), Value::String("existing".into()));
        let mut parallel = ParallelOutputs::empty();
        parallel.metadata.insert("meta_title".into(), "from metadata stage".into());
        let merged = overlay(base, &parallel);
        assert_eq!(merged.get("meta_title").unwrap().as_str().unwrap(), "existing");
    }
}
