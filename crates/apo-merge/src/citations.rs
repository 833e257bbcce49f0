//! Citation linking and marker sweeping (§4.4 steps 3-4), combined into one
//! anchor-span-aware text pass — see the module doc in `lib.rs` for why
//! these can't be two independent regex passes.

use apo_core::article::Citation;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("static pattern"))
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>.*?</a>").expect("static pattern"))
}

fn is_valid_absolute_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

pub(crate) fn resolve_citation_markers(mut map: Map<String, Value>, citations: &[Citation]) -> Map<String, Value> {
    let by_n: BTreeMap<u32, &Citation> = citations
        .iter()
        .filter(|c| is_valid_absolute_url(&c.url))
        .map(|c| (c.n, c))
        .collect();
    let mut used = BTreeSet::new();

    for value in map.values_mut() {
        rewrite_value(value, &by_n, &mut used);
    }

    let sources: Vec<Citation> = used
        .into_iter()
        .filter_map(|n| by_n.get(&n).map(|c| (*c).clone()))
        .collect();
    map.insert("sources".to_string(), serde_json::to_value(&sources).expect("Citation always serializes"));
    map
}

fn rewrite_value(value: &mut Value, by_n: &BTreeMap<u32, &Citation>, used: &mut BTreeSet<u32>) {
    match value {
        Value::String(s) => *s = rewrite_text(s, by_n, used),
        Value::Array(items) => items.iter_mut().for_each(|v| rewrite_value(v, by_n, used)),
        Value::Object(obj) => obj.values_mut().for_each(|v| rewrite_value(v, by_n, used)),
        _ => {}
    }
}

/// Replace resolved markers with anchors and drop unresolved ones, skipping
/// any marker that already falls inside an existing `<a>...</a>` span.
fn rewrite_text(text: &str, by_n: &BTreeMap<u32, &Citation>, used: &mut BTreeSet<u32>) -> String {
    if !text.contains('[') {
        return text.to_string();
    }
    let anchor_spans: Vec<(usize, usize)> = anchor_re().find_iter(text).map(|m| (m.start(), m.end())).collect();
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for cap in marker_re().captures_iter(text) {
        let whole = cap.get(0).expect("capture group 0 always present");
        if anchor_spans.iter().any(|&(s, e)| whole.start() >= s && whole.end() <= e) {
            continue;
        }
        out.push_str(&text[last_end..whole.start()]);
        if let Ok(n) = cap[1].parse::<u32>() {
            if let Some(citation) = by_n.get(&n) {
                out.push_str(&format!(
                    r#"<a href="{url}" target="_blank" rel="noopener noreferrer" data-cite-num="{n}">[{n}]</a>"#,
                    url = citation.url,
                    n = n,
                ));
                used.insert(n);
            }
        }
        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);
    out
}
