//! Parser for the PAGE `custom` attribute, e.g.
//! `readingOrder {index:0;} structure {type:MainZone;}`.
use std::collections::BTreeMap;

/// Groups of `key:value` pairs keyed by group name.
pub type Annotations = BTreeMap<String, BTreeMap<String, String>>;

/// Parse a `custom` attribute. Malformed chunks are skipped; values keep any
/// inner `:` so `type:MainZone:column` yields `MainZone:column`.
pub fn parse_custom_attribute(value: &str) -> Annotations {
    let mut annotations = Annotations::new();
    for chunk in value.split('}') {
        let Some((tag, body)) = chunk.split_once('{') else {
            continue;
        };
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let values = body
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once(':') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        annotations.insert(tag.to_string(), values);
    }
    annotations
}

/// The `type` of the `structure` group, if present and non-empty.
pub(crate) fn structure_type(value: &str) -> Option<String> {
    parse_custom_attribute(value)
        .remove("structure")?
        .remove("type")
        .filter(|kind| !kind.is_empty())
}
