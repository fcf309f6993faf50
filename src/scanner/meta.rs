//! Meta field analysis shared by the post type and taxonomy scanners

use crate::site::MetaKeyDef;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Number of samples used to guess a field type, and shown in reports
const MAX_SAMPLES: usize = 5;

/// Longer sample values are truncated
const SAMPLE_DISPLAY_LEN: usize = 50;

/// Longer text values are classified as `textarea`
const TEXTAREA_THRESHOLD: usize = 100;

static SERIALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:[aOC]:\d+:[{"]|s:\d+:".*";$|[id]:-?[0-9.eE+]+;$|b:[01];$|N;$)"#)
        .unwrap_or_else(|err| panic!("invalid SERIALIZED_RE regex: {err}"))
});

static SERIALIZED_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^s:\d+:"(.*)";$"#)
        .unwrap_or_else(|err| panic!("invalid SERIALIZED_STRING_RE regex: {err}"))
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+$")
        .unwrap_or_else(|err| panic!("invalid EMAIL_RE regex: {err}"))
});

/// A meta field as it appears in a scanner report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaFieldReport {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub usage_count: u64,
    pub sample_values: Vec<String>,
    pub is_protected: bool,
    pub is_registered: bool,
}

/// Describe the public meta keys of an object type, sorted by key.
/// Keys starting with `_` are private and left out.
pub fn analyze_meta_fields(defs: &[MetaKeyDef]) -> Vec<MetaFieldReport> {
    let mut fields: Vec<MetaFieldReport> = defs
        .iter()
        .filter(|def| !def.key.starts_with('_'))
        .map(|def| MetaFieldReport {
            key: def.key.clone(),
            kind: def
                .registered_type
                .clone()
                .unwrap_or_else(|| detect_value_type(&def.sample_values).to_string()),
            usage_count: def.usage_count,
            sample_values: def
                .sample_values
                .iter()
                .take(MAX_SAMPLES)
                .map(|v| display_sample(v))
                .collect(),
            is_protected: def.is_protected,
            is_registered: def.is_registered || def.registered_type.is_some(),
        })
        .collect();
    fields.sort_by(|a, b| a.key.cmp(&b.key));
    fields
}

/// Most common type among the first few samples; `string` when there are none.
/// Ties go to the type seen first.
pub fn detect_value_type(samples: &[String]) -> &'static str {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for value in samples.iter().take(MAX_SAMPLES) {
        let kind = classify_value(value);
        match counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((kind, 1)),
        }
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (kind, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((kind, n));
        }
    }
    best.map_or("string", |(kind, _)| kind)
}

/// Type of a single stored meta value
pub fn classify_value(value: &str) -> &'static str {
    if SERIALIZED_RE.is_match(value) {
        "serialized"
    } else if is_numeric(value) {
        if value.contains('.') {
            "float"
        } else {
            "integer"
        }
    } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        "boolean"
    } else if is_url(value) {
        "url"
    } else if EMAIL_RE.is_match(value) {
        "email"
    } else if value.chars().count() > TEXTAREA_THRESHOLD {
        "textarea"
    } else {
        "string"
    }
}

fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim_start();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && trimmed.parse::<f64>().is_ok()
}

fn is_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| u.has_host())
}

/// Shorten a sample for display; serialized structures become `[array]`/`[object]`
fn display_sample(value: &str) -> String {
    if SERIALIZED_RE.is_match(value) {
        if value.starts_with("a:") {
            return "[array]".to_string();
        }
        if value.starts_with("O:") || value.starts_with("C:") {
            return "[object]".to_string();
        }
        if let Some(caps) = SERIALIZED_STRING_RE.captures(value) {
            return truncate(&caps[1]);
        }
        if let Some(scalar) = value.get(2..value.len().saturating_sub(1)) {
            return scalar.to_string();
        }
    }
    truncate(value)
}

fn truncate(value: &str) -> String {
    if value.chars().count() > SAMPLE_DISPLAY_LEN {
        let head: String = value.chars().take(SAMPLE_DISPLAY_LEN).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn classifies_common_values() {
        assert_eq!(classify_value("42"), "integer");
        assert_eq!(classify_value("-3.5"), "float");
        assert_eq!(classify_value("true"), "boolean");
        assert_eq!(classify_value("https://example.com/a"), "url");
        assert_eq!(classify_value("jane@example.com"), "email");
        assert_eq!(classify_value(r#"a:1:{i:0;s:1:"x";}"#), "serialized");
        assert_eq!(classify_value(&"word ".repeat(30)), "textarea");
        assert_eq!(classify_value("hello"), "string");
        assert_eq!(classify_value("inf"), "string");
    }

    #[test]
    fn majority_type_wins() {
        assert_eq!(detect_value_type(&samples(&["1", "2", "x"])), "integer");
        assert_eq!(detect_value_type(&samples(&["x", "1"])), "string");
        assert_eq!(detect_value_type(&[]), "string");
    }

    #[test]
    fn registered_type_overrides_samples() {
        let defs = vec![MetaKeyDef {
            key: "price".to_string(),
            registered_type: Some("number".to_string()),
            sample_values: samples(&["cheap"]),
            ..Default::default()
        }];
        let fields = analyze_meta_fields(&defs);
        assert_eq!(fields[0].kind, "number");
        assert!(fields[0].is_registered);
    }

    #[test]
    fn private_keys_are_skipped_and_sorted() {
        let defs = vec![
            MetaKeyDef {
                key: "zeta".to_string(),
                ..Default::default()
            },
            MetaKeyDef {
                key: "_edit_lock".to_string(),
                ..Default::default()
            },
            MetaKeyDef {
                key: "alpha".to_string(),
                ..Default::default()
            },
        ];
        let keys: Vec<_> = analyze_meta_fields(&defs)
            .into_iter()
            .map(|f| f.key)
            .collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn samples_are_shortened() {
        assert_eq!(display_sample(r#"a:2:{i:0;i:1;i:1;i:2;}"#), "[array]");
        assert_eq!(display_sample(r#"s:5:"hello";"#), "hello");
        let long = "x".repeat(80);
        assert_eq!(display_sample(&long), format!("{}...", "x".repeat(50)));
    }
}
