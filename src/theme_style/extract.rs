//! Regex-based extraction over raw stylesheet text
//!
//! This is pattern matching, not CSS parsing: blocks are single-level
//! `selector { ... }` matches, and nested at-rules are not understood.

use super::tokens::{COMPONENT_PROPERTIES, FRAMEWORK_SIGNATURES, FRAMEWORK_THRESHOLD, TokenTable};
use crate::error::Result;
use crate::ordered::{OrderedMap, TokenMap};
use regex::Regex;
use std::sync::LazyLock;

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#(?:[0-9a-f]{3}){1,2}\b|rgba?\([^)]+\)|hsla?\([^)]+\)")
        .unwrap_or_else(|err| panic!("invalid COLOR_RE regex: {err}"))
});

static SPACING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\w-])(?:margin|padding)(?:-(?:top|right|bottom|left))?\s*:\s*([^;}]+)")
        .unwrap_or_else(|err| panic!("invalid SPACING_RE regex: {err}"))
});

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:px|rem|em|%|vh|vw)")
        .unwrap_or_else(|err| panic!("invalid LENGTH_RE regex: {err}"))
});

static CSS_VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w-])(--[\w-]+)\s*:\s*([^;}]+)")
        .unwrap_or_else(|err| panic!("invalid CSS_VARIABLE_RE regex: {err}"))
});

static MEDIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@media[^{]+\{").unwrap_or_else(|err| panic!("invalid MEDIA_RE regex: {err}"))
});

static RULE_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    COMPONENT_PROPERTIES
        .iter()
        .map(|property| {
            let re = Regex::new(&format!(
                r"(?i)(?:^|[\s;{{]){}\s*:\s*([^;}}]+)",
                regex::escape(property)
            ))
            .unwrap_or_else(|err| panic!("invalid {property} rule regex: {err}"));
            (*property, re)
        })
        .collect()
});

/// Which kind of token a table describes; decides how selector candidates match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Color,
    Typography,
    Spacing,
    Layout,
    Effect,
}

/// Prefix that keeps `nav` from matching `.nav` and `button` from `.wp-block-button`
fn selector_boundary(selector: &str) -> &'static str {
    if selector.starts_with(|c: char| c.is_ascii_alphabetic()) {
        r"(?:^|[^\w.#-])"
    } else {
        ""
    }
}

fn custom_property_pattern(name: &str) -> String {
    format!(r"(?i)(?:^|[^\w-]){}\s*:\s*([^;}}]+)", regex::escape(name))
}

fn block_property_pattern(selector: &str, property: &str) -> String {
    format!(
        r"(?i){}{}\s*\{{(?:[^}}]*?[\s;])?{}\s*:\s*([^;}}]+)",
        selector_boundary(selector),
        regex::escape(selector),
        property
    )
}

fn declaration_pattern(property: &str) -> String {
    format!(r"(?i)(?:^|[^\w-]){}\s*:\s*([^;}}]+)", regex::escape(property))
}

/// CSS property a typography selector candidate is read from
fn typography_property(token: &str) -> &'static str {
    if token.starts_with("font_family") {
        "font-family"
    } else if token.starts_with("font_size") {
        "font-size"
    } else if token.starts_with("line_height") {
        "line-height"
    } else {
        "font-weight"
    }
}

fn candidate_pattern(category: Category, token: &str, candidate: &str) -> String {
    if candidate.starts_with("--") {
        return custom_property_pattern(candidate);
    }
    match category {
        Category::Typography => {
            block_property_pattern(candidate, &regex::escape(typography_property(token)))
        }
        Category::Layout => block_property_pattern(candidate, "(?:max-)?width"),
        Category::Effect => declaration_pattern(candidate),
        Category::Color | Category::Spacing => custom_property_pattern(candidate),
    }
}

/// Resolve a token table against the stylesheets.
///
/// The first stylesheet that yields a token wins; within a stylesheet the
/// first matching candidate wins.
pub fn resolve_tokens(category: Category, table: TokenTable, stylesheets: &[&str]) -> Result<TokenMap> {
    let compiled = table
        .iter()
        .map(|(token, candidates)| -> Result<(&'static str, Vec<Regex>)> {
            let patterns = candidates
                .iter()
                .map(|candidate| Regex::new(&candidate_pattern(category, token, candidate)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((*token, patterns))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut found = TokenMap::new();
    for css in stylesheets {
        for (token, patterns) in &compiled {
            if found.contains_key(token) {
                continue;
            }
            let value = patterns
                .iter()
                .find_map(|re| re.captures(css).map(|caps| caps[1].trim().to_string()));
            if let Some(value) = value {
                found.insert(*token, value);
            }
        }
    }
    Ok(found)
}

/// Push `value` unless already present
fn push_unique(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Every color literal, first-seen order
pub fn all_colors(stylesheets: &[&str]) -> Vec<String> {
    let mut colors = Vec::new();
    for css in stylesheets {
        for m in COLOR_RE.find_iter(css) {
            push_unique(&mut colors, m.as_str());
        }
    }
    colors
}

/// Every value of a plain declaration such as `font-family` or `box-shadow`
pub fn declaration_values(property: &str, stylesheets: &[&str]) -> Result<Vec<String>> {
    let re = Regex::new(&declaration_pattern(property))?;
    let mut values = Vec::new();
    for css in stylesheets {
        for caps in re.captures_iter(css) {
            push_unique(&mut values, caps[1].trim());
        }
    }
    Ok(values)
}

/// Margin and padding values that carry a length unit
pub fn spacing_values(stylesheets: &[&str]) -> Vec<String> {
    let mut values = Vec::new();
    for css in stylesheets {
        for caps in SPACING_RE.captures_iter(css) {
            let value = caps[1].trim();
            if LENGTH_RE.is_match(value) {
                push_unique(&mut values, value);
            }
        }
    }
    values
}

/// Custom property declarations; the first declaration of a name wins
pub fn css_variables(stylesheets: &[&str]) -> TokenMap {
    let mut variables = TokenMap::new();
    for css in stylesheets {
        for caps in CSS_VARIABLE_RE.captures_iter(css) {
            variables.insert_first(caps[1].trim(), caps[2].trim().to_string());
        }
    }
    variables
}

/// `@media` headers without the opening brace
pub fn media_queries(stylesheets: &[&str]) -> Vec<String> {
    let mut queries = Vec::new();
    for css in stylesheets {
        for m in MEDIA_RE.find_iter(css) {
            push_unique(&mut queries, m.as_str().trim_end_matches('{').trim());
        }
    }
    queries
}

/// Whitelisted properties declared in a block body
pub fn parse_css_rules(block: &str) -> TokenMap {
    RULE_RES
        .iter()
        .filter_map(|(property, re)| {
            re.captures(block)
                .map(|caps| (property.to_string(), caps[1].trim().to_string()))
        })
        .collect()
}

/// Styles of the first block per selector; selectors without styles are left out
pub fn component_styles(selectors: &[&str], stylesheets: &[&str]) -> Result<OrderedMap<TokenMap>> {
    let mut components = OrderedMap::new();
    for css in stylesheets {
        for selector in selectors {
            if components.contains_key(selector) {
                continue;
            }
            let re = Regex::new(&format!(
                r"(?i){}{}\s*\{{([^}}]+)\}}",
                selector_boundary(selector),
                regex::escape(selector)
            ))?;
            if let Some(caps) = re.captures(css) {
                let rules = parse_css_rules(&caps[1]);
                if !rules.is_empty() {
                    components.insert(*selector, rules);
                }
            }
        }
    }
    Ok(components)
}

/// Frameworks with enough signature hits across all stylesheet text
pub fn detect_frameworks(stylesheets: &[&str]) -> Vec<String> {
    FRAMEWORK_SIGNATURES
        .iter()
        .filter(|(_, signatures)| {
            let hits = signatures
                .iter()
                .filter(|sig| stylesheets.iter().any(|css| css.contains(*sig)))
                .count();
            hits >= FRAMEWORK_THRESHOLD
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme_style::tokens::{
        BUTTON_SELECTORS, COLOR_TOKENS, LAYOUT_TOKENS, NAVIGATION_SELECTORS, TYPOGRAPHY_TOKENS,
    };

    #[test]
    fn first_candidate_in_first_stylesheet_wins() {
        let main = ":root { --color-primary: #3366ff; --primary: red; }";
        let extra = ":root { --wp--preset--color--primary: #000; --color-accent: #f90; }";
        let colors = resolve_tokens(Category::Color, COLOR_TOKENS, &[main, extra]).unwrap();
        assert_eq!(colors.get("primary").map(String::as_str), Some("#3366ff"));
        assert_eq!(colors.get("accent").map(String::as_str), Some("#f90"));
    }

    #[test]
    fn custom_property_names_must_match_whole() {
        let css = ":root { --brand--primary: blue; }";
        let colors = resolve_tokens(Category::Color, COLOR_TOKENS, &[css]).unwrap();
        assert!(colors.get("primary").is_none());
    }

    #[test]
    fn typography_selectors_read_their_property() {
        let css = "body { margin: 0; font-family: Inter, sans-serif; line-height: 1.6 }\nh1 { font-size: 2.5rem; }";
        let typography = resolve_tokens(Category::Typography, TYPOGRAPHY_TOKENS, &[css]).unwrap();
        assert_eq!(
            typography.get("font_family_base").map(String::as_str),
            Some("Inter, sans-serif")
        );
        assert_eq!(typography.get("line_height_base").map(String::as_str), Some("1.6"));
        assert_eq!(typography.get("font_size_h1").map(String::as_str), Some("2.5rem"));
        assert!(typography.get("font_size_base").is_none());
    }

    #[test]
    fn layout_selectors_read_widths() {
        let css = ".container { min-width: 320px; max-width: 1200px; }";
        let layout = resolve_tokens(Category::Layout, LAYOUT_TOKENS, &[css]).unwrap();
        assert_eq!(layout.get("container_width").map(String::as_str), Some("1200px"));
    }

    #[test]
    fn global_passes_dedupe_in_first_seen_order() {
        let a = ".a { color: #fff; background: rgba(0, 0, 0, 0.5); margin: 0 auto; padding: 1rem; }";
        let b = ".b { color: #FFF; border-color: #fff; padding: 1rem; margin: auto; }";
        assert_eq!(all_colors(&[a, b]), vec!["#fff", "rgba(0, 0, 0, 0.5)", "#FFF"]);
        assert_eq!(spacing_values(&[a, b]), vec!["1rem"]);
    }

    #[test]
    fn declarations_skip_custom_properties() {
        let css = ":root { --border-radius: 4px; } .card { border-radius: 8px; }";
        assert_eq!(declaration_values("border-radius", &[css]).unwrap(), vec!["8px"]);
    }

    #[test]
    fn first_variable_declaration_wins() {
        let css = ":root { --gap: 1rem; --accent: #f90; } .dark { --gap: 2rem; }";
        let vars = css_variables(&[css]);
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["--gap", "--accent"]);
        assert_eq!(vars.get("--gap").map(String::as_str), Some("1rem"));
    }

    #[test]
    fn media_headers_are_collected() {
        let css = "@media (max-width: 768px) { .a { color: red; } }\n@media (max-width: 768px) {}";
        assert_eq!(media_queries(&[css]), vec!["@media (max-width: 768px)"]);
    }

    #[test]
    fn rules_do_not_confuse_similar_properties() {
        let rules = parse_css_rules(" background-color: #eee; color: #111; padding:4px 8px ");
        assert_eq!(rules.get("color").map(String::as_str), Some("#111"));
        assert_eq!(rules.get("background-color").map(String::as_str), Some("#eee"));
        assert_eq!(rules.get("padding").map(String::as_str), Some("4px 8px"));
        assert!(rules.get("background").is_none());
    }

    #[test]
    fn element_selectors_do_not_match_classes() {
        let css = ".nav { color: red; }\n.wp-block-button { padding: 0; }";
        let nav = component_styles(NAVIGATION_SELECTORS, &[css]).unwrap();
        assert_eq!(nav.keys().collect::<Vec<_>>(), vec![".nav"]);
        let buttons = component_styles(BUTTON_SELECTORS, &[css]).unwrap();
        assert!(buttons.is_empty());
    }

    #[test]
    fn frameworks_need_two_signatures() {
        let css = ".row { display: flex; } .col-6 { width: 50%; }";
        assert_eq!(detect_frameworks(&[css]), vec!["bootstrap"]);
        assert!(detect_frameworks(&[".hero { color: red; }"]).is_empty());
    }
}
