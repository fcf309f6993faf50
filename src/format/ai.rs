//! JSON brief for AI coding assistants
//!
//! Restates the scan as architecture, relationships and ready-made query
//! snippets, followed by every scanner's raw output.

use super::GENERATOR;
use crate::error::Result;
use crate::orchestrator::{ScanEnvelope, TIMESTAMP_FORMAT};
use crate::ordered::OrderedMap;
use crate::scanner::ScannerKind;
use crate::scanner::meta::MetaFieldReport;
use crate::scanner::plugin::PluginReport;
use crate::scanner::post_type::{PostTypeEntry, PostTypeReport};
use crate::scanner::security::SecurityReport;
use crate::scanner::taxonomy::TaxonomyReport;
use crate::scanner::theme::ThemeReport;
use crate::site::ArchiveSetting;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Meta keys used more often than this are called out as key fields
const KEY_FIELD_USAGE: u64 = 10;

/// Points contributed by meta keys are capped
const META_SCORE_CAP: usize = 50;

const PURPOSE: &str = "This document provides a comprehensive analysis of a WordPress site's structure, designed to help AI assistants understand the site architecture for development tasks.";

/// Site focus by well-known post type slugs, first match wins
const FOCUS_RULES: [(&[&str], &str); 6] = [
    (&["product"], "E-commerce"),
    (&["event", "events"], "Events"),
    (&["portfolio", "project"], "Portfolio/Agency"),
    (&["course", "lesson"], "Learning Management"),
    (&["property", "listing"], "Real Estate"),
    (&["job", "job_listing"], "Job Board"),
];

const DEFAULT_FOCUS: &str = "Content/Blog";

#[derive(Debug, Serialize)]
struct AiDocument {
    meta: Meta,
    summary: Summary,
    architecture: Value,
    relationships: Value,
    development_context: Value,
    recommendations: Recommendations,
    detailed_analysis: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct Meta {
    generator: &'static str,
    scan_date: String,
    wordpress_version: Option<String>,
    php_version: Option<String>,
    site_url: String,
    active_theme: Option<String>,
    multisite: bool,
    purpose: &'static str,
}

#[derive(Debug, Serialize)]
struct Summary {
    overview: &'static str,
    key_metrics: Map<String, Value>,
    complexity_score: Complexity,
    primary_focus: &'static str,
}

/// Heuristic size of the content model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Complexity {
    pub score: u64,
    pub level: &'static str,
    pub factors: OrderedMap<u64>,
}

#[derive(Debug, Default, Serialize)]
struct Recommendations {
    performance: Vec<String>,
    development: Vec<String>,
    maintenance: Vec<String>,
}

/// Scanner reports the brief is derived from
struct Reports {
    post_types: Option<PostTypeReport>,
    taxonomies: Option<TaxonomyReport>,
    plugins: Option<PluginReport>,
    theme: Option<ThemeReport>,
    security: Option<SecurityReport>,
}

impl Reports {
    fn read(envelope: &ScanEnvelope) -> Self {
        Self {
            post_types: envelope.report("post_types"),
            taxonomies: envelope.report("taxonomies"),
            plugins: envelope.report("plugins"),
            theme: envelope.report("theme"),
            security: envelope.report("security"),
        }
    }

    /// Post types that are not built into WordPress
    fn custom_post_types(&self) -> impl Iterator<Item = (&str, &PostTypeEntry)> {
        self.post_types
            .iter()
            .flat_map(|report| report.post_types.iter())
            .filter(|(_, info)| !info.builtin)
    }
}

/// Renders a scan envelope as a JSON brief
#[derive(Debug, Clone, Copy, Default)]
pub struct AiFormatter;

impl AiFormatter {
    pub fn format(&self, envelope: &ScanEnvelope) -> Result<String> {
        let reports = Reports::read(envelope);
        let document = AiDocument {
            meta: meta(envelope, &reports),
            summary: summary(&reports),
            architecture: architecture(envelope, &reports),
            relationships: relationships(&reports),
            development_context: development_context(&reports),
            recommendations: recommendations(&reports),
            detailed_analysis: detailed_analysis(envelope)?,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

fn meta(envelope: &ScanEnvelope, reports: &Reports) -> Meta {
    let site = &envelope.site;
    // RFC 3339 style, the way the envelope's local timestamp reads
    let scan_date = chrono::NaiveDateTime::parse_from_str(&envelope.timestamp, TIMESTAMP_FORMAT)
        .map(|at| at.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|_| envelope.timestamp.clone());

    Meta {
        generator: GENERATOR,
        scan_date,
        wordpress_version: site.wordpress_version.clone(),
        php_version: site.php_version.clone(),
        site_url: site.url.clone(),
        active_theme: reports
            .theme
            .as_ref()
            .map(|theme| theme.active_theme.name.clone()),
        multisite: site.multisite,
        purpose: PURPOSE,
    }
}

fn summary(reports: &Reports) -> Summary {
    let mut key_metrics = Map::new();
    if let Some(report) = &reports.post_types {
        let stats = &report.statistics;
        key_metrics.insert("total_content_items".into(), json!(stats.total_posts));
        key_metrics.insert("content_types".into(), json!(stats.total_post_types));
        key_metrics.insert("custom_content_types".into(), json!(stats.custom_post_types));
    }
    if let Some(report) = &reports.taxonomies {
        let stats = &report.statistics;
        key_metrics.insert("taxonomies".into(), json!(stats.total_taxonomies));
        key_metrics.insert("custom_taxonomies".into(), json!(stats.custom_taxonomies));
        key_metrics.insert("total_terms".into(), json!(stats.total_terms));
    }

    Summary {
        overview: "WordPress site with custom content architecture",
        key_metrics,
        complexity_score: complexity(reports.post_types.as_ref(), reports.taxonomies.as_ref()),
        primary_focus: reports
            .post_types
            .as_ref()
            .map_or(DEFAULT_FOCUS, |report| {
                site_focus(&report.post_types.keys().collect::<Vec<_>>())
            }),
    }
}

/// `10 × custom post types + 8 × custom taxonomies + min(meta keys, 50)`
pub fn complexity(
    post_types: Option<&PostTypeReport>,
    taxonomies: Option<&TaxonomyReport>,
) -> Complexity {
    let mut score = 0;
    let mut factors = OrderedMap::new();

    if let Some(report) = post_types {
        let custom = report.statistics.custom_post_types as u64;
        score += custom * 10;
        factors.insert("custom_post_types", custom);
    }
    if let Some(report) = taxonomies {
        let custom = report.statistics.custom_taxonomies as u64;
        score += custom * 8;
        factors.insert("custom_taxonomies", custom);
    }
    if let Some(report) = post_types {
        let meta_keys = report.statistics.unique_meta_keys;
        score += meta_keys.min(META_SCORE_CAP) as u64;
        factors.insert("unique_meta_keys", meta_keys as u64);
    }

    Complexity {
        score,
        level: complexity_level(score),
        factors,
    }
}

pub fn complexity_level(score: u64) -> &'static str {
    match score {
        0..20 => "Simple",
        20..50 => "Moderate",
        50..100 => "Complex",
        _ => "Very Complex",
    }
}

/// First focus whose post type slugs are present, `Content/Blog` otherwise
pub fn site_focus(post_types: &[&str]) -> &'static str {
    FOCUS_RULES
        .iter()
        .find(|(slugs, _)| slugs.iter().any(|slug| post_types.contains(slug)))
        .map_or(DEFAULT_FOCUS, |(_, focus)| *focus)
}

fn home_url(envelope: &ScanEnvelope) -> String {
    format!("{}/", envelope.site.url.trim_end_matches('/'))
}

fn url_pattern(home: &str, name: &str, info: &PostTypeEntry) -> String {
    match &info.rewrite_slug {
        Some(slug) if !slug.is_empty() => format!("{}{}/%postname%/", home, slug),
        _ if info.public => format!("{}{}/%postname%/", home, name),
        _ => "Not publicly accessible".to_string(),
    }
}

fn rest_base<'a>(name: &'a str, rest_base: &'a Option<String>) -> &'a str {
    rest_base.as_deref().filter(|b| !b.is_empty()).unwrap_or(name)
}

fn post_type_notes(name: &str, info: &PostTypeEntry) -> Vec<String> {
    let mut notes = Vec::new();
    if info.show_in_rest {
        notes.push(format!(
            "REST API enabled - can be accessed via /wp-json/wp/v2/{}",
            rest_base(name, &info.rest_base)
        ));
    }
    if info.hierarchical {
        notes.push("Supports parent-child relationships like Pages".to_string());
    }
    if info.supports.iter().any(|feature| feature == "thumbnail") {
        notes.push("Supports featured images".to_string());
    }
    if !info.taxonomies.is_empty() {
        notes.push(format!("Can be organized with: {}", info.taxonomies.join(", ")));
    }
    match &info.has_archive {
        ArchiveSetting::Slug(slug) if !slug.is_empty() => {
            notes.push(format!("Has archive page at /{}", slug));
        }
        ArchiveSetting::Enabled(true) => notes.push(format!("Has archive page at /{}", name)),
        _ => {}
    }
    notes
}

fn key_fields(fields: &[MetaFieldReport]) -> impl Iterator<Item = &MetaFieldReport> {
    fields
        .iter()
        .filter(|field| field.usage_count > KEY_FIELD_USAGE || field.is_registered)
}

fn summarize_custom_fields(fields: &[MetaFieldReport]) -> Value {
    let mut types: OrderedMap<u64> = OrderedMap::new();
    for field in fields {
        let kind = if field.kind.is_empty() { "string" } else { field.kind.as_str() };
        let seen = types.get(kind).copied().unwrap_or(0);
        types.insert(kind, seen + 1);
    }
    let key_fields: Vec<Value> = key_fields(fields)
        .map(|field| json!({"key": field.key, "type": field.kind, "usage": field.usage_count}))
        .collect();

    json!({
        "count": fields.len(),
        "types": types,
        "key_fields": key_fields,
    })
}

fn architecture(envelope: &ScanEnvelope, reports: &Reports) -> Value {
    let home = home_url(envelope);
    let mut content_structure = Map::new();
    let mut data_relationships = Map::new();
    let mut url_patterns = Map::new();
    let mut template_hierarchy = Map::new();

    for (name, info) in reports.post_types.iter().flat_map(|r| r.post_types.iter()) {
        let description = if info.description.is_empty() {
            format!("Content type for {}", info.label)
        } else {
            info.description.clone()
        };
        let url_structure = url_pattern(&home, name, info);

        content_structure.insert(
            name.to_string(),
            json!({
                "label": info.label,
                "description": description,
                "hierarchical": info.hierarchical,
                "public": info.public,
                "rest_enabled": info.show_in_rest,
                "supports": info.supports,
                "taxonomies": info.taxonomies,
                "count": info.count,
                "custom_fields": summarize_custom_fields(&info.meta_fields),
                "url_structure": url_structure,
                "development_notes": post_type_notes(name, info),
            }),
        );

        if info.public {
            url_patterns.insert(name.to_string(), json!(url_structure));
        }
        if !info.taxonomies.is_empty() || info.hierarchical {
            data_relationships.insert(
                name.to_string(),
                json!({
                    "taxonomies": info.taxonomies,
                    "parent_child": info.hierarchical,
                    "custom_field_count": info.meta_fields.len(),
                }),
            );
        }
        if let Some(hierarchy) = &info.template_hierarchy {
            template_hierarchy.insert(name.to_string(), json!(hierarchy));
        }
    }

    json!({
        "content_structure": content_structure,
        "data_relationships": data_relationships,
        "url_patterns": url_patterns,
        "template_hierarchy": template_hierarchy,
    })
}

fn relationships(reports: &Reports) -> Value {
    let mut post_type_taxonomies = Map::new();
    let mut hierarchical_structures = Map::new();
    let mut taxonomy_connections = Map::new();
    let mut meta_relationships = Map::new();

    if let Some(report) = &reports.post_types {
        for (name, rel) in report.relationships.iter() {
            if !rel.taxonomies.is_empty() {
                post_type_taxonomies.insert(
                    name.to_string(),
                    json!({
                        "taxonomies": rel.taxonomies,
                        "description": format!(
                            "The {} post type can be organized using: {}",
                            name,
                            rel.taxonomies.join(", ")
                        ),
                    }),
                );
            }
            if rel.hierarchical {
                hierarchical_structures.insert(
                    name.to_string(),
                    json!({
                        "max_depth": rel.max_depth.unwrap_or(0),
                        "description": format!("The {} post type supports parent-child relationships", name),
                    }),
                );
            }
        }
        for (name, info) in report.post_types.iter() {
            let keys: Vec<&str> = key_fields(&info.meta_fields).map(|f| f.key.as_str()).collect();
            if !keys.is_empty() {
                meta_relationships.insert(name.to_string(), json!({ "key_fields": keys }));
            }
        }
    }

    if let Some(report) = &reports.taxonomies {
        for (name, rel) in report.relationships.iter() {
            let shared_with: Vec<&str> = rel.shared_with.keys().collect();
            taxonomy_connections.insert(
                name.to_string(),
                json!({
                    "applies_to": rel.post_types,
                    "shared_with": shared_with,
                    "has_meta": rel.has_term_meta,
                }),
            );
        }
    }

    json!({
        "post_type_taxonomies": post_type_taxonomies,
        "taxonomy_connections": taxonomy_connections,
        "hierarchical_structures": hierarchical_structures,
        "meta_relationships": meta_relationships,
    })
}

fn snippet(function: String, description: String) -> Value {
    json!({"function": function, "description": description})
}

fn key_functions(reports: &Reports) -> Value {
    let mut content_retrieval = Vec::new();
    let mut taxonomy_functions = Vec::new();
    let mut meta_functions = Vec::new();

    for (name, info) in reports.custom_post_types() {
        content_retrieval.push(snippet(
            format!("get_posts( array( 'post_type' => '{}' ) )", name),
            format!("Retrieve {} posts", info.label),
        ));
        content_retrieval.push(snippet(
            format!("new WP_Query( array( 'post_type' => '{}' ) )", name),
            format!("Query {} with advanced options", info.label),
        ));
        for field in key_fields(&info.meta_fields) {
            meta_functions.push(snippet(
                format!("get_post_meta( $post_id, '{}', true )", field.key),
                format!("Get the {} value of a {} item", field.key, info.label),
            ));
        }
    }

    for (name, info) in reports
        .taxonomies
        .iter()
        .flat_map(|r| r.taxonomies.iter())
        .filter(|(_, info)| !info.builtin)
    {
        taxonomy_functions.push(snippet(
            format!("get_terms( array( 'taxonomy' => '{}' ) )", name),
            format!("Get all {} terms", info.label),
        ));
        taxonomy_functions.push(snippet(
            format!("wp_get_post_terms( $post_id, '{}' )", name),
            format!("Get {} for a specific post", info.label),
        ));
    }

    json!({
        "content_retrieval": content_retrieval,
        "taxonomy_functions": taxonomy_functions,
        "meta_functions": meta_functions,
    })
}

fn common_patterns(reports: &Reports) -> Value {
    let mut patterns = Map::new();
    let Some(report) = &reports.post_types else {
        return Value::Object(patterns);
    };
    let has_any = |slugs: &[&str]| slugs.iter().any(|slug| report.post_types.contains_key(slug));

    if has_any(&["product"]) {
        patterns.insert(
            "e-commerce".into(),
            json!({
                "detected": true,
                "description": "Site appears to have e-commerce functionality with product post type",
                "key_elements": ["products", "orders", "customers"],
            }),
        );
    }
    if has_any(&["event", "events", "tribe_events"]) {
        patterns.insert(
            "events".into(),
            json!({
                "detected": true,
                "description": "Site has event management functionality",
                "key_elements": ["events", "venues", "organizers"],
            }),
        );
    }
    if has_any(&["portfolio", "project", "work"]) {
        patterns.insert(
            "portfolio".into(),
            json!({
                "detected": true,
                "description": "Site includes portfolio or project showcase functionality",
                "key_elements": ["projects", "clients", "services"],
            }),
        );
    }
    Value::Object(patterns)
}

fn hooks_reference(reports: &Reports) -> Value {
    let mut post_type_hooks = Vec::new();
    for (name, info) in reports.custom_post_types() {
        post_type_hooks.push(json!({
            "hook": format!("save_post_{}", name),
            "description": format!("Triggered when saving a {}", info.label),
        }));
        post_type_hooks.push(json!({
            "hook": format!("manage_{}_posts_columns", name),
            "description": format!("Customize admin columns for {}", info.label),
        }));
    }

    json!({
        "post_type_hooks": post_type_hooks,
        "taxonomy_hooks": [],
        "general_hooks": [
            {"hook": "init", "description": "Register custom post types and taxonomies"},
            {"hook": "pre_get_posts", "description": "Modify main queries for custom content"},
            {"hook": "template_redirect", "description": "Handle custom routing and redirects"},
        ],
    })
}

fn query_examples(reports: &Reports) -> Vec<Value> {
    reports
        .custom_post_types()
        .filter(|(_, info)| info.public)
        .map(|(name, info)| {
            let mut example = Map::new();
            example.insert("post_type".into(), json!(name));
            example.insert("label".into(), json!(info.label));
            example.insert(
                "basic_query".into(),
                json!(format!(
                    "\n$args = array(\n    'post_type' => '{name}',\n    'posts_per_page' => 10,\n    'post_status' => 'publish'\n);\n$query = new WP_Query( $args );"
                )),
            );
            if let Some(taxonomy) = info.taxonomies.first() {
                example.insert(
                    "taxonomy_query".into(),
                    json!(format!(
                        "\n$args = array(\n    'post_type' => '{name}',\n    'tax_query' => array(\n        array(\n            'taxonomy' => '{taxonomy}',\n            'field' => 'slug',\n            'terms' => 'example-term'\n        )\n    )\n);\n$query = new WP_Query( $args );"
                    )),
                );
            }
            if let Some(field) = info.meta_fields.first() {
                let meta_key = if field.key.is_empty() { "meta_key" } else { field.key.as_str() };
                example.insert(
                    "meta_query".into(),
                    json!(format!(
                        "\n$args = array(\n    'post_type' => '{name}',\n    'meta_query' => array(\n        array(\n            'key' => '{meta_key}',\n            'value' => 'example_value',\n            'compare' => '='\n        )\n    )\n);\n$query = new WP_Query( $args );"
                    )),
                );
            }
            Value::Object(example)
        })
        .collect()
}

fn security_notes(reports: &Reports) -> Value {
    let mut capabilities = Map::new();
    for (name, info) in reports.custom_post_types() {
        let cap = |key: &str, fallback: String| {
            info.capabilities.get(key).cloned().unwrap_or(fallback)
        };
        capabilities.insert(
            name.to_string(),
            json!({
                "edit": cap("edit_post", format!("edit_{}", name)),
                "publish": cap("publish_posts", format!("publish_{}s", name)),
                "delete": cap("delete_post", format!("delete_{}", name)),
            }),
        );
    }

    json!({
        "capabilities": capabilities,
        "data_validation": [],
        "best_practices": [
            "Always validate and sanitize user input",
            "Check user capabilities before allowing actions",
            "Use nonces for form submissions",
            "Escape output when displaying data",
            "Validate file uploads if applicable",
        ],
    })
}

fn development_context(reports: &Reports) -> Value {
    json!({
        "key_functions": key_functions(reports),
        "common_patterns": common_patterns(reports),
        "hooks_and_filters": hooks_reference(reports),
        "query_examples": query_examples(reports),
        "security_considerations": security_notes(reports),
    })
}

fn recommendations(reports: &Reports) -> Recommendations {
    let mut recs = Recommendations::default();

    if let Some(report) = &reports.post_types {
        if report.statistics.total_posts > 10_000 {
            recs.performance.push(
                "Consider implementing pagination and lazy loading for large content lists".into(),
            );
        }
        if report.statistics.total_meta_entries > 100_000 {
            recs.performance.push(
                "Large meta table detected - consider indexing frequently queried meta keys".into(),
            );
        }
    }

    recs.development.extend(
        [
            "Use WP_Query instead of query_posts() for custom queries",
            "Implement proper error handling for all database operations",
            "Follow WordPress coding standards for consistency",
        ]
        .map(String::from),
    );

    if let Some(report) = &reports.plugins {
        let inactive = report.all_plugins.categorized.inactive.len();
        if inactive > 0 {
            recs.maintenance.push(format!(
                "Remove {} inactive plugin(s) that are no longer needed",
                inactive
            ));
        }
    }
    if let Some(report) = &reports.security
        && report.security_headers.debug_display
    {
        recs.maintenance
            .push("Disable WP_DEBUG_DISPLAY so errors are not shown to visitors".into());
    }
    recs
}

/// Raw outcome of every scanner, `{}` for scanners that did not run
fn detailed_analysis(envelope: &ScanEnvelope) -> Result<Map<String, Value>> {
    let mut analysis = Map::new();
    for kind in ScannerKind::ALL {
        let outcome = match envelope.results.get(kind.id()) {
            Some(outcome) => serde_json::to_value(outcome)?,
            None => json!({}),
        };
        analysis.insert(kind.id().to_string(), outcome);
    }
    Ok(analysis)
}
