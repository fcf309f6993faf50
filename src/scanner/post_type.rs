//! Post type scanner

use super::meta::{MetaFieldReport, analyze_meta_fields};
use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, sanitize_results, to_output};
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::site::{ArchiveSetting, PostTypeDef, SiteSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const CACHE_KEY: &str = "post_type_scan_results";

/// Parent chains longer than this are not followed
const MAX_HIERARCHY_DEPTH: u32 = 10;

/// Statuses that WordPress registers itself
const BUILTIN_STATUSES: &[&str] = &[
    "publish",
    "future",
    "draft",
    "pending",
    "private",
    "trash",
    "auto-draft",
    "inherit",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTypeReport {
    pub post_types: OrderedMap<PostTypeEntry>,
    pub statistics: PostTypeStatistics,
    pub relationships: OrderedMap<PostTypeRelationship>,
    pub templates: OrderedMap<Vec<PageTemplateRef>>,
    pub custom_statuses: OrderedMap<CustomStatus>,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTypeEntry {
    pub name: String,
    pub label: String,
    pub description: String,
    pub public: bool,
    pub hierarchical: bool,
    pub show_in_rest: bool,
    pub rest_base: Option<String>,
    pub capabilities: OrderedMap<String>,
    pub supports: Vec<String>,
    pub taxonomies: Vec<String>,
    pub has_archive: ArchiveSetting,
    pub rewrite_slug: Option<String>,
    #[serde(rename = "_builtin")]
    pub builtin: bool,
    pub source: Source,
    pub meta_fields: Vec<MetaFieldReport>,
    pub count: u64,
    pub statuses: OrderedMap<u64>,
    pub custom_fields_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_hierarchy: Option<TemplateHierarchy>,
}

/// Where a post type or taxonomy was registered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl Source {
    pub fn detect(builtin: bool) -> Self {
        if builtin {
            Self {
                kind: "core".to_string(),
                name: "WordPress Core".to_string(),
            }
        } else {
            Self {
                kind: "unknown".to_string(),
                name: "Unknown Source".to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateHierarchy {
    pub single: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTypeStatistics {
    pub total_post_types: usize,
    pub public_post_types: usize,
    pub custom_post_types: usize,
    pub total_posts: u64,
    pub total_meta_entries: u64,
    pub unique_meta_keys: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTypeRelationship {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub taxonomies: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hierarchical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTemplateRef {
    pub file: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomStatus {
    pub label: String,
    pub public: bool,
    pub exclude_from_search: bool,
}

/// Scans registered post types, their meta fields and relationships
#[derive(Debug, Clone, Copy, Default)]
pub struct PostTypeScanner;

impl Scanner for PostTypeScanner {
    fn id(&self) -> &'static str {
        "post_types"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("post_type_scan");

        if let Some(cached) = ctx.get_cached_results::<Value>(CACHE_KEY) {
            tracing::debug!("returning cached post type scan results");
            return Ok(cached);
        }

        let site = ctx.site;
        let report = PostTypeReport {
            post_types: site
                .post_types
                .iter()
                .map(|pt| (pt.name.clone(), analyze_post_type(pt)))
                .collect(),
            statistics: statistics(site),
            relationships: relationships(site),
            templates: page_templates(site),
            custom_statuses: custom_statuses(site),
            performance_metrics: monitor.end("post_type_scan"),
        };

        ctx.set_cached_results(CACHE_KEY, &report);
        Ok(sanitize_results(to_output(&report)?))
    }
}

fn analyze_post_type(pt: &PostTypeDef) -> PostTypeEntry {
    let meta_fields = analyze_meta_fields(&pt.meta);
    let template_hierarchy = pt.public.then(|| template_hierarchy(pt));

    PostTypeEntry {
        name: pt.name.clone(),
        label: if pt.label.is_empty() {
            pt.name.clone()
        } else {
            pt.label.clone()
        },
        description: pt.description.clone(),
        public: pt.public,
        hierarchical: pt.hierarchical,
        show_in_rest: pt.show_in_rest,
        rest_base: pt.rest_base.clone(),
        capabilities: pt.capabilities.clone(),
        supports: pt.supports.clone(),
        taxonomies: pt.taxonomies.clone(),
        has_archive: pt.has_archive.clone(),
        rewrite_slug: pt.rewrite_slug.clone(),
        builtin: pt.builtin,
        source: Source::detect(pt.builtin),
        custom_fields_count: pt.meta.len(),
        meta_fields,
        count: post_count(pt),
        statuses: pt
            .statuses
            .iter()
            .filter(|(status, count)| **count > 0 && *status != "auto-draft")
            .map(|(status, count)| (status.to_string(), *count))
            .collect(),
        template_hierarchy,
    }
}

/// Total posts excluding auto-drafts; falls back to the reported count
fn post_count(pt: &PostTypeDef) -> u64 {
    if pt.statuses.is_empty() {
        return pt.count;
    }
    pt.statuses
        .iter()
        .filter(|(status, _)| *status != "auto-draft")
        .map(|(_, count)| count)
        .sum()
}

fn template_hierarchy(pt: &PostTypeDef) -> TemplateHierarchy {
    let name = &pt.name;
    TemplateHierarchy {
        single: vec![
            format!("single-{}.php", name),
            "single.php".to_string(),
            "index.php".to_string(),
        ],
        archive: pt.has_archive.is_enabled().then(|| {
            vec![
                format!("archive-{}.php", name),
                "archive.php".to_string(),
                "index.php".to_string(),
            ]
        }),
    }
}

fn statistics(site: &SiteSnapshot) -> PostTypeStatistics {
    let total_posts = site
        .post_types
        .iter()
        .map(|pt| {
            if pt.statuses.is_empty() {
                pt.count
            } else {
                pt.statuses
                    .iter()
                    .filter(|(status, _)| !matches!(*status, "auto-draft" | "inherit"))
                    .map(|(_, count)| count)
                    .sum()
            }
        })
        .sum();

    let total_meta_entries = site.meta.total_post_meta_entries.unwrap_or_else(|| {
        site.post_types
            .iter()
            .flat_map(|pt| pt.meta.iter())
            .map(|m| m.usage_count)
            .sum()
    });

    let unique_meta_keys = if site.meta.post_meta_keys.is_empty() {
        site.post_types
            .iter()
            .flat_map(|pt| pt.meta.iter().map(|m| m.key.as_str()))
            .collect::<HashSet<_>>()
            .len()
    } else {
        site.meta.post_meta_keys.len()
    };

    PostTypeStatistics {
        total_post_types: site.post_types.len(),
        public_post_types: site.post_types.iter().filter(|pt| pt.public).count(),
        custom_post_types: site.post_types.iter().filter(|pt| !pt.builtin).count(),
        total_posts,
        total_meta_entries,
        unique_meta_keys,
    }
}

fn relationships(site: &SiteSnapshot) -> OrderedMap<PostTypeRelationship> {
    let mut relationships = OrderedMap::new();
    for pt in &site.post_types {
        let mut rel = PostTypeRelationship {
            taxonomies: pt.taxonomies.clone(),
            ..Default::default()
        };
        if pt.hierarchical {
            rel.hierarchical = true;
            rel.max_depth = Some(max_hierarchy_depth(pt));
        }
        if pt.supports.iter().any(|s| s == "post-formats") {
            rel.post_formats = Some(theme_post_formats(site));
        }
        if rel != PostTypeRelationship::default() {
            relationships.insert(pt.name.clone(), rel);
        }
    }
    relationships
}

/// Longest parent chain among the post type's posts
pub(crate) fn max_hierarchy_depth(pt: &PostTypeDef) -> u32 {
    let parents: HashMap<u64, u64> = pt.posts.iter().map(|p| (p.id, p.parent)).collect();

    pt.posts
        .iter()
        .map(|post| {
            let mut depth = 0;
            let mut parent = post.parent;
            while parent > 0 && depth < MAX_HIERARCHY_DEPTH {
                depth += 1;
                parent = parents.get(&parent).copied().unwrap_or(0);
            }
            depth
        })
        .max()
        .unwrap_or(0)
}

/// Post formats declared by the theme, accepting `["aside"]` or `[["aside"]]`
fn theme_post_formats(site: &SiteSnapshot) -> Vec<String> {
    let Some(value) = site.theme.as_ref().and_then(|t| t.supports.get("post-formats")) else {
        return Vec::new();
    };
    let list = match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => inner.as_slice(),
            _ => items.as_slice(),
        },
        _ => return Vec::new(),
    };
    list.iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn page_templates(site: &SiteSnapshot) -> OrderedMap<Vec<PageTemplateRef>> {
    let mut templates = OrderedMap::new();
    let Some(theme) = &site.theme else {
        return templates;
    };
    if theme.page_templates.is_empty() {
        return templates;
    }

    for pt in site.post_types.iter().filter(|pt| pt.public) {
        if pt.supports.iter().any(|s| s == "page-attributes") {
            let refs = theme
                .page_templates
                .iter()
                .map(|(file, name)| PageTemplateRef {
                    file: file.to_string(),
                    name: name.clone(),
                })
                .collect();
            templates.insert(pt.name.clone(), refs);
        }
    }
    templates
}

fn custom_statuses(site: &SiteSnapshot) -> OrderedMap<CustomStatus> {
    site.post_statuses
        .iter()
        .filter(|s| !BUILTIN_STATUSES.contains(&s.name.as_str()))
        .map(|s| {
            (
                s.name.clone(),
                CustomStatus {
                    label: s.label.clone(),
                    public: s.public,
                    exclude_from_search: s.exclude_from_search,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheHandler;
    use crate::config::Settings;
    use crate::site::{MetaKeyDef, PostNode, PostStatusDef, ThemeDef};
    use serde_json::json;

    fn page_type() -> PostTypeDef {
        PostTypeDef {
            name: "page".to_string(),
            label: "Pages".to_string(),
            public: true,
            hierarchical: true,
            builtin: true,
            supports: vec!["title".to_string(), "page-attributes".to_string()],
            statuses: [("publish".to_string(), 3), ("auto-draft".to_string(), 2)]
                .into_iter()
                .collect(),
            posts: vec![
                PostNode { id: 1, parent: 0 },
                PostNode { id: 2, parent: 1 },
                PostNode { id: 3, parent: 2 },
            ],
            ..Default::default()
        }
    }

    fn book_type() -> PostTypeDef {
        PostTypeDef {
            name: "book".to_string(),
            label: "Books".to_string(),
            public: true,
            has_archive: ArchiveSetting::Enabled(true),
            supports: vec!["post-formats".to_string()],
            taxonomies: vec!["genre".to_string()],
            count: 12,
            meta: vec![
                MetaKeyDef {
                    key: "isbn".to_string(),
                    usage_count: 12,
                    sample_values: vec!["9780000000001".to_string()],
                    ..Default::default()
                },
                MetaKeyDef {
                    key: "_thumbnail_id".to_string(),
                    usage_count: 4,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn site() -> SiteSnapshot {
        SiteSnapshot {
            post_types: vec![page_type(), book_type()],
            post_statuses: vec![
                PostStatusDef {
                    name: "publish".to_string(),
                    ..Default::default()
                },
                PostStatusDef {
                    name: "archived".to_string(),
                    label: "Archived".to_string(),
                    ..Default::default()
                },
            ],
            theme: Some(ThemeDef {
                supports: [("post-formats".to_string(), json!([["aside", "video"]]))]
                    .into_iter()
                    .collect(),
                page_templates: [("templates/full.php".to_string(), "Full Width".to_string())]
                    .into_iter()
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn scan(site: &SiteSnapshot) -> PostTypeReport {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings {
            enable_caching: false,
            ..Default::default()
        };
        let value = PostTypeScanner
            .scan(&ScanContext::new(site, &cache, &settings))
            .unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn counts_and_statistics() {
        let report = scan(&site());
        let page = report.post_types.get("page").unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.statuses.keys().collect::<Vec<_>>(), vec!["publish"]);
        assert_eq!(report.statistics.total_post_types, 2);
        assert_eq!(report.statistics.custom_post_types, 1);
        assert_eq!(report.statistics.total_posts, 15);
        assert_eq!(report.statistics.total_meta_entries, 16);
        assert_eq!(report.statistics.unique_meta_keys, 2);
    }

    #[test]
    fn meta_fields_hide_private_keys() {
        let report = scan(&site());
        let book = report.post_types.get("book").unwrap();
        assert_eq!(book.meta_fields.len(), 1);
        assert_eq!(book.meta_fields[0].kind, "integer");
        assert_eq!(book.custom_fields_count, 2);
    }

    #[test]
    fn template_hierarchy_includes_archive_when_enabled() {
        let report = scan(&site());
        let book = report.post_types.get("book").unwrap();
        let hierarchy = book.template_hierarchy.as_ref().unwrap();
        assert_eq!(hierarchy.single[0], "single-book.php");
        assert_eq!(hierarchy.archive.as_ref().unwrap()[0], "archive-book.php");
        let page = report.post_types.get("page").unwrap();
        assert!(page.template_hierarchy.as_ref().unwrap().archive.is_none());
    }

    #[test]
    fn relationships_capture_depth_and_formats() {
        let report = scan(&site());
        let page = report.relationships.get("page").unwrap();
        assert!(page.hierarchical);
        assert_eq!(page.max_depth, Some(2));
        let book = report.relationships.get("book").unwrap();
        assert_eq!(book.taxonomies, vec!["genre"]);
        assert_eq!(book.post_formats.as_deref(), Some(&["aside".to_string(), "video".to_string()][..]));
    }

    #[test]
    fn depth_is_capped_on_cycles() {
        let pt = PostTypeDef {
            posts: vec![PostNode { id: 1, parent: 2 }, PostNode { id: 2, parent: 1 }],
            ..Default::default()
        };
        assert_eq!(max_hierarchy_depth(&pt), MAX_HIERARCHY_DEPTH);
    }

    #[test]
    fn templates_and_custom_statuses() {
        let report = scan(&site());
        let page_templates = report.templates.get("page").unwrap();
        assert_eq!(page_templates[0].name, "Full Width");
        assert!(report.templates.get("book").is_none());
        assert_eq!(report.custom_statuses.keys().collect::<Vec<_>>(), vec!["archived"]);
    }

    #[test]
    fn cached_results_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings::default();
        let site = site();
        let ctx = ScanContext::new(&site, &cache, &settings);

        let first = PostTypeScanner.scan(&ctx).unwrap();
        let mut changed = site.clone();
        changed.post_types.pop();
        let ctx = ScanContext::new(&changed, &cache, &settings);
        let second = PostTypeScanner.scan(&ctx).unwrap();
        assert_eq!(first["post_types"], second["post_types"]);
    }
}
