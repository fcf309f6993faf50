//! Taxonomy scanner

use super::meta::{MetaFieldReport, analyze_meta_fields};
use super::post_type::Source;
use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, sanitize_results, to_output};
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::site::{SiteSnapshot, TaxonomyDef, TermDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const CACHE_KEY: &str = "taxonomy_scan_results";

const SAMPLE_TERMS: usize = 5;

/// Parent chains longer than this are not followed
const MAX_TERM_DEPTH: u32 = 10;

/// Capabilities of the built-in `category` taxonomy
const DEFAULT_CAPABILITIES: &[(&str, &str)] = &[
    ("manage_terms", "manage_categories"),
    ("edit_terms", "manage_categories"),
    ("delete_terms", "manage_categories"),
    ("assign_terms", "edit_posts"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyReport {
    pub taxonomies: OrderedMap<TaxonomyEntry>,
    pub statistics: TaxonomyStatistics,
    pub relationships: OrderedMap<TaxonomyRelationship>,
    pub hierarchies: OrderedMap<HierarchyAnalysis>,
    pub custom_capabilities: OrderedMap<OrderedMap<String>>,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyEntry {
    pub name: String,
    pub label: String,
    pub description: String,
    pub object_type: Vec<String>,
    pub public: bool,
    pub hierarchical: bool,
    pub show_in_rest: bool,
    pub rest_base: Option<String>,
    pub capabilities: OrderedMap<String>,
    #[serde(rename = "_builtin")]
    pub builtin: bool,
    pub source: Source,
    pub term_count: usize,
    pub terms: Vec<TermSample>,
    pub meta_fields: Vec<MetaFieldReport>,
    pub max_depth: u32,
    pub usage_stats: UsageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermSample {
    pub term_id: u64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub parent: u64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    pub total_terms: usize,
    pub used_terms: usize,
    pub empty_terms: usize,
    pub most_used_terms: Vec<TermUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermUsage {
    pub name: String,
    pub slug: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyStatistics {
    pub total_taxonomies: usize,
    pub public_taxonomies: usize,
    pub custom_taxonomies: usize,
    pub hierarchical_taxonomies: usize,
    pub total_terms: usize,
    pub total_term_relationships: u64,
    pub unique_term_meta_keys: usize,
    pub taxonomies_by_post_type: OrderedMap<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyRelationship {
    pub post_types: Vec<String>,
    /// Other taxonomy → post types both are attached to
    pub shared_with: OrderedMap<Vec<String>>,
    pub has_term_meta: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyAnalysis {
    pub max_depth: u32,
    pub total_parent_terms: usize,
    pub total_child_terms: usize,
    pub orphaned_terms: usize,
    pub circular_references: Vec<CircularReference>,
    /// Depth → number of terms at that depth
    pub depth_distribution: OrderedMap<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularReference {
    pub term_id: u64,
    pub circular_parent: u64,
}

/// Scans registered taxonomies and their terms
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyScanner;

impl Scanner for TaxonomyScanner {
    fn id(&self) -> &'static str {
        "taxonomies"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("taxonomy_scan");

        if let Some(cached) = ctx.get_cached_results::<Value>(CACHE_KEY) {
            tracing::debug!("returning cached taxonomy scan results");
            return Ok(cached);
        }

        let site = ctx.site;
        let report = TaxonomyReport {
            taxonomies: site
                .taxonomies
                .iter()
                .map(|tax| (tax.name.clone(), analyze_taxonomy(tax)))
                .collect(),
            statistics: statistics(site),
            relationships: relationships(site),
            hierarchies: site
                .taxonomies
                .iter()
                .filter(|tax| tax.hierarchical)
                .map(|tax| (tax.name.clone(), analyze_hierarchy(&tax.terms)))
                .collect(),
            custom_capabilities: custom_capabilities(site),
            performance_metrics: monitor.end("taxonomy_scan"),
        };

        ctx.set_cached_results(CACHE_KEY, &report);
        Ok(sanitize_results(to_output(&report)?))
    }
}

fn analyze_taxonomy(tax: &TaxonomyDef) -> TaxonomyEntry {
    TaxonomyEntry {
        name: tax.name.clone(),
        label: if tax.label.is_empty() {
            tax.name.clone()
        } else {
            tax.label.clone()
        },
        description: tax.description.clone(),
        object_type: tax.object_type.clone(),
        public: tax.public,
        hierarchical: tax.hierarchical,
        show_in_rest: tax.show_in_rest,
        rest_base: tax.rest_base.clone(),
        capabilities: tax.capabilities.clone(),
        builtin: tax.builtin,
        source: Source::detect(tax.builtin),
        term_count: tax.terms.len(),
        terms: top_terms(&tax.terms, false)
            .into_iter()
            .map(|t| TermSample {
                term_id: t.term_id,
                name: t.name.clone(),
                slug: t.slug.clone(),
                count: t.count,
                parent: t.parent,
                description: t.description.clone(),
            })
            .collect(),
        meta_fields: analyze_meta_fields(&tax.term_meta),
        max_depth: if tax.hierarchical {
            max_term_depth(&tax.terms)
        } else {
            0
        },
        usage_stats: usage_stats(&tax.terms),
    }
}

/// Terms ordered by count, highest first; ties keep registration order
fn top_terms(terms: &[TermDef], used_only: bool) -> Vec<&TermDef> {
    let mut sorted: Vec<&TermDef> = terms
        .iter()
        .filter(|t| !used_only || t.count > 0)
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(SAMPLE_TERMS);
    sorted
}

fn usage_stats(terms: &[TermDef]) -> UsageStats {
    let used_terms = terms.iter().filter(|t| t.count > 0).count();
    UsageStats {
        total_terms: terms.len(),
        used_terms,
        empty_terms: terms.len() - used_terms,
        most_used_terms: top_terms(terms, true)
            .into_iter()
            .map(|t| TermUsage {
                name: t.name.clone(),
                slug: t.slug.clone(),
                count: t.count,
            })
            .collect(),
    }
}

fn parent_map(terms: &[TermDef]) -> HashMap<u64, u64> {
    terms.iter().map(|t| (t.term_id, t.parent)).collect()
}

fn max_term_depth(terms: &[TermDef]) -> u32 {
    let parents = parent_map(terms);
    terms
        .iter()
        .map(|term| {
            let mut depth = 0;
            let mut current = term.parent;
            while current > 0 && depth < MAX_TERM_DEPTH {
                let Some(&next) = parents.get(&current) else {
                    break;
                };
                depth += 1;
                current = next;
            }
            depth
        })
        .max()
        .unwrap_or(0)
}

/// Parent/child counts, orphans, cycles and depth distribution of a term tree
pub(crate) fn analyze_hierarchy(terms: &[TermDef]) -> HierarchyAnalysis {
    let parents = parent_map(terms);
    let mut analysis = HierarchyAnalysis {
        max_depth: max_term_depth(terms),
        ..Default::default()
    };
    let mut distribution: Vec<(u32, usize)> = Vec::new();

    for term in terms {
        if term.parent > 0 {
            analysis.total_child_terms += 1;
            if !parents.contains_key(&term.parent) {
                analysis.orphaned_terms += 1;
            }
        } else {
            analysis.total_parent_terms += 1;
        }

        let mut depth = 0u32;
        let mut current = term.parent;
        let mut visited = HashSet::from([term.term_id]);
        while current > 0 {
            let Some(&next) = parents.get(&current) else {
                break;
            };
            if !visited.insert(current) {
                analysis.circular_references.push(CircularReference {
                    term_id: term.term_id,
                    circular_parent: current,
                });
                break;
            }
            depth += 1;
            current = next;
        }

        match distribution.iter_mut().find(|(d, _)| *d == depth) {
            Some((_, n)) => *n += 1,
            None => distribution.push((depth, 1)),
        }
    }

    distribution.sort_by_key(|(depth, _)| *depth);
    analysis.depth_distribution = distribution
        .into_iter()
        .map(|(depth, n)| (depth.to_string(), n))
        .collect();
    analysis
}

fn statistics(site: &SiteSnapshot) -> TaxonomyStatistics {
    let taxonomies_by_post_type = site
        .post_types
        .iter()
        .filter_map(|pt| {
            let attached: Vec<String> = site
                .taxonomies
                .iter()
                .filter(|tax| tax.object_type.contains(&pt.name))
                .map(|tax| tax.name.clone())
                .collect();
            (!attached.is_empty()).then(|| (pt.name.clone(), attached))
        })
        .collect();

    let term_meta_keys: HashSet<&str> = if site.meta.term_meta_keys.is_empty() {
        site.taxonomies
            .iter()
            .flat_map(|tax| tax.term_meta.iter().map(|m| m.key.as_str()))
            .collect()
    } else {
        site.meta.term_meta_keys.iter().map(String::as_str).collect()
    };

    TaxonomyStatistics {
        total_taxonomies: site.taxonomies.len(),
        public_taxonomies: site.taxonomies.iter().filter(|t| t.public).count(),
        custom_taxonomies: site.taxonomies.iter().filter(|t| !t.builtin).count(),
        hierarchical_taxonomies: site.taxonomies.iter().filter(|t| t.hierarchical).count(),
        total_terms: site.taxonomies.iter().map(|t| t.terms.len()).sum(),
        total_term_relationships: site
            .taxonomies
            .iter()
            .flat_map(|t| t.terms.iter())
            .map(|term| term.count)
            .sum(),
        unique_term_meta_keys: term_meta_keys.len(),
        taxonomies_by_post_type,
    }
}

fn relationships(site: &SiteSnapshot) -> OrderedMap<TaxonomyRelationship> {
    site.taxonomies
        .iter()
        .map(|tax| {
            let shared_with = site
                .taxonomies
                .iter()
                .filter(|other| other.name != tax.name)
                .filter_map(|other| {
                    let shared: Vec<String> = tax
                        .object_type
                        .iter()
                        .filter(|pt| other.object_type.contains(pt))
                        .cloned()
                        .collect();
                    (!shared.is_empty()).then(|| (other.name.clone(), shared))
                })
                .collect();
            (
                tax.name.clone(),
                TaxonomyRelationship {
                    post_types: tax.object_type.clone(),
                    shared_with,
                    has_term_meta: !tax.term_meta.is_empty(),
                },
            )
        })
        .collect()
}

/// Capabilities of custom taxonomies that differ from the category defaults
fn custom_capabilities(site: &SiteSnapshot) -> OrderedMap<OrderedMap<String>> {
    site.taxonomies
        .iter()
        .filter(|tax| !tax.builtin)
        .filter_map(|tax| {
            let custom: OrderedMap<String> = tax
                .capabilities
                .iter()
                .filter(|(cap, value)| {
                    DEFAULT_CAPABILITIES
                        .iter()
                        .find(|(name, _)| name == cap)
                        .is_none_or(|(_, default)| *default != value.as_str())
                })
                .map(|(cap, value)| (cap.to_string(), value.clone()))
                .collect();
            (!custom.is_empty()).then(|| (tax.name.clone(), custom))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheHandler;
    use crate::config::Settings;
    use crate::site::{MetaKeyDef, PostTypeDef};

    fn term(id: u64, parent: u64, count: u64) -> TermDef {
        TermDef {
            term_id: id,
            name: format!("Term {}", id),
            slug: format!("term-{}", id),
            count,
            parent,
            ..Default::default()
        }
    }

    fn site() -> SiteSnapshot {
        SiteSnapshot {
            post_types: vec![
                PostTypeDef {
                    name: "post".to_string(),
                    ..Default::default()
                },
                PostTypeDef {
                    name: "book".to_string(),
                    ..Default::default()
                },
            ],
            taxonomies: vec![
                TaxonomyDef {
                    name: "category".to_string(),
                    label: "Categories".to_string(),
                    object_type: vec!["post".to_string()],
                    hierarchical: true,
                    public: true,
                    builtin: true,
                    terms: vec![term(1, 0, 5), term(2, 1, 0), term(3, 2, 9)],
                    ..Default::default()
                },
                TaxonomyDef {
                    name: "genre".to_string(),
                    label: "Genres".to_string(),
                    object_type: vec!["book".to_string(), "post".to_string()],
                    capabilities: [
                        ("manage_terms".to_string(), "manage_genres".to_string()),
                        ("assign_terms".to_string(), "edit_posts".to_string()),
                    ]
                    .into_iter()
                    .collect(),
                    terms: vec![term(10, 0, 2), term(11, 0, 0)],
                    term_meta: vec![MetaKeyDef {
                        key: "color".to_string(),
                        sample_values: vec!["#ff0000".to_string()],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn scan() -> TaxonomyReport {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings {
            enable_caching: false,
            ..Default::default()
        };
        let site = site();
        let value = TaxonomyScanner
            .scan(&ScanContext::new(&site, &cache, &settings))
            .unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn taxonomy_entries_and_usage() {
        let report = scan();
        let category = report.taxonomies.get("category").unwrap();
        assert_eq!(category.term_count, 3);
        assert_eq!(category.max_depth, 2);
        assert_eq!(category.terms[0].term_id, 3);
        assert_eq!(category.usage_stats.used_terms, 2);
        assert_eq!(category.usage_stats.empty_terms, 1);
        assert_eq!(category.usage_stats.most_used_terms.len(), 2);

        let genre = report.taxonomies.get("genre").unwrap();
        assert_eq!(genre.meta_fields[0].key, "color");
    }

    #[test]
    fn statistics_group_taxonomies_by_post_type() {
        let report = scan();
        assert_eq!(report.statistics.total_taxonomies, 2);
        assert_eq!(report.statistics.custom_taxonomies, 1);
        assert_eq!(report.statistics.total_terms, 5);
        assert_eq!(
            report.statistics.taxonomies_by_post_type.get("post").unwrap(),
            &vec!["category".to_string(), "genre".to_string()]
        );
        assert_eq!(report.statistics.unique_term_meta_keys, 1);
    }

    #[test]
    fn shared_post_types_are_reported() {
        let report = scan();
        let category = report.relationships.get("category").unwrap();
        assert_eq!(category.shared_with.get("genre").unwrap(), &vec!["post".to_string()]);
        assert!(!category.has_term_meta);
        assert!(report.relationships.get("genre").unwrap().has_term_meta);
    }

    #[test]
    fn only_non_default_capabilities_are_custom() {
        let report = scan();
        let genre = report.custom_capabilities.get("genre").unwrap();
        assert_eq!(genre.keys().collect::<Vec<_>>(), vec!["manage_terms"]);
        assert!(report.custom_capabilities.get("category").is_none());
    }

    #[test]
    fn hierarchy_finds_orphans_and_cycles() {
        let terms = vec![term(1, 0, 0), term(2, 1, 0), term(3, 99, 0), term(4, 5, 0), term(5, 4, 0)];
        let analysis = analyze_hierarchy(&terms);
        assert_eq!(analysis.total_parent_terms, 1);
        assert_eq!(analysis.total_child_terms, 4);
        assert_eq!(analysis.orphaned_terms, 1);
        assert_eq!(analysis.circular_references.len(), 2);
        assert_eq!(analysis.depth_distribution.get("0"), Some(&2));
        assert_eq!(analysis.depth_distribution.get("1"), Some(&3));
    }
}
