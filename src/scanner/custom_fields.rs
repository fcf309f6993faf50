//! Custom fields scanner

use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, batch_process, to_output};
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::site::{AcfGroup, RegisteredMeta, SiteSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public post meta keys listed in the report
const MAX_PUBLIC_KEYS: usize = 100;

/// Object types meta can be registered for
const META_OBJECT_TYPES: &[&str] = &["post", "term", "user", "comment"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFieldsReport {
    pub summary: MetaSummary,
    pub post_meta: PublicMetaKeys,
    pub registered_meta: OrderedMap<Vec<RegisteredMeta>>,
    pub acf_fields: AcfReport,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaSummary {
    pub total_meta_keys: usize,
    pub post_meta_keys: usize,
    pub term_meta_keys: usize,
    pub user_meta_keys: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicMetaKeys {
    pub keys: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcfReport {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_groups: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AcfGroup>,
}

/// Inventories meta keys, registered meta and ACF field groups
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomFieldsScanner;

impl Scanner for CustomFieldsScanner {
    fn id(&self) -> &'static str {
        "custom_fields"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("custom_fields_scan");

        let site = ctx.site;
        let report = CustomFieldsReport {
            summary: summary(site),
            post_meta: public_post_meta(site, ctx.settings.batch_size),
            registered_meta: META_OBJECT_TYPES
                .iter()
                .map(|kind| {
                    let registered = site.meta.registered.get(kind).cloned().unwrap_or_default();
                    (kind.to_string(), registered)
                })
                .collect(),
            acf_fields: match &site.meta.acf_groups {
                None => AcfReport::default(),
                Some(groups) => AcfReport {
                    available: true,
                    field_groups: Some(groups.len()),
                    groups: groups.clone(),
                },
            },
            performance_metrics: monitor.end("custom_fields_scan"),
        };

        to_output(&report)
    }
}

fn post_meta_keys(site: &SiteSnapshot) -> Vec<String> {
    if !site.meta.post_meta_keys.is_empty() {
        return site.meta.post_meta_keys.clone();
    }
    let mut keys: Vec<String> = site
        .post_types
        .iter()
        .flat_map(|pt| pt.meta.iter().map(|m| m.key.clone()))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn term_meta_keys(site: &SiteSnapshot) -> Vec<String> {
    if !site.meta.term_meta_keys.is_empty() {
        return site.meta.term_meta_keys.clone();
    }
    let mut keys: Vec<String> = site
        .taxonomies
        .iter()
        .flat_map(|tax| tax.term_meta.iter().map(|m| m.key.clone()))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn summary(site: &SiteSnapshot) -> MetaSummary {
    let post = post_meta_keys(site).len();
    let term = term_meta_keys(site).len();
    let user = site.meta.user_meta_keys.len();
    MetaSummary {
        total_meta_keys: post + term + user,
        post_meta_keys: post,
        term_meta_keys: term,
        user_meta_keys: user,
    }
}

fn public_post_meta(site: &SiteSnapshot, batch_size: usize) -> PublicMetaKeys {
    let all = post_meta_keys(site);
    let mut keys = batch_process(&all, batch_size, |chunk| {
        chunk
            .iter()
            .filter(|key| !key.starts_with('_'))
            .cloned()
            .collect()
    });
    keys.sort();
    keys.truncate(MAX_PUBLIC_KEYS);
    PublicMetaKeys {
        count: keys.len(),
        keys,
    }
}
