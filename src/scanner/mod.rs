//! Scanners
//!
//! Each scanner inspects one facet of a [`SiteSnapshot`] and returns a JSON
//! report. The registry order in [`ScannerKind::ALL`] is the order reports
//! appear in a scan envelope.

pub mod custom_fields;
pub mod database;
pub mod meta;
pub mod plugin;
pub mod post_type;
pub mod security;
pub mod taxonomy;
pub mod theme;

use crate::cache::CacheHandler;
use crate::config::Settings;
use crate::error::Result;
use crate::site::SiteSnapshot;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Instant;

/// A unit that inspects one facet of the site
pub trait Scanner: Send + Sync {
    /// Stable identifier used as the key in the scan envelope
    fn id(&self) -> &'static str;

    /// Produce this scanner's report
    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value>;
}

/// The built-in scanners, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    PostTypes,
    Taxonomies,
    CustomFields,
    Database,
    Plugins,
    Theme,
    Security,
    ThemeStyle,
}

impl ScannerKind {
    pub const ALL: [ScannerKind; 8] = [
        ScannerKind::PostTypes,
        ScannerKind::Taxonomies,
        ScannerKind::CustomFields,
        ScannerKind::Database,
        ScannerKind::Plugins,
        ScannerKind::Theme,
        ScannerKind::Security,
        ScannerKind::ThemeStyle,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ScannerKind::PostTypes => "post_types",
            ScannerKind::Taxonomies => "taxonomies",
            ScannerKind::CustomFields => "custom_fields",
            ScannerKind::Database => "database",
            ScannerKind::Plugins => "plugins",
            ScannerKind::Theme => "theme",
            ScannerKind::Security => "security",
            ScannerKind::ThemeStyle => "theme_style",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Construct the scanner for this kind
    pub fn build(self) -> Box<dyn Scanner> {
        match self {
            ScannerKind::PostTypes => Box::new(post_type::PostTypeScanner),
            ScannerKind::Taxonomies => Box::new(taxonomy::TaxonomyScanner),
            ScannerKind::CustomFields => Box::new(custom_fields::CustomFieldsScanner),
            ScannerKind::Database => Box::new(database::DatabaseScanner),
            ScannerKind::Plugins => Box::new(plugin::PluginScanner),
            ScannerKind::Theme => Box::new(theme::ThemeScanner),
            ScannerKind::Security => Box::new(security::SecurityScanner),
            ScannerKind::ThemeStyle => Box::new(crate::theme_style::ThemeStyleScanner),
        }
    }
}

/// All built-in scanners in registry order
pub fn registry() -> Vec<Box<dyn Scanner>> {
    ScannerKind::ALL.into_iter().map(ScannerKind::build).collect()
}

/// What a scanner gets to work with
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub site: &'a SiteSnapshot,
    pub cache: &'a CacheHandler,
    pub settings: &'a Settings,
}

impl<'a> ScanContext<'a> {
    pub fn new(site: &'a SiteSnapshot, cache: &'a CacheHandler, settings: &'a Settings) -> Self {
        Self {
            site,
            cache,
            settings,
        }
    }

    /// Cache key scoped to the scanned site, so two sites never share results
    pub fn cache_key(&self, base: &str) -> String {
        let digest = hex::encode(Sha256::digest(self.site.site.url.as_bytes()));
        format!("{}_{}", base, &digest[..12])
    }

    /// Memoized result, only consulted when caching is enabled
    pub fn get_cached_results<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.settings.enable_caching {
            return None;
        }
        self.cache.get_as(&self.cache_key(key))
    }

    pub fn set_cached_results<T: Serialize>(&self, key: &str, data: &T) -> bool {
        if !self.settings.enable_caching {
            return false;
        }
        self.cache
            .set_as(&self.cache_key(key), data, Some(self.settings.cache_duration))
    }
}

/// Timing and memory figures attached to every report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    /// Wall time in seconds
    pub execution_time: f64,
    /// Resident memory delta in bytes
    pub memory_used: i64,
    /// Peak resident memory in bytes
    pub peak_memory: u64,
}

/// Per-operation timers
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    running: HashMap<String, (Instant, u64)>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, operation: &str) {
        self.running
            .insert(operation.to_string(), (Instant::now(), resident_memory()));
    }

    /// Stop an operation's timer. Unknown operations report zeros.
    pub fn end(&mut self, operation: &str) -> PerformanceMetrics {
        let Some((started, start_memory)) = self.running.remove(operation) else {
            return PerformanceMetrics::default();
        };
        PerformanceMetrics {
            execution_time: started.elapsed().as_secs_f64(),
            memory_used: resident_memory() as i64 - start_memory as i64,
            peak_memory: peak_resident_memory(),
        }
    }
}

#[cfg(target_os = "linux")]
fn proc_status_kb(field: &str) -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status.lines().find_map(|line| {
                let rest = line.strip_prefix(field)?.strip_prefix(':')?;
                rest.split_whitespace().next()?.parse::<u64>().ok()
            })
        })
        .map_or(0, |kb| kb * 1024)
}

#[cfg(target_os = "linux")]
fn resident_memory() -> u64 {
    proc_status_kb("VmRSS")
}

#[cfg(target_os = "linux")]
fn peak_resident_memory() -> u64 {
    proc_status_kb("VmHWM")
}

#[cfg(not(target_os = "linux"))]
fn resident_memory() -> u64 {
    0
}

#[cfg(not(target_os = "linux"))]
fn peak_resident_memory() -> u64 {
    0
}

/// Process `items` in chunks of `batch_size`, concatenating the results
pub fn batch_process<T, R, F>(items: &[T], batch_size: usize, mut process: F) -> Vec<R>
where
    F: FnMut(&[T]) -> Vec<R>,
{
    items
        .chunks(batch_size.max(1))
        .flat_map(|chunk| process(chunk))
        .collect()
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").unwrap_or_else(|err| panic!("invalid TAG_RE regex: {err}"))
});

/// Strip markup and collapse whitespace in a text value
pub fn sanitize_text(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply [`sanitize_text`] to every string inside a report
pub fn sanitize_results(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_results).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_results(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Human readable byte size, e.g. `1.5 MB`
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut pow = 0;
    while pow < UNITS.len() - 1 && bytes >= 1u64 << (10 * (pow + 1)) {
        pow += 1;
    }

    let scaled = bytes as f64 / (1u64 << (10 * pow)) as f64;
    let rounded = format!("{:.*}", decimals, scaled);
    let trimmed = if rounded.contains('.') {
        rounded.trim_end_matches('0').trim_end_matches('.')
    } else {
        rounded.as_str()
    };
    format!("{} {}", trimmed, UNITS[pow])
}

/// Serialize a typed report into scanner output
pub(crate) fn to_output<T: Serialize>(report: &T) -> Result<Value> {
    Ok(serde_json::to_value(report)?)
}
