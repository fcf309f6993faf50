//! Plugin scanner

use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, to_output};
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::site::PluginDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin file fragment → features it brings to the site
const KNOWN_INTEGRATIONS: &[(&str, &[&str])] = &[
    ("woocommerce", &["e-commerce", "products", "orders"]),
    ("elementor", &["page-builder", "visual-editor"]),
    ("acf", &["custom-fields", "meta-boxes"]),
    ("yoast", &["seo", "meta-tags"]),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginReport {
    pub active_plugins: ActivePlugins,
    pub all_plugins: AllPlugins,
    pub must_use_plugins: MustUsePlugins,
    pub plugin_dependencies: OrderedMap<Vec<String>>,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivePlugins {
    pub count: usize,
    pub plugins: Vec<ActivePlugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivePlugin {
    pub file: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllPlugins {
    pub total: usize,
    pub categorized: CategorizedPlugins,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizedPlugins {
    pub active: Vec<PluginSummary>,
    pub inactive: Vec<PluginSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSummary {
    pub file: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MustUsePlugins {
    pub count: usize,
    pub plugins: Vec<MustUsePlugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MustUsePlugin {
    pub name: String,
    pub version: String,
}

/// Reports installed, active and must-use plugins
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginScanner;

impl Scanner for PluginScanner {
    fn id(&self) -> &'static str {
        "plugins"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("plugin_scan");

        let (must_use, regular): (Vec<&PluginDef>, Vec<&PluginDef>) =
            ctx.site.plugins.iter().partition(|p| p.must_use);
        let active: Vec<&PluginDef> = regular.iter().copied().filter(|p| p.active).collect();

        let summary = |p: &&PluginDef| PluginSummary {
            file: p.file.clone(),
            name: p.name.clone(),
            version: p.version.clone(),
        };

        let report = PluginReport {
            active_plugins: ActivePlugins {
                count: active.len(),
                plugins: active
                    .iter()
                    .map(|p| ActivePlugin {
                        file: p.file.clone(),
                        name: p.name.clone(),
                        version: p.version.clone(),
                        author: p.author.clone(),
                        description: p.description.clone(),
                    })
                    .collect(),
            },
            all_plugins: AllPlugins {
                total: regular.len(),
                categorized: CategorizedPlugins {
                    active: active.iter().map(summary).collect(),
                    inactive: regular.iter().filter(|p| !p.active).map(summary).collect(),
                },
            },
            must_use_plugins: MustUsePlugins {
                count: must_use.len(),
                plugins: must_use
                    .iter()
                    .map(|p| MustUsePlugin {
                        name: p.name.clone(),
                        version: p.version.clone(),
                    })
                    .collect(),
            },
            plugin_dependencies: dependencies(&active),
            performance_metrics: monitor.end("plugin_scan"),
        };

        to_output(&report)
    }
}

fn dependencies(active: &[&PluginDef]) -> OrderedMap<Vec<String>> {
    let mut map = OrderedMap::new();
    for plugin in active {
        let file = plugin.file.to_lowercase();
        for (fragment, features) in KNOWN_INTEGRATIONS {
            if file.contains(fragment) {
                map.insert(
                    plugin.file.clone(),
                    features.iter().map(|f| f.to_string()).collect(),
                );
                break;
            }
        }
    }
    map
}
