//! Database table scanner

use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, format_bytes, to_output};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tables WordPress core creates, without prefix
const CORE_TABLES: &[&str] = &[
    "posts",
    "postmeta",
    "comments",
    "commentmeta",
    "terms",
    "term_taxonomy",
    "term_relationships",
    "termmeta",
    "users",
    "usermeta",
    "options",
    "links",
];

const MAX_SIZED_TABLES: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseReport {
    pub tables: TableListing,
    pub custom_tables: CustomTables,
    pub table_sizes: Vec<TableSize>,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableListing {
    pub wordpress_tables: Vec<String>,
    pub custom_tables: Vec<String>,
    pub total_tables: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTables {
    pub tables: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSize {
    pub name: String,
    pub size_mb: f64,
    pub size: String,
    pub rows: u64,
}

/// Lists database tables and their sizes
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseScanner;

impl Scanner for DatabaseScanner {
    fn id(&self) -> &'static str {
        "database"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("database_scan");

        let database = ctx
            .site
            .database
            .as_ref()
            .ok_or(Error::MissingData("database tables"))?;
        let prefix = database.prefix.as_str();

        let (wordpress_tables, other_tables): (Vec<String>, Vec<String>) = database
            .tables
            .iter()
            .map(|t| t.name.clone())
            .partition(|name| name.starts_with(prefix));

        let custom: Vec<String> = wordpress_tables
            .iter()
            .filter(|name| !CORE_TABLES.contains(&&name[prefix.len()..]))
            .cloned()
            .collect();

        let mut sized: Vec<_> = database
            .tables
            .iter()
            .filter(|t| t.name.starts_with(prefix))
            .collect();
        sized.sort_by(|a, b| b.size_mb.total_cmp(&a.size_mb));

        let report = DatabaseReport {
            tables: TableListing {
                total_tables: database.tables.len(),
                wordpress_tables,
                custom_tables: other_tables,
            },
            custom_tables: CustomTables {
                count: custom.len(),
                tables: custom,
            },
            table_sizes: sized
                .into_iter()
                .take(MAX_SIZED_TABLES)
                .map(|t| TableSize {
                    name: t.name.clone(),
                    size_mb: (t.size_mb * 100.0).round() / 100.0,
                    size: format_bytes((t.size_mb * 1024.0 * 1024.0) as u64, 2),
                    rows: t.rows,
                })
                .collect(),
            performance_metrics: monitor.end("database_scan"),
        };

        to_output(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheHandler;
    use crate::config::Settings;
    use crate::site::{DatabaseInfo, SiteSnapshot, TableInfo};

    fn table(name: &str, size_mb: f64) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            size_mb,
            rows: 10,
        }
    }

    #[test]
    fn splits_core_custom_and_foreign_tables() {
        let site = SiteSnapshot {
            database: Some(DatabaseInfo {
                prefix: "wp_".to_string(),
                tables: vec![
                    table("wp_posts", 2.0),
                    table("wp_options", 0.5),
                    table("wp_wc_orders", 8.25),
                    table("legacy_log", 30.0),
                ],
            }),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings::default();
        let value = DatabaseScanner
            .scan(&ScanContext::new(&site, &cache, &settings))
            .unwrap();
        let report: DatabaseReport = serde_json::from_value(value).unwrap();

        assert_eq!(report.tables.total_tables, 4);
        assert_eq!(report.tables.custom_tables, vec!["legacy_log"]);
        assert_eq!(report.custom_tables.tables, vec!["wp_wc_orders"]);
        assert_eq!(report.table_sizes[0].name, "wp_wc_orders");
        assert_eq!(report.table_sizes[0].size, "8.25 MB");
        assert_eq!(report.table_sizes.len(), 3);
    }

    #[test]
    fn missing_table_listing_is_a_fault() {
        let site = SiteSnapshot::default();
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings::default();
        let err = DatabaseScanner
            .scan(&ScanContext::new(&site, &cache, &settings))
            .unwrap_err();
        assert_eq!(err.to_string(), "missing site data: database tables");
    }
}
