//! WP Site Analyzer - architecture reports for WordPress sites
//!
//! Collects a [`SiteSnapshot`] of a WordPress site (REST API, local theme
//! directory, or a saved snapshot file), runs the scanners over it and
//! turns the aggregated [`ScanEnvelope`] into Markdown, HTML or a JSON brief
//! for AI assistants.
//!
//! # Example
//!
//! ```no_run
//! use wp_site_analyzer::{
//!     CacheHandler, MarkdownFormatter, OptionStore, Orchestrator, RemoteCollector, Settings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> wp_site_analyzer::Result<()> {
//!     let settings = Settings::default();
//!     let data_dir = settings.data_dir();
//!     let cache = CacheHandler::new(&data_dir);
//!     let options = OptionStore::new(&data_dir);
//!
//!     let snapshot = RemoteCollector::new("https://example.com")?.collect().await?;
//!     let envelope = Orchestrator::new(&cache, &options, &settings).run(&snapshot, &[]);
//!     println!("{}", MarkdownFormatter.format(&envelope));
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod cache;
pub mod collect;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod options;
pub mod orchestrator;
pub mod ordered;
pub mod output;
pub mod render;
pub mod scanner;
pub mod site;
pub mod theme_style;

pub use admin::{AdminAction, AdminResponse, AdminService, CacheDiagnostics, Caller};
pub use cache::{CacheHandler, CacheStats};
pub use collect::{LocalCollector, RemoteCollector, RemoteCollectorBuilder};
pub use config::Settings;
pub use error::{Error, Result};
pub use export::{Download, ExportFormat};
pub use format::{AiFormatter, MarkdownFormatter, ThemeStyleFormatter};
pub use options::OptionStore;
pub use orchestrator::{Orchestrator, Progress, ScanEnvelope, ScanStatus, ScannerOutcome};
pub use ordered::OrderedMap;
pub use output::{OutputConfig, OutputFormat, OutputSort};
pub use render::markdown_to_html;
pub use scanner::{Scanner, ScannerKind};
pub use site::SiteSnapshot;
