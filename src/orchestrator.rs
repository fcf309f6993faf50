//! Scan orchestration
//!
//! Runs the selected scanners in registry order over one snapshot, isolating
//! scanner faults, recording progress in the option store and persisting the
//! resulting envelope.

use crate::cache::CacheHandler;
use crate::config::Settings;
use crate::options::{BACKUP_OPTION, LAST_SCAN_OPTION, OptionStore, PROGRESS_OPTION};
use crate::ordered::OrderedMap;
use crate::scanner::{ScanContext, Scanner, registry};
use crate::site::{SiteInfo, SiteSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Cache key of the latest envelope
pub const SCAN_RESULTS_KEY: &str = "scan_results";

/// How long the latest envelope stays in the cache, in seconds
pub const SCAN_RESULTS_TTL: u64 = 3600;

/// Local time format of envelope timestamps and the last-scan record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn current_time() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Running,
    Complete,
}

/// Progress of the running (or last) scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub status: ScanStatus,
    pub current: usize,
    pub total: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl Progress {
    fn running(current: usize, total: usize, message: String) -> Self {
        Self {
            status: ScanStatus::Running,
            current,
            total,
            message,
            execution_time: None,
        }
    }

    /// Stored progress, or the idle record when no scan has run
    pub fn load(options: &OptionStore) -> Self {
        options.get(PROGRESS_OPTION).unwrap_or_default()
    }
}

/// A scanner fault, recorded in place of its output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanFault {
    pub error: String,
}

/// What one scanner contributed to an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScannerOutcome {
    Failed(ScanFault),
    Completed(Value),
}

/// Aggregated result of one scan run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanEnvelope {
    pub results: OrderedMap<ScannerOutcome>,
    pub execution_time: f64,
    pub timestamp: String,
    pub site: SiteInfo,
}

impl ScanEnvelope {
    /// Output of a scanner that completed
    pub fn output(&self, scanner: &str) -> Option<&Value> {
        match self.results.get(scanner)? {
            ScannerOutcome::Completed(value) => Some(value),
            ScannerOutcome::Failed(_) => None,
        }
    }

    /// Output of a completed scanner read back into its report type
    pub fn report<T: DeserializeOwned>(&self, scanner: &str) -> Option<T> {
        let value = self.output(scanner)?;
        match serde_json::from_value(value.clone()) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("unreadable {} output: {}", scanner, e);
                None
            }
        }
    }

    /// Failed scanners and their messages, in registry order
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|(name, outcome)| match outcome {
            ScannerOutcome::Failed(fault) => Some((name, fault.error.as_str())),
            ScannerOutcome::Completed(_) => None,
        })
    }

    /// Latest envelope from the cache
    pub fn load(cache: &CacheHandler) -> Option<Self> {
        cache.get_as(SCAN_RESULTS_KEY)
    }
}

/// Runs scanners and persists their envelope
pub struct Orchestrator<'a> {
    scanners: Vec<Box<dyn Scanner>>,
    cache: &'a CacheHandler,
    options: &'a OptionStore,
    settings: &'a Settings,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator over the built-in scanner registry
    pub fn new(cache: &'a CacheHandler, options: &'a OptionStore, settings: &'a Settings) -> Self {
        Self::with_scanners(registry(), cache, options, settings)
    }

    pub fn with_scanners(
        scanners: Vec<Box<dyn Scanner>>,
        cache: &'a CacheHandler,
        options: &'a OptionStore,
        settings: &'a Settings,
    ) -> Self {
        Self {
            scanners,
            cache,
            options,
            settings,
        }
    }

    /// Scanner ids in run order
    pub fn scanner_ids(&self) -> Vec<&'static str> {
        self.scanners.iter().map(|s| s.id()).collect()
    }

    fn record_progress(&self, progress: &Progress) {
        if let Err(e) = self.options.update(PROGRESS_OPTION, progress) {
            tracing::warn!("could not record scan progress: {}", e);
        }
    }

    /// Run the scanners named in `only` (all when empty; unknown names are
    /// ignored) and persist the envelope.
    pub fn run(&self, site: &SiteSnapshot, only: &[String]) -> ScanEnvelope {
        let started = Instant::now();
        let known = self.scanner_ids();
        for name in only.iter().filter(|name| !known.contains(&name.as_str())) {
            tracing::warn!("ignoring unknown scanner {:?}", name);
        }
        let selected: Vec<&dyn Scanner> = self
            .scanners
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| only.is_empty() || only.iter().any(|name| name == s.id()))
            .collect();
        let total = selected.len();

        self.record_progress(&Progress::running(0, total, "Starting scan...".to_string()));

        let ctx = ScanContext::new(site, self.cache, self.settings);
        let mut results = OrderedMap::new();
        for (current, scanner) in selected.into_iter().enumerate() {
            let id = scanner.id();
            self.record_progress(&Progress::running(current, total, format!("Running {}...", id)));

            tracing::info!("running {} scanner", id);
            let outcome = match scanner.scan(&ctx) {
                Ok(output) => ScannerOutcome::Completed(output),
                Err(e) => {
                    tracing::warn!("{} scanner failed: {}", id, e);
                    ScannerOutcome::Failed(ScanFault {
                        error: e.to_string(),
                    })
                }
            };
            results.insert(id, outcome);
        }

        let execution_time = started.elapsed().as_secs_f64();
        self.record_progress(&Progress {
            status: ScanStatus::Complete,
            current: total,
            total,
            message: "Scan complete!".to_string(),
            execution_time: Some(execution_time),
        });

        let envelope = ScanEnvelope {
            results,
            execution_time,
            timestamp: current_time(),
            site: site.site.clone(),
        };

        if !self
            .cache
            .set_as(SCAN_RESULTS_KEY, &envelope, Some(SCAN_RESULTS_TTL))
        {
            tracing::warn!("scan results were not cached");
        }
        if let Err(e) = self.options.update(BACKUP_OPTION, &envelope) {
            tracing::warn!("could not store scan results backup: {}", e);
        }
        if let Err(e) = self.options.update(LAST_SCAN_OPTION, &envelope.timestamp) {
            tracing::warn!("could not record last scan time: {}", e);
        }

        tracing::info!(
            "scan finished in {:.2}s ({} scanner(s))",
            execution_time,
            envelope.results.len()
        );
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::scanner::ScannerKind;
    use serde_json::json;

    struct Fixed(&'static str);

    impl Scanner for Fixed {
        fn id(&self) -> &'static str {
            self.0
        }

        fn scan(&self, _ctx: &ScanContext<'_>) -> Result<Value> {
            Ok(json!({"name": self.0}))
        }
    }

    struct Broken;

    impl Scanner for Broken {
        fn id(&self) -> &'static str {
            "broken"
        }

        fn scan(&self, _ctx: &ScanContext<'_>) -> Result<Value> {
            Err(Error::MissingData("database tables"))
        }
    }

    fn stores(dir: &std::path::Path) -> (CacheHandler, OptionStore) {
        (CacheHandler::new(dir), OptionStore::new(dir))
    }

    #[test]
    fn failing_scanner_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, options) = stores(dir.path());
        let settings = Settings::default();
        let orchestrator = Orchestrator::with_scanners(
            vec![Box::new(Fixed("first")), Box::new(Broken), Box::new(Fixed("third"))],
            &cache,
            &options,
            &settings,
        );

        let envelope = orchestrator.run(&SiteSnapshot::default(), &[]);

        assert_eq!(
            envelope.results.keys().collect::<Vec<_>>(),
            vec!["first", "broken", "third"]
        );
        assert_eq!(envelope.output("first"), Some(&json!({"name": "first"})));
        assert_eq!(envelope.output("third"), Some(&json!({"name": "third"})));
        assert_eq!(
            serde_json::to_value(envelope.results.get("broken").unwrap()).unwrap(),
            json!({"error": "missing site data: database tables"})
        );

        let progress = Progress::load(&options);
        assert_eq!(progress.status, ScanStatus::Complete);
        assert_eq!(progress.current, 3);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.message, "Scan complete!");
        assert!(progress.execution_time.is_some());
    }

    #[test]
    fn envelope_is_cached_and_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, options) = stores(dir.path());
        let settings = Settings::default();
        let orchestrator = Orchestrator::with_scanners(
            vec![Box::new(Fixed("first")), Box::new(Broken)],
            &cache,
            &options,
            &settings,
        );

        let envelope = orchestrator.run(&SiteSnapshot::default(), &[]);

        let cached = ScanEnvelope::load(&cache).unwrap();
        assert_eq!(cached.results, envelope.results);
        assert_eq!(cached.timestamp, envelope.timestamp);
        assert_eq!(cached.errors().collect::<Vec<_>>(), vec![(
            "broken",
            "missing site data: database tables"
        )]);
        let backup: ScanEnvelope = options.get(BACKUP_OPTION).unwrap();
        assert_eq!(backup.results, envelope.results);
        assert_eq!(
            options.get::<String>(LAST_SCAN_OPTION),
            Some(envelope.timestamp.clone())
        );
    }

    #[test]
    fn allow_list_filters_and_ignores_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, options) = stores(dir.path());
        let settings = Settings::default();
        let orchestrator = Orchestrator::with_scanners(
            vec![Box::new(Fixed("first")), Box::new(Fixed("second"))],
            &cache,
            &options,
            &settings,
        );

        let only = vec!["second".to_string(), "nonexistent".to_string()];
        let envelope = orchestrator.run(&SiteSnapshot::default(), &only);
        assert_eq!(envelope.results.keys().collect::<Vec<_>>(), vec!["second"]);
        assert_eq!(Progress::load(&options).total, 1);
    }

    #[test]
    fn registry_ids_follow_scanner_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, options) = stores(dir.path());
        let settings = Settings::default();
        let orchestrator = Orchestrator::new(&cache, &options, &settings);
        let expected: Vec<&str> = ScannerKind::ALL.into_iter().map(ScannerKind::id).collect();
        assert_eq!(orchestrator.scanner_ids(), expected);
        assert_eq!(orchestrator.scanner_ids()[0], "post_types");
        assert_eq!(orchestrator.scanner_ids()[7], "theme_style");
    }

    #[test]
    fn completed_output_with_error_field_is_not_a_fault() {
        let outcome: ScannerOutcome =
            serde_json::from_value(json!({"error": "x", "performance_metrics": {}})).unwrap();
        assert!(matches!(outcome, ScannerOutcome::Completed(_)));
    }

    #[test]
    fn idle_progress_when_nothing_ran() {
        let dir = tempfile::tempdir().unwrap();
        let options = OptionStore::new(dir.path());
        assert_eq!(Progress::load(&options), Progress::default());
        assert_eq!(
            serde_json::to_value(Progress::default()).unwrap(),
            json!({"status": "idle", "current": 0, "total": 0, "message": ""})
        );
    }

    #[test]
    fn full_registry_runs_over_an_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, options) = stores(dir.path());
        let settings = Settings::default();
        let envelope = Orchestrator::new(&cache, &options, &settings).run(&SiteSnapshot::default(), &[]);

        assert_eq!(envelope.results.len(), 8);
        let failed: Vec<_> = envelope.errors().map(|(name, _)| name).collect();
        assert_eq!(failed, vec!["database", "theme", "theme_style"]);
        assert!(envelope.output("post_types").is_some());
    }
}
