//! Administrative actions
//!
//! Every action is gated by a nonce minted for [`NONCE_ACTION`] and by the
//! `manage_options` capability. The CLI is the only driver; nothing here
//! knows about a transport.

use crate::cache::{CacheHandler, CacheStats};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::export::{self, Download, ExportFormat};
use crate::format::MarkdownFormatter;
use crate::options::{LAST_SCAN_OPTION, OptionStore, PROGRESS_OPTION};
use crate::orchestrator::{Orchestrator, Progress, SCAN_RESULTS_KEY, ScanEnvelope, current_time};
use crate::render::markdown_to_html;
use crate::site::SiteSnapshot;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Action name every nonce is minted for
pub const NONCE_ACTION: &str = "wp_site_analyzer_scan";

/// Capability required for every action
pub const REQUIRED_CAPABILITY: &str = "manage_options";

/// A nonce stays valid for one to two ticks of this many seconds
const NONCE_TICK_SECS: i64 = 12 * 60 * 60;

const NONCE_LEN: usize = 10;

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: String,
    pub capabilities: Vec<String>,
}

impl Caller {
    /// A caller holding `manage_options`
    pub fn administrator(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            capabilities: vec![REQUIRED_CAPABILITY.to_string()],
        }
    }

    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[derive(Debug, Clone)]
pub enum AdminAction {
    /// Run the selected scanners (all when empty) over a snapshot
    Scan {
        site: Box<SiteSnapshot>,
        scanners: Vec<String>,
    },
    Progress,
    Export {
        format: ExportFormat,
    },
    ClearCache,
    CacheDiagnostics,
    /// The Markdown report rendered to HTML
    Report,
}

#[derive(Debug, Clone)]
pub enum AdminResponse {
    Scan(Box<ScanEnvelope>),
    Progress(Progress),
    Download(Download),
    Message(String),
    Diagnostics(Box<CacheDiagnostics>),
    Html(String),
}

/// State of the cached envelope and scan records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheDiagnostics {
    pub cache_handler_result: &'static str,
    pub transient_exists: bool,
    pub transient_key: String,
    pub cached_data_structure: Option<Vec<String>>,
    pub results_exist: bool,
    pub results_count: usize,
    pub last_scan: Option<String>,
    pub scan_progress: Option<Progress>,
    pub current_time: String,
    pub cache_stats: CacheStats,
}

fn nonce_tick(timestamp: i64) -> i64 {
    timestamp.div_euclid(NONCE_TICK_SECS) + 1
}

fn nonce_for_tick(secret: &str, action: &str, user: &str, tick: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"|");
    hasher.update(action.as_bytes());
    hasher.update(b"|");
    hasher.update(user.as_bytes());
    hasher.update(b"|");
    hasher.update(tick.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..NONCE_LEN].to_string()
}

/// Mint a nonce for `user` at unix time `timestamp`
pub fn create_nonce(secret: &str, user: &str, timestamp: i64) -> String {
    nonce_for_tick(secret, NONCE_ACTION, user, nonce_tick(timestamp))
}

/// Accepts nonces from the current or the previous tick
pub fn verify_nonce(secret: &str, user: &str, nonce: &str, timestamp: i64) -> bool {
    let tick = nonce_tick(timestamp);
    [tick, tick - 1]
        .into_iter()
        .any(|t| nonce_for_tick(secret, NONCE_ACTION, user, t) == nonce)
}

/// Executes admin actions against the cache and option store
pub struct AdminService<'a> {
    cache: &'a CacheHandler,
    options: &'a OptionStore,
    settings: &'a Settings,
}

impl<'a> AdminService<'a> {
    pub fn new(cache: &'a CacheHandler, options: &'a OptionStore, settings: &'a Settings) -> Self {
        Self {
            cache,
            options,
            settings,
        }
    }

    /// Nonce for the configured operator, valid now
    pub fn mint_nonce(&self, user: &str) -> String {
        create_nonce(&self.settings.admin.secret, user, chrono::Utc::now().timestamp())
    }

    fn authorize(&self, caller: &Caller, nonce: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        if !verify_nonce(&self.settings.admin.secret, &caller.user, nonce, now) {
            tracing::warn!(user = %caller.user, "rejected admin action: bad nonce");
            return Err(Error::InvalidToken);
        }
        if !caller.can(REQUIRED_CAPABILITY) {
            tracing::warn!(user = %caller.user, "rejected admin action: missing capability");
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    pub fn handle(&self, caller: &Caller, nonce: &str, action: AdminAction) -> Result<AdminResponse> {
        self.authorize(caller, nonce)?;

        match action {
            AdminAction::Scan { site, scanners } => {
                let orchestrator = Orchestrator::new(self.cache, self.options, self.settings);
                let envelope = orchestrator.run(&site, &scanners);
                Ok(AdminResponse::Scan(Box::new(envelope)))
            }
            AdminAction::Progress => Ok(AdminResponse::Progress(Progress::load(self.options))),
            AdminAction::Export { format } => {
                let today = chrono::Local::now().date_naive();
                let download = export::export(self.cache, &self.settings.export, format, today)?;
                Ok(AdminResponse::Download(download))
            }
            AdminAction::ClearCache => {
                self.clear_cache();
                Ok(AdminResponse::Message("Cache cleared successfully".to_string()))
            }
            AdminAction::CacheDiagnostics => {
                Ok(AdminResponse::Diagnostics(Box::new(self.diagnostics())))
            }
            AdminAction::Report => {
                let envelope = ScanEnvelope::load(self.cache).ok_or(Error::NoScanResults)?;
                let markdown = MarkdownFormatter.format(&envelope);
                Ok(AdminResponse::Html(markdown_to_html(&markdown)))
            }
        }
    }

    /// Drops the stored envelope, every scanner memo and the progress record
    fn clear_cache(&self) {
        self.cache.clear_all();
        self.options.delete(PROGRESS_OPTION);
        self.options.delete(LAST_SCAN_OPTION);
        tracing::info!("cleared cached scan results and scanner memos");
    }

    fn diagnostics(&self) -> CacheDiagnostics {
        let cached = self.cache.get(SCAN_RESULTS_KEY);
        let cached_data_structure = cached.as_ref().and_then(Value::as_object).map(|object| {
            object.keys().cloned().collect::<Vec<_>>()
        });
        let results = cached
            .as_ref()
            .and_then(|value| value.get("results"))
            .and_then(Value::as_object);

        CacheDiagnostics {
            cache_handler_result: if cached.is_some() {
                "Found cached results"
            } else {
                "No cached results"
            },
            transient_exists: self.cache.transient_exists(SCAN_RESULTS_KEY),
            transient_key: CacheHandler::transient_name(SCAN_RESULTS_KEY),
            cached_data_structure,
            results_exist: results.is_some(),
            results_count: results.map_or(0, |r| r.len()),
            last_scan: self.options.get(LAST_SCAN_OPTION),
            scan_progress: self.options.get(PROGRESS_OPTION),
            current_time: current_time(),
            cache_stats: self.cache.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ScanStatus;
    use std::path::Path;

    struct Fixture {
        _dir: tempfile::TempDir,
        cache: CacheHandler,
        options: OptionStore,
        settings: Settings,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path: &Path = dir.path();
        Fixture {
            cache: CacheHandler::new(path),
            options: OptionStore::new(path),
            settings: Settings::default(),
            _dir: dir,
        }
    }

    #[test]
    fn nonces_expire_after_two_ticks() {
        let now = 1_700_000_000;
        let nonce = create_nonce("s3cret", "admin", now);
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(verify_nonce("s3cret", "admin", &nonce, now));
        assert!(verify_nonce("s3cret", "admin", &nonce, now + NONCE_TICK_SECS));
        assert!(!verify_nonce("s3cret", "admin", &nonce, now + 2 * NONCE_TICK_SECS));
        assert!(!verify_nonce("s3cret", "editor", &nonce, now));
        assert!(!verify_nonce("other", "admin", &nonce, now));
    }

    #[test]
    fn bad_nonce_and_missing_capability_are_rejected() {
        let f = fixture();
        let service = AdminService::new(&f.cache, &f.options, &f.settings);

        let admin = Caller::administrator("admin");
        let err = service
            .handle(&admin, "0000000000", AdminAction::Progress)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToken));

        let editor = Caller {
            user: "editor".to_string(),
            capabilities: vec!["edit_posts".to_string()],
        };
        let nonce = service.mint_nonce("editor");
        let err = service.handle(&editor, &nonce, AdminAction::Progress).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn scan_then_export_and_clear() {
        let f = fixture();
        let service = AdminService::new(&f.cache, &f.options, &f.settings);
        let admin = Caller::administrator("admin");
        let nonce = service.mint_nonce("admin");

        let export = AdminAction::Export {
            format: ExportFormat::Json,
        };
        let err = service.handle(&admin, &nonce, export.clone()).unwrap_err();
        assert!(matches!(err, Error::NoScanResults));

        let scan = AdminAction::Scan {
            site: Box::default(),
            scanners: vec!["plugins".to_string()],
        };
        let AdminResponse::Scan(envelope) = service.handle(&admin, &nonce, scan).unwrap() else {
            panic!("expected scan response");
        };
        assert!(envelope.output("plugins").is_some());

        let AdminResponse::Progress(progress) =
            service.handle(&admin, &nonce, AdminAction::Progress).unwrap()
        else {
            panic!("expected progress response");
        };
        assert_eq!(progress.status, ScanStatus::Complete);

        let AdminResponse::Download(download) = service.handle(&admin, &nonce, export).unwrap() else {
            panic!("expected download response");
        };
        assert!(download.body.contains("\"plugins\""));

        let AdminResponse::Html(html) = service.handle(&admin, &nonce, AdminAction::Report).unwrap()
        else {
            panic!("expected report response");
        };
        assert!(html.starts_with("<article class=\"ai-report-content\"><h1"));

        let AdminResponse::Diagnostics(diag) = service
            .handle(&admin, &nonce, AdminAction::CacheDiagnostics)
            .unwrap()
        else {
            panic!("expected diagnostics response");
        };
        assert_eq!(diag.cache_handler_result, "Found cached results");
        assert!(diag.transient_exists);
        assert_eq!(diag.results_count, 1);
        assert!(diag.last_scan.is_some());

        let AdminResponse::Message(message) =
            service.handle(&admin, &nonce, AdminAction::ClearCache).unwrap()
        else {
            panic!("expected message response");
        };
        assert_eq!(message, "Cache cleared successfully");
        assert!(ScanEnvelope::load(&f.cache).is_none());
        assert_eq!(Progress::load(&f.options), Progress::default());
        assert_eq!(f.options.get::<String>(LAST_SCAN_OPTION), None);
    }

    #[test]
    fn rescan_after_clearing_sees_the_changed_site() {
        let f = fixture();
        let service = AdminService::new(&f.cache, &f.options, &f.settings);
        let admin = Caller::administrator("admin");
        let nonce = service.mint_nonce("admin");

        let post_type = |name: &str| crate::site::PostTypeDef {
            name: name.to_string(),
            public: true,
            ..Default::default()
        };
        let mut site = SiteSnapshot::default();
        site.site.url = "https://shop.example.com".to_string();
        site.post_types = vec![post_type("post"), post_type("book")];

        let scan_post_types = |site: &SiteSnapshot| -> Value {
            let action = AdminAction::Scan {
                site: Box::new(site.clone()),
                scanners: vec!["post_types".to_string()],
            };
            let AdminResponse::Scan(envelope) = service.handle(&admin, &nonce, action).unwrap()
            else {
                panic!("expected scan response");
            };
            envelope.output("post_types").unwrap()["post_types"].clone()
        };

        assert!(scan_post_types(&site).get("book").is_some());

        site.post_types.pop();
        // Without clearing, the memo still answers for the unchanged site URL
        assert!(scan_post_types(&site).get("book").is_some());

        service.handle(&admin, &nonce, AdminAction::ClearCache).unwrap();
        let rescanned = scan_post_types(&site);
        assert!(rescanned.get("post").is_some());
        assert!(rescanned.get("book").is_none());
    }
}
