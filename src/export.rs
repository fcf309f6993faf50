//! Downloadable exports of the latest scan

use crate::cache::CacheHandler;
use crate::config::ExportSettings;
use crate::error::{Error, Result};
use crate::format::{AiFormatter, MarkdownFormatter};
use crate::orchestrator::ScanEnvelope;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// The scan envelope as pretty-printed JSON
    #[default]
    Json,
    /// The Markdown site report
    Markdown,
    /// The JSON brief for AI assistants
    AiOptimized,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::AiOptimized => "ai_optimized",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Json | Self::AiOptimized => "application/json",
        }
    }

    /// Download file name for a given day
    pub fn filename(self, date: NaiveDate) -> String {
        let date = date.format("%Y-%m-%d");
        match self {
            Self::Json => format!("wp-site-analysis-{}.json", date),
            Self::Markdown => format!("wp-site-analysis-{}.md", date),
            Self::AiOptimized => format!("wp-site-analysis-ai-{}.json", date),
        }
    }

    fn enabled_in(self, settings: &ExportSettings) -> bool {
        match self {
            Self::Json => settings.json,
            Self::Markdown => settings.markdown,
            Self::AiOptimized => settings.ai_optimized,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "ai_optimized" | "ai" => Ok(Self::AiOptimized),
            _ => Err(Error::InvalidExportFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file ready to hand to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Download {
    pub content_type: &'static str,
    pub content_disposition: String,
    pub content_length: usize,
    pub body: String,
}

impl Download {
    fn new(format: ExportFormat, date: NaiveDate, body: String) -> Self {
        Self {
            content_type: format.content_type(),
            content_disposition: format!("attachment; filename=\"{}\"", format.filename(date)),
            content_length: body.len(),
            body,
        }
    }

    /// File name from the content disposition
    pub fn filename(&self) -> &str {
        self.content_disposition
            .split("filename=\"")
            .nth(1)
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or_default()
    }
}

/// Render an envelope in the requested format
pub fn render(envelope: &ScanEnvelope, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(envelope)?),
        ExportFormat::Markdown => Ok(MarkdownFormatter.format(envelope)),
        ExportFormat::AiOptimized => AiFormatter.format(envelope),
    }
}

/// Export the cached envelope. Nothing is produced unless a scan is cached.
pub fn export(
    cache: &CacheHandler,
    settings: &ExportSettings,
    format: ExportFormat,
    date: NaiveDate,
) -> Result<Download> {
    if !format.enabled_in(settings) {
        return Err(Error::ExportDisabled(format.to_string()));
    }
    let envelope = ScanEnvelope::load(cache).ok_or(Error::NoScanResults)?;
    let body = render(&envelope, format)?;
    tracing::info!(%format, bytes = body.len(), "exported scan results");
    Ok(Download::new(format, date, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{SCAN_RESULTS_KEY, ScannerOutcome};
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn export_without_scan_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let err = export(&cache, &ExportSettings::default(), ExportFormat::Json, day()).unwrap_err();
        assert!(matches!(err, Error::NoScanResults));
        assert_eq!(err.to_string(), "no scan results available");
    }

    #[test]
    fn json_export_has_download_headers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let mut envelope = ScanEnvelope::default();
        envelope
            .results
            .insert("plugins", ScannerOutcome::Completed(json!({"active_plugins": {"count": 0}})));
        assert!(cache.set_as(SCAN_RESULTS_KEY, &envelope, Some(3600)));

        let download = export(&cache, &ExportSettings::default(), ExportFormat::Json, day()).unwrap();
        assert_eq!(download.content_type, "application/json");
        assert_eq!(
            download.content_disposition,
            "attachment; filename=\"wp-site-analysis-2024-05-01.json\""
        );
        assert_eq!(download.filename(), "wp-site-analysis-2024-05-01.json");
        assert_eq!(download.content_length, download.body.len());
        let parsed: serde_json::Value = serde_json::from_str(&download.body).unwrap();
        assert_eq!(parsed["results"]["plugins"]["active_plugins"]["count"], 0);

        let markdown = export(&cache, &ExportSettings::default(), ExportFormat::Markdown, day()).unwrap();
        assert_eq!(markdown.content_type, "text/markdown");
        assert!(markdown.body.starts_with("# WordPress Site Analysis Report"));
    }

    #[test]
    fn disabled_formats_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = ExportSettings {
            ai_optimized: false,
            ..Default::default()
        };
        let err = export(&cache, &settings, ExportFormat::AiOptimized, day()).unwrap_err();
        assert!(matches!(err, Error::ExportDisabled(ref name) if name == "ai_optimized"));
    }

    #[test]
    fn formats_parse_by_name() {
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("AI_OPTIMIZED".parse::<ExportFormat>().unwrap(), ExportFormat::AiOptimized);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::AiOptimized.filename(day()), "wp-site-analysis-ai-2024-05-01.json");
    }
}
