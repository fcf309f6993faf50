//! Terminal output for scan summaries, progress and cache records

use crate::error::{Error, Result};
use crate::orchestrator::{Progress, ScanEnvelope, ScanStatus, ScannerOutcome};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::str::FromStr;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table output
    #[default]
    Human,
    /// JSON output
    Json,
    /// No output (silent mode)
    None,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "none" => Ok(Self::None),
            _ => Err(Error::InvalidOutputFormat(s.to_string())),
        }
    }
}

/// Row order of the scan summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSort {
    /// Scanner registry order (default)
    #[default]
    Registry,
    /// Alphabetically by scanner name
    Name,
    /// Failed scanners first, then registry order
    Status,
}

impl FromStr for OutputSort {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "registry" => Ok(Self::Registry),
            "name" => Ok(Self::Name),
            "status" => Ok(Self::Status),
            _ => Err(Error::InvalidOutputSort(s.to_string())),
        }
    }
}

/// Configuration for output formatting
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub sort: OutputSort,
}

impl OutputConfig {
    pub fn new(format: OutputFormat, sort: OutputSort) -> Self {
        Self { format, sort }
    }
}

/// Print the outcome of a scan run
pub fn output_envelope<W: Write>(
    envelope: &ScanEnvelope,
    config: &OutputConfig,
    writer: &mut W,
) -> Result<()> {
    match config.format {
        OutputFormat::Human => output_envelope_human(envelope, config.sort, writer),
        OutputFormat::Json => output_json(envelope, writer),
        OutputFormat::None => Ok(()),
    }
}

/// Print the stored scan progress
pub fn output_progress<W: Write>(
    progress: &Progress,
    config: &OutputConfig,
    writer: &mut W,
) -> Result<()> {
    match config.format {
        OutputFormat::Human => {
            let status = match progress.status {
                ScanStatus::Idle => "idle",
                ScanStatus::Running => "running",
                ScanStatus::Complete => "complete",
            };
            let mut line = format!(
                "Status: {} ({}/{})",
                status, progress.current, progress.total
            );
            if !progress.message.is_empty() {
                line.push_str(&format!(" - {}", progress.message));
            }
            if let Some(seconds) = progress.execution_time {
                line.push_str(&format!(" in {:.2}s", seconds));
            }
            writeln!(writer, "{}", line).map_err(Error::OutputFailed)
        }
        OutputFormat::Json => output_json(progress, writer),
        OutputFormat::None => Ok(()),
    }
}

/// Print a flat record (cache stats, diagnostics) as a two-column table
pub fn output_record<T: Serialize, W: Write>(
    record: &T,
    config: &OutputConfig,
    writer: &mut W,
) -> Result<()> {
    match config.format {
        OutputFormat::Human => {
            let mut table = new_table(vec!["Key", "Value"]);
            let rows = serde_json::to_value(record)?;
            if let Value::Object(map) = rows {
                for (key, value) in map {
                    table.add_row(vec![Cell::new(key), Cell::new(display_value(&value))]);
                }
            }
            writeln!(writer, "{}", table).map_err(Error::OutputFailed)
        }
        OutputFormat::Json => output_json(record, writer),
        OutputFormat::None => Ok(()),
    }
}

fn output_json<T: Serialize, W: Write>(value: &T, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer).map_err(Error::OutputFailed)?;
    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold)),
        );
    table
}

fn output_envelope_human<W: Write>(
    envelope: &ScanEnvelope,
    sort: OutputSort,
    writer: &mut W,
) -> Result<()> {
    let site = &envelope.site;
    let name = if site.name.is_empty() { "-" } else { &site.name };
    writeln!(writer, "Site: {} {}", name, site.url).map_err(Error::OutputFailed)?;
    writeln!(
        writer,
        "Scanned: {} in {:.2}s",
        envelope.timestamp, envelope.execution_time
    )
    .map_err(Error::OutputFailed)?;

    let mut rows: Vec<(usize, &str, &ScannerOutcome)> = envelope
        .results
        .iter()
        .enumerate()
        .map(|(index, (id, outcome))| (index, id, outcome))
        .collect();

    match sort {
        OutputSort::Registry => {}
        OutputSort::Name => rows.sort_by(|a, b| a.1.cmp(b.1)),
        OutputSort::Status => {
            rows.sort_by_key(|(index, _, outcome)| {
                (!matches!(outcome, ScannerOutcome::Failed(_)), *index)
            });
        }
    }

    let mut table = new_table(vec!["Scanner", "Status", "Time", "Details"]);
    for (_, id, outcome) in rows {
        add_scanner_row(&mut table, id, outcome);
    }

    writeln!(writer, "{}", table).map_err(Error::OutputFailed)
}

fn add_scanner_row(table: &mut Table, id: &str, outcome: &ScannerOutcome) {
    let (status_cell, time, details) = match outcome {
        ScannerOutcome::Completed(output) => (
            Cell::new("Ok")
                .fg(Color::Green)
                .set_alignment(CellAlignment::Center),
            output
                .pointer("/performance_metrics/execution_time")
                .and_then(Value::as_f64)
                .map_or_else(|| "-".to_string(), |secs| format!("{:.3}s", secs)),
            details(id, output),
        ),
        ScannerOutcome::Failed(fault) => (
            Cell::new("Failed")
                .fg(Color::Red)
                .set_alignment(CellAlignment::Center),
            "-".to_string(),
            fault.error.clone(),
        ),
    };

    table.add_row(vec![
        Cell::new(id),
        status_cell,
        Cell::new(time).set_alignment(CellAlignment::Right),
        Cell::new(details),
    ]);
}

/// One-line highlight of a scanner's output
fn details(id: &str, output: &Value) -> String {
    let count = |pointer: &str| output.pointer(pointer).and_then(Value::as_u64).unwrap_or(0);
    let text = |pointer: &str| {
        output
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    };

    match id {
        "post_types" => format!(
            "{} post types ({} custom), {} posts",
            count("/statistics/total_post_types"),
            count("/statistics/custom_post_types"),
            count("/statistics/total_posts")
        ),
        "taxonomies" => format!(
            "{} taxonomies, {} terms",
            count("/statistics/total_taxonomies"),
            count("/statistics/total_terms")
        ),
        "custom_fields" => format!("{} meta keys", count("/summary/total_meta_keys")),
        "database" => format!(
            "{} tables ({} custom)",
            count("/tables/total_tables"),
            output
                .pointer("/tables/custom_tables")
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        ),
        "plugins" => format!(
            "{} plugins, {} active",
            count("/all_plugins/total"),
            count("/active_plugins/count")
        ),
        "theme" => format!(
            "{} {}",
            text("/active_theme/name"),
            text("/active_theme/version")
        ),
        "security" => format!("{} roles", count("/user_roles/total_roles")),
        "theme_style" => format!(
            "{} colors, {} fonts, {} CSS variables",
            count("/statistics/color_count"),
            count("/statistics/font_family_count"),
            count("/statistics/css_variable_count")
        ),
        _ => String::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
