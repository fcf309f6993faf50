//! Markdown site report

use super::{GENERATOR, ThemeStyleFormatter, number_format, yes_no};
use crate::orchestrator::ScanEnvelope;
use crate::scanner::custom_fields::CustomFieldsReport;
use crate::scanner::plugin::PluginReport;
use crate::scanner::post_type::PostTypeReport;
use crate::scanner::taxonomy::TaxonomyReport;
use crate::scanner::theme::ThemeReport;
use crate::theme_style::ThemeStyleReport;
use chrono::NaiveDateTime;

/// Custom field rows shown per post type before the list is cut short
const MAX_FIELD_ROWS: usize = 5;

const SECTIONS: [(&str, &str); 7] = [
    ("summary", "Executive Summary"),
    ("post-types", "Post Types"),
    ("taxonomies", "Taxonomies"),
    ("custom-fields", "Custom Fields"),
    ("plugins", "Plugins"),
    ("theme", "Theme"),
    ("theme-styles", "Theme Styles & Design"),
];

/// Renders a scan envelope as a Markdown report
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn format(&self, envelope: &ScanEnvelope) -> String {
        self.format_at(envelope, chrono::Local::now().naive_local())
    }

    /// Same as [`format`](Self::format) with a fixed generation time
    pub fn format_at(&self, envelope: &ScanEnvelope, generated: NaiveDateTime) -> String {
        let post_types = envelope.report::<PostTypeReport>("post_types");
        let taxonomies = envelope.report::<TaxonomyReport>("taxonomies");

        let mut out = header(envelope, generated);
        out.push_str(&table_of_contents());
        out.push_str(&summary(post_types.as_ref(), taxonomies.as_ref()));

        if let Some(report) = &post_types {
            out.push_str(&format_post_types(report));
        }
        if let Some(report) = &taxonomies {
            out.push_str(&format_taxonomies(report));
        }
        if let Some(report) = envelope.report::<CustomFieldsReport>("custom_fields") {
            out.push_str(&format_custom_fields(&report));
        }
        if let Some(report) = envelope.report::<PluginReport>("plugins") {
            out.push_str(&format_plugins(&report));
        }
        if let Some(report) = envelope.report::<ThemeReport>("theme") {
            out.push_str(&format_theme(&report));
        }
        if let Some(report) = envelope.report::<ThemeStyleReport>("theme_style") {
            out.push_str(&format_theme_styles(&report, generated));
        }
        out.push_str(&scanner_errors(envelope));
        out.push_str(&footer(generated));
        out
    }
}

fn header(envelope: &ScanEnvelope, generated: NaiveDateTime) -> String {
    let site = &envelope.site;
    let mut out = String::from("# WordPress Site Analysis Report\n\n");
    out.push_str(&format!("**Site:** {}\n", site.name));
    out.push_str(&format!("**URL:** {}\n", site.url));
    out.push_str(&format!("**Generated:** {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!(
        "**WordPress Version:** {}\n",
        site.wordpress_version.as_deref().unwrap_or("Unknown")
    ));
    if let Some(php) = &site.php_version {
        out.push_str(&format!("**PHP Version:** {}\n", php));
    }
    out.push_str("\n---\n\n");
    out
}

fn table_of_contents() -> String {
    let mut out = String::from("## Table of Contents\n\n");
    for (anchor, title) in SECTIONS {
        out.push_str(&format!("- [{}](#{})\n", title, anchor));
    }
    out.push_str("\n---\n\n");
    out
}

fn summary(post_types: Option<&PostTypeReport>, taxonomies: Option<&TaxonomyReport>) -> String {
    let mut out = String::from("## Executive Summary {#summary}\n\n");
    if let Some(report) = post_types {
        let stats = &report.statistics;
        out.push_str("### Content Statistics\n\n");
        out.push_str(&format!("- **Total Post Types:** {}\n", stats.total_post_types));
        out.push_str(&format!("- **Custom Post Types:** {}\n", stats.custom_post_types));
        out.push_str(&format!("- **Total Posts:** {}\n", number_format(stats.total_posts)));
        out.push_str(&format!(
            "- **Total Meta Entries:** {}\n\n",
            number_format(stats.total_meta_entries)
        ));
    }
    if let Some(report) = taxonomies {
        let stats = &report.statistics;
        out.push_str("### Taxonomy Statistics\n\n");
        out.push_str(&format!("- **Total Taxonomies:** {}\n", stats.total_taxonomies));
        out.push_str(&format!("- **Custom Taxonomies:** {}\n", stats.custom_taxonomies));
        out.push_str(&format!(
            "- **Total Terms:** {}\n\n",
            number_format(stats.total_terms as u64)
        ));
    }
    out.push_str("---\n\n");
    out
}

fn description(text: &str) -> &str {
    if text.is_empty() {
        "No description provided"
    } else {
        text
    }
}

fn kind_label(builtin: bool) -> &'static str {
    if builtin { "Built-in" } else { "Custom" }
}

fn format_post_types(report: &PostTypeReport) -> String {
    let mut out = String::from("## Post Types {#post-types}\n\n");
    if report.post_types.is_empty() {
        out.push_str("No post type data available.\n\n");
        return out;
    }

    for (name, info) in report.post_types.iter() {
        out.push_str(&format!("### {} (`{}`)\n\n", info.label, name));
        out.push_str(&format!("**Description:** {}\n\n", description(&info.description)));
        out.push_str(&format!("**Type:** {}\n", kind_label(info.builtin)));
        out.push_str(&format!("**Count:** {} items\n", number_format(info.count)));
        out.push_str(&format!("**Public:** {}\n", yes_no(info.public)));
        out.push_str(&format!("**Hierarchical:** {}\n", yes_no(info.hierarchical)));
        if info.show_in_rest {
            out.push_str(&format!(
                "**REST API:** Enabled (base: `{}`)\n",
                info.rest_base.as_deref().filter(|b| !b.is_empty()).unwrap_or(name)
            ));
        }

        if !info.supports.is_empty() {
            out.push_str("\n**Supports:**\n");
            for feature in &info.supports {
                out.push_str(&format!("- {}\n", feature));
            }
        }
        if !info.taxonomies.is_empty() {
            out.push_str("\n**Taxonomies:**\n");
            for taxonomy in &info.taxonomies {
                out.push_str(&format!("- {}\n", taxonomy));
            }
        }

        if !info.meta_fields.is_empty() {
            let total = info.meta_fields.len();
            out.push_str(&format!("\n**Custom Fields:** {} fields detected\n", total));
            out.push_str("\n<details>\n<summary>View custom fields</summary>\n\n");
            out.push_str("| Field Key | Type | Usage Count |\n");
            out.push_str("|-----------|------|-------------|\n");
            for field in info.meta_fields.iter().take(MAX_FIELD_ROWS) {
                out.push_str(&format!(
                    "| `{}` | {} | {} |\n",
                    field.key, field.kind, field.usage_count
                ));
            }
            if total > MAX_FIELD_ROWS {
                out.push_str(&format!(
                    "\n*... and {} more fields*\n",
                    total - MAX_FIELD_ROWS
                ));
            }
            out.push_str("\n</details>\n");
        }

        out.push_str("\n---\n\n");
    }
    out
}

fn format_taxonomies(report: &TaxonomyReport) -> String {
    let mut out = String::from("## Taxonomies {#taxonomies}\n\n");
    if report.taxonomies.is_empty() {
        out.push_str("No taxonomy data available.\n\n");
        return out;
    }

    for (name, info) in report.taxonomies.iter() {
        out.push_str(&format!("### {} (`{}`)\n\n", info.label, name));
        out.push_str(&format!("**Description:** {}\n\n", description(&info.description)));
        out.push_str(&format!("**Type:** {}\n", kind_label(info.builtin)));
        out.push_str(&format!("**Terms:** {}\n", number_format(info.term_count as u64)));
        out.push_str(&format!("**Hierarchical:** {}\n", yes_no(info.hierarchical)));
        if !info.object_type.is_empty() {
            let applies: Vec<String> = info.object_type.iter().map(|pt| format!("`{}`", pt)).collect();
            out.push_str(&format!("**Applies to:** {}\n", applies.join(", ")));
        }
        if info.show_in_rest {
            out.push_str(&format!(
                "**REST API:** Enabled (base: `{}`)\n",
                info.rest_base.as_deref().filter(|b| !b.is_empty()).unwrap_or(name)
            ));
        }
        if !info.usage_stats.most_used_terms.is_empty() {
            out.push_str("\n**Most Used Terms:**\n");
            for term in &info.usage_stats.most_used_terms {
                out.push_str(&format!("- {} ({} posts)\n", term.name, term.count));
            }
        }
        out.push_str("\n---\n\n");
    }
    out
}

fn format_custom_fields(report: &CustomFieldsReport) -> String {
    let mut out = String::from("## Custom Fields {#custom-fields}\n\n");
    let summary = &report.summary;
    out.push_str("### Summary\n\n");
    out.push_str(&format!("- **Total Meta Keys:** {}\n", summary.total_meta_keys));
    out.push_str(&format!("- **Post Meta Keys:** {}\n", summary.post_meta_keys));
    out.push_str(&format!("- **Term Meta Keys:** {}\n", summary.term_meta_keys));
    out.push_str(&format!("- **User Meta Keys:** {}\n\n", summary.user_meta_keys));

    let acf = &report.acf_fields;
    if acf.available {
        out.push_str("### Advanced Custom Fields (ACF)\n\n");
        out.push_str(&format!(
            "**Field Groups:** {}\n\n",
            acf.field_groups.unwrap_or(acf.groups.len())
        ));
        for group in &acf.groups {
            out.push_str(&format!("- **{}** ({} fields)\n", group.title, group.field_count));
        }
        out.push('\n');
    }
    out.push_str("---\n\n");
    out
}

fn format_plugins(report: &PluginReport) -> String {
    let mut out = String::from("## Plugins {#plugins}\n\n");
    out.push_str(&format!("### Active Plugins ({})\n\n", report.active_plugins.count));
    for plugin in &report.active_plugins.plugins {
        out.push_str(&format!("- **{}** v{}\n", plugin.name, plugin.version));
        if !plugin.author.is_empty() {
            out.push_str(&format!("  - Author: {}\n", plugin.author));
        }
    }
    out.push('\n');

    let must_use = &report.must_use_plugins;
    if must_use.count > 0 {
        out.push_str(&format!("### Must-Use Plugins ({})\n\n", must_use.count));
        for plugin in &must_use.plugins {
            out.push_str(&format!("- **{}** v{}\n", plugin.name, plugin.version));
        }
        out.push('\n');
    }
    out.push_str("---\n\n");
    out
}

fn format_theme(report: &ThemeReport) -> String {
    let mut out = String::from("## Theme {#theme}\n\n");
    let theme = &report.active_theme;
    out.push_str("### Active Theme\n\n");
    out.push_str(&format!("**Name:** {} v{}\n", theme.name, theme.version));
    out.push_str(&format!("**Author:** {}\n", theme.author));
    if theme.is_child_theme {
        out.push_str("**Type:** Child Theme\n");
        if let Some(parent) = &report.child_theme.parent_theme {
            out.push_str(&format!("**Parent Theme:** {} v{}\n", parent.name, parent.version));
        }
    }
    out.push('\n');

    if !report.theme_support.is_empty() {
        out.push_str("### Theme Support\n\n");
        for feature in report.theme_support.keys() {
            out.push_str(&format!("- {}\n", feature));
        }
        out.push('\n');
    }

    let templates = &report.template_files;
    out.push_str("### Template Files\n\n");
    out.push_str(&format!("**Total Templates:** {}\n\n", templates.template_count));
    if !templates.page_templates.is_empty() {
        out.push_str("**Custom Page Templates:**\n");
        for (file, name) in templates.page_templates.iter() {
            out.push_str(&format!("- {} (`{}`)\n", name, file));
        }
    }
    out.push_str("\n---\n\n");
    out
}

/// The style guide body, from theme information up to the implementation
/// guide, with headings demoted one level
fn format_theme_styles(report: &ThemeStyleReport, generated: NaiveDateTime) -> String {
    let guide = ThemeStyleFormatter.format_at(report, generated);
    let mut lines = Vec::new();
    let mut capturing = false;

    for line in guide.lines() {
        if line.contains("## Theme Information") {
            capturing = true;
        }
        if line.contains("## Implementation Guide") {
            break;
        }
        if !capturing {
            continue;
        }
        lines.push(demote_heading(line));
    }

    let mut out = String::from("## Theme Styles & Design {#theme-styles}\n\n");
    out.push_str(&lines.join("\n"));
    out.push_str("\n---\n\n");
    out
}

/// `## x` → `### x`, `### x` → `#### x`; deeper headings are left alone
fn demote_heading(line: &str) -> String {
    for prefix in ["##", "###"] {
        if let Some(rest) = line.strip_prefix(prefix)
            && rest.starts_with(char::is_whitespace)
            && !rest.trim().is_empty()
        {
            return format!("#{} {}", prefix, rest.trim_start());
        }
    }
    line.to_string()
}

fn scanner_errors(envelope: &ScanEnvelope) -> String {
    let errors: Vec<(&str, &str)> = envelope.errors().collect();
    if errors.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Scanner Errors\n\n");
    out.push_str("The following scanners did not complete:\n\n");
    for (scanner, message) in errors {
        out.push_str(&format!("- **{}:** {}\n", scanner, message));
    }
    out.push_str("\n---\n\n");
    out
}

fn footer(generated: NaiveDateTime) -> String {
    format!(
        "\n---\n\n*Generated by {}*\n*Report generated on {}*\n",
        GENERATOR,
        generated.format("%Y-%m-%d at %H:%M:%S")
    )
}
