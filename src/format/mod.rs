//! Report formatters
//!
//! Pure transforms from a [`ScanEnvelope`](crate::orchestrator::ScanEnvelope)
//! (or one scanner's report) into a document: a Markdown site report, a
//! Markdown theme style guide, and a JSON brief for AI assistants.

pub mod ai;
pub mod markdown;
pub mod theme_style;

pub use ai::AiFormatter;
pub use markdown::MarkdownFormatter;
pub use theme_style::ThemeStyleFormatter;

/// Generator line used in report footers and metadata
pub const GENERATOR: &str = concat!("WP Site Analyzer v", env!("CARGO_PKG_VERSION"));

/// Integer with thousands separators, e.g. `12,345`
pub(crate) fn number_format(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(number_format(0), "0");
        assert_eq!(number_format(999), "999");
        assert_eq!(number_format(1000), "1,000");
        assert_eq!(number_format(1234567), "1,234,567");
    }
}
