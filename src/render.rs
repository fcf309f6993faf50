//! Markdown to HTML for the report preview
//!
//! A line-oriented converter for the Markdown the formatters produce. It is
//! not a general Markdown parser: blocks are recognized one line at a time
//! and lists are tracked with a stack of open list tags.

use regex::Regex;
use std::sync::LazyLock;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```(.*)$").unwrap_or_else(|err| panic!("invalid FENCE_RE regex: {err}"))
});

static HR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---+$").unwrap_or_else(|err| panic!("invalid HR_RE regex: {err}"))
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})\s+(.+?)(?:\s*\{#(.+?)\})?$")
        .unwrap_or_else(|err| panic!("invalid HEADING_RE regex: {err}"))
});

static TABLE_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|(.+)\|$").unwrap_or_else(|err| panic!("invalid TABLE_ROW_RE regex: {err}"))
});

static TABLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|[\s\-:|]+\|$")
        .unwrap_or_else(|err| panic!("invalid TABLE_SEPARATOR_RE regex: {err}"))
});

static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)([-*+]|\d+\.)\s+(.+)$")
        .unwrap_or_else(|err| panic!("invalid LIST_ITEM_RE regex: {err}"))
});

static BLOCKQUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^>\s*(.*)$").unwrap_or_else(|err| panic!("invalid BLOCKQUOTE_RE regex: {err}"))
});

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<summary>(.*?)</summary>$")
        .unwrap_or_else(|err| panic!("invalid SUMMARY_RE regex: {err}"))
});

/// Lines that end a list when they follow a blank line
static BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s|---+$|\||>|```)")
        .unwrap_or_else(|err| panic!("invalid BLOCK_START_RE regex: {err}"))
});

static CODE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`([^`]+)`").unwrap_or_else(|err| panic!("invalid CODE_SPAN_RE regex: {err}"))
});

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.+?)\*\*").unwrap_or_else(|err| panic!("invalid BOLD_RE regex: {err}"))
});

static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([^*]+)\*").unwrap_or_else(|err| panic!("invalid ITALIC_RE regex: {err}"))
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")
        .unwrap_or_else(|err| panic!("invalid LINK_RE regex: {err}"))
});

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9+.\-]*):")
        .unwrap_or_else(|err| panic!("invalid SCHEME_RE regex: {err}"))
});

static CODE_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{1}(\\d+)\u{1}")
        .unwrap_or_else(|err| panic!("invalid CODE_PLACEHOLDER_RE regex: {err}"))
});

static DETAILS_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<details class="collapsible-section">(.*?)</details>"#)
        .unwrap_or_else(|err| panic!("invalid DETAILS_BLOCK_RE regex: {err}"))
});

static SUMMARY_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)</summary>\s*(.+)")
        .unwrap_or_else(|err| panic!("invalid SUMMARY_TAIL_RE regex: {err}"))
});

const LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Render report Markdown as an HTML fragment
pub fn markdown_to_html(markdown: &str) -> String {
    let mut renderer = Renderer::default();
    renderer.render(markdown);
    renderer.finish()
}

#[derive(Debug, Default)]
struct Renderer {
    out: Vec<String>,
    in_code_block: bool,
    in_table: bool,
    list_stack: Vec<ListKind>,
}

impl Renderer {
    fn render(&mut self, markdown: &str) {
        let lines: Vec<&str> = markdown.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            self.line(line, lines.get(i + 1).copied());
        }
        self.close_lists();
        if self.in_table {
            self.close_table();
        }
    }

    fn close_lists(&mut self) {
        while let Some(kind) = self.list_stack.pop() {
            self.out.push(format!("</{}>", kind.tag()));
        }
    }

    fn close_table(&mut self) {
        self.in_table = false;
        self.out.push("</table></div>".to_string());
    }

    fn line(&mut self, line: &str, next: Option<&str>) {
        if let Some(caps) = FENCE_RE.captures(line) {
            if self.in_code_block {
                self.in_code_block = false;
                self.out.push("</code></pre>".to_string());
            } else {
                self.close_lists();
                self.in_code_block = true;
                let language = caps[1].trim();
                let language = if language.is_empty() { "plaintext" } else { language };
                self.out.push(format!(
                    r#"<pre class="code-block" data-language="{}"><code>"#,
                    escape_html(language)
                ));
            }
            return;
        }

        if self.in_code_block {
            self.out.push(escape_html(line));
            return;
        }

        if HR_RE.is_match(line) {
            self.close_lists();
            self.out.push(r#"<hr class="section-divider">"#.to_string());
            return;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            self.close_lists();
            let level = caps[1].len();
            let text = &caps[2];
            let id = caps
                .get(3)
                .map_or_else(|| slugify(text), |m| m.as_str().to_string());
            self.out.push(format!(
                r#"<h{level} id="{}" class="section-header level-{level}">{}</h{level}>"#,
                escape_html(&id),
                inline_markdown(text)
            ));
            return;
        }

        if TABLE_ROW_RE.is_match(line) {
            self.table_row(line, next);
            return;
        }

        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            let indent = caps[1].chars().count();
            let kind = if caps[2].ends_with('.') {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            };
            self.list_item(indent / 2, kind, &caps[3]);
            return;
        }

        if let Some(caps) = BLOCKQUOTE_RE.captures(line) {
            self.close_lists();
            self.out
                .push(format!("<blockquote>{}</blockquote>", inline_markdown(&caps[1])));
            return;
        }

        let trimmed = line.trim();
        if trimmed == "<details>" || trimmed == "</details>" {
            self.close_lists();
            self.out.push(trimmed.to_string());
            return;
        }
        if let Some(caps) = SUMMARY_RE.captures(trimmed) {
            self.close_lists();
            self.out
                .push(format!("<summary>{}</summary>", inline_markdown(&caps[1])));
            return;
        }

        if !trimmed.is_empty() {
            let continuation = !self.list_stack.is_empty()
                && line.chars().take(2).filter(|c| c.is_whitespace()).count() == 2;
            if continuation {
                self.continue_list_item(&inline_markdown(trimmed));
            } else {
                self.close_lists();
                self.out.push(format!("<p>{}</p>", inline_markdown(trimmed)));
            }
            return;
        }

        // Blank line: a list survives it unless a new block or another blank follows
        let closes = match next {
            None => true,
            Some(next) => next.trim().is_empty() || BLOCK_START_RE.is_match(next),
        };
        if closes {
            self.close_lists();
        }
    }

    fn table_row(&mut self, line: &str, next: Option<&str>) {
        self.close_lists();
        if !self.in_table {
            self.in_table = true;
            self.out
                .push(r#"<div class="table-wrapper"><table class="data-table">"#.to_string());
        }

        if !TABLE_SEPARATOR_RE.is_match(line) {
            let header = self
                .out
                .last()
                .is_some_and(|last| last.contains("<table"));
            let tag = if header { "th" } else { "td" };
            self.out.push("<tr>".to_string());
            for cell in line.trim_matches('|').split('|') {
                self.out
                    .push(format!("<{tag}>{}</{tag}>", inline_markdown(cell.trim())));
            }
            self.out.push("</tr>".to_string());
        }

        if !next.is_some_and(|next| TABLE_ROW_RE.is_match(next)) {
            self.close_table();
        }
    }

    /// Levels deeper than one past the current nesting are clamped
    fn list_item(&mut self, level: usize, kind: ListKind, content: &str) {
        let level = level.min(self.list_stack.len());

        while self.list_stack.len() > level + 1 {
            if let Some(closed) = self.list_stack.pop() {
                self.out.push(format!("</{}>", closed.tag()));
            }
        }

        if self.list_stack.len() == level {
            self.list_stack.push(kind);
            self.out
                .push(format!(r#"<{} class="styled-list">"#, kind.tag()));
        } else if self.list_stack[level] != kind {
            self.out.push(format!("</{}>", self.list_stack[level].tag()));
            self.list_stack[level] = kind;
            self.out
                .push(format!(r#"<{} class="styled-list">"#, kind.tag()));
        }

        self.out.push(format!("<li>{}</li>", inline_markdown(content)));
    }

    /// Append text to the open list item
    fn continue_list_item(&mut self, html: &str) {
        if let Some(last) = self.out.last_mut()
            && let Some(body) = last.strip_suffix("</li>")
        {
            *last = format!("{} {}</li>", body, html);
            return;
        }
        self.out.push(html.to_string());
    }

    fn finish(self) -> String {
        let html = decorate_details(&self.out.join("\n"));
        format!(r#"<article class="ai-report-content">{}</article>"#, html)
    }
}

/// Give `<details>` blocks their classes and wrap the body after `</summary>`
fn decorate_details(html: &str) -> String {
    let html = html
        .lines()
        .map(|line| {
            if line == "<details>" {
                r#"<details class="collapsible-section">"#.to_string()
            } else if let Some(caps) = SUMMARY_RE.captures(line) {
                format!(r#"<summary class="collapsible-header">{}</summary>"#, &caps[1])
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    DETAILS_BLOCK_RE
        .replace_all(&html, |caps: &regex::Captures<'_>| {
            let body = SUMMARY_TAIL_RE.replace(
                &caps[1],
                r#"</summary><div class="collapsible-content">${1}</div>"#,
            );
            format!(r#"<details class="collapsible-section">{}</details>"#, body)
        })
        .into_owned()
}

/// Lowercase, with runs of anything but ASCII letters and digits collapsed to `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape, then convert code spans, bold, italics and links.
/// Code spans are set aside first so nothing inside them is converted.
fn inline_markdown(text: &str) -> String {
    let escaped = escape_html(text);

    let mut spans = Vec::new();
    let text = CODE_SPAN_RE.replace_all(&escaped, |caps: &regex::Captures<'_>| {
        spans.push(format!(r#"<code class="inline-code">{}</code>"#, &caps[1]));
        format!("\u{1}{}\u{1}", spans.len() - 1)
    });

    let text = BOLD_RE.replace_all(&text, "<strong>${1}</strong>");
    let text = italics(&text);
    let text = LINK_RE.replace_all(&text, |caps: &regex::Captures<'_>| link(&caps[1], &caps[2]));

    CODE_PLACEHOLDER_RE
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| spans.get(i).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}

/// `*x*` not touching another asterisk
fn italics(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(m) = ITALIC_RE.find_at(text, search) {
        let clear_before = m.start() == 0 || bytes[m.start() - 1] != b'*';
        let clear_after = bytes.get(m.end()) != Some(&b'*');
        if clear_before && clear_after {
            out.push_str(&text[copied..m.start()]);
            out.push_str("<em>");
            out.push_str(&text[m.start() + 1..m.end() - 1]);
            out.push_str("</em>");
            copied = m.end();
            search = m.end();
        } else {
            search = m.start() + 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

fn link(label: &str, url: &str) -> String {
    if url.starts_with('#') {
        return format!(r#"<a href="{}" class="anchor-link">{}</a>"#, url, label);
    }
    let allowed = SCHEME_RE
        .captures(url)
        .is_none_or(|caps| LINK_SCHEMES.contains(&caps[1].to_ascii_lowercase().as_str()));
    let href = if allowed { url.trim() } else { "#" };
    format!(
        r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
        href, label
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> (String, Renderer) {
        let mut renderer = Renderer::default();
        renderer.render(markdown);
        let html = renderer.out.join("\n");
        (html, renderer)
    }

    #[test]
    fn list_closes_before_heading() {
        let html = markdown_to_html("- item one\n- item two\n\n## Next");
        assert_eq!(html.matches("<ul").count(), 1);
        assert_eq!(html.matches("</ul>").count(), 1);
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains(
            "<li>item two</li>\n</ul>\n<h2 id=\"next\" class=\"section-header level-2\">Next</h2>"
        ));
    }

    #[test]
    fn list_stack_is_empty_after_rendering() {
        let inputs = [
            "- a\n  - b\n    - c\n- d",
            "1. one\n2. two\n- three",
            "- a\n\n- b\n\ntext",
            "- a\n      - deep\n",
            "* x\n  continued\n\n\n> quote",
        ];
        for input in inputs {
            let (html, renderer) = render(input);
            assert!(renderer.list_stack.is_empty(), "{input}");
            let opened = html.matches("<ul").count() + html.matches("<ol").count();
            let closed = html.matches("</ul>").count() + html.matches("</ol>").count();
            assert_eq!(opened, closed, "{input}");
        }
    }

    #[test]
    fn single_blank_line_keeps_list_open() {
        let html = markdown_to_html("- a\n\n- b");
        assert_eq!(html.matches("<ul").count(), 1);
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn nesting_deepens_one_level_at_a_time() {
        let html = markdown_to_html("- a\n      - deep");
        assert_eq!(html.matches("<ul").count(), 2);
    }

    #[test]
    fn list_kind_switch_at_same_level() {
        let html = markdown_to_html("- a\n1. b");
        assert!(html.contains("<li>a</li>\n</ul>\n<ol class=\"styled-list\">\n<li>b</li>\n</ol>"));
    }

    #[test]
    fn continuation_joins_the_list_item() {
        let html = markdown_to_html("- first\n  more text");
        assert!(html.contains("<li>first more text</li>"));
    }

    #[test]
    fn tables_get_a_header_row() {
        let html = markdown_to_html("| Name | Value |\n|------|-------|\n| a | `b` |\n\nafter");
        assert!(html.contains("<th>Name</th>"));
        assert!(html.contains("<td>a</td>"));
        assert!(html.contains("<td><code class=\"inline-code\">b</code></td>"));
        assert_eq!(html.matches("</table></div>").count(), 1);
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn table_ending_in_separator_still_closes() {
        let html = markdown_to_html("| a |\n|---|");
        assert_eq!(html.matches("</table></div>").count(), 1);
    }

    #[test]
    fn code_blocks_are_escaped_verbatim() {
        let html = markdown_to_html("```css\na > b { color: red; }\n**not bold**\n```");
        assert!(html.contains("<pre class=\"code-block\" data-language=\"css\"><code>"));
        assert!(html.contains("a &gt; b { color: red; }"));
        assert!(html.contains("**not bold**"));
        assert!(html.contains("</code></pre>"));
    }

    #[test]
    fn heading_ids() {
        let html = markdown_to_html("## Post Types {#post-types}\n### Books (`book`)");
        assert!(html.contains("<h2 id=\"post-types\" class=\"section-header level-2\">Post Types</h2>"));
        assert!(html.contains("id=\"books-book\""));
        assert_eq!(slugify("  Theme Styles & Design! "), "theme-styles-design");
    }

    #[test]
    fn inline_conversions() {
        assert_eq!(
            inline_markdown("**bold** and *it* with <tag>"),
            "<strong>bold</strong> and <em>it</em> with &lt;tag&gt;"
        );
        assert_eq!(
            inline_markdown("`**raw**` stays"),
            "<code class=\"inline-code\">**raw**</code> stays"
        );
        assert_eq!(
            inline_markdown("[Top](#summary)"),
            "<a href=\"#summary\" class=\"anchor-link\">Top</a>"
        );
        assert_eq!(
            inline_markdown("[Site](https://example.com)"),
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener\">Site</a>"
        );
    }

    #[test]
    fn unsafe_link_schemes_are_neutralized() {
        let html = inline_markdown("[x](javascript:alert(1))");
        assert!(html.contains("href=\"#\""));
        assert!(!html.contains("javascript"));
        assert!(inline_markdown("[y](JavaScript:void(0))").contains("href=\"#\""));
    }

    #[test]
    fn details_blocks_are_decorated() {
        let html = markdown_to_html(
            "<details>\n<summary>View custom fields</summary>\n\n| Key |\n|-----|\n| a |\n\n</details>",
        );
        assert!(html.starts_with("<article class=\"ai-report-content\">"));
        assert!(html.ends_with("</article>"));
        assert!(html.contains("<details class=\"collapsible-section\">"));
        assert!(html.contains(
            "<summary class=\"collapsible-header\">View custom fields</summary><div class=\"collapsible-content\">"
        ));
        assert!(html.contains("</div></details>"));
    }

    #[test]
    fn raw_html_outside_details_is_escaped() {
        let html = markdown_to_html("<script>alert(1)</script>");
        assert!(html.contains("<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"));
    }
}
