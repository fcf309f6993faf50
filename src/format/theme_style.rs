//! Theme style guide formatter
//!
//! Turns a theme style report into a Markdown style guide an assistant can
//! follow when writing CSS that matches the theme.

use crate::ordered::{OrderedMap, TokenMap};
use crate::theme_style::tokens::STYLE_MODS;
use crate::theme_style::{
    ColorPalette, ComputedStyles, Effects, Layout, Spacing, ThemeInfo, ThemeStyleReport, Typography,
};
use chrono::NaiveDateTime;
use serde_json::{Value, json};

const MAX_SPACING_VALUES: usize = 10;
const MAX_MEDIA_QUERIES: usize = 10;
const MAX_RADIUS_VALUES: usize = 10;
const MAX_SHADOW_VALUES: usize = 5;
const MAX_TRANSITION_VALUES: usize = 5;
const MAX_CSS_VARIABLES: usize = 50;

/// Renders the theme style guide
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeStyleFormatter;

impl ThemeStyleFormatter {
    pub fn format(&self, report: &ThemeStyleReport) -> String {
        self.format_at(report, chrono::Local::now().naive_local())
    }

    pub fn format_at(&self, report: &ThemeStyleReport, generated: NaiveDateTime) -> String {
        let data = &report.data;
        let mut out: Vec<String> = Vec::new();

        out.push("# WordPress Theme Style Guide".into());
        out.push(String::new());
        out.push(format!("*Generated on {}*", generated.format("%Y-%m-%d %H:%M:%S")));
        out.push(String::new());

        out.push("## Table of Contents".into());
        out.push(String::new());
        for (title, anchor) in [
            ("Theme Information", "theme-information"),
            ("Color Palette", "color-palette"),
            ("Typography", "typography"),
            ("Spacing System", "spacing-system"),
            ("Component Styles", "component-styles"),
            ("Layout System", "layout-system"),
            ("Visual Effects", "visual-effects"),
            ("CSS Variables", "css-variables"),
            ("Computed Styles", "computed-styles"),
            ("Implementation Guide", "implementation-guide"),
        ] {
            out.push(format!("- [{}](#{})", title, anchor));
        }
        out.push(String::new());

        section(&mut out, "Theme Information", "theme-information");
        theme_info(&data.theme_info, &mut out);
        out.push(String::new());

        section(&mut out, "Color Palette", "color-palette");
        color_palette(&data.color_palette, &mut out);
        out.push(String::new());

        section(&mut out, "Typography", "typography");
        typography(&data.typography, &mut out);
        out.push(String::new());

        section(&mut out, "Spacing System", "spacing-system");
        spacing(&data.spacing, &mut out);
        out.push(String::new());

        section(&mut out, "Component Styles", "component-styles");
        component_group("Button Styles", &data.components.buttons, &mut out);
        component_group("Form Styles", &data.components.forms, &mut out);
        component_group("Card/Box Styles", &data.components.cards, &mut out);
        out.push(String::new());

        section(&mut out, "Layout System", "layout-system");
        layout(&data.layout, &mut out);
        out.push(String::new());

        section(&mut out, "Visual Effects", "visual-effects");
        effects(&data.effects, &mut out);
        out.push(String::new());

        if !data.css_variables.is_empty() {
            section(&mut out, "CSS Variables", "css-variables");
            css_variables(&data.css_variables, &mut out);
            out.push(String::new());
        }

        if has_computed_styles(&data.computed_styles) {
            section(&mut out, "Computed Styles", "computed-styles");
            computed_styles(&data.computed_styles, &mut out);
            out.push(String::new());
        }

        section(&mut out, "Implementation Guide", "implementation-guide");
        implementation_guide(report, &mut out);

        out.join("\n")
    }
}

fn section(out: &mut Vec<String>, title: &str, anchor: &str) {
    out.push(format!("## {} {{#{}}}", title, anchor));
    out.push(String::new());
}

/// `post-thumbnails` → `Post thumbnails`
fn feature_label(feature: &str) -> String {
    let mut chars = feature.chars();
    let label: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    label.replace('-', " ")
}

/// `header_textcolor` → `Header Textcolor`
fn setting_label(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { "Unknown" } else { value }
}

fn field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn theme_info(info: &ThemeInfo, out: &mut Vec<String>) {
    out.push("| Property | Value |".into());
    out.push("|----------|-------|".into());
    out.push(format!("| Theme Name | {} |", or_unknown(&info.name)));
    out.push(format!("| Version | {} |", or_unknown(&info.version)));
    out.push(format!("| Author | {} |", or_unknown(&info.author)));
    out.push(format!("| Text Domain | {} |", or_unknown(&info.text_domain)));
    if info.is_child_theme {
        out.push(format!(
            "| Parent Theme | {} |",
            or_unknown(info.parent_theme.as_deref().unwrap_or_default())
        ));
    }

    let supported: Vec<&str> = info
        .theme_supports
        .iter()
        .filter(|(_, supported)| **supported)
        .map(|(feature, _)| feature)
        .collect();
    if !supported.is_empty() {
        out.push(String::new());
        out.push("### Theme Support Features".into());
        out.push(String::new());
        for feature in supported {
            out.push(format!("- {}", feature_label(feature)));
        }
    }
}

fn color_palette(colors: &ColorPalette, out: &mut Vec<String>) {
    out.push("### Primary Colors".into());
    out.push(String::new());

    if !colors.css_colors.is_empty() {
        out.push("```css".into());
        out.push("/* Theme Color Variables */".into());
        for (name, value) in colors.css_colors.iter() {
            out.push(format!("--color-{}: {};", name.replace('_', "-"), value));
        }
        out.push("```".into());
        out.push(String::new());
    }

    if let Some(Value::Array(palette)) = &colors.editor_palette
        && !palette.is_empty()
    {
        out.push("### Editor Color Palette".into());
        out.push(String::new());
        out.push("| Name | Slug | Color |".into());
        out.push("|------|------|-------|".into());
        for color in palette {
            out.push(format!(
                "| {} | {} | {} |",
                field(color, "name"),
                field(color, "slug"),
                field(color, "color")
            ));
        }
        out.push(String::new());
    }

    if colors.all_colors.is_empty() {
        return;
    }

    out.push("### All Detected Colors".into());
    out.push(String::new());
    out.push("<details>".into());
    out.push(format!(
        "<summary>Click to expand full color list ({} colors)</summary>",
        colors.all_colors.len()
    ));
    out.push(String::new());

    let of_kind = |prefix: &str| -> Vec<&str> {
        colors
            .all_colors
            .iter()
            .filter(|c| c.to_ascii_lowercase().starts_with(prefix))
            .map(String::as_str)
            .collect()
    };
    let hex = of_kind("#");
    let rgb = of_kind("rgb");
    let hsl = of_kind("hsl");

    if !hex.is_empty() {
        out.push("**Hex Colors:**".into());
        out.push("```css".into());
        for chunk in hex.chunks(5) {
            out.push(chunk.join(", "));
        }
        out.push("```".into());
        out.push(String::new());
    }
    if !rgb.is_empty() {
        out.push("**RGB Colors:**".into());
        out.push("```css".into());
        out.extend(rgb.iter().map(|c| c.to_string()));
        out.push("```".into());
        out.push(String::new());
    }
    if !hsl.is_empty() {
        out.push("**HSL Colors:**".into());
        out.push("```css".into());
        out.extend(hsl.iter().map(|c| c.to_string()));
        out.push("```".into());
    }
    out.push("</details>".into());
}

fn typography(typography: &Typography, out: &mut Vec<String>) {
    let tokens = &typography.tokens;
    out.push("### Font Families".into());
    out.push(String::new());

    if tokens.contains_key("font_family_base") || tokens.contains_key("font_family_heading") {
        out.push("```css".into());
        for (token, variable) in [
            ("font_family_base", "--font-family-base"),
            ("font_family_heading", "--font-family-heading"),
            ("font_family_mono", "--font-family-mono"),
        ] {
            if let Some(value) = tokens.get(token) {
                out.push(format!("{}: {};", variable, value));
            }
        }
        out.push("```".into());
        out.push(String::new());
    }

    out.push("### Font Sizes".into());
    out.push(String::new());

    if let Some(Value::Array(sizes)) = &typography.editor_font_sizes
        && !sizes.is_empty()
    {
        out.push("| Name | Slug | Size |".into());
        out.push("|------|------|------|".into());
        for size in sizes {
            out.push(format!(
                "| {} | {} | {}px |",
                field(size, "name"),
                field(size, "slug"),
                field(size, "size")
            ));
        }
        out.push(String::new());
    }

    let font_sizes: Vec<(&str, &String)> = tokens
        .iter()
        .filter(|(key, _)| key.starts_with("font_size_"))
        .collect();
    if !font_sizes.is_empty() {
        out.push("```css".into());
        for (key, value) in font_sizes {
            out.push(format!("{}: {};", key.replacen("font_size_", "--font-size-", 1), value));
        }
        out.push("```".into());
        out.push(String::new());
    }

    if !typography.all_font_families.is_empty() {
        out.push("### All Font Families Used".into());
        out.push(String::new());
        for family in &typography.all_font_families {
            out.push(format!("- `{}`", family));
        }
    }
}

/// `--spacing-*` declarations for the scale tokens
fn spacing_declarations(tokens: &TokenMap) -> Vec<String> {
    tokens
        .iter()
        .filter(|(key, _)| key.starts_with("spacing_"))
        .map(|(key, value)| format!("{}: {};", key.replacen("spacing_", "--spacing-", 1), value))
        .collect()
}

fn capped_values(label: &str, values: &[&String], out: &mut Vec<String>) {
    if values.is_empty() {
        return;
    }
    let shown: Vec<&str> = values
        .iter()
        .take(MAX_SPACING_VALUES)
        .map(|v| v.as_str())
        .collect();
    out.push(format!("**{}:** {}", label, shown.join(", ")));
    if values.len() > MAX_SPACING_VALUES {
        out.push(format!("*... and {} more*", values.len() - MAX_SPACING_VALUES));
    }
}

fn spacing(spacing: &Spacing, out: &mut Vec<String>) {
    out.push("### Spacing Scale".into());
    out.push(String::new());

    let declarations = spacing_declarations(&spacing.tokens);
    if !declarations.is_empty() {
        out.push("```css".into());
        out.extend(declarations);
        out.push("```".into());
        out.push(String::new());
    }

    if spacing.common_spacing_values.is_empty() {
        return;
    }
    out.push("### Common Spacing Values".into());
    out.push(String::new());

    let rem: Vec<&String> = spacing
        .common_spacing_values
        .iter()
        .filter(|v| v.contains("rem"))
        .collect();
    let px: Vec<&String> = spacing
        .common_spacing_values
        .iter()
        .filter(|v| !v.contains("rem") && v.contains("px"))
        .collect();
    capped_values("REM Values", &rem, out);
    capped_values("Pixel Values", &px, out);
}

fn component_group(title: &str, components: &OrderedMap<TokenMap>, out: &mut Vec<String>) {
    if components.is_empty() {
        return;
    }
    out.push(format!("### {}", title));
    out.push(String::new());
    for (selector, styles) in components.iter() {
        out.push(format!("**{}**", selector));
        out.push("```css".into());
        out.push(format!("{} {{", selector));
        for (property, value) in styles.iter() {
            out.push(format!("    {}: {};", property, value));
        }
        out.push("}".into());
        out.push("```".into());
        out.push(String::new());
    }
}

fn layout(layout: &Layout, out: &mut Vec<String>) {
    out.push("### Container Widths".into());
    out.push(String::new());
    out.push("| Type | Width |".into());
    out.push("|------|-------|".into());
    if let Some(width) = &layout.content_width {
        out.push(format!("| Content Width | {} |", width));
    }
    for (token, label) in [("container_width", "Container Width"), ("wide_width", "Wide Width")] {
        if let Some(width) = layout.tokens.get(token) {
            out.push(format!("| {} | {} |", label, width));
        }
    }
    out.push(String::new());

    if layout.media_queries.is_empty() {
        return;
    }
    out.push("### Media Queries".into());
    out.push(String::new());
    out.push("```css".into());
    out.extend(layout.media_queries.iter().take(MAX_MEDIA_QUERIES).cloned());
    if layout.media_queries.len() > MAX_MEDIA_QUERIES {
        out.push(format!(
            "/* ... and {} more */",
            layout.media_queries.len() - MAX_MEDIA_QUERIES
        ));
    }
    out.push("```".into());
}

fn effect_values(title: &str, property: &str, values: &[String], cap: usize, out: &mut Vec<String>) {
    if values.is_empty() {
        return;
    }
    out.push(format!("### {}", title));
    out.push(String::new());
    out.push("```css".into());
    for value in values.iter().take(cap) {
        out.push(format!("{}: {};", property, value));
    }
    out.push("```".into());
    out.push(String::new());
}

fn effects(effects: &Effects, out: &mut Vec<String>) {
    effect_values(
        "Border Radius Values",
        "border-radius",
        &effects.border_radius_values,
        MAX_RADIUS_VALUES,
        out,
    );
    effect_values(
        "Box Shadow Values",
        "box-shadow",
        &effects.box_shadow_values,
        MAX_SHADOW_VALUES,
        out,
    );
    effect_values(
        "Transition Values",
        "transition",
        &effects.transition_values,
        MAX_TRANSITION_VALUES,
        out,
    );
}

fn css_variables(variables: &TokenMap, out: &mut Vec<String>) {
    out.push("```css".into());
    out.push(":root {".into());
    for (name, value) in variables.iter().take(MAX_CSS_VARIABLES) {
        out.push(format!("    {}: {};", name, value));
    }
    if variables.len() > MAX_CSS_VARIABLES {
        out.push(format!(
            "    /* ... and {} more variables */",
            variables.len() - MAX_CSS_VARIABLES
        ));
    }
    out.push("}".into());
    out.push("```".into());
}

fn mod_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(if text.starts_with('#') {
        text
    } else {
        format!("#{}", text)
    })
}

fn has_computed_styles(styles: &ComputedStyles) -> bool {
    !styles.theme_mods.is_empty()
        || styles.content_width.is_some()
        || !styles.elementor_colors.is_empty()
        || !styles.elementor_typography.is_empty()
}

fn computed_styles(styles: &ComputedStyles, out: &mut Vec<String>) {
    let mods: Vec<(String, String)> = STYLE_MODS
        .iter()
        .filter_map(|name| {
            let value = mod_value(styles.theme_mods.get(name)?)?;
            Some((setting_label(name), value))
        })
        .collect();
    if !mods.is_empty() {
        out.push("### Theme Customizer Settings".into());
        out.push(String::new());
        out.push("| Setting | Value |".into());
        out.push("|---------|-------|".into());
        for (label, value) in mods {
            out.push(format!("| {} | {} |", label, value));
        }
        out.push(String::new());
    }

    if styles.elementor_colors.is_empty() && styles.elementor_typography.is_empty() {
        return;
    }
    out.push("### Elementor Global Settings".into());
    out.push(String::new());
    out.push(
        "**Note:** This theme uses Elementor. The following are global Elementor settings that override theme styles."
            .into(),
    );
    out.push(String::new());

    if !styles.elementor_colors.is_empty() {
        out.push("#### Elementor System Colors".into());
        out.push(String::new());
        out.push("| Name | Color |".into());
        out.push("|------|-------|".into());
        for color in &styles.elementor_colors {
            out.push(format!("| {} | {} |", color.title, color.color));
        }
        out.push(String::new());
    }

    if !styles.elementor_typography.is_empty() {
        out.push("#### Elementor System Typography".into());
        out.push(String::new());
        out.push("| Name | Settings |".into());
        out.push("|------|----------|".into());
        for typo in &styles.elementor_typography {
            let mut settings = Vec::new();
            if let Some(family) = &typo.typography_font_family {
                settings.push(format!("Font: {}", family));
            }
            if let Some(size) = &typo.typography_font_size {
                settings.push(format!("Size: {}", size));
            }
            if let Some(weight) = &typo.typography_font_weight {
                settings.push(format!("Weight: {}", weight));
            }
            out.push(format!("| {} | {} |", typo.title, settings.join(", ")));
        }
        out.push(String::new());
    }

    if let Some(width) = &styles.elementor_container_width {
        out.push(format!("**Elementor Container Width:** {}", width));
        out.push(String::new());
    }
}

fn implementation_guide(report: &ThemeStyleReport, out: &mut Vec<String>) {
    let data = &report.data;
    let stats = &report.statistics;

    out.push("### Quick Start CSS Template".into());
    out.push(String::new());
    out.push("Use this CSS template as a starting point for matching this theme's visual style:".into());
    out.push(String::new());
    out.push("```css".into());
    out.push("/* Theme-Compatible Styles */".into());
    out.push(":root {".into());
    if !data.color_palette.css_colors.is_empty() {
        out.push("    /* Colors */".into());
        for (name, value) in data.color_palette.css_colors.iter() {
            out.push(format!("    --color-{}: {};", name.replace('_', "-"), value));
        }
    }
    out.push("    ".into());
    out.push("    /* Typography */".into());
    for (token, variable) in [
        ("font_family_base", "--font-family-base"),
        ("font_size_base", "--font-size-base"),
        ("line_height_base", "--line-height-base"),
    ] {
        if let Some(value) = data.typography.tokens.get(token) {
            out.push(format!("    {}: {};", variable, value));
        }
    }
    out.push("    ".into());
    out.push("    /* Spacing */".into());
    for declaration in spacing_declarations(&data.spacing.tokens) {
        out.push(format!("    {}", declaration));
    }
    out.push("}".into());
    out.push(String::new());
    out.extend(
        [
            "/* Base Styles */",
            "body {",
            "    font-family: var(--font-family-base);",
            "    font-size: var(--font-size-base);",
            "    line-height: var(--line-height-base);",
            "    color: var(--color-foreground);",
            "    background-color: var(--color-background);",
            "}",
            "",
            "a {",
            "    color: var(--color-link);",
            "    text-decoration: underline;",
            "}",
            "",
            "a:hover {",
            "    color: var(--color-link-hover);",
            "}",
            "```",
            "",
            "### Integration Notes",
            "",
        ]
        .map(String::from),
    );

    if !stats.detected_frameworks.is_empty() {
        out.push(format!(
            "**Detected CSS Frameworks:** {}",
            stats.detected_frameworks.join(", ")
        ));
        out.push(String::new());
        out.push(format!(
            "This theme appears to use {}. Consider using the same framework(s) for consistency.",
            stats.detected_frameworks.join(" and ")
        ));
        out.push(String::new());
    }

    if stats.is_block_theme {
        out.push(
            "**Block Theme:** This is a WordPress block theme. Use block patterns and theme.json for best compatibility."
                .into(),
        );
        out.push(String::new());
    }

    if stats.uses_elementor {
        out.extend(
            [
                "**Elementor Page Builder:** This site uses Elementor. Most styling is controlled through Elementor's global settings and individual widget styles rather than theme CSS.",
                "",
                "To match this site's style:",
                "1. Use Elementor's Global Colors and Typography settings",
                "2. Check Site Settings > Global Colors & Fonts in Elementor",
                "3. Style inheritance follows Elementor's system, not traditional CSS",
                "",
            ]
            .map(String::from),
        );
    }

    out.extend(
        [
            "### Best Practices",
            "",
            "1. **Use CSS Variables** - This theme uses CSS custom properties extensively. Use the provided variables for consistency.",
            "2. **Match Spacing** - Follow the spacing scale to maintain visual rhythm.",
            "3. **Typography Hierarchy** - Respect the established font sizes and families.",
            "4. **Color Consistency** - Stick to the defined color palette.",
            "5. **Component Patterns** - Follow the existing button, form, and card styles.",
        ]
        .map(String::from),
    );

    if let Some(theme_json) = &data.theme_json {
        let excerpt = json!({
            "version": theme_json.version,
            "settings": {
                "color": theme_json.settings.get("color"),
                "typography": theme_json.settings.get("typography"),
                "spacing": theme_json.settings.get("spacing"),
            }
        });
        out.push(String::new());
        out.push("### theme.json Configuration".into());
        out.push(String::new());
        out.push("This theme uses theme.json. Key settings:".into());
        out.push(String::new());
        out.push("```json".into());
        out.push(serde_json::to_string_pretty(&excerpt).unwrap_or_else(|_| excerpt.to_string()));
        out.push("```".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme_style::{Components, StyleData, StyleStatistics, ThemeJsonSummary};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn tokens(pairs: &[(&str, &str)]) -> TokenMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_report() -> ThemeStyleReport {
        let mut buttons = OrderedMap::new();
        buttons.insert(".button", tokens(&[("color", "#fff"), ("background-color", "#3366ff")]));
        let mut supports = OrderedMap::new();
        supports.insert("custom-logo", true);
        supports.insert("editor-styles", false);
        supports.insert("post-thumbnails", true);

        ThemeStyleReport {
            data: StyleData {
                theme_info: ThemeInfo {
                    name: "Acme".to_string(),
                    version: "1.2".to_string(),
                    theme_supports: supports,
                    ..Default::default()
                },
                color_palette: ColorPalette {
                    css_colors: tokens(&[("primary", "#3366ff"), ("link_hover", "#224499")]),
                    all_colors: vec![
                        "#3366ff".to_string(),
                        "rgb(0, 0, 0)".to_string(),
                        "#fff".to_string(),
                    ],
                    ..Default::default()
                },
                spacing: Spacing {
                    tokens: tokens(&[("spacing_sm", "0.5rem"), ("grid_gap", "1rem")]),
                    common_spacing_values: vec!["1rem".into(), "10px".into(), "2em".into()],
                    ..Default::default()
                },
                components: Components {
                    buttons,
                    ..Default::default()
                },
                theme_json: Some(ThemeJsonSummary {
                    version: Some(json!(2)),
                    settings: json!({"color": {"custom": false}}),
                    ..Default::default()
                }),
                ..Default::default()
            },
            statistics: StyleStatistics {
                detected_frameworks: vec!["bootstrap".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn guide_contains_tokens_and_components() {
        let guide = ThemeStyleFormatter.format_at(&sample_report(), at());

        assert!(guide.starts_with("# WordPress Theme Style Guide\n\n*Generated on 2024-05-01 09:30:00*"));
        assert!(guide.contains("| Theme Name | Acme |"));
        assert!(guide.contains("- Custom logo\n- Post thumbnails"));
        assert!(!guide.contains("Editor styles"));
        assert!(guide.contains("--color-link-hover: #224499;"));
        assert!(guide.contains("<summary>Click to expand full color list (3 colors)</summary>"));
        assert!(guide.contains("**Hex Colors:**\n```css\n#3366ff, #fff\n```"));
        assert!(guide.contains("**RGB Colors:**\n```css\nrgb(0, 0, 0)\n```"));
        assert!(guide.contains("--spacing-sm: 0.5rem;"));
        assert!(!guide.contains("--spacing-grid"));
        assert!(guide.contains("**REM Values:** 1rem\n**Pixel Values:** 10px"));
        assert!(guide.contains(".button {\n    color: #fff;\n    background-color: #3366ff;\n}"));
        assert!(guide.contains("**Detected CSS Frameworks:** bootstrap"));
        assert!(guide.contains("### theme.json Configuration"));
        assert!(guide.contains("\"custom\": false"));
    }

    #[test]
    fn optional_sections_are_skipped() {
        let guide = ThemeStyleFormatter.format_at(&ThemeStyleReport::default(), at());
        assert!(!guide.contains("## CSS Variables {#css-variables}"));
        assert!(!guide.contains("## Computed Styles {#computed-styles}"));
        assert!(!guide.contains("theme.json Configuration"));
        assert!(guide.contains("| Theme Name | Unknown |"));
        assert!(guide.contains("## Implementation Guide {#implementation-guide}"));
    }

    #[test]
    fn long_variable_lists_are_capped() {
        let mut report = ThemeStyleReport::default();
        for i in 0..55 {
            report
                .data
                .css_variables
                .insert(format!("--v{}", i), format!("{}px", i));
        }
        let guide = ThemeStyleFormatter.format_at(&report, at());
        assert!(guide.contains("    --v49: 49px;"));
        assert!(!guide.contains("--v50:"));
        assert!(guide.contains("/* ... and 5 more variables */"));
    }

    #[test]
    fn customizer_colors_get_a_hash() {
        let mut report = ThemeStyleReport::default();
        report
            .data
            .computed_styles
            .theme_mods
            .insert("header_textcolor", json!("333333"));
        let guide = ThemeStyleFormatter.format_at(&report, at());
        assert!(guide.contains("| Header Textcolor | #333333 |"));
    }
}
