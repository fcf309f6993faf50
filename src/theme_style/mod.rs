//! Theme style scanner
//!
//! Reconstructs a theme's design tokens (colors, typography, spacing, layout,
//! effects, component styles) from raw stylesheet text, and adds what the
//! theme declares in structured form: editor palettes, `theme.json`,
//! customizer settings and an Elementor kit.

pub mod extract;
pub mod tokens;

use crate::error::{Error, Result};
use crate::ordered::{OrderedMap, TokenMap};
use crate::scanner::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, to_output};
use crate::site::{ElementorColor, ElementorTypography, SiteSnapshot, ThemeDef};
use extract::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokens::{
    BUTTON_SELECTORS, CARD_SELECTORS, COLOR_TOKENS, EFFECT_TOKENS, FORM_SELECTORS, LAYOUT_TOKENS,
    NAVIGATION_SELECTORS, SPACING_TOKENS, STYLE_MODS, STYLE_SUPPORTS, STYLESHEET_PATHS,
    TYPOGRAPHY_TOKENS,
};

/// Scanner output: extracted data plus summary statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeStyleReport {
    pub data: StyleData,
    pub statistics: StyleStatistics,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleData {
    pub theme_info: ThemeInfo,
    pub color_palette: ColorPalette,
    pub typography: Typography,
    pub spacing: Spacing,
    pub components: Components,
    pub layout: Layout,
    pub effects: Effects,
    pub css_variables: TokenMap,
    pub frameworks: Vec<String>,
    pub custom_css: CustomCss,
    pub theme_json: Option<ThemeJsonSummary>,
    pub computed_styles: ComputedStyles,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeInfo {
    pub name: String,
    pub version: String,
    pub text_domain: String,
    pub template: String,
    pub stylesheet: String,
    pub theme_uri: String,
    pub author: String,
    pub is_child_theme: bool,
    pub parent_theme: Option<String>,
    pub theme_supports: OrderedMap<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPalette {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_palette: Option<Value>,
    /// Semantic color token → value
    pub css_colors: TokenMap,
    /// Every color literal across the stylesheets, first-seen order
    pub all_colors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_font_sizes: Option<Value>,
    #[serde(flatten)]
    pub tokens: TokenMap,
    pub all_font_families: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_spacing: Option<Value>,
    #[serde(flatten)]
    pub tokens: TokenMap,
    pub common_spacing_values: Vec<String>,
}

/// Selector → whitelisted properties, per component family
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    pub buttons: OrderedMap<TokenMap>,
    pub forms: OrderedMap<TokenMap>,
    pub cards: OrderedMap<TokenMap>,
    pub navigation: OrderedMap<TokenMap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_width: Option<String>,
    #[serde(flatten)]
    pub tokens: TokenMap,
    pub media_queries: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Effects {
    #[serde(flatten)]
    pub tokens: TokenMap,
    pub border_radius_values: Vec<String>,
    pub box_shadow_values: Vec<String>,
    pub transition_values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomCss {
    /// Customizer "Additional CSS"
    pub customizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_mods: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeJsonSummary {
    pub version: Option<Value>,
    pub settings: Value,
    pub styles: Value,
    #[serde(rename = "customTemplates")]
    pub custom_templates: Value,
    #[serde(rename = "templateParts")]
    pub template_parts: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyles {
    /// Customizer color settings that are set
    #[serde(flatten)]
    pub theme_mods: OrderedMap<Value>,
    pub content_width: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elementor_colors: Vec<ElementorColor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elementor_typography: Vec<ElementorTypography>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elementor_container_width: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleStatistics {
    pub theme_name: String,
    pub is_block_theme: bool,
    pub has_theme_json: bool,
    pub color_count: usize,
    pub font_family_count: usize,
    pub css_variable_count: usize,
    pub detected_frameworks: Vec<String>,
    pub has_custom_css: bool,
    pub uses_elementor: bool,
}

/// Extracts design tokens from the active theme's stylesheets
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeStyleScanner;

impl Scanner for ThemeStyleScanner {
    fn id(&self) -> &'static str {
        "theme_style"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("theme_style_scan");

        let site = ctx.site;
        let theme = site
            .theme
            .as_ref()
            .ok_or(Error::MissingData("active theme"))?;
        let sheets = theme_stylesheets(site);
        tracing::debug!("extracting styles from {} stylesheet(s)", sheets.len());

        let data = StyleData {
            theme_info: theme_info(theme),
            color_palette: ColorPalette {
                editor_palette: declared_list(theme, "editor-color-palette"),
                css_colors: extract::resolve_tokens(Category::Color, COLOR_TOKENS, &sheets)?,
                all_colors: extract::all_colors(&sheets),
            },
            typography: Typography {
                editor_font_sizes: declared_list(theme, "editor-font-sizes"),
                tokens: extract::resolve_tokens(Category::Typography, TYPOGRAPHY_TOKENS, &sheets)?,
                all_font_families: extract::declaration_values("font-family", &sheets)?,
            },
            spacing: Spacing {
                custom_spacing: theme
                    .supports("custom-spacing")
                    .then(|| theme.supports.get("custom-spacing").cloned())
                    .flatten(),
                tokens: extract::resolve_tokens(Category::Spacing, SPACING_TOKENS, &sheets)?,
                common_spacing_values: extract::spacing_values(&sheets),
            },
            components: Components {
                buttons: extract::component_styles(BUTTON_SELECTORS, &sheets)?,
                forms: extract::component_styles(FORM_SELECTORS, &sheets)?,
                cards: extract::component_styles(CARD_SELECTORS, &sheets)?,
                navigation: extract::component_styles(NAVIGATION_SELECTORS, &sheets)?,
            },
            layout: Layout {
                content_width: theme.content_width.map(|w| format!("{}px", w)),
                tokens: extract::resolve_tokens(Category::Layout, LAYOUT_TOKENS, &sheets)?,
                media_queries: extract::media_queries(&sheets),
            },
            effects: Effects {
                tokens: extract::resolve_tokens(Category::Effect, EFFECT_TOKENS, &sheets)?,
                border_radius_values: extract::declaration_values("border-radius", &sheets)?,
                box_shadow_values: extract::declaration_values("box-shadow", &sheets)?,
                transition_values: extract::declaration_values("transition", &sheets)?,
            },
            css_variables: extract::css_variables(&sheets),
            frameworks: extract::detect_frameworks(&sheets),
            custom_css: CustomCss {
                customizer: theme.custom_css.clone().unwrap_or_default(),
                theme_mods: theme.theme_mods.get("custom_css").cloned(),
            },
            theme_json: site.theme_json.as_ref().and_then(summarize_theme_json),
            computed_styles: computed_styles(theme),
        };

        let statistics = statistics(&data, site);
        let report = ThemeStyleReport {
            data,
            statistics,
            performance_metrics: monitor.end("theme_style_scan"),
        };
        to_output(&report)
    }
}

/// Stylesheet texts in lookup order; paths the snapshot lacks are skipped
fn theme_stylesheets(site: &SiteSnapshot) -> Vec<&str> {
    STYLESHEET_PATHS
        .iter()
        .filter_map(|path| {
            site.stylesheets
                .iter()
                .find(|sheet| sheet.path.trim_start_matches('/') == *path)
                .map(|sheet| sheet.content.as_str())
        })
        .collect()
}

fn theme_info(theme: &ThemeDef) -> ThemeInfo {
    let is_child_theme = theme.is_child_theme();
    ThemeInfo {
        name: theme.name.clone(),
        version: theme.version.clone(),
        text_domain: theme.text_domain.clone(),
        template: theme.template.clone(),
        stylesheet: theme.stylesheet.clone(),
        theme_uri: theme.theme_uri.clone(),
        author: theme.author.clone(),
        is_child_theme,
        parent_theme: if is_child_theme {
            theme.parent.as_ref().map(|p| p.name.clone())
        } else {
            None
        },
        theme_supports: STYLE_SUPPORTS
            .iter()
            .map(|feature| (feature.to_string(), theme.supports(feature)))
            .collect(),
    }
}

/// Arguments of a list-style theme support such as `editor-color-palette`.
/// Accepts both the bare list and the list wrapped in an argument array.
fn declared_list(theme: &ThemeDef, feature: &str) -> Option<Value> {
    match theme.supports.get(feature)? {
        Value::Array(args) => match args.first() {
            Some(inner @ Value::Array(_)) => Some(inner.clone()),
            _ => Some(Value::Array(args.clone())),
        },
        _ => None,
    }
}

fn summarize_theme_json(raw: &Value) -> Option<ThemeJsonSummary> {
    let obj = raw.as_object().filter(|obj| !obj.is_empty())?;
    let field = |name: &str, default: fn() -> Value| obj.get(name).cloned().unwrap_or_else(default);
    Some(ThemeJsonSummary {
        version: obj.get("version").cloned(),
        settings: field("settings", || Value::Object(Map::new())),
        styles: field("styles", || Value::Object(Map::new())),
        custom_templates: field("customTemplates", || Value::Array(Vec::new())),
        template_parts: field("templateParts", || Value::Array(Vec::new())),
    })
}

fn computed_styles(theme: &ThemeDef) -> ComputedStyles {
    let kit = theme.elementor.as_ref();
    ComputedStyles {
        theme_mods: STYLE_MODS
            .iter()
            .filter_map(|name| {
                theme
                    .theme_mods
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect(),
        content_width: theme.content_width.map(|w| format!("{}px", w)),
        elementor_colors: kit.map(|k| k.system_colors.clone()).unwrap_or_default(),
        elementor_typography: kit.map(|k| k.system_typography.clone()).unwrap_or_default(),
        elementor_container_width: kit
            .and_then(|k| k.container_width.as_ref())
            .map(|w| w.to_string()),
    }
}

fn uses_elementor(site: &SiteSnapshot) -> bool {
    site.theme.as_ref().is_some_and(|t| t.elementor.is_some())
        || site
            .plugins
            .iter()
            .any(|p| p.active && p.file.starts_with("elementor/"))
}

fn statistics(data: &StyleData, site: &SiteSnapshot) -> StyleStatistics {
    StyleStatistics {
        theme_name: if data.theme_info.name.is_empty() {
            "Unknown".to_string()
        } else {
            data.theme_info.name.clone()
        },
        is_block_theme: site.theme.as_ref().is_some_and(|t| t.is_block_theme),
        has_theme_json: data.theme_json.is_some(),
        color_count: data.color_palette.all_colors.len(),
        font_family_count: data.typography.all_font_families.len(),
        css_variable_count: data.css_variables.len(),
        detected_frameworks: data.frameworks.clone(),
        has_custom_css: !data.custom_css.customizer.trim().is_empty(),
        uses_elementor: uses_elementor(site),
    }
}
