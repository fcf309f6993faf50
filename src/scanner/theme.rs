//! Theme scanner

use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, to_output};
use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use crate::site::ThemeDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Theme features checked by the theme and theme style scanners
pub(crate) const THEME_FEATURES: [&str; 12] = [
    "post-thumbnails",
    "custom-logo",
    "custom-header",
    "custom-background",
    "post-formats",
    "html5",
    "title-tag",
    "automatic-feed-links",
    "editor-style",
    "align-wide",
    "responsive-embeds",
    "wp-block-styles",
];

const KEY_TEMPLATES: [&str; 10] = [
    "index.php",
    "single.php",
    "page.php",
    "archive.php",
    "search.php",
    "404.php",
    "header.php",
    "footer.php",
    "functions.php",
    "sidebar.php",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeReport {
    pub active_theme: ActiveTheme,
    /// Supported feature → `true`, or the arguments it was registered with
    pub theme_support: OrderedMap<Value>,
    pub template_files: TemplateFiles,
    pub child_theme: ChildTheme,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveTheme {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub template: String,
    pub stylesheet: String,
    pub theme_uri: String,
    pub text_domain: String,
    pub is_child_theme: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateFiles {
    pub page_templates: OrderedMap<String>,
    pub template_count: usize,
    pub key_templates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildTheme {
    pub is_child: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_theme: Option<ParentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_modifications: Option<ChildModifications>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentSummary {
    pub name: String,
    pub version: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildModifications {
    pub functions_php: bool,
    pub style_css: bool,
}

/// Reports the active theme, its features and templates
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeScanner;

impl Scanner for ThemeScanner {
    fn id(&self) -> &'static str {
        "theme"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("theme_scan");

        let theme = ctx
            .site
            .theme
            .as_ref()
            .ok_or(Error::MissingData("active theme"))?;

        let report = ThemeReport {
            active_theme: ActiveTheme {
                name: theme.name.clone(),
                version: theme.version.clone(),
                author: theme.author.clone(),
                description: theme.description.clone(),
                template: theme.template.clone(),
                stylesheet: theme.stylesheet.clone(),
                theme_uri: theme.theme_uri.clone(),
                text_domain: theme.text_domain.clone(),
                is_child_theme: theme.is_child_theme(),
            },
            theme_support: supported_features(theme),
            template_files: template_files(theme),
            child_theme: child_theme(theme),
            performance_metrics: monitor.end("theme_scan"),
        };

        to_output(&report)
    }
}

/// Features from [`THEME_FEATURES`] the theme supports, with their arguments
pub(crate) fn supported_features(theme: &ThemeDef) -> OrderedMap<Value> {
    THEME_FEATURES
        .iter()
        .filter(|feature| theme.supports(feature))
        .map(|feature| {
            let value = match theme.supports.get(feature) {
                Some(args @ (Value::Array(_) | Value::Object(_))) => args.clone(),
                _ => Value::Bool(true),
            };
            (feature.to_string(), value)
        })
        .collect()
}

fn template_files(theme: &ThemeDef) -> TemplateFiles {
    TemplateFiles {
        page_templates: theme.page_templates.clone(),
        template_count: theme.files.iter().filter(|f| f.ends_with(".php")).count(),
        key_templates: KEY_TEMPLATES
            .iter()
            .filter(|file| theme.has_file(file))
            .map(|file| file.to_string())
            .collect(),
    }
}

fn child_theme(theme: &ThemeDef) -> ChildTheme {
    if !theme.is_child_theme() {
        return ChildTheme::default();
    }

    let parent = theme.parent.as_ref();
    ChildTheme {
        is_child: true,
        parent_theme: Some(ParentSummary {
            name: parent.map(|p| p.name.clone()).unwrap_or_default(),
            version: parent.map(|p| p.version.clone()).unwrap_or_default(),
            template: parent
                .map(|p| p.template.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| theme.template.clone()),
        }),
        child_modifications: Some(ChildModifications {
            functions_php: theme.has_file("functions.php"),
            style_css: theme.has_file("style.css"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheHandler;
    use crate::config::Settings;
    use crate::site::{ParentTheme, SiteSnapshot};
    use serde_json::json;

    fn scan(site: &SiteSnapshot) -> Result<ThemeReport> {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings::default();
        let value = ThemeScanner.scan(&ScanContext::new(site, &cache, &settings))?;
        Ok(serde_json::from_value(value).unwrap())
    }

    fn child_theme_site() -> SiteSnapshot {
        let mut supports = OrderedMap::new();
        supports.insert("post-thumbnails", json!(true));
        supports.insert("html5", json!(["search-form", "gallery"]));
        supports.insert("custom-logo", json!(false));
        supports.insert("menus", json!(true));

        SiteSnapshot {
            theme: Some(ThemeDef {
                name: "Storefront Child".to_string(),
                template: "storefront".to_string(),
                stylesheet: "storefront-child".to_string(),
                parent: Some(ParentTheme {
                    name: "Storefront".to_string(),
                    version: "4.5.0".to_string(),
                    template: "storefront".to_string(),
                }),
                supports,
                files: vec![
                    "style.css".to_string(),
                    "functions.php".to_string(),
                    "single.php".to_string(),
                    "templates/full-width.php".to_string(),
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn reports_supports_templates_and_parent() {
        let report = scan(&child_theme_site()).unwrap();

        assert!(report.active_theme.is_child_theme);
        assert_eq!(
            report.theme_support.keys().collect::<Vec<_>>(),
            vec!["post-thumbnails", "html5"]
        );
        assert_eq!(
            report.theme_support.get("html5"),
            Some(&json!(["search-form", "gallery"]))
        );
        assert_eq!(report.template_files.template_count, 3);
        assert_eq!(
            report.template_files.key_templates,
            vec!["single.php", "functions.php"]
        );
        assert_eq!(report.child_theme.parent_theme.unwrap().name, "Storefront");
        assert_eq!(
            report.child_theme.child_modifications,
            Some(ChildModifications {
                functions_php: true,
                style_css: true,
            })
        );
    }

    #[test]
    fn standalone_theme_is_not_a_child() {
        let site = SiteSnapshot {
            theme: Some(ThemeDef {
                name: "Twenty Twenty-Four".to_string(),
                template: "twentytwentyfour".to_string(),
                stylesheet: "twentytwentyfour".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = scan(&site).unwrap();
        assert_eq!(report.child_theme, ChildTheme::default());
    }

    #[test]
    fn missing_theme_is_a_fault() {
        assert!(matches!(
            scan(&SiteSnapshot::default()),
            Err(Error::MissingData("active theme"))
        ));
    }
}
