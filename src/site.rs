//! Site snapshot - everything the scanners know about a WordPress site
//!
//! A snapshot is gathered once (from the REST API, a local theme directory,
//! or a saved JSON file) and then handed read-only to every scanner.

use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Complete picture of a site as seen by the scanners
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSnapshot {
    pub site: SiteInfo,
    pub post_types: Vec<PostTypeDef>,
    pub post_statuses: Vec<PostStatusDef>,
    pub taxonomies: Vec<TaxonomyDef>,
    pub meta: MetaInventory,
    pub plugins: Vec<PluginDef>,
    pub theme: Option<ThemeDef>,
    /// Theme stylesheets that exist, main `style.css` first
    pub stylesheets: Vec<Stylesheet>,
    /// Raw `theme.json` document of the active theme
    pub theme_json: Option<Value>,
    pub roles: Vec<RoleDef>,
    pub security: SecurityFlags,
    pub file_permissions: OrderedMap<FilePermission>,
    pub database: Option<DatabaseInfo>,
}

impl SiteSnapshot {
    /// Load a snapshot previously written with [`SiteSnapshot::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the snapshot as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    pub fn post_type(&self, name: &str) -> Option<&PostTypeDef> {
        self.post_types.iter().find(|pt| pt.name == name)
    }

    pub fn taxonomy(&self, name: &str) -> Option<&TaxonomyDef> {
        self.taxonomies.iter().find(|t| t.name == name)
    }
}

/// General site information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub name: String,
    pub url: String,
    pub description: String,
    pub wordpress_version: Option<String>,
    pub php_version: Option<String>,
    pub multisite: bool,
}

/// Archive setting of a post type: a flag or a custom archive slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchiveSetting {
    Enabled(bool),
    Slug(String),
}

impl Default for ArchiveSetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl ArchiveSetting {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Enabled(flag) => *flag,
            Self::Slug(slug) => !slug.is_empty(),
        }
    }
}

/// A registered post type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTypeDef {
    pub name: String,
    pub label: String,
    pub description: String,
    pub public: bool,
    pub hierarchical: bool,
    pub show_in_rest: bool,
    pub rest_base: Option<String>,
    pub capabilities: OrderedMap<String>,
    pub supports: Vec<String>,
    pub taxonomies: Vec<String>,
    pub has_archive: ArchiveSetting,
    pub rewrite_slug: Option<String>,
    #[serde(rename = "_builtin")]
    pub builtin: bool,
    pub count: u64,
    pub statuses: OrderedMap<u64>,
    pub meta: Vec<MetaKeyDef>,
    /// Post id/parent pairs, used to measure hierarchy depth
    pub posts: Vec<PostNode>,
}

/// Parent link of a single post
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PostNode {
    pub id: u64,
    pub parent: u64,
}

/// A meta key observed on posts or terms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaKeyDef {
    pub key: String,
    /// Type declared through `register_meta`, if any
    pub registered_type: Option<String>,
    pub usage_count: u64,
    pub sample_values: Vec<String>,
    pub is_protected: bool,
    pub is_registered: bool,
}

/// A registered post status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostStatusDef {
    pub name: String,
    pub label: String,
    pub public: bool,
    pub exclude_from_search: bool,
    #[serde(rename = "_builtin")]
    pub builtin: bool,
}

/// A registered taxonomy with its terms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyDef {
    pub name: String,
    pub label: String,
    pub description: String,
    pub object_type: Vec<String>,
    pub public: bool,
    pub hierarchical: bool,
    pub show_in_rest: bool,
    pub rest_base: Option<String>,
    pub capabilities: OrderedMap<String>,
    #[serde(rename = "_builtin")]
    pub builtin: bool,
    pub terms: Vec<TermDef>,
    pub term_meta: Vec<MetaKeyDef>,
}

/// A single taxonomy term
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermDef {
    pub term_id: u64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub parent: u64,
    pub description: String,
}

/// Site-wide meta key inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaInventory {
    pub post_meta_keys: Vec<String>,
    pub term_meta_keys: Vec<String>,
    pub user_meta_keys: Vec<String>,
    /// Row count of the post meta table, when known
    pub total_post_meta_entries: Option<u64>,
    /// Registered meta per object type (post, term, user, comment)
    pub registered: OrderedMap<Vec<RegisteredMeta>>,
    /// ACF field groups; `None` when ACF is not active
    pub acf_groups: Option<Vec<AcfGroup>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisteredMeta {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub single: bool,
    pub show_in_rest: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcfGroup {
    pub title: String,
    pub key: String,
    pub location: Value,
    pub field_count: u64,
}

/// An installed plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDef {
    /// Plugin file relative to the plugins directory, e.g. `akismet/akismet.php`
    pub file: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub active: bool,
    pub must_use: bool,
}

/// The active theme
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeDef {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub template: String,
    pub stylesheet: String,
    pub theme_uri: String,
    pub text_domain: String,
    pub parent: Option<ParentTheme>,
    /// Declared theme supports; values carry the feature arguments when present
    pub supports: OrderedMap<Value>,
    /// Theme files relative to the theme root
    pub files: Vec<String>,
    /// Page template file → template name
    pub page_templates: OrderedMap<String>,
    pub is_block_theme: bool,
    pub content_width: Option<u32>,
    pub theme_mods: OrderedMap<Value>,
    /// Customizer "Additional CSS"
    pub custom_css: Option<String>,
    pub elementor: Option<ElementorKit>,
}

impl ThemeDef {
    pub fn is_child_theme(&self) -> bool {
        self.parent.is_some() || (!self.template.is_empty() && self.template != self.stylesheet)
    }

    pub fn supports(&self, feature: &str) -> bool {
        self.supports
            .get(feature)
            .is_some_and(|v| !matches!(v, Value::Bool(false) | Value::Null))
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentTheme {
    pub name: String,
    pub version: String,
    pub template: String,
}

/// Elementor active kit settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementorKit {
    pub system_colors: Vec<ElementorColor>,
    pub system_typography: Vec<ElementorTypography>,
    pub container_width: Option<SizeValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementorColor {
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementorTypography {
    pub title: String,
    pub typography_font_family: Option<String>,
    pub typography_font_size: Option<SizeValue>,
    pub typography_font_weight: Option<String>,
}

/// A number with a CSS unit, as Elementor stores it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeValue {
    pub size: f64,
    pub unit: String,
}

impl std::fmt::Display for SizeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.size, self.unit)
    }
}

/// Raw stylesheet text and where it came from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stylesheet {
    pub path: String,
    pub content: String,
}

/// A user role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDef {
    pub key: String,
    pub name: String,
    pub capabilities: OrderedMap<bool>,
    pub user_count: u64,
}

/// Security-relevant configuration flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFlags {
    pub ssl_enabled: bool,
    pub admin_ssl: bool,
    pub debug_mode: bool,
    pub debug_display: bool,
    pub script_debug: bool,
    /// Security response headers observed on the homepage
    pub headers: OrderedMap<String>,
}

/// Permission summary of a critical file or directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermission {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

/// Database table listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseInfo {
    pub prefix: String,
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableInfo {
    pub name: String,
    pub size_mb: f64,
    pub rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_snapshot_uses_defaults() {
        let snapshot: SiteSnapshot =
            serde_json::from_str(r#"{"site":{"name":"Demo"},"post_types":[{"name":"post"}]}"#)
                .unwrap();
        assert_eq!(snapshot.site.name, "Demo");
        assert_eq!(snapshot.post_types[0].name, "post");
        assert!(!snapshot.post_types[0].has_archive.is_enabled());
        assert!(snapshot.theme.is_none());
    }

    #[test]
    fn archive_accepts_flag_or_slug() {
        let pt: PostTypeDef =
            serde_json::from_str(r#"{"name":"book","has_archive":"library"}"#).unwrap();
        assert_eq!(pt.has_archive, ArchiveSetting::Slug("library".to_string()));
        assert!(pt.has_archive.is_enabled());
    }

    #[test]
    fn child_theme_detection() {
        let theme = ThemeDef {
            template: "twentytwentyfour".to_string(),
            stylesheet: "my-child".to_string(),
            ..Default::default()
        };
        assert!(theme.is_child_theme());

        let standalone = ThemeDef {
            template: "astra".to_string(),
            stylesheet: "astra".to_string(),
            ..Default::default()
        };
        assert!(!standalone.is_child_theme());
    }

    #[test]
    fn size_value_display() {
        let size = SizeValue {
            size: 1140.0,
            unit: "px".to_string(),
        };
        assert_eq!(size.to_string(), "1140px");
    }
}
