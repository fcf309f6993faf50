//! Local collection from a theme directory and a WordPress root on disk

use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use crate::scanner::security::CRITICAL_PATHS;
use crate::site::{FilePermission, ParentTheme, SiteSnapshot, Stylesheet, ThemeDef};
use crate::theme_style::tokens::STYLESHEET_PATHS;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::{DirEntry, WalkDir};

/// WordPress only reads this much of a file when parsing its header
const HEADER_BYTES: usize = 8192;

/// Deepest directory level searched for theme files
const MAX_THEME_DEPTH: usize = 4;

/// Theme file extensions worth listing
const THEME_FILE_EXTENSIONS: &[&str] = &["php", "css", "json", "html"];

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", ".git"];

/// Block themes ship one of these
const BLOCK_TEMPLATES: &[&str] = &["templates/index.html", "block-templates/index.html"];

static THEME_SUPPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"add_theme_support\(\s*['"]([a-z0-9-]+)['"]"#)
        .unwrap_or_else(|err| panic!("invalid THEME_SUPPORT_RE regex: {err}"))
});

static CONTENT_WIDTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$content_width\s*=\s*(\d+)")
        .unwrap_or_else(|err| panic!("invalid CONTENT_WIDTH_RE regex: {err}"))
});

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"define\(\s*['"]([A-Z_]+)['"]\s*,\s*(true|false|TRUE|FALSE|1|0)\s*\)"#)
        .unwrap_or_else(|err| panic!("invalid DEFINE_RE regex: {err}"))
});

static WP_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$wp_version\s*=\s*['"]([^'"]+)['"]"#)
        .unwrap_or_else(|err| panic!("invalid WP_VERSION_RE regex: {err}"))
});

/// Reads a theme and/or WordPress install from the filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalCollector {
    theme_dir: Option<PathBuf>,
    wordpress_root: Option<PathBuf>,
}

impl LocalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of the active theme (the one holding `style.css`)
    pub fn theme_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.theme_dir = Some(dir.into());
        self
    }

    /// WordPress root (the one holding `wp-config.php`)
    pub fn wordpress_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wordpress_root = Some(dir.into());
        self
    }

    /// Snapshot built from disk alone
    pub fn collect(&self) -> Result<SiteSnapshot> {
        let mut snapshot = SiteSnapshot::default();
        self.apply(&mut snapshot)?;
        Ok(snapshot)
    }

    /// Overlay what the disk knows onto an existing snapshot
    pub fn apply(&self, snapshot: &mut SiteSnapshot) -> Result<()> {
        if let Some(root) = &self.wordpress_root {
            apply_wordpress_root(root, snapshot)?;
        }

        let theme_dir = self.theme_dir.clone().or_else(|| {
            let root = self.wordpress_root.as_ref()?;
            let stylesheet = &snapshot.theme.as_ref()?.stylesheet;
            let dir = root.join("wp-content/themes").join(stylesheet);
            dir.is_dir().then_some(dir)
        });

        if let Some(dir) = theme_dir {
            apply_theme_dir(&dir, snapshot)?;
        }
        Ok(())
    }
}

fn apply_theme_dir(dir: &Path, snapshot: &mut SiteSnapshot) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "theme directory not found"),
        ));
    }
    tracing::info!("reading theme from {}", dir.display());

    let local = read_theme(dir)?;
    snapshot.theme = Some(match snapshot.theme.take() {
        Some(known) => merge_theme(known, local),
        None => local,
    });

    let stylesheets = read_stylesheets(dir);
    if !stylesheets.is_empty() {
        snapshot.stylesheets = stylesheets;
    }

    let theme_json_path = dir.join("theme.json");
    if theme_json_path.is_file() {
        let raw = std::fs::read_to_string(&theme_json_path)
            .map_err(|e| Error::io(&theme_json_path, e))?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(theme_json) => snapshot.theme_json = Some(theme_json),
            Err(e) => tracing::warn!("ignoring invalid theme.json: {}", e),
        }
    }
    Ok(())
}

/// Theme definition from `style.css`, `functions.php` and the file tree
fn read_theme(dir: &Path) -> Result<ThemeDef> {
    let style_path = dir.join("style.css");
    let style = std::fs::read_to_string(&style_path).map_err(|e| Error::io(&style_path, e))?;
    let headers = file_headers(
        &style,
        &[
            "Theme Name",
            "Theme URI",
            "Author",
            "Description",
            "Version",
            "Template",
            "Text Domain",
        ],
    );
    let header = |name: &str| headers.get(name).cloned().unwrap_or_default();

    let stylesheet = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let template = match header("Template") {
        t if t.is_empty() => stylesheet.clone(),
        t => t,
    };

    let parent = (template != stylesheet).then(|| read_parent(dir, &template));
    let files = theme_files(dir);
    let functions = std::fs::read_to_string(dir.join("functions.php")).unwrap_or_default();

    Ok(ThemeDef {
        name: match header("Theme Name") {
            n if n.is_empty() => stylesheet.clone(),
            n => n,
        },
        version: header("Version"),
        author: header("Author"),
        description: header("Description"),
        theme_uri: header("Theme URI"),
        text_domain: header("Text Domain"),
        template,
        stylesheet,
        parent,
        supports: theme_supports(&functions),
        content_width: CONTENT_WIDTH_RE
            .captures(&functions)
            .and_then(|caps| caps[1].parse().ok()),
        page_templates: page_templates(dir, &files),
        is_block_theme: BLOCK_TEMPLATES.iter().any(|t| dir.join(t).is_file()),
        files,
        ..Default::default()
    })
}

/// Parent theme header from the sibling directory, or just its slug
fn read_parent(dir: &Path, template: &str) -> ParentTheme {
    let style = dir
        .parent()
        .map(|themes| themes.join(template).join("style.css"))
        .and_then(|path| std::fs::read_to_string(path).ok())
        .unwrap_or_default();
    let headers = file_headers(&style, &["Theme Name", "Version"]);

    ParentTheme {
        name: headers
            .get("Theme Name")
            .cloned()
            .unwrap_or_else(|| template.to_string()),
        version: headers.get("Version").cloned().unwrap_or_default(),
        template: template.to_string(),
    }
}

/// Disk data wins for files and headers; the rest stays as collected
fn merge_theme(known: ThemeDef, local: ThemeDef) -> ThemeDef {
    ThemeDef {
        supports: if known.supports.is_empty() {
            local.supports
        } else {
            known.supports
        },
        parent: local.parent.or(known.parent),
        is_block_theme: known.is_block_theme || local.is_block_theme,
        content_width: local.content_width.or(known.content_width),
        theme_mods: known.theme_mods,
        custom_css: known.custom_css,
        elementor: known.elementor,
        ..local
    }
}

/// `Name: value` header lines from the top of a file
pub fn file_headers(content: &str, names: &[&str]) -> OrderedMap<String> {
    let head = match content.char_indices().nth(HEADER_BYTES) {
        Some((end, _)) => &content[..end],
        None => content,
    };

    let mut headers = OrderedMap::new();
    for name in names {
        let pattern = format!(
            r"(?mi)^(?:[ \t]*<\?php)?[ \t/*#@]*{}:(.*)$",
            regex::escape(name)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(head) {
            let value = caps[1].trim().trim_end_matches("*/").trim();
            if !value.is_empty() {
                headers.insert(*name, value.to_string());
            }
        }
    }
    headers
}

fn theme_supports(functions: &str) -> OrderedMap<Value> {
    let mut supports = OrderedMap::new();
    for caps in THEME_SUPPORT_RE.captures_iter(functions) {
        supports.insert_first(&caps[1], Value::Bool(true));
    }
    supports
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Theme files relative to the theme root, sorted
fn theme_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .max_depth(MAX_THEME_DEPTH)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| THEME_FILE_EXTENSIONS.contains(&ext))
        })
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            Some(relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// PHP files declaring a `Template Name` header
fn page_templates(dir: &Path, files: &[String]) -> OrderedMap<String> {
    files
        .iter()
        .filter(|file| file.ends_with(".php"))
        .filter_map(|file| {
            let content = std::fs::read_to_string(dir.join(file)).ok()?;
            let name = file_headers(&content, &["Template Name"])
                .get("Template Name")?
                .clone();
            Some((file.clone(), name))
        })
        .collect()
}

fn read_stylesheets(dir: &Path) -> Vec<Stylesheet> {
    STYLESHEET_PATHS
        .iter()
        .filter_map(|path| {
            let full = dir.join(path);
            if !full.is_file() {
                return None;
            }
            match std::fs::read_to_string(&full) {
                Ok(content) => Some(Stylesheet {
                    path: path.to_string(),
                    content,
                }),
                Err(e) => {
                    tracing::warn!("skipping stylesheet {}: {}", full.display(), e);
                    None
                }
            }
        })
        .collect()
}

fn apply_wordpress_root(root: &Path, snapshot: &mut SiteSnapshot) -> Result<()> {
    if !root.is_dir() {
        return Err(Error::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "WordPress root not found"),
        ));
    }
    tracing::info!("reading WordPress install at {}", root.display());

    for name in CRITICAL_PATHS {
        let path = critical_path(root, name);
        snapshot
            .file_permissions
            .insert(name, file_permission(&path));
    }

    let config = std::fs::read_to_string(root.join("wp-config.php")).unwrap_or_default();
    let defines = config_defines(&config);
    let flag = |name: &str| defines.get(name).copied();

    let security = &mut snapshot.security;
    security.debug_mode = flag("WP_DEBUG").unwrap_or(false);
    // WordPress displays errors unless told otherwise, but only in debug mode
    security.debug_display = security.debug_mode && flag("WP_DEBUG_DISPLAY").unwrap_or(true);
    security.script_debug = flag("SCRIPT_DEBUG").unwrap_or(false);
    if let Some(force_ssl_admin) = flag("FORCE_SSL_ADMIN") {
        security.admin_ssl = force_ssl_admin;
    }

    if snapshot.site.wordpress_version.is_none()
        && let Ok(version_php) = std::fs::read_to_string(root.join("wp-includes/version.php"))
        && let Some(caps) = WP_VERSION_RE.captures(&version_php)
    {
        snapshot.site.wordpress_version = Some(caps[1].to_string());
    }
    Ok(())
}

fn critical_path(root: &Path, name: &str) -> PathBuf {
    match name {
        "uploads" => root.join("wp-content/uploads"),
        other => root.join(other),
    }
}

/// Boolean constants defined in `wp-config.php`
fn config_defines(config: &str) -> OrderedMap<bool> {
    let mut defines = OrderedMap::new();
    for caps in DEFINE_RE.captures_iter(config) {
        let enabled = matches!(&caps[2], "true" | "TRUE" | "1");
        defines.insert(&caps[1], enabled);
    }
    defines
}

pub(crate) fn file_permission(path: &Path) -> FilePermission {
    let Ok(metadata) = std::fs::metadata(path) else {
        return FilePermission {
            exists: false,
            ..Default::default()
        };
    };

    FilePermission {
        exists: true,
        writable: Some(!metadata.permissions().readonly()),
        permissions: permission_bits(&metadata),
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;
    Some(format!("{:04o}", metadata.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> Option<String> {
    None
}
