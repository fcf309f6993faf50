//! Remote collection over the WordPress REST API
//!
//! The REST root must answer; every other endpoint is optional and simply
//! leaves its part of the snapshot empty when it fails (most of them need an
//! application password). The homepage fills gaps the API leaves open: the
//! WordPress version, security headers, and theme/plugin slugs when the
//! authenticated endpoints are unavailable.

use crate::config::SiteSettings;
use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use crate::site::{
    ArchiveSetting, MetaKeyDef, ParentTheme, PluginDef, PostNode, PostStatusDef, PostTypeDef,
    RegisteredMeta, RoleDef, SiteInfo, SiteSnapshot, Stylesheet, TaxonomyDef, TermDef, ThemeDef,
};
use crate::theme_style::tokens::STYLESHEET_PATHS;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// User agent for requests (standard Chrome on Windows)
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 30;

/// Paths relative to the site root
const WP_JSON_PATH: &str = "wp-json/";
const WP_FEED_PATH: &str = "feed/";
const WP_README_PATH: &str = "readme.html";
const WP_THEMES_PATH: &str = "wp-content/themes/";

/// Largest page the REST API hands out
const PER_PAGE: u32 = 100;

/// Response header carrying the collection size
const TOTAL_HEADER: &str = "x-wp-total";

/// Paths to skip when detecting plugins
const SKIP_PLUGIN_SLUGS: &[&str] = &["index", "cache"];

/// Allowed URL schemes
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Response headers recorded for the security report
const SECURITY_HEADERS: &[&str] = &[
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
    "permissions-policy",
];

const BUILTIN_POST_TYPES: &[&str] = &[
    "post",
    "page",
    "attachment",
    "revision",
    "nav_menu_item",
    "custom_css",
    "customize_changeset",
    "oembed_cache",
    "user_request",
    "wp_block",
    "wp_template",
    "wp_template_part",
    "wp_global_styles",
    "wp_navigation",
    "wp_font_family",
    "wp_font_face",
];

const BUILTIN_TAXONOMIES: &[&str] = &[
    "category",
    "post_tag",
    "nav_menu",
    "link_category",
    "post_format",
    "wp_theme",
    "wp_template_part_area",
    "wp_pattern_category",
];

const BUILTIN_STATUSES: &[&str] = &[
    "publish",
    "future",
    "draft",
    "pending",
    "private",
    "trash",
    "auto-draft",
    "inherit",
    "request-pending",
    "request-confirmed",
    "request-failed",
    "request-completed",
];

static FEED_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"wordpress\.org/\?v=([0-9.]+)")
        .unwrap_or_else(|err| panic!("invalid FEED_VERSION_RE regex: {err}"))
});

static README_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Version\s+([0-9.]+)")
        .unwrap_or_else(|err| panic!("invalid README_VERSION_RE regex: {err}"))
});

static THEME_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/wp-content/themes/([^/]+)/")
        .unwrap_or_else(|err| panic!("invalid THEME_PATH_RE regex: {err}"))
});

static PLUGIN_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/wp-content/(mu-)?plugins/([a-zA-Z0-9_-]+)/")
        .unwrap_or_else(|err| panic!("invalid PLUGIN_PATH_RE regex: {err}"))
});

/// REST API root document
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestRoot {
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    home: Option<String>,
    namespaces: Option<Vec<String>>,
}

impl RestRoot {
    fn is_wordpress(&self) -> bool {
        let wp_namespace = self
            .namespaces
            .as_ref()
            .is_some_and(|ns| ns.iter().any(|n| n.starts_with("wp/")));
        wp_namespace || self.name.is_some() || self.url.is_some()
    }
}

/// A text field that is either a plain string or `{raw, rendered}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RestText {
    Plain(String),
    Field {
        #[serde(default)]
        raw: Option<String>,
        #[serde(default)]
        rendered: String,
    },
}

impl Default for RestText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl RestText {
    fn into_text(self) -> String {
        match self {
            Self::Plain(text) => text,
            Self::Field { raw, rendered } => raw.unwrap_or(rendered),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestPostType {
    name: String,
    slug: String,
    description: String,
    hierarchical: bool,
    viewable: Option<bool>,
    has_archive: Option<ArchiveSetting>,
    rest_base: Option<String>,
    taxonomies: Vec<String>,
    supports: OrderedMap<Value>,
    capabilities: OrderedMap<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestStatus {
    name: String,
    slug: String,
    public: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestVisibility {
    public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestTaxonomy {
    name: String,
    slug: String,
    description: String,
    types: Vec<String>,
    hierarchical: bool,
    rest_base: Option<String>,
    capabilities: OrderedMap<String>,
    visibility: Option<RestVisibility>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestTerm {
    id: u64,
    name: String,
    slug: String,
    count: u64,
    parent: u64,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestPost {
    id: u64,
    parent: u64,
    /// Registered meta; WordPress sends `[]` when there is none
    meta: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestPlugin {
    plugin: String,
    status: String,
    name: RestText,
    version: String,
    author: RestText,
    description: RestText,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestTheme {
    stylesheet: String,
    template: String,
    name: RestText,
    version: String,
    author: RestText,
    description: RestText,
    theme_uri: RestText,
    textdomain: String,
    is_block_theme: bool,
    theme_supports: OrderedMap<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RestUser {
    roles: Vec<String>,
    capabilities: OrderedMap<bool>,
}

/// What the homepage reveals without authentication
#[derive(Debug, Default)]
struct Homepage {
    html: String,
    generator: Option<String>,
    stylesheet_hrefs: Vec<String>,
    headers: OrderedMap<String>,
}

/// Application password credentials
#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Builds a [`SiteSnapshot`] from a live WordPress site
#[derive(Debug)]
pub struct RemoteCollector {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

/// Builder for configuring a RemoteCollector with options
#[derive(Debug)]
pub struct RemoteCollectorBuilder {
    url: String,
    allow_private: bool,
    credentials: Option<Credentials>,
}

impl RemoteCollectorBuilder {
    /// Create a new builder for the given URL or domain
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            allow_private: false,
            credentials: None,
        }
    }

    /// Allow private/internal IP addresses (localhost, 192.168.x.x, etc.)
    ///
    /// By default, SSRF protection blocks requests to internal networks.
    /// Enable this to analyze local WordPress installations.
    pub fn allow_private(mut self, allow: bool) -> Self {
        self.allow_private = allow;
        self
    }

    /// Authenticate REST requests with an application password
    pub fn credentials(mut self, username: &str, application_password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: application_password.to_string(),
        });
        self
    }

    /// Build the RemoteCollector with the configured options
    pub fn build(self) -> Result<RemoteCollector> {
        RemoteCollector::build_internal(&self.url, self.allow_private, self.credentials)
    }
}

impl RemoteCollector {
    /// Create a collector for the given URL or domain with SSRF protection
    /// enabled and no credentials
    pub fn new(url: &str) -> Result<Self> {
        Self::build_internal(url, false, None)
    }

    /// Create a builder for configuring collector options
    ///
    /// # Example
    ///
    /// ```no_run
    /// use wp_site_analyzer::RemoteCollector;
    ///
    /// let collector = RemoteCollector::builder("localhost:8080")
    ///     .allow_private(true)
    ///     .credentials("admin", "abcd efgh ijkl mnop")
    ///     .build()?;
    /// # Ok::<(), wp_site_analyzer::Error>(())
    /// ```
    pub fn builder(url: &str) -> RemoteCollectorBuilder {
        RemoteCollectorBuilder::new(url)
    }

    /// Collector for the `[site]` section of the configuration
    pub fn from_settings(site: &SiteSettings) -> Result<Self> {
        let url = site.url.as_deref().ok_or(Error::MissingData("site url"))?;
        let mut builder = Self::builder(url).allow_private(site.allow_private);
        if let (Some(username), Some(password)) = (&site.username, &site.application_password) {
            builder = builder.credentials(username, password);
        }
        builder.build()
    }

    fn build_internal(
        url: &str,
        allow_private: bool,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        // Auto-add https:// if no scheme provided
        let url_with_scheme = if !url.contains("://") {
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        let mut base_url =
            Url::parse(&url_with_scheme).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if !ALLOWED_SCHEMES.contains(&base_url.scheme()) {
            return Err(Error::InvalidUrl(format!(
                "scheme '{}' not allowed (use http or https)",
                base_url.scheme()
            )));
        }

        if !allow_private {
            Self::validate_host(&base_url)?;
        }

        // Relative joins must land below a subdirectory install
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .danger_accept_invalid_certs(false)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Site root every request is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Reject hosts that are internal/private addresses (SSRF protection)
    fn validate_host(url: &Url) -> Result<()> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("missing host".to_string()))?;

        if host == "localhost" || host.ends_with(".localhost") {
            return Err(Error::InvalidUrl("localhost not allowed".to_string()));
        }

        let port = url
            .port()
            .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });
        let socket_addr = format!("{}:{}", host, port);

        if let Ok(addrs) = socket_addr.to_socket_addrs() {
            for addr in addrs {
                if Self::is_internal_ip(addr.ip()) {
                    return Err(Error::InvalidUrl(format!(
                        "internal/private IP address not allowed: {}",
                        addr.ip()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check if an IP address is internal/private (RFC 1918, link-local, loopback, etc.)
    fn is_internal_ip(ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(ipv4) => {
                ipv4.is_loopback()                      // 127.0.0.0/8
                    || ipv4.is_private()                // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                    || ipv4.is_link_local()             // 169.254.0.0/16
                    || ipv4.is_broadcast()              // 255.255.255.255
                    || ipv4.is_unspecified()            // 0.0.0.0
                    || ipv4.octets()[0] == 100          // Shared address space 100.64.0.0/10
                        && ipv4.octets()[1] >= 64
                        && ipv4.octets()[1] <= 127
                    || ipv4.octets()[..2] == [192, 0] // Documentation/test ranges
            }
            IpAddr::V6(ipv6) => {
                ipv6.is_loopback()                      // ::1
                    || ipv6.is_unspecified()            // ::
                    // Unique local addresses (fc00::/7)
                    || (ipv6.segments()[0] & 0xfe00) == 0xfc00
                    // Link-local (fe80::/10)
                    || (ipv6.segments()[0] & 0xffc0) == 0xfe80
            }
        }
    }

    /// Gather a snapshot of the site
    pub async fn collect(&self) -> Result<SiteSnapshot> {
        tracing::info!("collecting site data from {}", self.base_url);
        let root = self.fetch_root().await?;
        let homepage = self.fetch_homepage().await;

        let wordpress_version = match homepage.generator.clone() {
            Some(version) => Some(version),
            None => self.detect_version_from_feed_or_readme().await,
        };

        let site = SiteInfo {
            name: root.name.clone().unwrap_or_default(),
            url: root
                .home
                .clone()
                .or_else(|| root.url.clone())
                .unwrap_or_else(|| self.base_url.as_str().trim_end_matches('/').to_string()),
            description: root.description.clone().unwrap_or_default(),
            wordpress_version,
            php_version: None,
            multisite: false,
        };

        let mut snapshot = SiteSnapshot {
            site,
            post_statuses: self.post_statuses().await,
            ..Default::default()
        };

        self.collect_post_types(&mut snapshot).await;
        snapshot.taxonomies = self.taxonomies().await;
        snapshot.plugins = match self.plugins().await {
            Some(plugins) => plugins,
            None => plugins_from_html(&homepage.html),
        };

        let theme = match self.active_theme().await {
            Some(theme) => Some(theme),
            None => theme_from_html(&homepage.stylesheet_hrefs, &homepage.html),
        };
        if let Some(mut theme) = theme {
            self.collect_theme_files(&mut theme, &mut snapshot).await;
            snapshot.theme = Some(theme);
        }

        snapshot.roles = self.current_role().await.into_iter().collect();
        snapshot.security.ssl_enabled = self.base_url.scheme() == "https";
        snapshot.security.headers = homepage.headers;

        tracing::info!(
            "collected {} post types, {} taxonomies, {} plugins",
            snapshot.post_types.len(),
            snapshot.taxonomies.len(),
            snapshot.plugins.len()
        );
        Ok(snapshot)
    }

    fn rest_url(&self, route: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{}{}", WP_JSON_PATH, route))
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// `context=edit` exposes more fields but needs credentials
    fn context(&self) -> &'static str {
        if self.is_authenticated() { "edit" } else { "view" }
    }

    async fn fetch(&self, url: &Url) -> Result<reqwest::Response> {
        let mut request = self.client.get(url.as_str());
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::HttpRequest(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status().as_u16()));
        }
        Ok(response)
    }

    /// Fetch a page and return its body
    async fn fetch_page(&self, url: &Url) -> Result<String> {
        self.fetch(url)
            .await?
            .text()
            .await
            .map_err(|e| Error::HttpRequest(e.to_string()))
    }

    /// Optional endpoint with the collection total from `X-WP-Total`.
    /// Failures are logged and read as absent.
    async fn optional_page<T: DeserializeOwned>(&self, route: &str) -> Option<(T, Option<u64>)> {
        let result = async {
            let url = self.rest_url(route)?;
            let response = self.fetch(&url).await?;
            let total = total_from_headers(response.headers());
            let body = response
                .json::<T>()
                .await
                .map_err(|e| Error::HttpRequest(e.to_string()))?;
            Ok::<_, Error>((body, total))
        }
        .await;

        match result {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::debug!("skipping {}: {}", route, e);
                None
            }
        }
    }

    async fn optional_json<T: DeserializeOwned>(&self, route: &str) -> Option<T> {
        self.optional_page(route).await.map(|(body, _)| body)
    }

    /// The REST root is the one endpoint that has to work
    async fn fetch_root(&self) -> Result<RestRoot> {
        let url = self.rest_url("")?;
        let body = self.fetch_page(&url).await?;
        let root: RestRoot = serde_json::from_str(&body).map_err(|_| Error::NotWordPress)?;
        if !root.is_wordpress() {
            return Err(Error::NotWordPress);
        }
        Ok(root)
    }

    async fn fetch_homepage(&self) -> Homepage {
        let response = match self.fetch(&self.base_url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("homepage unavailable: {}", e);
                return Homepage::default();
            }
        };

        let headers = security_headers(response.headers());
        let html = response.text().await.unwrap_or_default();
        let document = Html::parse_document(&html);

        Homepage {
            generator: version_from_meta(&document),
            stylesheet_hrefs: stylesheet_hrefs(&document),
            headers,
            html,
        }
    }

    async fn detect_version_from_feed_or_readme(&self) -> Option<String> {
        if let Some(version) = self.detect_version_from(WP_FEED_PATH, &FEED_VERSION_RE).await {
            return Some(version);
        }
        self.detect_version_from(WP_README_PATH, &README_VERSION_RE)
            .await
    }

    async fn detect_version_from(&self, path: &str, re: &Regex) -> Option<String> {
        let url = self.base_url.join(path).ok()?;
        let body = self.fetch_page(&url).await.ok()?;
        re.captures(&body)?.get(1).map(|m| m.as_str().to_string())
    }

    async fn post_statuses(&self) -> Vec<PostStatusDef> {
        let route = format!("wp/v2/statuses?context={}", self.context());
        let Some(statuses) = self.optional_json::<OrderedMap<RestStatus>>(&route).await else {
            return Vec::new();
        };

        statuses
            .values()
            .map(|status| PostStatusDef {
                name: status.slug.clone(),
                label: status.name.clone(),
                public: status.public,
                exclude_from_search: !status.public,
                builtin: BUILTIN_STATUSES.contains(&status.slug.as_str()),
            })
            .collect()
    }

    async fn collect_post_types(&self, snapshot: &mut SiteSnapshot) {
        let route = format!("wp/v2/types?context={}", self.context());
        let Some(types) = self.optional_json::<OrderedMap<RestPostType>>(&route).await else {
            return;
        };

        let mut post_meta_keys: Vec<String> = Vec::new();
        let mut registered: Vec<RegisteredMeta> = Vec::new();

        for rest in types.values() {
            let mut post_type = PostTypeDef {
                name: rest.slug.clone(),
                label: rest.name.clone(),
                description: rest.description.clone(),
                public: rest.viewable.unwrap_or(true),
                hierarchical: rest.hierarchical,
                show_in_rest: true,
                rest_base: rest.rest_base.clone(),
                capabilities: rest.capabilities.clone(),
                supports: rest
                    .supports
                    .iter()
                    .filter(|(_, enabled)| !matches!(enabled, Value::Bool(false)))
                    .map(|(feature, _)| feature.to_string())
                    .collect(),
                taxonomies: rest.taxonomies.clone(),
                has_archive: rest.has_archive.clone().unwrap_or_default(),
                builtin: BUILTIN_POST_TYPES.contains(&rest.slug.as_str()),
                ..Default::default()
            };

            if let Some(rest_base) = &rest.rest_base {
                let route = format!(
                    "wp/v2/{}?per_page={}&_fields=id,parent,meta",
                    rest_base, PER_PAGE
                );
                if let Some((posts, total)) = self.optional_page::<Vec<RestPost>>(&route).await {
                    post_type.count = total.unwrap_or(posts.len() as u64);
                    post_type.meta = meta_from_posts(&posts);
                    if rest.hierarchical {
                        post_type.posts = posts
                            .iter()
                            .map(|p| PostNode {
                                id: p.id,
                                parent: p.parent,
                            })
                            .collect();
                    }
                    for field in &post_type.meta {
                        if !post_meta_keys.contains(&field.key) {
                            post_meta_keys.push(field.key.clone());
                            registered.push(registered_meta(&field.key, &posts));
                        }
                    }
                }
            }

            snapshot.post_types.push(post_type);
        }

        post_meta_keys.sort();
        snapshot.meta.post_meta_keys = post_meta_keys;
        if !registered.is_empty() {
            snapshot.meta.registered.insert("post", registered);
        }
    }

    async fn taxonomies(&self) -> Vec<TaxonomyDef> {
        let route = format!("wp/v2/taxonomies?context={}", self.context());
        let Some(taxonomies) = self.optional_json::<OrderedMap<RestTaxonomy>>(&route).await
        else {
            return Vec::new();
        };

        let mut defs = Vec::with_capacity(taxonomies.len());
        for rest in taxonomies.values() {
            let terms = match &rest.rest_base {
                Some(rest_base) => {
                    let route = format!("wp/v2/{}?per_page={}", rest_base, PER_PAGE);
                    self.optional_json::<Vec<RestTerm>>(&route)
                        .await
                        .unwrap_or_default()
                }
                None => Vec::new(),
            };

            defs.push(TaxonomyDef {
                name: rest.slug.clone(),
                label: rest.name.clone(),
                description: rest.description.clone(),
                object_type: rest.types.clone(),
                public: rest
                    .visibility
                    .as_ref()
                    .and_then(|v| v.public)
                    .unwrap_or(true),
                hierarchical: rest.hierarchical,
                show_in_rest: true,
                rest_base: rest.rest_base.clone(),
                capabilities: rest.capabilities.clone(),
                builtin: BUILTIN_TAXONOMIES.contains(&rest.slug.as_str()),
                terms: terms
                    .into_iter()
                    .map(|t| TermDef {
                        term_id: t.id,
                        name: t.name,
                        slug: t.slug,
                        count: t.count,
                        parent: t.parent,
                        description: t.description,
                    })
                    .collect(),
                term_meta: Vec::new(),
            });
        }
        defs
    }

    /// Installed plugins; `None` when the endpoint is not available to us
    async fn plugins(&self) -> Option<Vec<PluginDef>> {
        if !self.is_authenticated() {
            return None;
        }
        let plugins: Vec<RestPlugin> = self.optional_json("wp/v2/plugins").await?;
        Some(
            plugins
                .into_iter()
                .map(|p| PluginDef {
                    file: format!("{}.php", p.plugin),
                    name: p.name.into_text(),
                    version: p.version,
                    author: p.author.into_text(),
                    description: p.description.into_text(),
                    active: p.status == "active" || p.status == "network-active",
                    must_use: false,
                })
                .collect(),
        )
    }

    async fn active_theme(&self) -> Option<ThemeDef> {
        if !self.is_authenticated() {
            return None;
        }
        let themes: Vec<RestTheme> = self.optional_json("wp/v2/themes?status=active").await?;
        let active = themes.into_iter().next()?;

        let parent = if !active.template.is_empty() && active.template != active.stylesheet {
            let route = format!("wp/v2/themes/{}", active.template);
            let parent = self.optional_json::<RestTheme>(&route).await;
            Some(match parent {
                Some(parent) => ParentTheme {
                    name: parent.name.into_text(),
                    version: parent.version,
                    template: parent.stylesheet,
                },
                None => ParentTheme {
                    name: active.template.clone(),
                    template: active.template.clone(),
                    ..Default::default()
                },
            })
        } else {
            None
        };

        Some(ThemeDef {
            name: active.name.into_text(),
            version: active.version,
            author: active.author.into_text(),
            description: active.description.into_text(),
            template: active.template,
            stylesheet: active.stylesheet,
            theme_uri: active.theme_uri.into_text(),
            text_domain: active.textdomain,
            parent,
            supports: active.theme_supports,
            is_block_theme: active.is_block_theme,
            ..Default::default()
        })
    }

    /// Public theme assets: stylesheets and `theme.json`
    async fn collect_theme_files(&self, theme: &mut ThemeDef, snapshot: &mut SiteSnapshot) {
        let Ok(theme_root) = self
            .base_url
            .join(&format!("{}{}/", WP_THEMES_PATH, theme.stylesheet))
        else {
            return;
        };

        for path in STYLESHEET_PATHS {
            let Ok(url) = theme_root.join(path) else {
                continue;
            };
            if let Ok(content) = self.fetch_page(&url).await {
                tracing::debug!("fetched stylesheet {}", path);
                theme.files.push(path.to_string());
                snapshot.stylesheets.push(Stylesheet {
                    path: path.to_string(),
                    content,
                });
            }
        }

        if let Ok(url) = theme_root.join("theme.json")
            && let Ok(body) = self.fetch_page(&url).await
            && let Ok(theme_json) = serde_json::from_str::<Value>(&body)
        {
            theme.files.push("theme.json".to_string());
            snapshot.theme_json = Some(theme_json);
        }
    }

    /// Role of the authenticated user; the REST API lists no others
    async fn current_role(&self) -> Option<RoleDef> {
        if !self.is_authenticated() {
            return None;
        }
        let me: RestUser = self.optional_json("wp/v2/users/me?context=edit").await?;
        let key = me.roles.first()?.clone();
        let capabilities = me
            .capabilities
            .iter()
            .filter(|(cap, _)| !me.roles.iter().any(|role| role == cap))
            .map(|(cap, granted)| (cap.to_string(), *granted))
            .collect();

        Some(RoleDef {
            name: title_case(&key),
            key,
            capabilities,
            user_count: 1,
        })
    }
}

fn total_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers.get(TOTAL_HEADER)?.to_str().ok()?.trim().parse().ok()
}

fn security_headers(headers: &HeaderMap) -> OrderedMap<String> {
    SECURITY_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Version from `<meta name="generator" content="WordPress X.Y.Z">`
fn version_from_meta(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='generator']").ok()?;

    for element in document.select(&selector) {
        if let Some(content) = element.value().attr("content")
            && let Some(version) = content.strip_prefix("WordPress ")
        {
            let version = version.trim();
            if !version.is_empty() {
                return Some(version.to_string());
            }
        }
    }
    None
}

fn stylesheet_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("link[rel='stylesheet']") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Theme slug and version from the homepage asset URLs
fn theme_from_html(stylesheet_hrefs: &[String], html: &str) -> Option<ThemeDef> {
    let from_link = stylesheet_hrefs.iter().find_map(|href| {
        let caps = THEME_PATH_RE.captures(href)?;
        Some((caps[1].to_string(), version_param(href)))
    });

    let (slug, version) = match from_link {
        Some(found) => found,
        None => (THEME_PATH_RE.captures(html)?[1].to_string(), None),
    };

    tracing::debug!("theme {} detected from homepage assets", slug);
    Some(ThemeDef {
        name: slug.clone(),
        version: version.unwrap_or_default(),
        template: slug.clone(),
        stylesheet: slug,
        ..Default::default()
    })
}

/// Plugins whose assets the homepage loads; all of them are active
fn plugins_from_html(html: &str) -> Vec<PluginDef> {
    let mut plugins: Vec<PluginDef> = Vec::new();

    for caps in PLUGIN_PATH_RE.captures_iter(html) {
        let slug = &caps[2];
        if SKIP_PLUGIN_SLUGS.contains(&slug) || plugins.iter().any(|p| p.name == slug) {
            continue;
        }
        let must_use = caps.get(1).is_some();
        plugins.push(PluginDef {
            file: format!("{}/{}.php", slug, slug),
            name: slug.to_string(),
            version: find_plugin_version(html, slug).unwrap_or_default(),
            active: true,
            must_use,
            ..Default::default()
        });
    }
    plugins
}

/// Plugin version from a `ver=` parameter on one of its asset URLs
fn find_plugin_version(html: &str, slug: &str) -> Option<String> {
    let pattern = format!(
        r#"/wp-content/(?:mu-)?plugins/{}/[^'"]*\?[^'"]*ver=([0-9a-zA-Z._-]+)"#,
        regex::escape(slug)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(html)?;
    Some(normalize_version(caps.get(1)?.as_str()))
}

fn version_param(url: &str) -> Option<String> {
    let v_start = url.find("ver=")? + 4;
    let v_end = url[v_start..]
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '.' && c != '-' && c != '_')
        .map(|i| v_start + i)
        .unwrap_or(url.len());
    Some(normalize_version(&url[v_start..v_end]))
}

/// Mark cache-busting timestamps and commit hashes used as asset versions
pub fn normalize_version(version: &str) -> String {
    // Unix timestamp (10 digits, starts with 1 or 2)
    if version.len() == 10
        && version.chars().all(|c| c.is_ascii_digit())
        && version.starts_with(['1', '2'])
    {
        return format!("(timestamp:{})", version);
    }

    // Git commit hash (7+ hex chars)
    if version.len() >= 7
        && version.chars().all(|c| c.is_ascii_hexdigit())
        && !version.chars().all(|c| c.is_ascii_digit())
    {
        return format!("(hash:{})", &version[..7]);
    }

    version.to_string()
}

/// Meta keys seen on sampled posts, with counts and sample values
fn meta_from_posts(posts: &[RestPost]) -> Vec<MetaKeyDef> {
    let mut fields: Vec<MetaKeyDef> = Vec::new();
    for meta in posts.iter().filter_map(|p| p.meta.as_object()) {
        for (key, value) in meta {
            let index = match fields.iter().position(|f| &f.key == key) {
                Some(index) => index,
                None => {
                    fields.push(MetaKeyDef {
                        key: key.clone(),
                        is_protected: key.starts_with('_'),
                        is_registered: true,
                        ..Default::default()
                    });
                    fields.len() - 1
                }
            };
            let field = &mut fields[index];
            if is_empty_meta(value) {
                continue;
            }
            field.usage_count += 1;
            field.sample_values.push(meta_sample(value));
        }
    }
    fields
}

fn registered_meta(key: &str, posts: &[RestPost]) -> RegisteredMeta {
    let sample = posts
        .iter()
        .filter_map(|p| p.meta.get(key))
        .find(|value| !value.is_null());

    RegisteredMeta {
        key: key.to_string(),
        kind: match sample {
            Some(Value::Bool(_)) => "boolean",
            Some(Value::Number(n)) if n.is_f64() => "number",
            Some(Value::Number(_)) => "integer",
            Some(Value::Array(_)) => "array",
            Some(Value::Object(_)) => "object",
            _ => "string",
        }
        .to_string(),
        description: String::new(),
        single: !matches!(sample, Some(Value::Array(_))),
        show_in_rest: true,
    }
}

fn is_empty_meta(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn meta_sample(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
