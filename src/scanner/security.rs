//! Security scanner

use super::{PerformanceMetrics, PerformanceMonitor, ScanContext, Scanner, to_output};
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::site::{FilePermission, RoleDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Files and directories whose permissions are reported
pub const CRITICAL_PATHS: [&str; 4] = ["wp-config.php", ".htaccess", "wp-content", "uploads"];

/// Capabilities WordPress core grants to its default roles
const CORE_CAPABILITIES: &[&str] = &[
    "switch_themes",
    "edit_themes",
    "activate_plugins",
    "edit_plugins",
    "edit_users",
    "edit_files",
    "manage_options",
    "moderate_comments",
    "manage_categories",
    "manage_links",
    "upload_files",
    "unfiltered_html",
    "edit_posts",
    "edit_others_posts",
    "edit_published_posts",
    "publish_posts",
    "edit_pages",
    "read",
    "edit_others_pages",
    "edit_published_pages",
    "publish_pages",
    "delete_pages",
    "delete_others_pages",
    "delete_published_pages",
    "delete_posts",
    "delete_others_posts",
    "delete_published_posts",
    "delete_private_posts",
    "edit_private_posts",
    "read_private_posts",
    "delete_private_pages",
    "edit_private_pages",
    "read_private_pages",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityReport {
    pub user_roles: UserRoles,
    pub capabilities: CapabilitySummary,
    pub file_permissions: OrderedMap<FilePermission>,
    pub security_headers: SecurityHeaders,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRoles {
    pub total_roles: usize,
    pub roles: OrderedMap<RoleSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSummary {
    pub name: String,
    /// Capabilities the role is granted
    pub capabilities: Vec<String>,
    pub user_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySummary {
    pub total_capabilities: usize,
    pub custom_capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeaders {
    pub ssl_enabled: bool,
    pub admin_ssl: bool,
    pub debug_mode: bool,
    pub debug_display: bool,
    pub script_debug: bool,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub response_headers: OrderedMap<String>,
}

/// Reports roles, capabilities, file permissions and security flags
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityScanner;

impl Scanner for SecurityScanner {
    fn id(&self) -> &'static str {
        "security"
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Result<Value> {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("security_scan");

        let site = ctx.site;
        let flags = &site.security;

        let report = SecurityReport {
            user_roles: UserRoles {
                total_roles: site.roles.len(),
                roles: site
                    .roles
                    .iter()
                    .map(|role| (role.key.clone(), role_summary(role)))
                    .collect(),
            },
            capabilities: capability_summary(&site.roles),
            file_permissions: CRITICAL_PATHS
                .iter()
                .map(|name| {
                    let perm = site.file_permissions.get(name).cloned().unwrap_or_default();
                    (name.to_string(), perm)
                })
                .collect(),
            security_headers: SecurityHeaders {
                ssl_enabled: flags.ssl_enabled,
                admin_ssl: flags.admin_ssl,
                debug_mode: flags.debug_mode,
                debug_display: flags.debug_display,
                script_debug: flags.script_debug,
                response_headers: flags.headers.clone(),
            },
            performance_metrics: monitor.end("security_scan"),
        };

        to_output(&report)
    }
}

fn role_summary(role: &RoleDef) -> RoleSummary {
    RoleSummary {
        name: role.name.clone(),
        capabilities: role
            .capabilities
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(cap, _)| cap.to_string())
            .collect(),
        user_count: role.user_count,
    }
}

fn capability_summary(roles: &[RoleDef]) -> CapabilitySummary {
    let mut all: Vec<&str> = Vec::new();
    for role in roles {
        for cap in role.capabilities.keys() {
            if !all.contains(&cap) {
                all.push(cap);
            }
        }
    }

    CapabilitySummary {
        total_capabilities: all.len(),
        custom_capabilities: all
            .into_iter()
            .filter(|cap| !CORE_CAPABILITIES.contains(cap) && !cap.starts_with("level_"))
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheHandler;
    use crate::config::Settings;
    use crate::site::SiteSnapshot;

    fn role(key: &str, caps: &[(&str, bool)], users: u64) -> RoleDef {
        let mut capabilities = OrderedMap::new();
        for (cap, granted) in caps {
            capabilities.insert(*cap, *granted);
        }
        RoleDef {
            key: key.to_string(),
            name: key.to_string(),
            capabilities,
            user_count: users,
        }
    }

    fn scan(site: &SiteSnapshot) -> SecurityReport {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        let settings = Settings::default();
        let value = SecurityScanner
            .scan(&ScanContext::new(site, &cache, &settings))
            .unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn roles_and_custom_capabilities() {
        let site = SiteSnapshot {
            roles: vec![
                role(
                    "administrator",
                    &[("manage_options", true), ("edit_posts", true), ("level_10", true)],
                    1,
                ),
                role(
                    "shop_manager",
                    &[("edit_posts", true), ("manage_woocommerce", true), ("read", false)],
                    3,
                ),
            ],
            ..Default::default()
        };
        let report = scan(&site);

        assert_eq!(report.user_roles.total_roles, 2);
        let manager = report.user_roles.roles.get("shop_manager").unwrap();
        assert_eq!(manager.capabilities, vec!["edit_posts", "manage_woocommerce"]);
        assert_eq!(manager.user_count, 3);
        assert_eq!(report.capabilities.total_capabilities, 5);
        assert_eq!(report.capabilities.custom_capabilities, vec!["manage_woocommerce"]);
    }

    #[test]
    fn unknown_paths_are_reported_missing() {
        let mut site = SiteSnapshot::default();
        site.file_permissions.insert(
            "wp-config.php",
            FilePermission {
                exists: true,
                writable: Some(false),
                permissions: Some("0440".to_string()),
            },
        );
        site.security.ssl_enabled = true;

        let report = scan(&site);
        assert_eq!(
            report.file_permissions.keys().collect::<Vec<_>>(),
            CRITICAL_PATHS.to_vec()
        );
        assert_eq!(
            report.file_permissions.get("wp-config.php").unwrap().permissions.as_deref(),
            Some("0440")
        );
        assert!(!report.file_permissions.get("uploads").unwrap().exists);
        assert!(report.security_headers.ssl_enabled);
        assert!(report.security_headers.response_headers.is_empty());
    }
}
