//! Remote collection against a mocked WordPress REST API

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_site_analyzer::{Error, RemoteCollector, SiteSnapshot};

const HOMEPAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta name="generator" content="WordPress 6.5.2">
  <link rel="stylesheet" href="/wp-content/themes/bookshelf/style.css?ver=1.4.0">
  <link rel="stylesheet" href="/wp-content/plugins/contact-form-7/includes/css/styles.css?ver=5.9">
  <script src="/wp-content/mu-plugins/site-tools/loader.js"></script>
</head>
<body></body>
</html>"#;

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A public site: REST root, homepage, types, taxonomies and a stylesheet
async fn public_site() -> MockServer {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/wp-json/",
        json!({
            "name": "Demo Books",
            "description": "Reviews and loans",
            "url": "https://books.example.com",
            "home": "https://books.example.com",
            "namespaces": ["oembed/1.0", "wp/v2"]
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(HOMEPAGE, "text/html")
                .insert_header("x-frame-options", "SAMEORIGIN")
                .insert_header("x-content-type-options", "nosniff"),
        )
        .mount(&server)
        .await;

    mount_json(
        &server,
        "/wp-json/wp/v2/types",
        json!({
            "post": {
                "name": "Posts",
                "slug": "post",
                "hierarchical": false,
                "viewable": true,
                "has_archive": false,
                "rest_base": "posts",
                "taxonomies": ["category"]
            },
            "book": {
                "name": "Books",
                "slug": "book",
                "description": "Library catalogue",
                "hierarchical": false,
                "viewable": true,
                "has_archive": "library",
                "rest_base": "books",
                "taxonomies": []
            }
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"id": 1, "parent": 0, "meta": []},
                    {"id": 2, "parent": 0, "meta": []}
                ]))
                .insert_header("x-wp-total", "42"),
        )
        .mount(&server)
        .await;

    mount_json(
        &server,
        "/wp-json/wp/v2/books",
        json!([
            {"id": 10, "parent": 0, "meta": {"isbn": "978-0261103573", "rating": ""}},
            {"id": 11, "parent": 0, "meta": {"isbn": "", "rating": ""}}
        ]),
    )
    .await;

    mount_json(
        &server,
        "/wp-json/wp/v2/taxonomies",
        json!({
            "category": {
                "name": "Categories",
                "slug": "category",
                "types": ["post"],
                "hierarchical": true,
                "rest_base": "categories"
            }
        }),
    )
    .await;

    mount_json(
        &server,
        "/wp-json/wp/v2/categories",
        json!([
            {"id": 1, "name": "Uncategorized", "slug": "uncategorized", "count": 3, "parent": 0},
            {"id": 4, "name": "Reviews", "slug": "reviews", "count": 12, "parent": 0}
        ]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/wp-content/themes/bookshelf/style.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(":root { --color-primary: #3366ff; }", "text/css"),
        )
        .mount(&server)
        .await;

    server
}

async fn collect(server: &MockServer) -> wp_site_analyzer::Result<SiteSnapshot> {
    RemoteCollector::builder(&server.uri())
        .allow_private(true)
        .build()?
        .collect()
        .await
}

#[tokio::test]
async fn collects_public_site() {
    let server = public_site().await;
    let snapshot = collect(&server).await.unwrap();

    assert_eq!(snapshot.site.name, "Demo Books");
    assert_eq!(snapshot.site.url, "https://books.example.com");
    assert_eq!(snapshot.site.wordpress_version.as_deref(), Some("6.5.2"));

    assert_eq!(snapshot.post_types.len(), 2);
    let post = &snapshot.post_types[0];
    assert_eq!(post.name, "post");
    assert!(post.builtin);
    assert_eq!(post.count, 42);
    assert!(post.meta.is_empty());

    let book = &snapshot.post_types[1];
    assert!(!book.builtin);
    assert_eq!(book.count, 2);
    let isbn = book.meta.iter().find(|m| m.key == "isbn").unwrap();
    assert_eq!(isbn.usage_count, 1);
    assert_eq!(isbn.sample_values, vec!["978-0261103573"]);
    assert_eq!(snapshot.meta.post_meta_keys, vec!["isbn", "rating"]);

    let category = &snapshot.taxonomies[0];
    assert!(category.builtin);
    assert_eq!(category.terms.len(), 2);
    assert_eq!(category.terms[1].name, "Reviews");
}

#[tokio::test]
async fn public_site_falls_back_to_homepage_assets() {
    let server = public_site().await;
    let snapshot = collect(&server).await.unwrap();

    let names: Vec<&str> = snapshot.plugins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["contact-form-7", "site-tools"]);
    assert_eq!(snapshot.plugins[0].version, "5.9");
    assert!(!snapshot.plugins[0].must_use);
    assert!(snapshot.plugins[1].must_use);

    let theme = snapshot.theme.as_ref().unwrap();
    assert_eq!(theme.stylesheet, "bookshelf");
    assert_eq!(theme.version, "1.4.0");
    assert_eq!(theme.files, vec!["style.css"]);
    assert_eq!(snapshot.stylesheets.len(), 1);
    assert!(snapshot.stylesheets[0].content.contains("--color-primary"));
    assert!(snapshot.theme_json.is_none());

    // Roles need an authenticated user
    assert!(snapshot.roles.is_empty());

    assert!(!snapshot.security.ssl_enabled);
    assert_eq!(
        snapshot.security.headers.get("x-frame-options").map(String::as_str),
        Some("SAMEORIGIN")
    );
    assert!(snapshot.security.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn credentials_unlock_plugins_theme_and_role() {
    let server = public_site().await;
    // admin:secret
    let auth = || header("authorization", "Basic YWRtaW46c2VjcmV0");

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/plugins"))
        .and(auth())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "plugin": "akismet/akismet",
                "status": "inactive",
                "name": "Akismet Anti-spam",
                "version": "5.3",
                "author": {"raw": "Automattic", "rendered": "<a>Automattic</a>"},
                "description": {"raw": "Spam protection", "rendered": "<p>Spam protection</p>"}
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/themes"))
        .and(auth())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "stylesheet": "bookshelf",
                "template": "bookshelf",
                "name": {"raw": "Bookshelf", "rendered": "Bookshelf"},
                "version": "1.4.0",
                "textdomain": "bookshelf",
                "theme_supports": {"title-tag": true, "custom-logo": {"height": 60}}
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/users/me"))
        .and(auth())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roles": ["administrator"],
            "capabilities": {"administrator": true, "manage_options": true, "edit_posts": true}
        })))
        .mount(&server)
        .await;

    let snapshot = RemoteCollector::builder(&server.uri())
        .allow_private(true)
        .credentials("admin", "secret")
        .build()
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(snapshot.plugins.len(), 1);
    let akismet = &snapshot.plugins[0];
    assert_eq!(akismet.file, "akismet/akismet.php");
    assert_eq!(akismet.author, "Automattic");
    assert!(!akismet.active);

    let theme = snapshot.theme.as_ref().unwrap();
    assert_eq!(theme.name, "Bookshelf");
    assert_eq!(theme.text_domain, "bookshelf");
    assert!(theme.parent.is_none());
    assert!(theme.supports.contains_key("custom-logo"));

    assert_eq!(snapshot.roles.len(), 1);
    let role = &snapshot.roles[0];
    assert_eq!(role.key, "administrator");
    assert_eq!(role.name, "Administrator");
    assert!(!role.capabilities.contains_key("administrator"));
    assert_eq!(role.capabilities.get("manage_options"), Some(&true));
}

#[tokio::test]
async fn missing_rest_api_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = collect(&server).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus(404)));
}

#[tokio::test]
async fn non_wordpress_json_is_rejected() {
    let server = MockServer::start().await;
    mount_json(&server, "/wp-json/", json!({"status": "ok"})).await;

    let err = collect(&server).await.unwrap_err();
    assert!(matches!(err, Error::NotWordPress));
}

#[tokio::test]
async fn private_hosts_need_opt_in() {
    let server = MockServer::start().await;
    let err = RemoteCollector::new(&server.uri()).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}
