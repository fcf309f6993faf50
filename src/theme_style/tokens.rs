//! Token tables and selector lists for style extraction
//!
//! Each table maps a semantic token name to candidates ordered from most to
//! least specific. Candidates starting with `--` are custom properties; the
//! rest are selectors (or, for effects, plain properties).

/// Ordered candidate list per semantic token
pub type TokenTable = &'static [(&'static str, &'static [&'static str])];

/// Stylesheets read from the theme directory, main stylesheet first
pub const STYLESHEET_PATHS: [&str; 7] = [
    "style.css",
    "assets/css/style.css",
    "assets/css/main.css",
    "css/style.css",
    "css/main.css",
    "dist/style.css",
    "dist/main.css",
];

pub const COLOR_TOKENS: TokenTable = &[
    ("primary", &["--wp--preset--color--primary", "--color-primary", "--primary"]),
    ("secondary", &["--wp--preset--color--secondary", "--color-secondary", "--secondary"]),
    ("accent", &["--wp--preset--color--accent", "--color-accent", "--accent"]),
    ("background", &["--wp--preset--color--background", "--color-background", "--bg-color"]),
    ("foreground", &["--wp--preset--color--foreground", "--color-text", "--text-color"]),
    ("heading", &["--wp--preset--color--heading", "--color-heading", "--heading-color"]),
    ("link", &["--wp--preset--color--link", "--color-link", "--link-color"]),
    ("link_hover", &["--wp--preset--color--link-hover", "--color-link-hover", "--link-hover"]),
    ("button", &["--wp--preset--color--button", "--color-button", "--button-color"]),
    (
        "button_hover",
        &["--wp--preset--color--button-hover", "--color-button-hover", "--button-hover"],
    ),
    ("border", &["--wp--preset--color--border", "--color-border", "--border-color"]),
    ("success", &["--wp--preset--color--success", "--color-success", "--success"]),
    ("warning", &["--wp--preset--color--warning", "--color-warning", "--warning"]),
    (
        "error",
        &["--wp--preset--color--error", "--color-error", "--error", "--danger"],
    ),
];

pub const TYPOGRAPHY_TOKENS: TokenTable = &[
    (
        "font_family_base",
        &["--wp--preset--font-family--system", "--font-family-base", "body"],
    ),
    (
        "font_family_heading",
        &[
            "--wp--preset--font-family--heading",
            "--font-family-heading",
            "h1, h2, h3, h4, h5, h6",
        ],
    ),
    (
        "font_family_mono",
        &["--wp--preset--font-family--monospace", "--font-family-mono", "code, pre"],
    ),
    ("font_size_base", &["--wp--preset--font-size--normal", "--font-size-base", "body"]),
    ("font_size_h1", &["--wp--preset--font-size--huge", "--font-size-h1", "h1"]),
    ("font_size_h2", &["--wp--preset--font-size--x-large", "--font-size-h2", "h2"]),
    ("font_size_h3", &["--wp--preset--font-size--large", "--font-size-h3", "h3"]),
    (
        "line_height_base",
        &["--wp--custom--line-height--normal", "--line-height-base", "body"],
    ),
    ("font_weight_normal", &["--wp--custom--font-weight--normal", "--font-weight-normal"]),
    ("font_weight_bold", &["--wp--custom--font-weight--bold", "--font-weight-bold"]),
];

pub const SPACING_TOKENS: TokenTable = &[
    ("spacing_unit", &["--wp--preset--spacing--unit", "--spacing-unit", "--space-1"]),
    ("spacing_xs", &["--wp--preset--spacing--20", "--spacing-xs", "--space-xs"]),
    ("spacing_sm", &["--wp--preset--spacing--30", "--spacing-sm", "--space-sm"]),
    ("spacing_md", &["--wp--preset--spacing--40", "--spacing-md", "--space-md"]),
    ("spacing_lg", &["--wp--preset--spacing--50", "--spacing-lg", "--space-lg"]),
    ("spacing_xl", &["--wp--preset--spacing--60", "--spacing-xl", "--space-xl"]),
    ("container_padding", &["--wp--custom--spacing--outer", "--container-padding"]),
    ("grid_gap", &["--wp--style--block-gap", "--grid-gap", "--gap"]),
];

pub const LAYOUT_TOKENS: TokenTable = &[
    (
        "container_width",
        &["--wp--custom--layout--content-size", "--container-width", ".container"],
    ),
    ("wide_width", &["--wp--custom--layout--wide-size", "--wide-width", ".alignwide"]),
    ("grid_columns", &["--wp--custom--layout--grid-columns", "--grid-columns"]),
    ("breakpoint_sm", &["--wp--custom--breakpoint--sm", "--breakpoint-sm"]),
    ("breakpoint_md", &["--wp--custom--breakpoint--md", "--breakpoint-md"]),
    ("breakpoint_lg", &["--wp--custom--breakpoint--lg", "--breakpoint-lg"]),
];

pub const EFFECT_TOKENS: TokenTable = &[
    ("border_radius", &["--wp--custom--border--radius", "--border-radius", "border-radius"]),
    ("box_shadow", &["--wp--custom--shadow--natural", "--box-shadow", "box-shadow"]),
    ("transition", &["--wp--custom--transition--duration", "--transition", "transition"]),
];

pub const BUTTON_SELECTORS: &[&str] = &[
    ".button",
    ".btn",
    ".wp-block-button__link",
    "button",
    r#"input[type="submit"]"#,
    r#"input[type="button"]"#,
];

pub const FORM_SELECTORS: &[&str] = &[
    r#"input[type="text"]"#,
    r#"input[type="email"]"#,
    "textarea",
    "select",
    ".form-control",
    ".input",
];

pub const CARD_SELECTORS: &[&str] = &[".card", ".box", ".panel", ".wp-block-group", "article"];

pub const NAVIGATION_SELECTORS: &[&str] =
    &[".navigation", ".nav", ".menu", ".wp-block-navigation", "nav"];

/// Properties kept from a component block, in report order
pub const COMPONENT_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "background",
    "border",
    "border-radius",
    "padding",
    "margin",
    "font-family",
    "font-size",
    "font-weight",
    "line-height",
    "text-decoration",
    "text-transform",
    "box-shadow",
    "transition",
];

/// Signature strings per framework; two hits mean the framework is in use
pub const FRAMEWORK_SIGNATURES: &[(&str, &[&str])] = &[
    ("bootstrap", &[".container-fluid", ".row", ".col-", "btn-primary"]),
    ("tailwind", &[".flex", ".grid", ".bg-", ".text-", "hover:"]),
    ("foundation", &[".row", ".columns", ".button", ".callout"]),
    ("bulma", &[".columns", ".column", ".button", ".hero"]),
    ("materialize", &[".materialize", ".waves-effect", ".card-panel"]),
];

pub const FRAMEWORK_THRESHOLD: usize = 2;

/// Theme supports reported in the style guide's theme information
pub const STYLE_SUPPORTS: [&str; 12] = [
    "custom-logo",
    "custom-header",
    "custom-background",
    "post-thumbnails",
    "editor-styles",
    "wp-block-styles",
    "responsive-embeds",
    "editor-color-palette",
    "editor-font-sizes",
    "custom-line-height",
    "custom-units",
    "custom-spacing",
];

/// Customizer settings that hold colors
pub const STYLE_MODS: [&str; 5] = [
    "background_color",
    "header_textcolor",
    "link_color",
    "main_text_color",
    "secondary_text_color",
];
