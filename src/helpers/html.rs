//! HTML helper functions

use super::url::url_for;
use crate::config::SiteConfig;

/// Generate an image tag
///
/// # Examples
/// ```ignore
/// image_tag(&config, "https://images.prismic.io/banner.png", Some("Post banner"), None)
/// ```
pub fn image_tag(
    config: &SiteConfig,
    path: &str,
    alt: Option<&str>,
    class: Option<&str>,
) -> String {
    let src = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        url_for(config, path)
    };

    let class_attr = class
        .map(|c| format!(r#" class="{}""#, html_escape(c)))
        .unwrap_or_default();

    format!(
        r#"<img{} src="{}" alt="{}">"#,
        class_attr,
        html_escape(&src),
        html_escape(alt.unwrap_or(""))
    )
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="spacetraveling {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
