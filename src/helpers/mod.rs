//! Helper functions for templates
//!
//! URL, date and HTML helpers shared by the page generator and the
//! development server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;

use crate::config::SiteConfig;

/// Helpers bound to a site configuration
#[derive(Clone)]
pub struct Helpers {
    config: SiteConfig,
}

impl Helpers {
    /// Create a new helpers instance
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    /// Get url_for helper
    pub fn url_for(&self, path: &str) -> String {
        url_for(&self.config, path)
    }

    /// Get post_url helper
    pub fn post_url(&self, slug: &str) -> String {
        post_url(&self.config, slug)
    }

    /// Get image_tag helper
    pub fn image_tag(&self, path: &str, alt: Option<&str>, class: Option<&str>) -> String {
        image_tag(&self.config, path, alt, class)
    }

    /// Format a publication date with the site's format and language
    pub fn date(&self, date: Option<&str>) -> String {
        format_publication_date(date, &self.config.date_format, &self.config.language)
    }

    /// `datetime` attribute value for a `<time>` element
    pub fn date_attr(&self, date: Option<&str>) -> String {
        date.and_then(parse_date)
            .map(|dt| date_xml(&dt))
            .unwrap_or_default()
    }
}
