//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub i18n_dir: String,

    // Date format (date-fns style)
    pub date_format: String,

    // Reading time
    pub words_per_minute: usize,

    // Content API
    #[serde(default)]
    pub api: ApiConfig,

    // Home page
    #[serde(default)]
    pub listing: ListingConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            i18n_dir: "languages".to_string(),

            date_format: "dd MMM yyyy".to_string(),

            words_per_minute: 200,

            api: ApiConfig::default(),
            listing: ListingConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Content API connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Repository API root, e.g. `https://<repo>.cdn.prismic.io/api/v2`
    pub endpoint: String,
    /// Permanent access token for private repositories
    pub access_token: Option<String>,
}

/// Listing page query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Posts per page; every further page is loaded on demand
    pub page_size: u32,
    pub order_by: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 1,
            order_by: "my.post.date desc".to_string(),
        }
    }
}
