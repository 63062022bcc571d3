//! Initialize a new blog site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
i18n_dir: languages

# Date format
date_format: dd MMM yyyy
words_per_minute: 200

# Content API
api:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  # access_token: ''

# Home page setting
listing:
  page_size: 1
  order_by: my.post.date desc
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("languages"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, CONFIG_TEMPLATE)?;
    tracing::debug!("Wrote {:?}", config_path);

    Ok(())
}
