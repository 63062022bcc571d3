//! Internationalization (i18n) support
//!
//! UI strings ship built in for `en` and `pt-BR`; a site can override or
//! add languages with `languages/<lang>.yml` files.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_EN: &str = r#"
load_more: Load more posts
loading: Loading...
not_found: Post not found
banner_alt: Post banner
reading_time: "%d min"
"#;

const BUILTIN_PT_BR: &str = r#"
load_more: Carregar mais posts
loading: Carregando...
not_found: Post não encontrado
banner_alt: Banner do post
reading_time: "%d min"
"#;

/// Internationalization handler
#[derive(Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a handler without any translations
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            translations: HashMap::new(),
        }
    }

    /// Create a handler preloaded with the built-in strings
    pub fn with_builtin(language: &str) -> Self {
        let mut i18n = Self::new(language);
        for (lang, source) in [("en", BUILTIN_EN), ("pt-BR", BUILTIN_PT_BR)] {
            match serde_yaml::from_str(source) {
                Ok(data) => {
                    i18n.translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::warn!("Invalid built-in language {}: {}", lang, e),
            }
        }
        i18n
    }

    /// Load language files from a directory, merging over existing keys
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let lang = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("en")
                .to_string();

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    self.translations.entry(lang).or_default().extend(data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// Get a translation by key
    pub fn get(&self, key: &str) -> String {
        self.get_for_lang(&self.language, key)
    }

    /// Get a translation for a specific language
    pub fn get_for_lang(&self, lang: &str, key: &str) -> String {
        let lookup = |lang: &str| {
            self.translations
                .get(lang)
                .and_then(|data| data.get(key))
                .map(yaml_value_to_string)
        };

        // Exact language, then its base (pt-BR -> pt), then English
        let base = lang.split(['-', '_']).next().unwrap_or(lang);
        lookup(lang)
            .or_else(|| lookup(base))
            .or_else(|| lookup("en"))
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by a number
    pub fn get_count(&self, key: &str, count: usize) -> String {
        self.get(key).replace("%d", &count.to_string())
    }
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::with_builtin("en")
    }
}
