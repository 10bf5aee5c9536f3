//! Internationalization (i18n) support
//!
//! UI strings ship for `pt-BR` and `en`. A site can add languages or
//! override strings with flat `languages/<lang>.yml` files.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PT_BR: &str = r#"
loading: Carregando...
load_more: Carregar mais posts
prev_post: Post anterior
next_post: Próximo post
reading_time: "%d min"
not_found: Post não encontrado
error: Algo deu errado
"#;

const EN: &str = r#"
loading: Loading...
load_more: Load more posts
prev_post: Previous post
next_post: Next post
reading_time: "%d min"
not_found: Post not found
error: Something went wrong
"#;

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with the built-in languages
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, raw) in [("pt-BR", PT_BR), ("en", EN)] {
            match serde_yaml::from_str::<HashMap<String, String>>(raw) {
                Ok(data) => {
                    translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::warn!("Invalid built-in language {}: {}", lang, e),
            }
        }
        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Load language files from a directory
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
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, String>>(&content) {
                Ok(data) => {
                    self.translations
                        .entry(lang.to_string())
                        .or_default()
                        .extend(data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key, falling back to English and then the key
    pub fn get(&self, key: &str) -> String {
        [self.language.as_str(), "en"]
            .iter()
            .find_map(|lang| self.translations.get(*lang)?.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: usize) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// Every translation for the current language, English filling the gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = self
            .translations
            .get("en")
            .cloned()
            .unwrap_or_default();
        if let Some(current) = self.translations.get(&self.language) {
            result.extend(current.clone());
        }
        result
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_translations() {
        let i18n = I18n::new("pt-BR");
        assert_eq!(i18n.get("loading"), "Carregando...");
        assert_eq!(i18n.get("next_post"), "Próximo post");
        assert_eq!(i18n.get_count("reading_time", 4), "4 min");
        assert_eq!(i18n.get("unknown"), "unknown");
    }

    #[test]
    fn test_fallback_to_english() {
        let i18n = I18n::new("de");
        assert_eq!(i18n.get("prev_post"), "Previous post");
    }

    #[test]
    fn test_load_languages_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pt-BR.yml"), "load_more: Mais posts\n").unwrap();
        fs::write(dir.path().join("es.yml"), "loading: Cargando...\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut i18n = I18n::new("pt-BR");
        i18n.load_languages(dir.path()).unwrap();
        assert_eq!(i18n.get("load_more"), "Mais posts");
        assert_eq!(i18n.get("loading"), "Carregando...");

        let all = i18n.get_all_translations();
        assert_eq!(all.get("load_more"), Some(&"Mais posts".to_string()));

        let es = I18n {
            language: "es".to_string(),
            ..i18n
        };
        assert_eq!(es.get("loading"), "Cargando...");
        assert_eq!(es.get("next_post"), "Next post");
    }
}
