//! Language registry: Single source of truth for all supported locales.
//!
//! The registry is static and immutable. It is initialized once on first
//! access through a `OnceLock` and shared by every component.

use std::sync::OnceLock;

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "ru", "en")
    pub code: &'static str,

    /// English name of the language
    pub name: &'static str,

    /// Native name of the language (e.g., "Русский", "ไทย")
    pub native_name: &'static str,

    /// Flag emoji shown in the language switcher and in notifications
    pub flag: &'static str,

    /// Whether missing strings for this locale are filled by machine translation
    pub auto_translate: bool,

    /// Whether this is the base/source locale (exactly one must be true)
    pub is_base: bool,
}

/// Global language registry.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All locales, in display order (base first).
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// Locales that are translation targets (everything except the base).
    pub fn list_targets(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| !lang.is_base).collect()
    }

    /// Locales whose missing strings the sync sweep fills automatically.
    pub fn list_auto_translate(&self) -> Vec<&LanguageConfig> {
        self.languages
            .iter()
            .filter(|lang| lang.auto_translate && !lang.is_base)
            .collect()
    }

    /// The base (source) locale.
    ///
    /// The registry is built from a fixed table with exactly one base entry,
    /// so the first entry is returned if the table is ever edited incorrectly.
    pub fn base(&self) -> &LanguageConfig {
        self.languages
            .iter()
            .find(|lang| lang.is_base)
            .unwrap_or(&self.languages[0])
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// The four locales served by the landing page. Russian is the source language.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "ru",
            name: "Russian",
            native_name: "Русский",
            flag: "🇷🇺",
            auto_translate: false,
            is_base: true,
        },
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            flag: "🇬🇧",
            auto_translate: true,
            is_base: false,
        },
        LanguageConfig {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
            flag: "🇨🇳",
            auto_translate: true,
            is_base: false,
        },
        LanguageConfig {
            code: "th",
            name: "Thai",
            native_name: "ไทย",
            flag: "🇹🇭",
            auto_translate: true,
            is_base: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_four_locales_registered() {
        let registry = LanguageRegistry::get();
        let codes: Vec<_> = registry.list_all().iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["ru", "en", "zh", "th"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_base_is_russian() {
        let base = LanguageRegistry::get().base();
        assert_eq!(base.code, "ru");
        assert!(!base.auto_translate);
    }

    #[test]
    fn test_exactly_one_base() {
        let registry = LanguageRegistry::get();
        assert_eq!(registry.list_all().iter().filter(|l| l.is_base).count(), 1);
    }

    #[test]
    fn test_targets_exclude_base() {
        let targets = LanguageRegistry::get().list_targets();
        assert_eq!(targets.len(), 3);
        assert!(targets.iter().all(|l| l.code != "ru"));
    }

    #[test]
    fn test_auto_translate_locales() {
        let auto: Vec<_> = LanguageRegistry::get()
            .list_auto_translate()
            .iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(auto, vec!["en", "zh", "th"]);
    }

    #[test]
    fn test_get_by_code_thai() {
        let config = LanguageRegistry::get().get_by_code("th").unwrap();
        assert_eq!(config.native_name, "ไทย");
        assert_eq!(config.flag, "🇹🇭");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LanguageRegistry::get().get_by_code("fr").is_none());
    }
}
