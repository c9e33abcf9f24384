//! Locale type: a code validated against the registry.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A supported locale.
///
/// Only codes present in the registry can be turned into a `Locale`, so every
/// value refers to a known configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
    code: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown locale code: '{0}'")]
pub struct UnknownLocale(pub String);

impl Locale {
    pub const RUSSIAN: Locale = Locale { code: "ru" };
    pub const ENGLISH: Locale = Locale { code: "en" };
    pub const CHINESE: Locale = Locale { code: "zh" };
    pub const THAI: Locale = Locale { code: "th" };

    /// Create a Locale from a language code string (case-insensitive).
    pub fn from_code(code: &str) -> Result<Locale, UnknownLocale> {
        let normalized = code.trim().to_ascii_lowercase();
        LanguageRegistry::get()
            .get_by_code(&normalized)
            .map(|config| Locale { code: config.code })
            .ok_or_else(|| UnknownLocale(code.to_string()))
    }

    /// The base (source) locale all strings are authored in.
    pub fn base() -> Locale {
        Locale {
            code: LanguageRegistry::get().base().code,
        }
    }

    /// Every registered locale, base first.
    pub fn all() -> Vec<Locale> {
        LanguageRegistry::get()
            .list_all()
            .iter()
            .map(|config| Locale { code: config.code })
            .collect()
    }

    /// Locales the sync sweep translates into.
    pub fn auto_translate_targets() -> Vec<Locale> {
        LanguageRegistry::get()
            .list_auto_translate()
            .into_iter()
            .map(|config| Locale { code: config.code })
            .collect()
    }

    /// Every non-base locale.
    pub fn targets() -> Vec<Locale> {
        LanguageRegistry::get()
            .list_targets()
            .into_iter()
            .map(|config| Locale { code: config.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Full configuration from the registry.
    ///
    /// Locales are only constructed from registry entries, so the lookup
    /// falls back to the base entry purely to stay total.
    pub fn config(&self) -> &'static LanguageConfig {
        let registry = LanguageRegistry::get();
        registry
            .get_by_code(self.code)
            .unwrap_or_else(|| registry.base())
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn flag(&self) -> &'static str {
        self.config().flag
    }

    pub fn is_base(&self) -> bool {
        self.config().is_base
    }

    pub fn auto_translate(&self) -> bool {
        self.config().auto_translate
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code)
    }
}

impl std::str::FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Locale::from_code(&code).map_err(serde::de::Error::custom)
    }
}
