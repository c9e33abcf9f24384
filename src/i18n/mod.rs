//! Locales and localized strings for the landing site.
//!
//! - `registry`: the four supported locales and their metadata
//! - `language`: the `Locale` type validated against the registry
//! - `store`: lazily loaded per-locale dictionaries with dotted-path lookup
//! - `validator`: placeholder, URL and tag checks for translated strings
//!
//! ```rust,ignore
//! use landing_i18n_core::i18n::{Locale, LocaleStore};
//!
//! let store = LocaleStore::new("locales");
//! let title = store.resolve(Locale::ENGLISH, "hero.title", None).await;
//! ```

mod language;
mod registry;
mod store;
mod validator;

pub use language::{Locale, UnknownLocale};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use store::LocaleStore;
pub use validator::{TranslationValidator, ValidationReport};
