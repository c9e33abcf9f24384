//! Locale store: lazily loaded per-locale JSON dictionaries.
//!
//! Dictionaries live at `<dir>/<code>.json` and are nested JSON objects.
//! Lookups use dotted paths (`hero.title`). A missing string never fails the
//! caller: it resolves to the supplied fallback, or to the path itself so the
//! gap is visible on the rendered page.

use crate::i18n::Locale;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct LocaleStore {
    dir: PathBuf,
    /// One cell per registered locale; `OnceCell` guarantees a single in-flight load.
    dictionaries: HashMap<Locale, OnceCell<Value>>,
    loads: AtomicUsize,
}

impl LocaleStore {
    /// Create a store reading dictionaries from `dir`. Nothing is read until first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dictionaries: Locale::all()
                .into_iter()
                .map(|locale| (locale, OnceCell::new()))
                .collect(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Create a store from dictionaries already in memory.
    ///
    /// Locales not present in `dictionaries` behave as if their file failed to load.
    pub fn from_dictionaries(dictionaries: HashMap<Locale, Value>) -> Self {
        let mut dictionaries = dictionaries;
        Self {
            dir: PathBuf::new(),
            dictionaries: Locale::all()
                .into_iter()
                .map(|locale| {
                    let dict = dictionaries
                        .remove(&locale)
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    (locale, OnceCell::new_with(Some(dict)))
                })
                .collect(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve `path` in `locale`'s dictionary.
    ///
    /// Returns `fallback` when given and the string is missing, else `path` unchanged.
    pub async fn resolve(&self, locale: Locale, path: &str, fallback: Option<&str>) -> String {
        match self.lookup(locale, path).await {
            Some(text) => text,
            None => fallback.unwrap_or(path).to_string(),
        }
    }

    /// Resolve and substitute `{{name}}` placeholders.
    pub async fn resolve_with(&self, locale: Locale, path: &str, vars: &[(&str, &str)]) -> String {
        let mut text = self.resolve(locale, path, None).await;
        for (name, value) in vars {
            text = text.replace(&format!("{{{{{}}}}}", name), value);
        }
        text
    }

    /// Resolve in `locale`, then in the base locale, then fall back to the path.
    pub async fn resolve_or_base(&self, locale: Locale, path: &str) -> String {
        if let Some(text) = self.lookup(locale, path).await {
            return text;
        }
        if !locale.is_base() {
            if let Some(text) = self.lookup(Locale::base(), path).await {
                return text;
            }
        }
        path.to_string()
    }

    /// Number of dictionary files read so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn lookup(&self, locale: Locale, path: &str) -> Option<String> {
        let dictionary = self.dictionary(locale).await?;
        resolve_dotted(dictionary, path)
    }

    async fn dictionary(&self, locale: Locale) -> Option<&Value> {
        let cell = self.dictionaries.get(&locale)?;
        Some(cell.get_or_init(|| self.load(locale)).await)
    }

    async fn load(&self, locale: Locale) -> Value {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("{}.json", locale.code()));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read locale file {}: {}", path.display(), e);
                return Value::Object(Map::new());
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(value @ Value::Object(_)) => {
                debug!("Loaded locale dictionary {}", path.display());
                value
            }
            Ok(_) => {
                warn!("Locale file {} is not a JSON object", path.display());
                Value::Object(Map::new())
            }
            Err(e) => {
                warn!("Failed to parse locale file {}: {}", path.display(), e);
                Value::Object(Map::new())
            }
        }
    }
}

/// Walk nested objects by dotted path. Array segments may be numeric indices.
fn resolve_dotted(root: &Value, path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_locale(dir: &TempDir, code: &str, value: &Value) {
        std::fs::write(dir.path().join(format!("{}.json", code)), value.to_string())
            .expect("Failed to write locale file");
    }

    fn sample_store() -> LocaleStore {
        let mut dictionaries = HashMap::new();
        dictionaries.insert(
            Locale::RUSSIAN,
            json!({
                "hero": { "title": "Инвестируйте с нами", "cta": "Оставить заявку" },
                "footer": { "copyright": "© 2024" },
                "greeting": "Здравствуйте, {{name}}!"
            }),
        );
        dictionaries.insert(
            Locale::ENGLISH,
            json!({
                "hero": { "title": "Invest with us" },
                "stats": { "clients": 1200, "licensed": true },
                "steps": ["Sign up", "Deposit"]
            }),
        );
        LocaleStore::from_dictionaries(dictionaries)
    }

    // ==================== resolve_dotted Tests ====================

    #[test]
    fn test_resolve_dotted_nested() {
        let data = json!({ "a": { "b": { "c": "deep" } } });
        assert_eq!(resolve_dotted(&data, "a.b.c"), Some("deep".into()));
        assert_eq!(resolve_dotted(&data, "a.b"), None);
        assert_eq!(resolve_dotted(&data, "a.x.c"), None);
        assert_eq!(resolve_dotted(&data, ""), None);
    }

    #[test]
    fn test_resolve_dotted_scalars_and_arrays() {
        let data = json!({ "n": 5, "flag": false, "list": ["zero", "one"] });
        assert_eq!(resolve_dotted(&data, "n"), Some("5".into()));
        assert_eq!(resolve_dotted(&data, "flag"), Some("false".into()));
        assert_eq!(resolve_dotted(&data, "list.1"), Some("one".into()));
        assert_eq!(resolve_dotted(&data, "list.7"), None);
        assert_eq!(resolve_dotted(&data, "n.more"), None);
    }

    // ==================== resolve Tests ====================

    #[tokio::test]
    async fn test_resolve_existing_key() {
        let store = sample_store();
        assert_eq!(
            store.resolve(Locale::RUSSIAN, "hero.title", None).await,
            "Инвестируйте с нами"
        );
        assert_eq!(store.resolve(Locale::ENGLISH, "steps.0", None).await, "Sign up");
    }

    #[tokio::test]
    async fn test_resolve_missing_returns_path() {
        let store = sample_store();
        assert_eq!(store.resolve(Locale::ENGLISH, "hero.cta", None).await, "hero.cta");
    }

    #[tokio::test]
    async fn test_resolve_missing_returns_fallback() {
        let store = sample_store();
        assert_eq!(
            store.resolve(Locale::THAI, "hero.title", Some("Welcome")).await,
            "Welcome"
        );
    }

    #[tokio::test]
    async fn test_resolve_object_node_is_missing() {
        let store = sample_store();
        assert_eq!(store.resolve(Locale::RUSSIAN, "hero", None).await, "hero");
    }

    #[tokio::test]
    async fn test_resolve_with_vars() {
        let store = sample_store();
        let text = store
            .resolve_with(Locale::RUSSIAN, "greeting", &[("name", "Анна")])
            .await;
        assert_eq!(text, "Здравствуйте, Анна!");
    }

    #[tokio::test]
    async fn test_resolve_or_base_falls_back_to_russian() {
        let store = sample_store();
        assert_eq!(
            store.resolve_or_base(Locale::ENGLISH, "hero.cta").await,
            "Оставить заявку"
        );
        assert_eq!(
            store.resolve_or_base(Locale::ENGLISH, "hero.title").await,
            "Invest with us"
        );
        assert_eq!(store.resolve_or_base(Locale::CHINESE, "nope").await, "nope");
    }

    // ==================== File Loading Tests ====================

    #[tokio::test]
    async fn test_loads_from_directory_once() {
        let dir = TempDir::new().unwrap();
        write_locale(&dir, "zh", &json!({ "hero": { "title": "与我们一起投资" } }));
        let store = LocaleStore::new(dir.path());

        assert_eq!(store.load_count(), 0);
        assert_eq!(store.resolve(Locale::CHINESE, "hero.title", None).await, "与我们一起投资");
        assert_eq!(store.resolve(Locale::CHINESE, "hero.missing", None).await, "hero.missing");
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_resolves_to_path() {
        let dir = TempDir::new().unwrap();
        let store = LocaleStore::new(dir.path());

        assert_eq!(store.resolve(Locale::THAI, "hero.title", None).await, "hero.title");
        assert_eq!(store.resolve(Locale::THAI, "hero.title", Some("x")).await, "x");
        // Failure is cached for the store's lifetime
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_resolves_to_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("en.json"), "{ not json").unwrap();
        let store = LocaleStore::new(dir.path());

        assert_eq!(store.resolve(Locale::ENGLISH, "a.b", None).await, "a.b");
    }

    #[tokio::test]
    async fn test_non_object_root_resolves_to_path() {
        let dir = TempDir::new().unwrap();
        write_locale(&dir, "en", &json!(["not", "an", "object"]));
        let store = LocaleStore::new(dir.path());

        assert_eq!(store.resolve(Locale::ENGLISH, "0", None).await, "0");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolves_load_once() {
        let dir = TempDir::new().unwrap();
        write_locale(&dir, "ru", &json!({ "hero": { "title": "Заголовок" } }));
        let store = Arc::new(LocaleStore::new(dir.path()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.resolve(Locale::RUSSIAN, "hero.title", None).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "Заголовок");
        }
        assert_eq!(store.load_count(), 1);
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_absent_path_returns_fallback_or_path(
            path in "[a-z]{1,6}(\\.[a-z]{1,6}){0,3}",
            fallback in proptest::option::of("[A-Za-z ]{0,12}"),
        ) {
            // "zzz" prefix keeps generated paths out of the sample dictionaries
            let path = format!("zzz{}", path);
            let store = sample_store();
            for locale in Locale::all() {
                let resolved = tokio_test::block_on(store.resolve(locale, &path, fallback.as_deref()));
                let expected = fallback.clone().unwrap_or_else(|| path.clone());
                prop_assert_eq!(resolved, expected);
            }
        }

        #[test]
        fn prop_resolve_never_panics(path in "\\PC{0,24}") {
            let store = sample_store();
            let resolved = tokio_test::block_on(store.resolve(Locale::ENGLISH, &path, None));
            prop_assert!(!resolved.is_empty() || path.is_empty());
        }
    }
}
