//! Cached, retrying text translation.
//!
//! The translation service and the cache are collaborators supplied by the
//! caller: anything implementing [`Translator`] and [`KvCache`]. Translations
//! survive restarts with a [`FileCache`].

use crate::core::describe::{Fields, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::tasks::TaskError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Calls to the translator before giving up on a text.
pub const MAX_ATTEMPTS: usize = 3;

/// Returned in place of a translation once every attempt has failed.
pub const ERROR_MARKER: &str = "<ERROR>";

/// A string key/value store.
pub trait KvCache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: &str);
}

impl<C: KvCache + ?Sized> KvCache for Arc<C> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) {
        (**self).put(key, value)
    }
}

/// An in-process [`KvCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

/// A [`KvCache`] stored as one JSON object on disk.
///
/// Every `put` rewrites the file, so an entry is durable once `put` returns.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileCache {
    /// Loads the store at `path`. A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| TaskError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(TaskError::io(&path)(e)),
        };
        log::debug!("Opened cache {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), TaskError> {
        let content = serde_json::to_string_pretty(entries).map_err(|source| TaskError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(TaskError::io(&self.path))
    }
}

impl KvCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        // The lock is held so concurrent writers cannot interleave files.
        if let Err(e) = self.persist(&entries) {
            log::warn!("Could not persist cache entry '{key}': {e}");
        }
    }
}

/// A remote translation service.
pub trait Translator: Send + Sync + 'static {
    /// Translates `text`; the reply may contain HTML entities.
    fn translate(&self, text: &str, target_language_code: &str) -> Result<String, WorkError>;
}

#[derive(Debug, Deserialize)]
pub struct TranslateParams {
    pub text: String,
    pub target_language_code: String,
}

impl Parameters for TranslateParams {
    fn declare(params: Fields) -> Fields {
        params
            .required::<String>("text")
            .with_default("target_language_code", "en".to_string())
    }
}

/// Translates one text, consulting the cache first.
pub struct Translate<T: Translator, C: KvCache = MemoryCache> {
    translator: T,
    cache: C,
}

impl<T: Translator> Translate<T> {
    pub fn new(translator: T) -> Self {
        Self::with_cache(translator, MemoryCache::new())
    }
}

impl<T: Translator, C: KvCache> Translate<T, C> {
    pub fn with_cache(translator: T, cache: C) -> Self {
        Self { translator, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn translate_with_retries(&self, text: &str, language: &str) -> Result<String, WorkError> {
        let mut attempt = 1;
        loop {
            match self.translator.translate(text, language) {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    log::debug!("Translation attempt {attempt} failed: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: Translator, C: KvCache> WorkLogic for Translate<T, C> {
    type Params = TranslateParams;
    type Output = String;

    fn name(&self) -> &str {
        "translate"
    }

    fn run(&self, params: TranslateParams) -> Result<Returned<String>, WorkError> {
        let key = format!("{}:{}", params.target_language_code, params.text);
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("Cache hit: {}", params.text);
            return Ok(cached.into());
        }

        log::info!("Translating: {}", params.text);
        match self.translate_with_retries(&params.text, &params.target_language_code) {
            Ok(reply) => {
                let translated = html_escape::decode_html_entities(&reply).into_owned();
                self.cache.put(&key, &translated);
                log::info!("Got translation: {translated}");
                Ok(translated.into())
            }
            Err(e) => {
                log::error!("Got error in translation: {e}");
                Ok(ERROR_MARKER.to_string().into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawConfig;
    use crate::core::task::Task;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls, then answers in upper case.
    struct Flaky {
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    impl Flaky {
        fn new(failures: usize) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    failures,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl Translator for Flaky {
        fn translate(&self, text: &str, target_language_code: &str) -> Result<String, WorkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err("service unavailable".into());
            }
            Ok(format!("[{target_language_code}] {}", text.to_uppercase()))
        }
    }

    fn raw(text: &str) -> RawConfig {
        let mut raw = RawConfig::new();
        raw.insert("text".into(), json!(text));
        raw
    }

    #[test]
    fn test_translates_and_caches() {
        let (translator, calls) = Flaky::new(0);
        let task = Task::new(Translate::new(translator)).unwrap();

        let first = task.execute(&raw("tom & jerry")).unwrap();
        let second = task.execute(&raw("tom & jerry")).unwrap();

        assert_eq!(first.as_deref(), Some("[en] TOM & JERRY"));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(task.logic().cache().len(), 1);
    }

    #[test]
    fn test_cache_is_per_language() {
        let (translator, calls) = Flaky::new(0);
        let task = Task::new(Translate::new(translator)).unwrap();
        let mut french = raw("hi");
        french.insert("target_language_code".into(), json!("fr"));

        assert_eq!(task.execute(&raw("hi")).unwrap().as_deref(), Some("[en] HI"));
        assert_eq!(task.execute(&french).unwrap().as_deref(), Some("[fr] HI"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_retries_before_succeeding() {
        let (translator, calls) = Flaky::new(MAX_ATTEMPTS - 1);
        let task = Task::new(Translate::new(translator)).unwrap();
        assert_eq!(task.execute(&raw("ok")).unwrap().as_deref(), Some("[en] OK"));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[test]
    fn test_exhausted_attempts_yield_marker_uncached() {
        let (translator, calls) = Flaky::new(usize::MAX);
        let cache = Arc::new(MemoryCache::new());
        let task = Task::new(Translate::with_cache(translator, Arc::clone(&cache))).unwrap();

        assert_eq!(task.execute(&raw("lost")).unwrap().as_deref(), Some(ERROR_MARKER));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert!(cache.is_empty());
    }

    /// Answers with the text as an HTML-escaped service would.
    struct Escaping;

    impl Translator for Escaping {
        fn translate(&self, text: &str, _target_language_code: &str) -> Result<String, WorkError> {
            Ok(match text {
                "quote" => "it&#39;s &quot;fine&quot; &amp; &lt;ok&gt;".to_string(),
                "cafe" => "caf&#xE9;".to_string(),
                other => other.to_string(),
            })
        }
    }

    #[test]
    fn test_replies_are_unescaped_before_caching() {
        let task = Task::new(Translate::new(Escaping)).unwrap();
        assert_eq!(
            task.execute(&raw("quote")).unwrap().as_deref(),
            Some("it's \"fine\" & <ok>")
        );
        assert_eq!(task.execute(&raw("cafe")).unwrap().as_deref(), Some("café"));
        assert_eq!(task.execute(&raw("fish & chips")).unwrap().as_deref(), Some("fish & chips"));
        assert_eq!(task.logic().cache().get("en:cafe").as_deref(), Some("café"));
    }

    #[test]
    fn test_file_cache_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.json");

        let cache = FileCache::open(&path).unwrap();
        assert!(cache.is_empty());
        cache.put("fr:water", "eau");
        cache.put("fr:water", "l'eau");
        cache.put("fr:bread", "pain");

        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("fr:water").as_deref(), Some("l'eau"));
        assert_eq!(reopened.get("de:water"), None);
    }

    #[test]
    fn test_translations_persist_across_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let (translator, calls) = Flaky::new(0);
        let task = Task::new(Translate::with_cache(translator, FileCache::open(&path).unwrap())).unwrap();
        task.execute(&raw("hello")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (translator, calls) = Flaky::new(usize::MAX);
        let task = Task::new(Translate::with_cache(translator, FileCache::open(&path).unwrap())).unwrap();
        assert_eq!(task.execute(&raw("hello")).unwrap().as_deref(), Some("[en] HELLO"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_corrupt_cache_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileCache::open(&path), Err(TaskError::Json { .. })));
    }
}
