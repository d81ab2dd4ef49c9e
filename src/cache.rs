//! Explicit, injectable caching of resolution results across batches.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::conflation::ConflationConfig;
use crate::error::KgError;
use crate::nodenorm::{ResolutionClient, ResolutionMap, ResolutionRecord, prepare_curies};

/// Resolutions depend on the conflation flags, so both are part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub curie: String,
    pub conflation: ConflationConfig,
}

impl CacheKey {
    pub fn new(curie: impl Into<String>, conflation: ConflationConfig) -> Self {
        Self {
            curie: curie.into(),
            conflation,
        }
    }

    fn encode(&self) -> String {
        format!("{}|{}", self.conflation.tag(), self.curie)
    }

    fn decode(value: &str) -> Option<Self> {
        let (tag, curie) = value.split_once('|')?;
        let conflation = match tag {
            "gp=0,dc=0" => ConflationConfig::new(false, false),
            "gp=0,dc=1" => ConflationConfig::new(false, true),
            "gp=1,dc=0" => ConflationConfig::new(true, false),
            "gp=1,dc=1" => ConflationConfig::new(true, true),
            _ => return None,
        };
        Some(Self::new(curie, conflation))
    }
}

/// Storage for resolved (or known-unresolvable) identifiers.
///
/// `get` returns `None` on a miss and `Some(None)` for a cached negative.
pub trait ResolutionCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Option<ResolutionRecord>>;
    fn put(&self, key: CacheKey, value: Option<ResolutionRecord>);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Option<ResolutionRecord>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResolutionCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Option<ResolutionRecord>> {
        lock(&self.entries).get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: Option<ResolutionRecord>) {
        lock(&self.entries).insert(key, value);
    }
}

/// A cache backed by a JSON file, loaded on open and written by [`flush`].
///
/// [`flush`]: JsonFileCache::flush
#[derive(Debug)]
pub struct JsonFileCache {
    path: Utf8PathBuf,
    entries: Mutex<HashMap<CacheKey, Option<ResolutionRecord>>>,
}

impl JsonFileCache {
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, KgError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|err| KgError::Filesystem(format!("read cache {path}: {err}")))?;
            let stored: BTreeMap<String, Option<ResolutionRecord>> = serde_json::from_str(&content)
                .map_err(|err| KgError::Filesystem(format!("parse cache {path}: {err}")))?;
            stored
                .into_iter()
                .filter_map(|(key, value)| CacheKey::decode(&key).map(|key| (key, value)))
                .collect()
        } else {
            HashMap::new()
        };
        debug!(path = %path, entries = entries.len(), "opened resolution cache");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist all entries, replacing the file atomically.
    pub fn flush(&self) -> Result<(), KgError> {
        let stored = lock(&self.entries)
            .iter()
            .map(|(key, value)| (key.encode(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|err| KgError::Filesystem(err.to_string()))?;

        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        fs::create_dir_all(parent).map_err(|err| KgError::Filesystem(err.to_string()))?;
        let mut temp =
            NamedTempFile::new_in(parent).map_err(|err| KgError::Filesystem(err.to_string()))?;
        temp.write_all(&json)
            .map_err(|err| KgError::Filesystem(err.to_string()))?;
        temp.persist(&self.path)
            .map_err(|err| KgError::Filesystem(err.to_string()))?;
        debug!(path = %self.path, entries = stored.len(), "flushed resolution cache");
        Ok(())
    }
}

impl ResolutionCache for JsonFileCache {
    fn get(&self, key: &CacheKey) -> Option<Option<ResolutionRecord>> {
        lock(&self.entries).get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: Option<ResolutionRecord>) {
        lock(&self.entries).insert(key, value);
    }
}

/// A [`ResolutionClient`] answering from a cache and batching every miss into
/// one call to the wrapped client.
pub struct CachedResolutionClient<C, S> {
    inner: C,
    cache: S,
}

impl<C: ResolutionClient, S: ResolutionCache> CachedResolutionClient<C, S> {
    pub fn new(inner: C, cache: S) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn cache(&self) -> &S {
        &self.cache
    }

    pub fn into_parts(self) -> (C, S) {
        (self.inner, self.cache)
    }
}

impl<C: ResolutionClient, S: ResolutionCache> ResolutionClient for CachedResolutionClient<C, S> {
    fn resolve(
        &self,
        curies: &[String],
        conflation: ConflationConfig,
    ) -> Result<ResolutionMap, KgError> {
        let curies = prepare_curies(curies)?;
        let mut resolved = ResolutionMap::with_capacity(curies.len());
        let mut misses = Vec::new();
        for curie in curies {
            match self.cache.get(&CacheKey::new(curie.as_str(), conflation)) {
                Some(hit) => {
                    resolved.insert(curie, hit);
                }
                None => misses.push(curie),
            }
        }
        debug!(
            hits = resolved.len(),
            misses = misses.len(),
            "resolution cache lookup"
        );
        if misses.is_empty() {
            return Ok(resolved);
        }

        let mut fetched = self.inner.resolve(&misses, conflation)?;
        for curie in misses {
            let record = fetched.remove(&curie).flatten();
            self.cache
                .put(CacheKey::new(curie.as_str(), conflation), record.clone());
            resolved.insert(curie, record);
        }
        Ok(resolved)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
