use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::compose::stage::Pipeline;
use crate::compose::{SourceFile, build_pipeline};
use crate::config::BuildConfig;

/// Memoized pipelines for one build.
///
/// The cache borrows the `BuildConfig` it composes against, so every cached
/// pipeline sees the same, fully built variable table.
///
/// Thread safety: entries live in a `RwLock<HashMap>`. Rayon workers take
/// read locks on hits and a write lock only on a miss.
pub struct PipelineCache<'a> {
    config: &'a BuildConfig,
    entries: RwLock<HashMap<CacheKey, Arc<Pipeline<'a>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Path, query and (when content is supplied) the SHA-256 of the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: String,
    query: String,
    content_hash: Option<String>,
}

impl CacheKey {
    fn for_file(file: &SourceFile<'_>) -> Self {
        Self {
            path: file.path.clone(),
            query: file.query.to_string(),
            content_hash: file.content.map(|c| content_hash(c.as_bytes())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl<'a> PipelineCache<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &'a BuildConfig {
        self.config
    }

    pub fn get_or_build(&self, file: &SourceFile<'_>) -> Arc<Pipeline<'a>> {
        let key = CacheKey::for_file(file);

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(pipeline) = entries.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(pipeline);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let pipeline = Arc::new(build_pipeline(file, self.config));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another worker may have built the same key meanwhile; keep the first.
        Arc::clone(entries.entry(key).or_insert(pipeline))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// SHA-256 hex digest of `content`.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
