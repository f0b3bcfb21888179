use crate::error::ConfigError;
use crate::rules::RuleSet;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Version constants for cache invalidation
pub mod versions {
    pub const MEASURELINK_VERSION: &str = "0.1.0";
    /// Bump when matching semantics change for an unchanged pattern document.
    pub const ENGINE_VERSION: &str = "1.0.0";
}

/// Calculate hash for raw pattern document content
pub fn calculate_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Calculate hash of any serializable configuration via its JSON form
pub fn calculate_config_hash<T: Serialize>(config: &T) -> Result<String, serde_json::Error> {
    let config_json = serde_json::to_string(config)?;
    Ok(calculate_content_hash(&config_json))
}

/// Identity of a compiled rule set: document content + engine version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RuleSetCacheKey {
    pub content_hash: String,
    pub engine_version: String,
}

impl RuleSetCacheKey {
    pub fn new(content_hash: String) -> Self {
        Self {
            content_hash,
            engine_version: versions::ENGINE_VERSION.to_string(),
        }
    }

    pub fn for_content(content: &str) -> Self {
        Self::new(calculate_content_hash(content))
    }

    /// Compute cache key hash for logging and external storage
    pub fn to_cache_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.content_hash);
        hasher.update(&self.engine_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached rule set with metadata
#[derive(Debug, Clone)]
pub struct RuleSetCacheValue {
    pub rule_set: Arc<RuleSet>,
    pub created_at: DateTime<Utc>,
    pub compile_time_ms: u64,
    pub cache_version: String,
}

impl RuleSetCacheValue {
    pub fn new(rule_set: RuleSet, compile_time_ms: u64) -> Self {
        Self {
            rule_set: Arc::new(rule_set),
            created_at: Utc::now(),
            compile_time_ms,
            cache_version: versions::MEASURELINK_VERSION.to_string(),
        }
    }
}

/// Compiled rule sets shared across extraction calls and threads.
///
/// A rule set is compiled outside the lock and only published once complete;
/// readers never observe a partial one. Identical content always resolves to
/// the same `Arc`.
#[derive(Debug, Default)]
pub struct RuleSetCache {
    entries: RwLock<HashMap<RuleSetCacheKey, RuleSetCacheValue>>,
}

impl RuleSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RuleSetCacheKey) -> Option<Arc<RuleSet>> {
        self.entries.read().get(key).map(|v| Arc::clone(&v.rule_set))
    }

    /// Compiled rule set for a pattern document, compiling it on first use.
    pub fn get_or_compile(&self, content: &str) -> Result<Arc<RuleSet>, ConfigError> {
        let key = RuleSetCacheKey::for_content(content);
        if let Some(hit) = self.get(&key) {
            debug!(key = %key.to_cache_hash(), "rule set cache hit");
            return Ok(hit);
        }

        let started = Instant::now();
        let rule_set = RuleSet::from_json_str(content)?;
        let value = RuleSetCacheValue::new(rule_set, started.elapsed().as_millis() as u64);

        let mut entries = self.entries.write();
        // Another thread may have published the same document meanwhile.
        let published = entries.entry(key).or_insert(value);
        info!(
            "💾 Cached rule set {} ({} variants, compiled in {}ms)",
            published.rule_set.fingerprint().get(..12).unwrap_or_default(),
            published.rule_set.rule_count(),
            published.compile_time_ms
        );
        Ok(Arc::clone(&published.rule_set))
    }

    pub fn get_or_load(&self, path: impl AsRef<Path>) -> Result<Arc<RuleSet>, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.get_or_compile(&content)
    }

    pub fn builtin(&self) -> Result<Arc<RuleSet>, ConfigError> {
        self.get_or_compile(crate::rules::compiler::BUILTIN_PATTERNS)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
