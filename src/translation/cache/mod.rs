/*!
 * Translation caching functionality.
 *
 * Content-addressed store mapping a language pair plus normalized source
 * text to a previously computed translation. Every backend enforces a byte
 * budget (least recently accessed entries go first) and a time-to-live
 * measured from the entry's creation.
 *
 * Backends:
 * - `MemoryCacheRepository`: process-local, lost on restart
 * - `SqliteCacheRepository`: durable, stored in the user's data directory
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_config::{CacheBackend, CacheConfig};
use crate::errors::CacheError;
use crate::translation::request::LanguagePair;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCacheRepository;
pub use sqlite::SqliteCacheRepository;

/// Default byte budget (10 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default time-to-live (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bookkeeping carried alongside a cached translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Model that produced the translation
    pub model: String,
    /// Sampling temperature used
    pub temperature: f32,
    /// Creation time in epoch milliseconds; TTL is measured from here
    pub created_at: u64,
    /// Number of cache hits served by this entry
    pub hit_count: u64,
}

/// A cached translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub source_text: String,
    pub lang_pair: LanguagePair,
    pub translated_text: String,
    /// UTF-8 byte length of `translated_text`
    pub size_bytes: u64,
    /// Last read or write in epoch milliseconds
    pub last_access_time: u64,
    pub meta: CacheMeta,
}

impl CacheEntry {
    /// New entry for `source_text`; the key and size are derived, timestamps are
    /// assigned by the repository on `set`
    pub fn new(
        lang_pair: LanguagePair,
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let source_text = source_text.into();
        let translated_text = translated_text.into();
        Self {
            key: build_cache_key(lang_pair, &source_text),
            size_bytes: estimate_bytes(&translated_text),
            source_text,
            lang_pair,
            translated_text,
            last_access_time: 0,
            meta: CacheMeta {
                model: model.into(),
                temperature,
                created_at: 0,
                hit_count: 0,
            },
        }
    }
}

/// Process-lifetime cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub estimated_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when there were none
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entries: {}, Size: {} bytes, Hits: {}, Misses: {}, Hit rate: {:.1}%",
            self.entry_count,
            self.estimated_bytes,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

/// Budget and expiry applied by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub max_bytes: u64,
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheOptions {
    pub(crate) fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }

    pub(crate) fn is_expired(&self, created_at: u64, now: u64) -> bool {
        now.saturating_sub(created_at) > self.ttl_ms()
    }
}

/// Source of wall-clock time for TTL and recency
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in epoch milliseconds
    fn now_ms(&self) -> u64;
}

/// The real clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Hand-driven clock for tests and benchmarks
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Storage capability shared by all cache backends
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Look up a live entry, refreshing its recency and hit count.
    /// Expired entries are removed and reported as a miss.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace an entry, then evict down to the byte budget
    async fn set(&self, entry: CacheEntry) -> Result<CacheEntry, CacheError>;

    /// Remove least recently accessed entries until the total size fits `byte_limit`
    async fn evict_until(&self, byte_limit: u64) -> Result<(), CacheError>;

    /// Current counters
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Drop every entry; hit and miss counters are kept
    async fn clear(&self) -> Result<u64, CacheError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Hit/miss counters kept by a repository for its lifetime
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Key for `source_text` under `lang_pair`: `src:dst:<fnv1a-64 hex>`
pub fn build_cache_key(lang_pair: LanguagePair, source_text: &str) -> String {
    let normalized = source_text.replace("\r\n", "\n");
    format!(
        "{}:{}:{:016x}",
        lang_pair.src,
        lang_pair.dst,
        fnv1a_64(normalized.trim().as_bytes())
    )
}

/// UTF-8 byte length
pub fn estimate_bytes(value: &str) -> u64 {
    value.len() as u64
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Build the repository selected by `config`
///
/// `Auto` prefers the SQLite store and falls back to memory when it cannot be
/// opened. `Persistent` fails instead of falling back.
pub fn create_cache_repository(
    config: &CacheConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn CacheRepository>, CacheError> {
    let options = config.options();

    match config.backend {
        CacheBackend::Memory => {
            info!("Using in-memory translation cache");
            Ok(Arc::new(MemoryCacheRepository::with_clock(options, clock)))
        }
        CacheBackend::Persistent => {
            let path = resolve_cache_path(config)?;
            info!("Using persistent translation cache at {:?}", path);
            Ok(Arc::new(SqliteCacheRepository::open(&path, options, clock)?))
        }
        CacheBackend::Auto => {
            let persistent = resolve_cache_path(config)
                .and_then(|path| SqliteCacheRepository::open(&path, options, clock.clone()));
            match persistent {
                Ok(repository) => {
                    info!("Using persistent translation cache at {:?}", repository.path());
                    Ok(Arc::new(repository))
                }
                Err(e) => {
                    warn!("Persistent cache unavailable ({}), falling back to memory", e);
                    Ok(Arc::new(MemoryCacheRepository::with_clock(options, clock)))
                }
            }
        }
    }
}

fn resolve_cache_path(config: &CacheConfig) -> Result<PathBuf, CacheError> {
    match &config.path {
        Some(path) => Ok(path.clone()),
        None => Ok(crate::database::DatabaseConnection::default_database_path()?),
    }
}
