/*!
 * Tests for the translation cache backends
 *
 * Every behavioural test runs against both backends through the
 * `CacheRepository` trait object the service uses.
 */

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use yakusu::app_config::{CacheBackend, CacheConfig};
use yakusu::database::DatabaseConnection;
use yakusu::translation::cache::{
    CacheEntry, CacheOptions, CacheRepository, ManualClock, MemoryCacheRepository,
    SqliteCacheRepository, build_cache_key, create_cache_repository,
};

use crate::common::{en_ja, ja_en};

fn backends(max_bytes: u64, ttl: Duration) -> Vec<(Arc<dyn CacheRepository>, Arc<ManualClock>)> {
    let options = CacheOptions { max_bytes, ttl };

    let memory_clock = Arc::new(ManualClock::new(10_000));
    let memory: Arc<dyn CacheRepository> =
        Arc::new(MemoryCacheRepository::with_clock(options, memory_clock.clone()));

    let sqlite_clock = Arc::new(ManualClock::new(10_000));
    let sqlite: Arc<dyn CacheRepository> = Arc::new(SqliteCacheRepository::with_connection(
        DatabaseConnection::new_in_memory().unwrap(),
        options,
        sqlite_clock.clone(),
    ));

    vec![(memory, memory_clock), (sqlite, sqlite_clock)]
}

fn entry(source: &str, translated: &str) -> CacheEntry {
    CacheEntry::new(en_ja(), source, translated, "lmstudio", 0.2)
}

#[tokio::test]
async fn test_setThenGet_shouldReturnSameTranslation() {
    for (cache, _) in backends(1024, Duration::from_secs(60)) {
        let stored = cache.set(entry("Good morning.", "おはようございます。")).await.unwrap();
        let found = cache.get(&stored.key).await.unwrap().unwrap();

        assert_eq!(found.translated_text, "おはようございます。", "{}", cache.backend_name());
        assert_eq!(found.source_text, "Good morning.");
        assert_eq!(found.meta.hit_count, 1);
    }
}

#[tokio::test]
async fn test_set_withThreeTenByteEntriesAndTwentyByteBudget_shouldEvictFirst() {
    for (cache, clock) in backends(20, Duration::from_secs(60)) {
        let a = cache.set(entry("a", "0123456789")).await.unwrap();
        clock.advance(Duration::from_millis(1));
        let b = cache.set(entry("b", "0123456789")).await.unwrap();
        clock.advance(Duration::from_millis(1));
        let c = cache.set(entry("c", "0123456789")).await.unwrap();

        let name = cache.backend_name();
        assert!(cache.get(&a.key).await.unwrap().is_none(), "{}", name);
        assert!(cache.get(&b.key).await.unwrap().is_some(), "{}", name);
        assert!(cache.get(&c.key).await.unwrap().is_some(), "{}", name);
        assert_eq!(cache.stats().await.unwrap().estimated_bytes, 20, "{}", name);
    }
}

#[tokio::test]
async fn test_get_afterTtl_shouldBeAbsent() {
    for (cache, clock) in backends(1024, Duration::from_secs(10)) {
        let stored = cache.set(entry("Hello.", "こんにちは。")).await.unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(cache.get(&stored.key).await.unwrap().is_some(), "{}", cache.backend_name());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get(&stored.key).await.unwrap().is_none(), "{}", cache.backend_name());
        assert_eq!(cache.stats().await.unwrap().entry_count, 0);
    }
}

#[tokio::test]
async fn test_evictUntil_shouldRemoveLeastRecentlyAccessedFirst() {
    for (cache, clock) in backends(1024, Duration::from_secs(60)) {
        let old = cache.set(entry("old", "aaaa")).await.unwrap();
        clock.advance(Duration::from_millis(5));
        let newer = cache.set(entry("newer", "bbbb")).await.unwrap();
        clock.advance(Duration::from_millis(5));
        cache.get(&old.key).await.unwrap();

        cache.evict_until(4).await.unwrap();

        let name = cache.backend_name();
        assert!(cache.get(&newer.key).await.unwrap().is_none(), "{}", name);
        assert!(cache.get(&old.key).await.unwrap().is_some(), "{}", name);
    }
}

#[tokio::test]
async fn test_stats_shouldCountHitsAndMisses() {
    for (cache, _) in backends(1024, Duration::from_secs(60)) {
        let stored = cache.set(entry("Hi.", "やあ。")).await.unwrap();
        cache.get(&stored.key).await.unwrap();
        cache.get(&stored.key).await.unwrap();
        cache.get("en:ja:0000000000000000").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_keys_shouldSeparateDirections() {
    for (cache, _) in backends(1024, Duration::from_secs(60)) {
        cache.set(entry("sake", "酒")).await.unwrap();
        assert!(cache.get(&build_cache_key(ja_en(), "sake")).await.unwrap().is_none());
        assert!(cache.get(&build_cache_key(en_ja(), "sake")).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_createCacheRepository_shouldHonourBackendChoice() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0));

    let memory = CacheConfig {
        backend: CacheBackend::Memory,
        ..CacheConfig::default()
    };
    assert_eq!(create_cache_repository(&memory, clock.clone()).unwrap().backend_name(), "memory");

    let persistent = CacheConfig {
        backend: CacheBackend::Persistent,
        path: Some(dir.path().join("cache").join("cache.db")),
        ..CacheConfig::default()
    };
    assert_eq!(create_cache_repository(&persistent, clock.clone()).unwrap().backend_name(), "sqlite");
    assert!(dir.path().join("cache").join("cache.db").exists());
}

#[tokio::test]
async fn test_createCacheRepository_withUnopenablePath_shouldFallBackOnlyInAutoMode() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0));

    // A directory cannot be opened as a database file
    let auto = CacheConfig {
        backend: CacheBackend::Auto,
        path: Some(dir.path().to_path_buf()),
        ..CacheConfig::default()
    };
    assert_eq!(create_cache_repository(&auto, clock.clone()).unwrap().backend_name(), "memory");

    let persistent = CacheConfig {
        backend: CacheBackend::Persistent,
        ..auto
    };
    assert!(create_cache_repository(&persistent, clock).is_err());
}
