/*!
 * Tests for configuration loading and validation
 */

use std::fs;
use tempfile::TempDir;

use yakusu::app_config::{CacheBackend, Config, LogLevel};

#[test]
fn test_load_withFullFile_shouldReadEverySection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    fs::write(
        &path,
        r#"{
            "source_language": "ja",
            "target_language": "en",
            "log_level": "debug",
            "client": {
                "endpoint": "http://127.0.0.1:4321/v1",
                "model": "gemma-2-9b",
                "temperature": 0.5,
                "max_tokens": 1024,
                "timeout_secs": 15,
                "concurrent_requests": 4,
                "retry_count": 1,
                "retry_backoff_ms": 250
            },
            "cache": { "backend": "persistent", "max_bytes": 2048, "ttl_secs": 60, "path": "/tmp/yakusu-test.db" },
            "batch": { "window_size": 8 }
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.client.concurrent_requests, 4);
    assert_eq!(config.cache.backend, CacheBackend::Persistent);
    assert_eq!(config.batch.window_size, 8);

    let params = config.client.params();
    assert_eq!(params.model, "gemma-2-9b");
    assert_eq!(params.max_tokens, 1024);
    assert!((params.temperature - 0.5).abs() < f32::EPSILON);
}

#[test]
fn test_load_withEmptyObject_shouldUseDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    fs::write(&path, "{}").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.client.endpoint, "http://localhost:1234/v1");
    assert!(config.client.api_key.is_none());
}

#[test]
fn test_load_withMalformedJson_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    fs::write(&path, "{ not json").unwrap();

    let error = Config::load(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_validate_withZeroCacheBudget_shouldFail() {
    let mut config = Config::default();
    config.cache.max_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withBlankModel_shouldFail() {
    let mut config = Config::default();
    config.client.model = " ".to_string();
    assert!(config.validate().is_err());
}
