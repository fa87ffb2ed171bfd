/*!
 * SQLite cache backend.
 *
 * Entries live in the `cache_entries` table. Every operation runs as one
 * transaction on the blocking pool, so the read-modify-write in `get` and
 * the insert-then-evict in `set` are atomic with respect to other callers.
 */

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use rusqlite::{OptionalExtension, Row, Transaction, params};

use crate::database::DatabaseConnection;
use crate::errors::CacheError;
use crate::translation::request::LanguagePair;

use super::{
    CacheEntry, CacheMeta, CacheOptions, CacheRepository, CacheStats, Clock, Counters,
    SystemClock, estimate_bytes,
};

const SELECT_COLUMNS: &str = "key, source_text, source_language, target_language, translated_text, \
     size_bytes, last_access_time, model, temperature, created_at, hit_count";

/// Durable cache backed by SQLite
#[derive(Debug)]
pub struct SqliteCacheRepository {
    db: DatabaseConnection,
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl SqliteCacheRepository {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path, options: CacheOptions, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        Ok(Self::with_connection(DatabaseConnection::new(path)?, options, clock))
    }

    /// Cache over an existing connection
    pub fn with_connection(
        db: DatabaseConnection,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            options,
            clock,
            counters: Counters::default(),
        }
    }

    /// Volatile SQLite cache, mostly for tests
    pub fn in_memory(options: CacheOptions) -> Result<Self, CacheError> {
        Ok(Self::with_connection(
            DatabaseConnection::new_in_memory()?,
            options,
            Arc::new(SystemClock),
        ))
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(CacheEntryRow, String, String)> {
    Ok((
        CacheEntryRow {
            key: row.get(0)?,
            source_text: row.get(1)?,
            translated_text: row.get(4)?,
            size_bytes: row.get(5)?,
            last_access_time: row.get(6)?,
            model: row.get(7)?,
            temperature: row.get(8)?,
            created_at: row.get(9)?,
            hit_count: row.get(10)?,
        },
        row.get(2)?,
        row.get(3)?,
    ))
}

struct CacheEntryRow {
    key: String,
    source_text: String,
    translated_text: String,
    size_bytes: i64,
    last_access_time: i64,
    model: String,
    temperature: f64,
    created_at: i64,
    hit_count: i64,
}

impl CacheEntryRow {
    fn into_entry(self, src: &str, dst: &str) -> Result<CacheEntry, CacheError> {
        let lang_pair = LanguagePair::from_codes(src, dst)
            .map_err(|e| CacheError::Serialization(format!("Row {}: {}", self.key, e)))?;

        Ok(CacheEntry {
            key: self.key,
            source_text: self.source_text,
            lang_pair,
            translated_text: self.translated_text,
            size_bytes: from_sql_int(self.size_bytes),
            last_access_time: from_sql_int(self.last_access_time),
            meta: CacheMeta {
                model: self.model,
                temperature: self.temperature as f32,
                created_at: from_sql_int(self.created_at),
                hit_count: from_sql_int(self.hit_count),
            },
        })
    }
}

fn load_entry(tx: &Transaction<'_>, key: &str) -> anyhow::Result<Option<(CacheEntryRow, String, String)>> {
    let sql = format!("SELECT {} FROM cache_entries WHERE key = ?1", SELECT_COLUMNS);
    Ok(tx.query_row(&sql, [key], read_row).optional()?)
}

fn total_bytes(tx: &Transaction<'_>) -> anyhow::Result<u64> {
    let total: i64 = tx.query_row(
        "SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries",
        [],
        |row| row.get(0),
    )?;
    Ok(from_sql_int(total))
}

/// Delete oldest-accessed rows until the table fits in `byte_limit`
fn evict_rows(tx: &Transaction<'_>, byte_limit: u64) -> anyhow::Result<usize> {
    let mut total = total_bytes(tx)?;
    if total <= byte_limit {
        return Ok(0);
    }

    let victims: Vec<(String, i64)> = {
        let mut stmt =
            tx.prepare("SELECT key, size_bytes FROM cache_entries ORDER BY last_access_time ASC, key ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut evicted = 0;
    for (key, size) in victims {
        if total <= byte_limit {
            break;
        }
        tx.execute("DELETE FROM cache_entries WHERE key = ?1", [&key])?;
        total = total.saturating_sub(from_sql_int(size));
        evicted += 1;
    }
    Ok(evicted)
}

enum Lookup {
    Missing,
    Expired,
    Hit(CacheEntryRow, String, String),
}

#[async_trait]
impl CacheRepository for SqliteCacheRepository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.clock.now_ms();
        let options = self.options;
        let key_owned = key.to_string();

        let lookup = self
            .db
            .transaction_async(move |tx| {
                let Some((mut row, src, dst)) = load_entry(tx, &key_owned)? else {
                    return Ok(Lookup::Missing);
                };

                if options.is_expired(from_sql_int(row.created_at), now) {
                    tx.execute("DELETE FROM cache_entries WHERE key = ?1", [&key_owned])?;
                    return Ok(Lookup::Expired);
                }

                row.hit_count += 1;
                row.last_access_time = to_sql_int(now);
                tx.execute(
                    "UPDATE cache_entries SET hit_count = ?1, last_access_time = ?2 WHERE key = ?3",
                    params![row.hit_count, row.last_access_time, key_owned],
                )?;
                Ok(Lookup::Hit(row, src, dst))
            })
            .await?;

        match lookup {
            Lookup::Missing => {
                self.counters.miss();
                debug!("Cache miss for {}", key);
                Ok(None)
            }
            Lookup::Expired => {
                self.counters.miss();
                debug!("Cache entry {} expired", key);
                Ok(None)
            }
            Lookup::Hit(row, src, dst) => {
                self.counters.hit();
                debug!("Cache hit for {}", key);
                Ok(Some(row.into_entry(&src, &dst)?))
            }
        }
    }

    async fn set(&self, mut entry: CacheEntry) -> Result<CacheEntry, CacheError> {
        let now = self.clock.now_ms();
        let max_bytes = self.options.max_bytes;
        entry.last_access_time = now;
        entry.size_bytes = estimate_bytes(&entry.translated_text);

        let stored = entry.clone();
        let (created_at, evicted) = self
            .db
            .transaction_async(move |tx| {
                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT created_at FROM cache_entries WHERE key = ?1",
                        [&stored.key],
                        |row| row.get(0),
                    )
                    .optional()?;
                let created_at = existing.map(from_sql_int).unwrap_or(now);

                tx.execute(
                    r#"
                    INSERT INTO cache_entries (
                        key, source_text, source_language, target_language, translated_text,
                        size_bytes, last_access_time, model, temperature, created_at, hit_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(key) DO UPDATE SET
                        source_text = excluded.source_text,
                        source_language = excluded.source_language,
                        target_language = excluded.target_language,
                        translated_text = excluded.translated_text,
                        size_bytes = excluded.size_bytes,
                        last_access_time = excluded.last_access_time,
                        model = excluded.model,
                        temperature = excluded.temperature,
                        hit_count = excluded.hit_count
                    "#,
                    params![
                        stored.key,
                        stored.source_text,
                        stored.lang_pair.src.code(),
                        stored.lang_pair.dst.code(),
                        stored.translated_text,
                        to_sql_int(stored.size_bytes),
                        to_sql_int(stored.last_access_time),
                        stored.meta.model,
                        f64::from(stored.meta.temperature),
                        to_sql_int(created_at),
                        to_sql_int(stored.meta.hit_count),
                    ],
                )?;

                let evicted = evict_rows(tx, max_bytes)?;
                Ok((created_at, evicted))
            })
            .await?;

        if evicted > 0 {
            debug!("Evicted {} cache entries to stay within {} bytes", evicted, max_bytes);
        }

        entry.meta.created_at = created_at;
        Ok(entry)
    }

    async fn evict_until(&self, byte_limit: u64) -> Result<(), CacheError> {
        let evicted = self
            .db
            .transaction_async(move |tx| evict_rows(tx, byte_limit))
            .await?;
        if evicted > 0 {
            debug!("Evicted {} cache entries to stay within {} bytes", evicted, byte_limit);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let (entry_count, estimated_bytes) = self
            .db
            .execute_async(|conn| {
                let (count, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM cache_entries",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok((from_sql_int(count), from_sql_int(bytes)))
            })
            .await?;

        Ok(CacheStats {
            entry_count,
            estimated_bytes,
            hits: self.counters.hits(),
            misses: self.counters.misses(),
        })
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let deleted = self
            .db
            .transaction_async(|tx| Ok(tx.execute("DELETE FROM cache_entries", [])?))
            .await?;
        debug!("Translation cache cleared ({} entries)", deleted);
        Ok(deleted as u64)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
