//! Cached entry operations.
//!
//! Entries are request/response snapshots keyed by method and URL inside a
//! generation. There is no per-entry eviction: entries are overwritten by a
//! later store of the same URL and removed only with their generation.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Response headers as a JSON object of name to value.
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry for `url`, stamping the key hash and store time.
    pub fn new(
        method: &str, url: &str, status_code: u16, content_type: Option<String>, headers_json: Option<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            key_hash: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code,
            content_type,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        }
    }
}

/// An entry together with the generation it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub generation: String,
    pub entry: CachedEntry,
}

const UPSERT_ENTRY: &str = "INSERT INTO cache_entries (
        generation, key_hash, method, url, status_code, content_type, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status_code = excluded.status_code,
        content_type = excluded.content_type,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const OPEN_GENERATION: &str = "INSERT OR IGNORE INTO cache_generations (name, opened_at) VALUES (?1, ?2)";

fn upsert(conn: &rusqlite::Connection, generation: &str, entry: &CachedEntry) -> Result<(), rusqlite::Error> {
    conn.execute(
        UPSERT_ENTRY,
        params![
            generation,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status_code as i64,
            &entry.content_type,
            &entry.headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

fn read_hit(row: &rusqlite::Row<'_>) -> Result<CacheHit, rusqlite::Error> {
    Ok(CacheHit {
        generation: row.get(0)?,
        entry: CachedEntry {
            key_hash: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status_code: row.get::<_, i64>(4)? as u16,
            content_type: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            stored_at: row.get(8)?,
        },
    })
}

impl CacheDb {
    /// Insert or overwrite an entry in `generation`, opening it if needed.
    pub async fn put_entry(&self, generation: &str, entry: &CachedEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(OPEN_GENERATION, params![&generation, &entry.stored_at])?;
                upsert(&tx, &generation, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every entry in `generation` or none of them.
    pub async fn put_batch(&self, generation: &str, entries: Vec<CachedEntry>) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(OPEN_GENERATION, params![&generation, now])?;
                for entry in &entries {
                    upsert(&tx, &generation, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in any generation.
    ///
    /// Generations are searched in creation order and the first match wins,
    /// so an entry in an older generation shadows one in a newer generation.
    pub async fn match_any(&self, method: &str, url: &str) -> Result<Option<CacheHit>, Error> {
        let key_hash = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheHit>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.generation, e.key_hash, e.method, e.url, e.status_code,
                            e.content_type, e.headers_json, e.body, e.stored_at
                     FROM cache_entries e
                     JOIN cache_generations g ON g.name = e.generation
                     WHERE e.key_hash = ?1
                     ORDER BY g.rowid ASC
                     LIMIT 1",
                )?;

                match stmt.query_row(params![key_hash], read_hit) {
                    Ok(hit) => Ok(Some(hit)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in one generation only.
    pub async fn match_in(&self, generation: &str, method: &str, url: &str) -> Result<Option<CachedEntry>, Error> {
        let generation = generation.to_string();
        let key_hash = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT generation, key_hash, method, url, status_code,
                            content_type, headers_json, body, stored_at
                     FROM cache_entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![generation, key_hash], read_hit) {
                    Ok(hit) => Ok(Some(hit.entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a generation, sorted.
    pub async fn generation_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE generation = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored for a URL across all generations.
    pub async fn count_matches(&self, method: &str, url: &str) -> Result<u64, Error> {
        let key_hash = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE key_hash = ?1", params![key_hash], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
