//! Key/value persistence for settings documents.

use crate::Error;
use crate::cache::CacheDb;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Read a stored settings document.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                match conn.query_row("SELECT value_json FROM settings WHERE key = ?1", params![key], |row| row.get(0)) {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a settings document.
    pub async fn put_setting(&self, key: &str, value_json: String) -> Result<(), Error> {
        let key = key.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
                    params![key, value_json, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every settings document.
    pub async fn clear_settings(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> { Ok(conn.execute("DELETE FROM settings", [])? as u64) })
            .await
            .map_err(Error::from)
    }
}
