//! Cache generation naming and management.
//!
//! A generation is a named partition of the store. Two kinds are live at a
//! time, one static and one dynamic, each suffixed with the deployed version.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_rusqlite::params;

/// Kind of a live cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// Immutable app-shell assets.
    Static,
    /// Runtime-fetched resources.
    Dynamic,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationKind::Static => write!(f, "static"),
            GenerationKind::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Generation names for one deployed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGenerations {
    /// Combined tag from the first release; never written, always collected.
    pub legacy: String,
    pub static_name: String,
    pub dynamic_name: String,
}

impl CacheGenerations {
    pub fn for_version(version: &str) -> Self {
        Self {
            legacy: format!("bim-viewer-v{version}"),
            static_name: format!("bim-static-v{version}"),
            dynamic_name: format!("bim-dynamic-v{version}"),
        }
    }

    pub fn name(&self, kind: GenerationKind) -> &str {
        match kind {
            GenerationKind::Static => &self.static_name,
            GenerationKind::Dynamic => &self.dynamic_name,
        }
    }

    /// Whether `name` is one of the two live generations.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}

/// Entry count and stored body size for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationStats {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
    pub opened_at: String,
}

impl CacheDb {
    /// Open (create if missing) a generation so it exists even while empty.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, opened_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if no generation with that name existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE generation = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation.
    ///
    /// Returns the number of generations removed.
    pub async fn clear_generations(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute("DELETE FROM cache_entries", [])?;
                let deleted = tx.execute("DELETE FROM cache_generations", [])?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts and sizes per generation, in creation order.
    pub async fn generation_stats(&self) -> Result<Vec<GenerationStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0), g.opened_at
                     FROM cache_generations g
                     LEFT JOIN cache_entries e ON e.generation = g.name
                     GROUP BY g.name
                     ORDER BY g.rowid ASC",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(GenerationStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                            opened_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_names() {
        let generations = CacheGenerations::for_version("1.0.0");
        assert_eq!(generations.legacy, "bim-viewer-v1.0.0");
        assert_eq!(generations.name(GenerationKind::Static), "bim-static-v1.0.0");
        assert_eq!(generations.name(GenerationKind::Dynamic), "bim-dynamic-v1.0.0");
    }

    #[test]
    fn test_is_current() {
        let generations = CacheGenerations::for_version("1.0.0");
        assert!(generations.is_current("bim-static-v1.0.0"));
        assert!(generations.is_current("bim-dynamic-v1.0.0"));
        assert!(!generations.is_current("bim-viewer-v1.0.0"));
        assert!(!generations.is_current("bim-static-v0.9.0"));
    }

    #[tokio::test]
    async fn test_open_list_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("bim-static-v1").await.unwrap();
        db.open_generation("bim-dynamic-v1").await.unwrap();
        db.open_generation("bim-static-v1").await.unwrap();

        assert_eq!(db.generation_names().await.unwrap(), vec!["bim-static-v1", "bim-dynamic-v1"]);

        assert!(db.delete_generation("bim-static-v1").await.unwrap());
        assert!(!db.delete_generation("bim-static-v1").await.unwrap());
        assert_eq!(db.generation_names().await.unwrap(), vec!["bim-dynamic-v1"]);
    }

    #[tokio::test]
    async fn test_stats_for_empty_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("bim-dynamic-v1").await.unwrap();

        let stats = db.generation_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].entries, 0);
        assert_eq!(stats[0].bytes, 0);
    }
}
