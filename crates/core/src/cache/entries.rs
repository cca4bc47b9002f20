//! Generation and entry CRUD on the SQLite backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{CacheBackend, CacheEntry};
use crate::Error;
use crate::net::Response;

/// Raw column values of an `entries` row.
struct EntryRow {
    key: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn into_entry(self) -> Result<CacheEntry, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::Serialization(format!("invalid status {} for {}", self.status, self.key)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(CacheEntry {
            key: self.key,
            response: Response { status, status_text: self.status_text, headers, body: self.body },
            stored_at,
        })
    }
}

#[async_trait]
impl CacheBackend for CacheDb {
    async fn create_generation(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![generation, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Entries go with their generation through `ON DELETE CASCADE`.
    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    Ok(EntryRow {
                        key: row.get(0)?,
                        status: row.get(1)?,
                        status_text: row.get(2)?,
                        headers_json: row.get(3)?,
                        body: row.get(4)?,
                        stored_at: row.get(5)?,
                    })
                });

                match result {
                    Ok(row) => row.into_entry().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Upsert by delete-then-insert so the entry moves to the tail.
    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![generation, Utc::now().to_rfc3339()],
                )?;
                tx.execute("DELETE FROM entries WHERE generation = ?1 AND key = ?2", params![generation, entry.key])?;
                tx.execute(
                    "INSERT INTO entries (generation, key, status, status_text, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        generation,
                        entry.key,
                        i64::from(entry.response.status),
                        entry.response.status_text,
                        headers_json,
                        entry.response.body,
                        entry.stored_at.to_rfc3339(),
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str, key: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE generation = ?1 AND key = ?2", params![generation, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE generation = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn evict_oldest(&self, generation: &str, keep: usize) -> Result<u64, Error> {
        let generation = generation.to_string();
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                if count <= keep {
                    return Ok(0);
                }

                let to_delete = count - keep;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE seq IN (
                        SELECT seq FROM entries WHERE generation = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![generation, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
