//! Named cache stores.
//!
//! Mirrors the browser's cache storage: a set of named stores, each mapping a
//! request URL to the last response written for it. Writes overwrite; there is
//! no per-entry expiry and no multi-key transaction. Whole stores are deleted
//! when their name falls out of the current generation.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A response as persisted in a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Request URL the response is keyed by.
    pub url: String,
    pub status: u16,
    /// Header name/value pairs in wire order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

fn ensure_store(conn: &rusqlite::Connection, name: &str) -> Result<bool, Error> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(inserted > 0)
}

impl CacheDb {
    /// Open a store, creating it if absent.
    ///
    /// Returns true when the store was newly created.
    pub async fn open_store(&self, name: &str) -> Result<bool, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("store name cannot be empty".into()));
        }
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> { ensure_store(conn, &name) })
            .await
            .map_err(Error::from)
    }

    /// Whether a store with this exact name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All store names in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Write a response into a store, replacing any previous entry for its URL.
    ///
    /// The store is created on demand.
    pub async fn put(&self, store: &str, response: &StoredResponse) -> Result<(), Error> {
        let store = store.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store)?;
                conn.execute(
                    "INSERT INTO cache_entries (store, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(store, url) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &store,
                        &response.url,
                        response.status as i64,
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request URL.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_url(&self, store: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT url, status, headers_json, body, stored_at
                         FROM cache_entries WHERE store = ?1 AND url = ?2",
                        params![store, url],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Vec<u8>>(3)?,
                                row.get::<_, String>(4)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((url, status, headers_json, body, stored_at)) = row else {
                    return Ok(None);
                };
                let status = u16::try_from(status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                let headers = serde_json::from_str(&headers_json)?;
                Ok(Some(StoredResponse { url, status, headers, body, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs held by a store, oldest write first.
    pub async fn store_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM cache_entries WHERE store = ?1 ORDER BY stored_at ASC, url ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
