//! Cache entry operations on the SQLite store.
//!
//! Timestamps and TTLs are stored as integer milliseconds so the monotonic
//! write rule can be enforced inside the UPSERT itself.

use super::connection::CacheDb;
use super::entry::CacheEntry;
use super::key::{CacheKey, ResourceKind};
use super::store::CacheStore;
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Raw column values of one `cache_entries` row.
struct EntryRow {
    kind: String,
    subject: String,
    cursor: Option<String>,
    payload_json: String,
    fetched_at_ms: i64,
    ttl_fresh_ms: i64,
    ttl_stale_ms: i64,
}

impl EntryRow {
    fn into_entry(self) -> Result<CacheEntry, Error> {
        let kind = ResourceKind::parse(&self.kind)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown resource kind: {}", self.kind)))?;
        let fetched_at = DateTime::<Utc>::from_timestamp_millis(self.fetched_at_ms)
            .ok_or_else(|| Error::CorruptEntry(format!("fetched_at out of range: {}", self.fetched_at_ms)))?;

        Ok(CacheEntry {
            key: CacheKey::from_parts(kind, self.subject, self.cursor),
            payload: serde_json::from_str(&self.payload_json)?,
            fetched_at,
            ttl_fresh: TimeDelta::milliseconds(self.ttl_fresh_ms),
            ttl_stale: TimeDelta::milliseconds(self.ttl_stale_ms),
        })
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let key_hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT kind, subject, cursor, payload_json, fetched_at_ms, ttl_fresh_ms, ttl_stale_ms
                     FROM cache_entries WHERE key_hash = ?1",
                )?;

                let result = stmt.query_row(params![key_hash], |row| {
                    Ok(EntryRow {
                        kind: row.get(0)?,
                        subject: row.get(1)?,
                        cursor: row.get(2)?,
                        payload_json: row.get(3)?,
                        fetched_at_ms: row.get(4)?,
                        ttl_fresh_ms: row.get(5)?,
                        ttl_stale_ms: row.get(6)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some(entry) = row.map(EntryRow::into_entry).transpose()? else {
            return Ok(None);
        };
        if entry.key != *key {
            tracing::warn!(requested = %key, stored = %entry.key, "digest matched a different key, ignoring row");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<bool, Error> {
        let key_hash = entry.key.digest();
        let kind = entry.key.kind().as_str();
        let subject = entry.key.subject().to_string();
        let cursor = entry.key.cursor().map(str::to_string);
        let payload_json = serde_json::to_string(&entry.payload)?;
        let fetched_at_ms = entry.fetched_at.timestamp_millis();
        let ttl_fresh_ms = entry.ttl_fresh.num_milliseconds();
        let ttl_stale_ms = entry.ttl_stale.num_milliseconds();
        let expires_at_ms = entry.expires_at().timestamp_millis();

        let changed = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let changed = conn.execute(
                    "INSERT INTO cache_entries (
                        key_hash, kind, subject, cursor, payload_json,
                        fetched_at_ms, ttl_fresh_ms, ttl_stale_ms, expires_at_ms
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        payload_json = excluded.payload_json,
                        fetched_at_ms = excluded.fetched_at_ms,
                        ttl_fresh_ms = excluded.ttl_fresh_ms,
                        ttl_stale_ms = excluded.ttl_stale_ms,
                        expires_at_ms = excluded.expires_at_ms
                    WHERE excluded.fetched_at_ms >= cache_entries.fetched_at_ms
                        AND cache_entries.kind = excluded.kind
                        AND cache_entries.subject = excluded.subject
                        AND cache_entries.cursor IS excluded.cursor",
                    params![
                        key_hash,
                        kind,
                        subject,
                        cursor,
                        payload_json,
                        fetched_at_ms,
                        ttl_fresh_ms,
                        ttl_stale_ms,
                        expires_at_ms
                    ],
                )?;
                Ok(changed)
            })
            .await
            .map_err(Error::from)?;

        if changed == 0 {
            tracing::debug!(key = %entry.key, "discarding write older than stored entry");
        }
        Ok(changed > 0)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_entries WHERE key_hash = ?1)",
                    params![key_hash],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, Error> {
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key_hash = ?1", params![key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let now_ms = now.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at_ms <= ?1", params![now_ms])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn check_writable(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute_batch("BEGIN IMMEDIATE; ROLLBACK;")?;
                Ok(())
            })
            .await
            .map_err(|e| Error::CacheUnavailable(Error::from(e).to_string()))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
