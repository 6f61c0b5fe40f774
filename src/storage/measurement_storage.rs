use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::StoreError;
use crate::models::{MeasurementResult, Provider};
use crate::storage::ResultStore;
use crate::storage::schema::create_tables;

/// SQLite-backed result store
///
/// A single connection guarded by a mutex; every save is one INSERT, so
/// concurrent callers are serialized here rather than in the database.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        // WAL lets readers of the database run alongside the collector
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("Could not enable WAL mode for {}: {e}", db_path.display());
        }

        let store = Self::from_connection(conn)?;
        info!("Result store opened at {}", db_path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        create_tables(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Number of stored results
    pub fn count(&self) -> Result<u64, StoreError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM speed_tests", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Reads back the newest results, most recent first
    pub fn recent(&self, limit: usize) -> Result<Vec<MeasurementResult>, StoreError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut stmt = conn.prepare(
            "SELECT timestamp, provider, server, download_mbps, upload_mbps, latency_ms, raw_json
             FROM speed_tests
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let timestamp: String = row.get(0)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?
                .with_timezone(&Utc);

            let provider: String = row.get(1)?;
            let provider = provider.parse::<Provider>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
            })?;

            Ok(MeasurementResult {
                timestamp,
                provider,
                server: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                download_mbps: row.get(3)?,
                upload_mbps: row.get(4)?,
                latency_ms: row.get(5)?,
                raw_payload: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            })
        })?;

        let results: Result<Vec<_>, _> = rows.collect();
        Ok(results?)
    }
}

impl ResultStore for SqliteStore {
    fn save(&self, result: &MeasurementResult) -> Result<(), StoreError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "INSERT INTO speed_tests (
                timestamp, provider, server, download_mbps, upload_mbps, latency_ms, raw_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                result.provider.as_str(),
                result.server,
                result.download_mbps,
                result.upload_mbps,
                result.latency_ms,
                result.raw_payload,
            ],
        )?;

        debug!("Stored {} result from server '{}'", result.provider, result.server);
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        let Some(conn) = self.lock().take() else {
            debug!("Result store already closed");
            return Ok(());
        };

        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        info!("Result store closed");
        Ok(())
    }
}
