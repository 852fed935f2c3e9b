// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes: the job claim
//! relies on `BEGIN IMMEDIATE` ordering on this one connection.

use notify_config::model::StorageConfig;
use notify_core::NotifyError;
use tracing::debug;

use crate::migrations;

/// Milliseconds SQLite waits on a lock held by another process.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Handle to the Notify database.
///
/// Cloning is cheap and every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, NotifyError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by the `[storage]` config section.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, NotifyError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    /// Open the database at `path`, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, NotifyError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| NotifyError::Storage {
                source: Box::new(e),
            })?;
        }

        // Journal mode and migrations run once on a short-lived blocking
        // connection before the shared writer exists.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), NotifyError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(storage_err)?;
            let mode = if wal_mode { "WAL" } else { "DELETE" };
            let applied: String = conn
                .query_row(&format!("PRAGMA journal_mode = {mode};"), [], |row| row.get(0))
                .map_err(storage_err)?;
            debug!(journal_mode = %applied, "journal mode set");
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(storage_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| NotifyError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| NotifyError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(std::time::Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))?;
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection. Query modules go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the background connection.
    pub async fn close(self) -> Result<(), NotifyError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");

        self.conn.close().await.map_err(|e| NotifyError::Storage {
            source: Box::new(e),
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

fn storage_err(e: rusqlite::Error) -> NotifyError {
    NotifyError::Storage {
        source: Box::new(e),
    }
}

/// Convert tokio-rusqlite errors to [`NotifyError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NotifyError {
    NotifyError::Storage {
        source: Box::new(e),
    }
}
