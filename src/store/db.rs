// SPDX-License-Identifier: MPL-2.0

use crate::config::APP_NAME;
use crate::store::StoreError;
use crate::store::schema::{POSTS_DEDUPE, POSTS_UNIQUE_INDEX, SCHEMA};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Handle to the tracker database
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open or create the database at ~/.local/share/paddock/paddock.db
    pub fn open() -> Result<Self, StoreError> {
        let path = Self::db_path()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Path(format!("failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(&path)?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run schema migrations
    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Execute the schema (all CREATE IF NOT EXISTS)
        conn.execute_batch(SCHEMA)?;

        // Databases created before the unique post index may contain
        // duplicate rows; remove them before securing the index.
        conn.execute(POSTS_DEDUPE, [])?;
        conn.execute(POSTS_UNIQUE_INDEX, [])?;

        Ok(())
    }

    /// Get XDG data directory path for the database
    fn db_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Path("could not find data directory".to_string()))?;

        Ok(data_dir.join(APP_NAME).join("paddock.db"))
    }

    /// Access connection for operations
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("db lock poisoned")
    }

    /// Get current unix timestamp
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}
