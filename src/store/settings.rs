// SPDX-License-Identifier: MPL-2.0

use crate::store::{Db, StoreError};
use rusqlite::params;

/// API credential pair. Requests go out unauthenticated when absent.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub api_key: String,
}

/// Store operations for settings
pub struct SettingsStore<'a> {
    db: &'a Db,
}

impl<'a> SettingsStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn credentials(&self) -> Result<Option<Credentials>, StoreError> {
        let conn = self.db.conn();
        let result = conn.query_row(
            "SELECT user_id, api_key FROM credentials WHERE id = 1",
            [],
            |row| {
                Ok(Credentials {
                    user_id: row.get(0)?,
                    api_key: row.get(1)?,
                })
            },
        );

        match result {
            Ok(creds) => Ok(Some(creds)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_credentials(&self, creds: &Credentials) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO credentials (id, user_id, api_key)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                api_key = excluded.api_key
            "#,
            params![creds.user_id, creds.api_key],
        )?;
        Ok(())
    }
}
