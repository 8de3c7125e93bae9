// SPDX-License-Identifier: MPL-2.0

mod db;
mod posts;
mod schema;
mod settings;
mod trackers;

pub use db::Db;
pub use posts::{CachedPost, PostStore};
pub use settings::{Credentials, SettingsStore};
pub use trackers::{NewTracker, Tracker, TrackerKind, TrackerStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found")]
    NotFound,
    #[error("tag already tracked: {0}")]
    DuplicateTag(String),
    #[error("database path error: {0}")]
    Path(String),
}
