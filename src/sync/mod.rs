// SPDX-License-Identifier: MPL-2.0

mod engine;
mod events;

pub use engine::SyncEngine;
pub use events::{EventSink, LogSink, SyncEvent};

use crate::booru::ProviderError;
use crate::config::{PAGE_DELAY, REPAIR_MAX_PAGES, TRACKER_DELAY};
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A full sweep refuses to start without credentials.
    #[error("no API credentials configured")]
    MissingCredentials,
    #[error("tracker not found: {0}")]
    TrackerNotFound(i64),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pacing knobs for sync runs. Defaults match the remote service's informal
/// rate tolerance; tests zero them out.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Delay between page fetches within one tracker.
    pub page_delay: Duration,
    /// Delay between trackers during a sweep.
    pub tracker_delay: Duration,
    /// Page cap for repair runs.
    pub repair_max_pages: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_delay: PAGE_DELAY,
            tracker_delay: TRACKER_DELAY,
            repair_max_pages: REPAIR_MAX_PAGES,
        }
    }
}
