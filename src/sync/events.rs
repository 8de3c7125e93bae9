// SPDX-License-Identifier: MPL-2.0

//! Lifecycle events emitted during sync runs.
//!
//! The engine notifies an observer (the UI layer) through an [`EventSink`];
//! emission is fire-and-forget and the engine never depends on delivery.

/// Progress events of sweep and repair runs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncEvent {
    /// A full sweep began.
    SweepStarted,
    /// One tracker's loop began.
    TrackerStarted {
        name: String,
    },
    /// One tracker's loop completed.
    TrackerSynced {
        name: String,
        /// Posts added during this run.
        added: usize,
    },
    /// One tracker's loop stopped on an error; the sweep continues.
    TrackerFailed {
        name: String,
        error: String,
    },
    /// The sweep could not start (missing credentials, store failure).
    SweepFailed {
        error: String,
    },
    /// The sweep reached its end state.
    SweepFinished {
        added: usize,
        failed: usize,
    },
    RepairStarted {
        name: String,
    },
    RepairFinished {
        name: String,
        added: usize,
    },
}

/// Observer boundary for sync lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: SyncEvent) {
        (**self).emit(event);
    }
}

/// Sink that forwards events to the log, used by the headless binary.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SyncEvent) {
        match event {
            SyncEvent::SweepStarted => tracing::info!("sweep started"),
            SyncEvent::TrackerStarted { name } => tracing::info!(%name, "checking tracker"),
            SyncEvent::TrackerSynced { name, added } => {
                tracing::info!(%name, added, "tracker synced");
            }
            SyncEvent::TrackerFailed { name, error } => {
                tracing::warn!(%name, %error, "tracker failed");
            }
            SyncEvent::SweepFailed { error } => tracing::error!(%error, "sweep failed"),
            SyncEvent::SweepFinished { added, failed } => {
                tracing::info!(added, failed, "sweep finished");
            }
            SyncEvent::RepairStarted { name } => tracing::info!(%name, "repair started"),
            SyncEvent::RepairFinished { name, added } => {
                tracing::info!(%name, added, "repair finished");
            }
        }
    }
}
