// SPDX-License-Identifier: MPL-2.0

//! Incremental sync engine.
//!
//! Each engine instance owns a run guard: at most one sweep or repair run
//! is in flight per engine at a time, and a second attempt is a silent
//! no-op. Within a run, pages are fetched strictly sequentially with a
//! courtesy delay between requests.
//!
//! The per-tracker loop keeps two cursors apart on purpose. The cursor at
//! the start of the run backs both the remote `id:>` filter and the local
//! "is this new" test for every page, so the filter stays stable across
//! the whole run. The running maximum of observed ids (`highest_seen`) is
//! only used for the final monotone cursor advance. Advancing the cursor
//! mid-run would change the filter between pages and could skip or
//! duplicate posts when the remote ordering is not ascending by id.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::booru::{BooruProvider, PageQuery, RemotePost};
use crate::config::PAGE_SIZE;
use crate::store::{Credentials, Db, PostStore, SettingsStore, StoreError, Tracker, TrackerKind, TrackerStore};
use crate::sync::events::{EventSink, SyncEvent};
use crate::sync::{SyncError, SyncOptions};

/// Outcome of one tracker's loop. `error` is set when the loop stopped
/// early; posts persisted before the stop are kept.
struct TrackerRun {
    added: usize,
    error: Option<SyncError>,
}

/// Clears the run guard on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncEngine<C, S> {
    db: Db,
    client: C,
    sink: S,
    options: SyncOptions,
    running: AtomicBool,
}

impl<C: BooruProvider, S: EventSink> SyncEngine<C, S> {
    pub fn new(db: Db, client: C, sink: S) -> Self {
        Self::with_options(db, client, sink, SyncOptions::default())
    }

    pub fn with_options(db: Db, client: C, sink: S, options: SyncOptions) -> Self {
        Self {
            db,
            client,
            sink,
            options,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        if self.running.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(RunGuard(&self.running))
        }
    }

    /// Start a full sweep in the background and return immediately.
    /// Lifecycle events communicate progress and completion.
    pub fn spawn_full_sync(self: &Arc<Self>)
    where
        C: 'static,
        S: 'static,
    {
        let engine = Arc::clone(self);
        crate::runtime::spawn(async move {
            engine.sync_all().await;
        });
    }

    /// Run a full sweep over all trackers. A concurrent attempt is a
    /// silent no-op. The sweep itself never fails once started; failing
    /// trackers are isolated and reported through the sink.
    #[tracing::instrument(skip(self))]
    pub async fn sync_all(&self) {
        let Some(_guard) = self.try_begin_run() else {
            tracing::debug!("sync already in flight, ignoring");
            return;
        };

        self.sink.emit(SyncEvent::SweepStarted);

        match self.sweep().await {
            Ok((added, failed)) => {
                self.sink.emit(SyncEvent::SweepFinished { added, failed });
            }
            Err(e) => {
                tracing::error!(error = %e, "sweep aborted");
                self.sink.emit(SyncEvent::SweepFailed {
                    error: e.to_string(),
                });
                self.sink.emit(SyncEvent::SweepFinished {
                    added: 0,
                    failed: 0,
                });
            }
        }
    }

    async fn sweep(&self) -> Result<(usize, usize), SyncError> {
        let trackers = TrackerStore::new(&self.db).list_all()?;
        let creds = SettingsStore::new(&self.db)
            .credentials()?
            .ok_or(SyncError::MissingCredentials)?;

        let mut added_total = 0;
        let mut failed = 0;

        for tracker in &trackers {
            self.sink.emit(SyncEvent::TrackerStarted {
                name: tracker.name.clone(),
            });

            let run = self.sync_tracker(tracker, Some(&creds), None, None).await;
            added_total += run.added;

            match run.error {
                None => self.sink.emit(SyncEvent::TrackerSynced {
                    name: tracker.name.clone(),
                    added: run.added,
                }),
                Some(e) => {
                    tracing::warn!(tracker = %tracker.name, error = %e, "tracker sync failed");
                    self.sink.emit(SyncEvent::TrackerFailed {
                        name: tracker.name.clone(),
                        error: e.to_string(),
                    });
                    failed += 1;
                }
            }

            tokio::time::sleep(self.options.tracker_delay).await;
        }

        Ok((added_total, failed))
    }

    /// Forced backfill of a single tracker: the effective cursor is 0 for
    /// this run only and the page count is capped. The stored cursor still
    /// only ever advances. Unlike sweep failures, the error propagates to
    /// the caller.
    #[tracing::instrument(skip(self))]
    pub async fn repair_tracker(&self, id: i64) -> Result<usize, SyncError> {
        let Some(_guard) = self.try_begin_run() else {
            tracing::debug!("sync already in flight, skipping repair");
            return Ok(0);
        };

        let tracker = TrackerStore::new(&self.db).get(id).map_err(|e| match e {
            StoreError::NotFound => SyncError::TrackerNotFound(id),
            other => SyncError::Store(other),
        })?;
        let creds = SettingsStore::new(&self.db).credentials()?;

        self.sink.emit(SyncEvent::RepairStarted {
            name: tracker.name.clone(),
        });

        let run = self
            .sync_tracker(
                &tracker,
                creds.as_ref(),
                Some(0),
                Some(self.options.repair_max_pages),
            )
            .await;

        self.sink.emit(SyncEvent::RepairFinished {
            name: tracker.name.clone(),
            added: run.added,
        });

        match run.error {
            Some(e) => Err(e),
            None => Ok(run.added),
        }
    }

    /// The per-tracker loop: fetch page, filter new, persist, advance.
    async fn sync_tracker(
        &self,
        tracker: &Tracker,
        creds: Option<&Credentials>,
        cursor_override: Option<u64>,
        max_pages: Option<u32>,
    ) -> TrackerRun {
        let trackers = TrackerStore::new(&self.db);
        let posts = PostStore::new(&self.db);

        let run_cursor = cursor_override.unwrap_or(tracker.last_post_id);
        let mut highest_seen = run_cursor;
        let mut page: u32 = 0;
        let mut added_this_run = 0usize;
        let mut error: Option<SyncError> = None;

        loop {
            if let Some(cap) = max_pages {
                if page >= cap {
                    break;
                }
            }

            let query = PageQuery {
                tag: &tracker.tag,
                uploader: tracker.kind == TrackerKind::Uploader,
                cursor: run_cursor,
                page,
                user_id: creds.map(|c| c.user_id.as_str()),
                api_key: creds.map(|c| c.api_key.as_str()),
            };

            let batch = match self.client.fetch_page(&query).await {
                Ok(batch) => batch,
                Err(e) => {
                    error = Some(e.into());
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }

            if let Some(batch_max) = batch.iter().map(|p| p.post_id).max() {
                highest_seen = highest_seen.max(batch_max);
            }

            // The remote id filter is best effort; the run-start cursor is
            // the authoritative test for what counts as new.
            let new_posts: Vec<RemotePost> = batch
                .iter()
                .filter(|p| p.post_id > run_cursor)
                .cloned()
                .collect();

            if new_posts.is_empty() && run_cursor > 0 {
                break;
            }

            if !new_posts.is_empty() {
                if let Err(e) = posts.upsert_batch(tracker.id, &new_posts) {
                    error = Some(e.into());
                    break;
                }
                if let Err(e) = trackers.apply_progress(tracker.id, highest_seen, new_posts.len())
                {
                    error = Some(e.into());
                    break;
                }
                added_this_run += new_posts.len();
            }

            if batch.len() < PAGE_SIZE {
                break;
            }

            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }

        // Even with nothing new, persist last_checked and any cursor
        // movement the remote filter let through.
        if added_this_run == 0 {
            if let Err(e) = trackers.apply_progress(tracker.id, highest_seen, 0) {
                error = error.or(Some(e.into()));
            }
        }

        tracing::debug!(
            tracker = %tracker.name,
            added = added_this_run,
            cursor = highest_seen,
            "tracker run finished"
        );

        TrackerRun {
            added: added_this_run,
            error,
        }
    }
}

impl<C, S> std::fmt::Debug for SyncEngine<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
