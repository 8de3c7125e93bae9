// SPDX-License-Identifier: MPL-2.0

//! End-to-end tests of the sync engine against a scripted provider and an
//! in-memory store.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use paddock::booru::{BooruProvider, PageQuery, ProviderError, RemotePost, TagSuggestion};
use paddock::store::{Credentials, Db, NewTracker, PostStore, SettingsStore, Tracker, TrackerKind, TrackerStore};
use paddock::sync::{EventSink, SyncEngine, SyncError, SyncEvent, SyncOptions};

fn post(post_id: u64) -> RemotePost {
    RemotePost {
        post_id,
        file_url: format!("https://cdn.example/{}.png", post_id),
        preview_url: format!("https://cdn.example/{}.thumb.jpg", post_id),
        sample_url: format!("https://cdn.example/{}.sample.jpg", post_id),
        tags: "tag_a tag_b".to_string(),
        rating: "s".to_string(),
        published_at: 1_700_000_000,
    }
}

fn posts(ids: impl IntoIterator<Item = u64>) -> Vec<RemotePost> {
    ids.into_iter().map(post).collect()
}

#[derive(Debug, Clone)]
struct RecordedQuery {
    tag: String,
    cursor: u64,
    page: u32,
    authed: bool,
}

/// Provider scripted with a queue of page results per tag.
#[derive(Default)]
struct ScriptedProvider {
    pages: Mutex<HashMap<String, VecDeque<Result<Vec<RemotePost>, ProviderError>>>>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedProvider {
    fn script(&self, tag: &str, results: Vec<Result<Vec<RemotePost>, ProviderError>>) {
        self.pages
            .lock()
            .unwrap()
            .insert(tag.to_string(), results.into());
    }

    fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl BooruProvider for ScriptedProvider {
    async fn fetch_page(&self, query: &PageQuery<'_>) -> Result<Vec<RemotePost>, ProviderError> {
        self.queries.lock().unwrap().push(RecordedQuery {
            tag: query.tag.to_string(),
            cursor: query.cursor,
            page: query.page,
            authed: query.user_id.is_some(),
        });

        self.pages
            .lock()
            .unwrap()
            .get_mut(query.tag)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(Vec::new()))
    }

    async fn search_tags(&self, _input: &str) -> Result<Vec<TagSuggestion>, ProviderError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<SyncEvent>>);

impl RecordingSink {
    fn events(&self) -> Vec<SyncEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SyncEvent) {
        self.0.lock().unwrap().push(event);
    }
}

struct Harness {
    db: Db,
    engine: Arc<SyncEngine<Arc<ScriptedProvider>, Arc<RecordingSink>>>,
    provider: Arc<ScriptedProvider>,
    sink: Arc<RecordingSink>,
}

fn harness() -> Harness {
    let db = Db::open_in_memory().unwrap();
    let provider = Arc::new(ScriptedProvider::default());
    let sink = Arc::new(RecordingSink::default());

    let options = SyncOptions {
        page_delay: Duration::ZERO,
        tracker_delay: Duration::ZERO,
        repair_max_pages: 3,
    };
    let engine = Arc::new(SyncEngine::with_options(
        db.clone(),
        Arc::clone(&provider),
        Arc::clone(&sink),
        options,
    ));

    Harness {
        db,
        engine,
        provider,
        sink,
    }
}

impl Harness {
    fn add_tracker(&self, name: &str, tag: &str) -> Tracker {
        TrackerStore::new(&self.db)
            .add(&NewTracker {
                name: name.to_string(),
                tag: tag.to_string(),
                kind: TrackerKind::Tag,
            })
            .unwrap()
    }

    fn seed_credentials(&self) {
        SettingsStore::new(&self.db)
            .save_credentials(&Credentials {
                user_id: "1234".to_string(),
                api_key: "secret".to_string(),
            })
            .unwrap();
    }

    fn set_cursor(&self, id: i64, cursor: u64) {
        TrackerStore::new(&self.db)
            .apply_progress(id, cursor, 0)
            .unwrap();
    }

    fn tracker(&self, id: i64) -> Tracker {
        TrackerStore::new(&self.db).get(id).unwrap()
    }

    fn post_count(&self, id: i64) -> u64 {
        PostStore::new(&self.db).count(Some(id)).unwrap()
    }
}

#[tokio::test]
async fn first_sync_persists_short_page_with_one_fetch() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.provider.script("artist", vec![Ok(posts(1..=40))]);

    h.engine.sync_all().await;

    assert_eq!(h.post_count(t.id), 40);
    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 40);
    assert_eq!(after.new_posts_count, 40);
    assert!(after.last_checked.is_some());

    // 40 < page size, so no second fetch.
    let queries = h.provider.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].cursor, 0);
    assert_eq!(queries[0].page, 0);
    assert!(queries[0].authed);
}

#[tokio::test]
async fn mixed_page_only_persists_ids_above_cursor() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.set_cursor(t.id, 100);
    h.provider.script("artist", vec![Ok(posts([50, 60, 150]))]);

    h.engine.sync_all().await;

    assert_eq!(h.post_count(t.id), 1);
    let stored = PostStore::new(&h.db).list_by_tracker(t.id, 10, 0).unwrap();
    assert_eq!(stored[0].post_id, 150);

    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 150);
    assert_eq!(after.new_posts_count, 1);
}

#[tokio::test]
async fn full_pages_reuse_the_run_start_cursor() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.provider.script(
        "artist",
        vec![Ok(posts(1..=100)), Ok(posts(101..=140))],
    );

    h.engine.sync_all().await;

    assert_eq!(h.post_count(t.id), 140);
    assert_eq!(h.tracker(t.id).last_post_id, 140);

    let queries = h.provider.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].page, 1);
    // The id filter stays bound to the cursor at the start of the run even
    // though the stored cursor advanced after the first page.
    assert_eq!(queries[0].cursor, 0);
    assert_eq!(queries[1].cursor, 0);
}

#[tokio::test]
async fn ignores_remote_records_below_cursor_despite_filter() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.set_cursor(t.id, 100);
    // Remote mis-applies the id filter and resends old posts.
    h.provider.script("artist", vec![Ok(posts([50, 60]))]);

    h.engine.sync_all().await;

    assert_eq!(h.post_count(t.id), 0);
    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 100);
    assert_eq!(after.new_posts_count, 0);
    // Caught up: one fetch, then stop.
    assert_eq!(h.provider.queries().len(), 1);
    assert!(after.last_checked.is_some());
}

#[tokio::test]
async fn caught_up_tracker_still_updates_last_checked() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.set_cursor(t.id, 40);
    h.provider.script("artist", vec![Ok(Vec::new())]);

    h.engine.sync_all().await;

    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 40);
    assert_eq!(after.new_posts_count, 0);
    assert!(after.last_checked.is_some());
}

#[tokio::test]
async fn cursor_is_monotone_across_runs() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.provider.script("artist", vec![Ok(posts(1..=40))]);

    h.engine.sync_all().await;
    assert_eq!(h.tracker(t.id).last_post_id, 40);

    // Second sweep finds nothing; the cursor must not move backwards.
    h.engine.sync_all().await;
    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 40);
    assert_eq!(after.new_posts_count, 40);
}

#[tokio::test]
async fn resync_of_same_ids_does_not_duplicate_rows() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.provider.script("artist", vec![Ok(posts(1..=30))]);
    h.engine.sync_all().await;

    // Repair re-fetches the same history.
    h.provider.script("artist", vec![Ok(posts(1..=30))]);
    h.engine.repair_tracker(t.id).await.unwrap();

    assert_eq!(h.post_count(t.id), 30);
}

#[tokio::test]
async fn repair_caps_pages_and_never_regresses_cursor() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.set_cursor(t.id, 500);

    // Ten pages of history; repair must stop after three.
    let history: Vec<Result<Vec<RemotePost>, ProviderError>> = (0u64..10)
        .map(|page| {
            let hi = 1000 - page * 100;
            Ok(posts(((hi - 99)..=hi).rev()))
        })
        .collect();
    h.provider.script("artist", history);

    let added = h.engine.repair_tracker(t.id).await.unwrap();
    assert_eq!(added, 300);

    let queries = h.provider.queries();
    assert_eq!(queries.len(), 3);
    // Repair forces the effective cursor to zero for the run.
    assert!(queries.iter().all(|q| q.cursor == 0));

    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 1000);
    assert_eq!(h.post_count(t.id), 300);
}

#[tokio::test]
async fn repair_of_old_history_keeps_stored_cursor() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.set_cursor(t.id, 500);
    // Only posts older than the stored cursor exist remotely.
    h.provider.script("artist", vec![Ok(posts(1..=10))]);

    let added = h.engine.repair_tracker(t.id).await.unwrap();
    assert_eq!(added, 10);

    // Backfilled rows are persisted, the cursor stays at 500.
    assert_eq!(h.post_count(t.id), 10);
    assert_eq!(h.tracker(t.id).last_post_id, 500);
}

#[tokio::test]
async fn repair_of_unknown_tracker_fails() {
    let h = harness();
    let err = h.engine.repair_tracker(999).await.unwrap_err();
    assert!(matches!(err, SyncError::TrackerNotFound(999)));
}

#[tokio::test]
async fn repair_propagates_provider_errors() {
    let h = harness();
    let t = h.add_tracker("artist", "artist");
    h.provider.script(
        "artist",
        vec![Err(ProviderError::Status {
            status: 503,
            context: "page 0 of 'artist'".to_string(),
        })],
    );

    let err = h.engine.repair_tracker(t.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Provider(_)));
}

#[tokio::test]
async fn sweep_without_credentials_does_not_fetch() {
    let h = harness();
    h.add_tracker("artist", "artist");
    h.provider.script("artist", vec![Ok(posts(1..=5))]);

    h.engine.sync_all().await;

    assert!(h.provider.queries().is_empty());
    let events = h.sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SyncEvent::SweepFailed { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, SyncEvent::SweepFinished { .. })));
}

#[tokio::test]
async fn failing_tracker_is_isolated_from_the_sweep() {
    let h = harness();
    h.seed_credentials();
    let bad = h.add_tracker("alpha", "alpha");
    let good = h.add_tracker("beta", "beta");

    h.provider.script(
        "alpha",
        vec![Err(ProviderError::Network("connection reset".to_string()))],
    );
    h.provider.script("beta", vec![Ok(posts(1..=3))]);

    h.engine.sync_all().await;

    // The failure stopped alpha only; beta synced normally.
    assert_eq!(h.post_count(bad.id), 0);
    assert_eq!(h.post_count(good.id), 3);

    let events = h.sink.events();
    assert!(events.iter().any(
        |e| matches!(e, SyncEvent::TrackerFailed { name, .. } if name == "alpha")
    ));
    assert!(events.iter().any(
        |e| matches!(e, SyncEvent::TrackerSynced { name, added: 3 } if name == "beta")
    ));
    assert!(events.iter().any(
        |e| matches!(e, SyncEvent::SweepFinished { added: 3, failed: 1 })
    ));
}

#[tokio::test]
async fn partial_failure_keeps_earlier_pages() {
    let h = harness();
    h.seed_credentials();
    let t = h.add_tracker("artist", "artist");
    h.provider.script(
        "artist",
        vec![
            Ok(posts(1..=100)),
            Err(ProviderError::Network("timed out".to_string())),
        ],
    );

    h.engine.sync_all().await;

    // The first page landed and advanced the cursor before the failure.
    assert_eq!(h.post_count(t.id), 100);
    let after = h.tracker(t.id);
    assert_eq!(after.last_post_id, 100);
    assert_eq!(after.new_posts_count, 100);

    let events = h.sink.events();
    assert!(events.iter().any(
        |e| matches!(e, SyncEvent::TrackerFailed { name, .. } if name == "artist")
    ));
}

/// Provider that parks inside the first fetch until released.
struct GatedProvider {
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
    fetches: AtomicUsize,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl BooruProvider for GatedProvider {
    async fn fetch_page(&self, _query: &PageQuery<'_>) -> Result<Vec<RemotePost>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }

    async fn search_tags(&self, _input: &str) -> Result<Vec<TagSuggestion>, ProviderError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn concurrent_runs_are_silently_ignored() {
    let db = Db::open_in_memory().unwrap();
    SettingsStore::new(&db)
        .save_credentials(&Credentials {
            user_id: "1234".to_string(),
            api_key: "secret".to_string(),
        })
        .unwrap();
    let tracker = TrackerStore::new(&db)
        .add(&NewTracker {
            name: "artist".to_string(),
            tag: "artist".to_string(),
            kind: TrackerKind::Tag,
        })
        .unwrap();

    let provider = Arc::new(GatedProvider::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = Arc::new(SyncEngine::with_options(
        db,
        Arc::clone(&provider),
        Arc::clone(&sink),
        SyncOptions {
            page_delay: Duration::ZERO,
            tracker_delay: Duration::ZERO,
            repair_max_pages: 3,
        },
    ));

    let running = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.sync_all().await })
    };

    // Wait until the first run is parked inside its fetch.
    provider.entered.notified().await;
    assert!(engine.is_running());

    // Both a second sweep and a repair are no-ops while the run is active.
    engine.sync_all().await;
    let repaired = engine.repair_tracker(tracker.id).await.unwrap();
    assert_eq!(repaired, 0);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

    provider.release.notify_one();
    running.await.unwrap();
    assert!(!engine.is_running());

    let events = sink.events();
    let sweeps = events
        .iter()
        .filter(|e| matches!(e, SyncEvent::SweepStarted))
        .count();
    assert_eq!(sweeps, 1);
}

#[tokio::test]
async fn sweep_visits_trackers_in_name_order() {
    let h = harness();
    h.seed_credentials();
    h.add_tracker("zeta", "z_tag");
    h.add_tracker("alpha", "a_tag");

    h.engine.sync_all().await;

    let tags: Vec<_> = h.provider.queries().iter().map(|q| q.tag.clone()).collect();
    assert_eq!(tags, vec!["a_tag", "z_tag"]);
}
