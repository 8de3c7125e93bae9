// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the tracker database
pub const SCHEMA: &str = r#"
-- Database version for migrations
PRAGMA user_version = 1;

-- trackers: tags/uploaders/queries being watched for new posts
CREATE TABLE IF NOT EXISTS trackers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    tag TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL DEFAULT 'tag',
    last_post_id INTEGER NOT NULL DEFAULT 0,
    new_posts_count INTEGER NOT NULL DEFAULT 0,
    last_checked INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trackers_name ON trackers(name);

-- posts: cached metadata, one row per (tracker, remote post id)
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracker_id INTEGER NOT NULL REFERENCES trackers(id) ON DELETE CASCADE,
    post_id INTEGER NOT NULL,
    file_url TEXT NOT NULL,
    preview_url TEXT NOT NULL DEFAULT '',
    sample_url TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '',
    rating TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    published_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    is_viewed INTEGER NOT NULL DEFAULT 0,
    is_favorited INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_tracker ON posts(tracker_id, post_id DESC);

-- credentials: single-row API credential pair
CREATE TABLE IF NOT EXISTS credentials (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    user_id TEXT NOT NULL,
    api_key TEXT NOT NULL
);
"#;

/// Dedup key for posts, created after legacy duplicates are removed.
pub const POSTS_UNIQUE_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_tracker_post_unique ON posts(tracker_id, post_id)";

/// Removes duplicate (tracker_id, post_id) rows left behind by databases
/// created before the unique index existed, keeping the oldest row.
pub const POSTS_DEDUPE: &str = r#"
DELETE FROM posts
WHERE id NOT IN (
    SELECT MIN(id)
    FROM posts
    GROUP BY tracker_id, post_id
)
"#;
