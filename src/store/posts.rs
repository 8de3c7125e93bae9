// SPDX-License-Identifier: MPL-2.0

use crate::booru::RemotePost;
use crate::store::{Db, StoreError};
use rusqlite::params;

/// A cached post row. The remote service stays the source of truth for the
/// descriptive fields; `is_viewed`/`is_favorited` are purely local.
#[derive(Debug, Clone)]
pub struct CachedPost {
    pub id: i64,
    pub tracker_id: i64,
    pub post_id: u64,
    pub file_url: String,
    pub preview_url: String,
    pub sample_url: String,
    pub tags: String,
    pub rating: String,
    pub title: String,
    pub published_at: i64,
    pub created_at: i64,
    pub is_viewed: bool,
    pub is_favorited: bool,
}

/// Store operations for cached posts
pub struct PostStore<'a> {
    db: &'a Db,
}

impl<'a> PostStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Upsert one batch of posts in a single transaction.
    ///
    /// Merge policy on conflict: media URLs are only replaced by non-empty
    /// incoming values, tags and rating always take the incoming value,
    /// and local view state is left alone.
    pub fn upsert_batch(&self, tracker_id: i64, posts: &[RemotePost]) -> Result<(), StoreError> {
        if posts.is_empty() {
            return Ok(());
        }

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let now = Db::now();

        for post in posts {
            tx.execute(
                r#"
                INSERT INTO posts (
                    tracker_id, post_id, file_url, preview_url, sample_url,
                    tags, rating, title, published_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', ?8, ?9)
                ON CONFLICT(tracker_id, post_id) DO UPDATE SET
                    file_url = CASE
                        WHEN excluded.file_url != '' THEN excluded.file_url
                        ELSE posts.file_url
                    END,
                    preview_url = CASE
                        WHEN excluded.preview_url != '' THEN excluded.preview_url
                        ELSE posts.preview_url
                    END,
                    sample_url = CASE
                        WHEN excluded.sample_url != '' THEN excluded.sample_url
                        ELSE posts.sample_url
                    END,
                    tags = excluded.tags,
                    rating = excluded.rating
                "#,
                params![
                    tracker_id,
                    post.post_id as i64,
                    post.file_url,
                    post.preview_url,
                    post.sample_url,
                    post.tags,
                    post.rating,
                    post.published_at,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// A gallery page for one tracker, newest remote id first.
    pub fn list_by_tracker(
        &self,
        tracker_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CachedPost>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tracker_id, post_id, file_url, preview_url, sample_url,
                   tags, rating, title, published_at, created_at, is_viewed, is_favorited
            FROM posts
            WHERE tracker_id = ?1
            ORDER BY post_id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;

        let posts = stmt
            .query_map(
                params![tracker_id, limit as i64, offset as i64],
                Self::row_to_post,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    /// Cached post count, for one tracker or overall.
    pub fn count(&self, tracker_id: Option<i64>) -> Result<u64, StoreError> {
        let conn = self.db.conn();
        let count: i64 = match tracker_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE tracker_id = ?",
                [id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    pub fn mark_viewed(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let changed = conn.execute("UPDATE posts SET is_viewed = 1 WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Flip the favorite flag, returning the new value.
    pub fn toggle_favorite(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE posts SET is_favorited = NOT is_favorited WHERE id = ?",
            [id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        let favorited: bool =
            conn.query_row("SELECT is_favorited FROM posts WHERE id = ?", [id], |row| {
                row.get(0)
            })?;
        Ok(favorited)
    }

    /// Clear view state for every post of a tracker.
    pub fn reset_viewed(&self, tracker_id: i64) -> Result<usize, StoreError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE posts SET is_viewed = 0 WHERE tracker_id = ?",
            [tracker_id],
        )?;
        Ok(changed)
    }

    fn row_to_post(row: &rusqlite::Row) -> Result<CachedPost, rusqlite::Error> {
        Ok(CachedPost {
            id: row.get(0)?,
            tracker_id: row.get(1)?,
            post_id: row.get::<_, i64>(2)? as u64,
            file_url: row.get(3)?,
            preview_url: row.get(4)?,
            sample_url: row.get(5)?,
            tags: row.get(6)?,
            rating: row.get(7)?,
            title: row.get(8)?,
            published_at: row.get(9)?,
            created_at: row.get(10)?,
            is_viewed: row.get(11)?,
            is_favorited: row.get(12)?,
        })
    }
}
