// SPDX-License-Identifier: MPL-2.0

use crate::store::{Db, StoreError};
use crate::tags::normalize_tag;
use rusqlite::params;

/// How a tracker's canonical tag is turned into a remote query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerKind {
    /// Plain tag search.
    Tag,
    /// Uploader search, prefixed with `user:` on the wire.
    Uploader,
    /// Saved multi-tag query.
    Query,
}

impl TrackerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerKind::Tag => "tag",
            TrackerKind::Uploader => "uploader",
            TrackerKind::Query => "query",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "uploader" => TrackerKind::Uploader,
            "query" => TrackerKind::Query,
            _ => TrackerKind::Tag,
        }
    }
}

/// A tracked tag/uploader and its sync cursor.
#[derive(Debug, Clone)]
pub struct Tracker {
    pub id: i64,
    pub name: String,
    /// Canonical search key, unique across trackers.
    pub tag: String,
    pub kind: TrackerKind,
    /// Highest remote post id already incorporated. Never decreases.
    pub last_post_id: u64,
    /// Posts added since the user last acknowledged this tracker.
    pub new_posts_count: u64,
    /// Unix time of the most recent sync attempt, new posts or not.
    pub last_checked: Option<i64>,
    pub created_at: i64,
}

/// Fields supplied when adding a tracker.
#[derive(Debug, Clone)]
pub struct NewTracker {
    pub name: String,
    pub tag: String,
    pub kind: TrackerKind,
}

/// Store operations for trackers
pub struct TrackerStore<'a> {
    db: &'a Db,
}

impl<'a> TrackerStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// All trackers in stable name order, the order a sweep visits them in.
    pub fn list_all(&self) -> Result<Vec<Tracker>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, tag, kind, last_post_id, new_posts_count, last_checked, created_at
            FROM trackers
            ORDER BY name ASC
            "#,
        )?;

        let trackers = stmt
            .query_map([], Self::row_to_tracker)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(trackers)
    }

    pub fn get(&self, id: i64) -> Result<Tracker, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, tag, kind, last_post_id, new_posts_count, last_checked, created_at
            FROM trackers
            WHERE id = ?
            "#,
        )?;

        stmt.query_row([id], Self::row_to_tracker)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Database(other),
            })
    }

    /// Insert a tracker. The tag is normalized to its canonical form first;
    /// fails with `DuplicateTag` if the canonical tag is already tracked.
    pub fn add(&self, tracker: &NewTracker) -> Result<Tracker, StoreError> {
        let tag = normalize_tag(&tracker.tag);
        let conn = self.db.conn();
        let now = Db::now();

        let result = conn.execute(
            r#"
            INSERT INTO trackers (name, tag, kind, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![tracker.name, tag, tracker.kind.as_str(), now],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateTag(tag));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        drop(conn);
        self.get(id)
    }

    /// Delete a tracker; its cached posts cascade.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let changed = conn.execute("DELETE FROM trackers WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// User acknowledgement: zero the new-post counter.
    pub fn reset_new_count(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE trackers SET new_posts_count = 0 WHERE id = ?",
            [id],
        )?;
        Ok(changed > 0)
    }

    /// Atomic, monotone progress update after a sync batch.
    ///
    /// The cursor only moves forward: the SQL CASE keeps the stored value
    /// when the candidate is not greater, so a racing repair run can never
    /// regress it. `last_checked` advances unconditionally.
    pub fn apply_progress(
        &self,
        id: i64,
        cursor_candidate: u64,
        added_count: usize,
    ) -> Result<(), StoreError> {
        let conn = self.db.conn();
        let now = Db::now();

        conn.execute(
            r#"
            UPDATE trackers
            SET
                last_post_id = CASE
                    WHEN ?2 > last_post_id THEN ?2
                    ELSE last_post_id
                END,
                new_posts_count = new_posts_count + ?3,
                last_checked = ?4
            WHERE id = ?1
            "#,
            params![id, cursor_candidate as i64, added_count as i64, now],
        )?;

        Ok(())
    }

    /// One-shot cleanup of tags stored before normalization existed.
    ///
    /// Rewrites every tag to its canonical form and returns how many rows
    /// changed. A tracker whose canonical form is already taken by another
    /// tracker is left as-is rather than merged.
    pub fn normalize_all(&self) -> Result<usize, StoreError> {
        let trackers = self.list_all()?;
        let conn = self.db.conn();
        let mut changed = 0;

        for tracker in &trackers {
            let canonical = normalize_tag(&tracker.tag);
            if canonical == tracker.tag {
                continue;
            }

            let result = conn.execute(
                "UPDATE trackers SET tag = ?1 WHERE id = ?2",
                params![canonical, tracker.id],
            );
            match result {
                Ok(_) => changed += 1,
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(changed)
    }

    /// LIKE search over name and tag for the add-tracker picker.
    pub fn search(&self, query: &str) -> Result<Vec<Tracker>, StoreError> {
        if query.len() < 2 {
            return Ok(Vec::new());
        }

        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, tag, kind, last_post_id, new_posts_count, last_checked, created_at
            FROM trackers
            WHERE name LIKE ?1 OR tag LIKE ?1
            ORDER BY name ASC
            LIMIT 20
            "#,
        )?;

        let pattern = format!("%{}%", query);
        let trackers = stmt
            .query_map([pattern], Self::row_to_tracker)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(trackers)
    }

    fn row_to_tracker(row: &rusqlite::Row) -> Result<Tracker, rusqlite::Error> {
        let kind: String = row.get(3)?;
        Ok(Tracker {
            id: row.get(0)?,
            name: row.get(1)?,
            tag: row.get(2)?,
            kind: TrackerKind::from_str(&kind),
            last_post_id: row.get::<_, i64>(4)? as u64,
            new_posts_count: row.get::<_, i64>(5)? as u64,
            last_checked: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}
