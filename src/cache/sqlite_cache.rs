use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};

use crate::asset::{AssetKind, AssetRecord, Reviewable, Status};
use crate::error::{GovernanceError, Result};
use crate::review::Review;
use crate::storage::AssetStore;

const CACHE_DB: &str = "cache.db";

/// SQLite index over scores and the moderation queue.
///
/// Everything in here is derived from the store and can be thrown away;
/// it is rebuilt whenever the store's version hash moves.
pub struct ScoreIndex {
    conn: Connection,
    path: PathBuf,
}

impl ScoreIndex {
    /// Open or create the index database
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CACHE_DB);
        let conn = Connection::open(&path)?;

        let index = Self { conn, path };
        index.init_schema()?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                title TEXT NOT NULL,
                score REAL,
                total_weight INTEGER,
                rating_count INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_assets_kind_score ON assets(kind, score);

            CREATE TABLE IF NOT EXISTS pending_reviews (
                review_id TEXT PRIMARY KEY,
                asset_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                requested_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Store version the index was built from
    pub fn store_version(&self) -> Result<Option<String>> {
        let result: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'store_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM assets; DELETE FROM pending_reviews; DELETE FROM meta;",
        )?;
        Ok(())
    }

    /// Rebuild from `store` unless the index already matches `version`.
    /// Returns true if a rebuild happened.
    pub fn sync_from_store<S: AssetStore>(&mut self, store: &S, version: &str) -> Result<bool> {
        if self.store_version()?.as_deref() == Some(version) {
            return Ok(false);
        }

        let records = store.list()?;
        let tx = self.conn.transaction()?;
        tx.execute_batch("DELETE FROM assets; DELETE FROM pending_reviews;")?;
        for record in &records {
            write_asset(&tx, record)?;
            if let Some(open) = store.reviews_for(record.id())?.into_iter().find(|r| r.is_open()) {
                write_pending(&tx, &open, record)?;
            }
        }
        write_version(&tx, version)?;
        tx.commit()?;

        tracing::debug!(assets = records.len(), %version, "score index rebuilt");
        Ok(true)
    }

    /// Highest-scored active assets of `kind`. Unscored assets are left out.
    pub fn leaderboard(&self, kind: AssetKind, limit: usize) -> Result<Vec<RankedAsset>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, title, score, total_weight, rating_count
             FROM assets
             WHERE kind = ?1 AND status = ?2 AND score IS NOT NULL
             ORDER BY score DESC, total_weight DESC, id
             LIMIT ?3",
        )?;

        let results = stmt
            .query_map(
                params![kind.to_string(), Status::Active.to_string(), limit as i64],
                |row| {
                    Ok(RankedAsset {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        title: row.get(2)?,
                        score: row.get(3)?,
                        total_weight: row.get(4)?,
                        rating_count: row.get(5)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Open reviews, oldest request first.
    pub fn pending_reviews(&self) -> Result<Vec<QueuedReview>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_id, asset_id, kind, title, requested_at
             FROM pending_reviews
             ORDER BY requested_at, review_id",
        )?;

        let results = stmt
            .query_map([], |row| {
                Ok(QueuedReview {
                    review_id: row.get(0)?,
                    asset_id: row.get(1)?,
                    kind: row.get(2)?,
                    title: row.get(3)?,
                    requested_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Index a single record outside a full rebuild.
    pub fn refresh(&self, record: &AssetRecord, open_review: Option<&Review>) -> Result<()> {
        write_asset(&self.conn, record)?;
        self.conn
            .execute("DELETE FROM pending_reviews WHERE asset_id = ?1", [record.id()])?;
        if let Some(review) = open_review {
            write_pending(&self.conn, review, record)?;
        }
        // the index no longer matches any store version
        self.conn
            .execute("DELETE FROM meta WHERE key = 'store_version'", [])?;
        Ok(())
    }
}

fn write_version(conn: &Connection, version: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('store_version', ?1)",
        [version],
    )?;
    Ok(())
}

fn write_asset(conn: &Connection, record: &AssetRecord) -> Result<()> {
    let score = record.score();
    conn.execute(
        "INSERT OR REPLACE INTO assets
         (id, kind, status, title, score, total_weight, rating_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id(),
            record.kind().to_string(),
            record.status().to_string(),
            record.title(),
            score.map(|s| s.value),
            score.map(|s| s.total_weight),
            score.map(|s| s.rating_count as i64),
        ],
    )?;
    Ok(())
}

fn write_pending(conn: &Connection, review: &Review, record: &AssetRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO pending_reviews
         (review_id, asset_id, kind, title, requested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            review.id,
            review.asset_id,
            record.kind().to_string(),
            record.title(),
            review
                .requested_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )?;
    Ok(())
}

/// A leaderboard row
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAsset {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub score: f64,
    pub total_weight: i64,
    pub rating_count: i64,
}

/// A moderation queue row
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedReview {
    pub review_id: String,
    pub asset_id: String,
    pub kind: String,
    pub title: String,
    pub requested_at: String,
}

impl From<rusqlite::Error> for GovernanceError {
    fn from(e: rusqlite::Error) -> Self {
        GovernanceError::StorageUnavailable(format!("SQLite error: {}", e))
    }
}
