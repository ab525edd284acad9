//! SQLite backend
//!
//! Schema lives in `hackrev_common::db::init`: one `reviews` row per record
//! and one `review_technologies` row per tag (position, display text,
//! normalized key). Each append is a single transaction.

use super::LedgerBackend;
use crate::record::{RecordId, ReviewRecord, TagKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hackrev_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Wrap a pool whose schema was created by `hackrev_common::db::init_database`
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Map a `reviews` row; technologies are attached by the caller
fn review_from_row(row: &SqliteRow, technologies: Vec<String>) -> Result<ReviewRecord> {
    let id: i64 = row.try_get("id")?;
    let id = u64::try_from(id)
        .map_err(|_| Error::InvalidInput(format!("negative review id {}", id)))?;
    let rating: i64 = row.try_get("rating")?;
    let rating = u8::try_from(rating)
        .map_err(|_| Error::InvalidInput(format!("review {} has rating {}", id, rating)))?;
    let submitted_at: DateTime<Utc> = row.try_get("submitted_at")?;

    Ok(ReviewRecord {
        id: RecordId::new(id),
        reviewer: row.try_get("reviewer")?,
        reviewee: row.try_get("reviewee")?,
        hackathon: row.try_get("hackathon")?,
        rating,
        comment: row.try_get("comment")?,
        technologies,
        project_url: row.try_get("project_url")?,
        submitted_at,
    })
}

fn db_id(id: RecordId) -> Result<i64> {
    i64::try_from(id.get())
        .map_err(|_| Error::InvalidInput(format!("review id {} exceeds SQLite range", id)))
}

#[async_trait]
impl LedgerBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn append(&self, record: &ReviewRecord) -> Result<()> {
        let id = db_id(record.id)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reviews (id, reviewer, reviewee, hackathon, rating, comment, project_url, submitted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&record.reviewer)
        .bind(&record.reviewee)
        .bind(&record.hackathon)
        .bind(i64::from(record.rating))
        .bind(&record.comment)
        .bind(&record.project_url)
        .bind(record.submitted_at)
        .execute(&mut *tx)
        .await?;

        for (position, technology) in record.technologies.iter().enumerate() {
            let tag_key = TagKey::normalize(technology).ok_or_else(|| {
                Error::InvalidInput(format!("review {} has a blank technology", record.id))
            })?;
            sqlx::query(
                "INSERT INTO review_technologies (review_id, position, technology, tag_key) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(technology)
            .bind(tag_key.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(id = %record.id, "Appended review to SQLite");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ReviewRecord>> {
        let tech_rows = sqlx::query(
            "SELECT review_id, technology FROM review_technologies ORDER BY review_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut technologies: HashMap<i64, Vec<String>> = HashMap::new();
        for row in &tech_rows {
            let review_id: i64 = row.try_get("review_id")?;
            technologies
                .entry(review_id)
                .or_default()
                .push(row.try_get("technology")?);
        }

        let rows = sqlx::query(
            "SELECT id, reviewer, reviewee, hackathon, rating, comment, project_url, submitted_at
             FROM reviews ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                review_from_row(row, technologies.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn read(&self, id: RecordId) -> Result<Option<ReviewRecord>> {
        let db_id = db_id(id)?;
        let Some(row) = sqlx::query(
            "SELECT id, reviewer, reviewee, hackathon, rating, comment, project_url, submitted_at
             FROM reviews WHERE id = ?",
        )
        .bind(db_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let technologies: Vec<String> = sqlx::query_scalar(
            "SELECT technology FROM review_technologies WHERE review_id = ? ORDER BY position",
        )
        .bind(db_id)
        .fetch_all(&self.pool)
        .await?;

        review_from_row(&row, technologies).map(Some)
    }
}
