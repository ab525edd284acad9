//! Database initialization
//!
//! Creates the database file on first run and the ledger tables if missing.
//! Table creation is idempotent, so this runs on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
///
/// Pragmas are per connection, so they are set on the connect options and
/// apply to every connection the pool opens.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL lets readers proceed while the single ledger writer appends
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_reviews_table(&pool).await?;
    create_review_technologies_table(&pool).await?;

    Ok(pool)
}

async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY,
            reviewer TEXT NOT NULL,
            reviewee TEXT NOT NULL,
            hackathon TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment TEXT NOT NULL,
            project_url TEXT,
            submitted_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_reviewee ON reviews(reviewee)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_review_technologies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_technologies (
            review_id INTEGER NOT NULL REFERENCES reviews(id),
            position INTEGER NOT NULL,
            technology TEXT NOT NULL,
            tag_key TEXT NOT NULL,
            PRIMARY KEY (review_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_technologies_tag ON review_technologies(tag_key)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
