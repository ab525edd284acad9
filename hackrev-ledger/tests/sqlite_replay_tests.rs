//! SQLite backend: reopening a ledger reproduces ids, indices and records

use hackrev_common::db::init_database;
use hackrev_ledger::{
    LedgerBackend, LedgerError, LedgerStore, QueryEngine, RecordId, ReviewRecord,
    ReviewSubmission, SqliteBackend, SubmissionGateway, TagKey,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn submission(reviewer: &str, reviewee: &str, rating: i64, technologies: &[&str]) -> ReviewSubmission {
    ReviewSubmission {
        reviewer: reviewer.to_string(),
        reviewee: reviewee.to_string(),
        hackathon: "ETHGlobal".to_string(),
        rating,
        comment: format!("{} reviewing {}", reviewer, reviewee),
        technologies: technologies.iter().map(|t| t.to_string()).collect(),
        project_url: Some(format!("https://github.com/{}/project", reviewee)),
    }
}

async fn open_ledger(db_path: &Path) -> Arc<LedgerStore> {
    let pool = init_database(db_path).await.unwrap();
    Arc::new(LedgerStore::open(Arc::new(SqliteBackend::new(pool))).await.unwrap())
}

fn assert_same_record(actual: &ReviewRecord, expected: &ReviewRecord) {
    assert_eq!(actual.id, expected.id);
    assert_eq!(actual.reviewer, expected.reviewer);
    assert_eq!(actual.reviewee, expected.reviewee);
    assert_eq!(actual.hackathon, expected.hackathon);
    assert_eq!(actual.rating, expected.rating);
    assert_eq!(actual.comment, expected.comment);
    assert_eq!(actual.technologies, expected.technologies);
    assert_eq!(actual.project_url, expected.project_url);
    assert_eq!(
        actual.submitted_at.timestamp_micros(),
        expected.submitted_at.timestamp_micros()
    );
}

#[tokio::test]
async fn test_reopen_reproduces_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("hackrev.db");

    let originals: Vec<ReviewRecord> = {
        let ledger = open_ledger(&db_path).await;
        assert_eq!(ledger.backend_name(), "sqlite");
        let gateway = SubmissionGateway::new(ledger.clone());

        gateway
            .submit(submission("bob", "alice", 5, &["Solidity", "React", "react"]))
            .await
            .unwrap();
        gateway
            .submit(submission("carol", "alice", 4, &["Polygon", "React"]))
            .await
            .unwrap();
        gateway
            .submit(submission("alice", "dave", 3, &["Rust"]))
            .await
            .unwrap();

        (1..=3)
            .map(|id| ledger.get_by_id(RecordId::new(id)).unwrap())
            .collect()
    };

    let ledger = open_ledger(&db_path).await;
    assert_eq!(ledger.len(), 3);
    ledger.check_consistency().unwrap();

    for original in &originals {
        assert_same_record(&ledger.get_by_id(original.id).unwrap(), original);
    }

    let queries = QueryEngine::new(ledger.clone());
    let alice: Vec<u64> = queries.reviews_of("alice").iter().map(|r| r.id.get()).collect();
    assert_eq!(alice, vec![1, 2]);

    let react = ledger.records_tagged(&TagKey::normalize("REACT").unwrap());
    assert_eq!(react.len(), 2);
    // Duplicate display tags survive the round trip
    assert_eq!(react[0].technologies, vec!["Solidity", "React", "react"]);

    // Next commit continues the persisted sequence
    let id = SubmissionGateway::new(ledger.clone())
        .submit(submission("erin", "alice", 2, &["Go"]))
        .await
        .unwrap();
    assert_eq!(id, RecordId::new(4));
}

#[tokio::test]
async fn test_point_read_from_backend() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("hackrev.db")).await.unwrap();
    let backend = Arc::new(SqliteBackend::new(pool));
    let ledger = LedgerStore::open(backend.clone()).await.unwrap();

    let draft = hackrev_ledger::validate_submission(submission("bob", "alice", 5, &["Rust"])).unwrap();
    let id = ledger.commit(draft).await.unwrap();

    let stored = backend.read(id).await.unwrap().unwrap();
    assert_same_record(&stored, &ledger.get_by_id(id).unwrap());
    assert!(backend.read(RecordId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_gap_in_persisted_ids_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("hackrev.db");

    {
        let ledger = open_ledger(&db_path).await;
        let gateway = SubmissionGateway::new(ledger);
        for reviewer in ["bob", "carol", "dave"] {
            gateway
                .submit(submission(reviewer, "alice", 4, &["Rust"]))
                .await
                .unwrap();
        }
    }

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("DELETE FROM review_technologies WHERE review_id = 2")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM reviews WHERE id = 2")
        .execute(&pool)
        .await
        .unwrap();

    let result = LedgerStore::open(Arc::new(SqliteBackend::new(pool))).await;
    assert!(matches!(result, Err(LedgerError::Persistence(_))));
}
