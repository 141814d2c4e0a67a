//! Database initialization and schema constraint tests
//!
//! Verifies that the storage layer itself enforces uniqueness and the
//! cascade/restrict rules for deletions.

use confman_common::db::{init_database, init_memory_database};
use confman_common::Error;
use sqlx::SqlitePool;
use tempfile::TempDir;

const NOW: &str = "2026-01-01T00:00:00.000Z";

async fn insert_user(pool: &SqlitePool, id: &str, username: &str, email: &str) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, phone, created_at, updated_at)
         VALUES (?, ?, ?, 'x', '+1555', ?, ?)",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(NOW)
    .bind(NOW)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_conference(pool: &SqlitePool, id: &str, owner: &str) {
    sqlx::query(
        "INSERT INTO conferences (id, title, start_date, end_date, mode, created_by, created_at, updated_at)
         VALUES (?, 'Conf', '2026-01-10', '2026-01-12', 'Online', ?, ?, ?)",
    )
    .bind(id)
    .bind(owner)
    .bind(NOW)
    .bind(NOW)
    .execute(pool)
    .await
    .unwrap();
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("confman.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("confman.db");

    let pool1 = init_database(&db_path).await.unwrap();
    insert_user(&pool1, "u1", "alice", "alice@x.com").await.unwrap();
    pool1.close().await;

    // Second open re-runs schema creation without touching data
    let pool2 = init_database(&db_path).await.unwrap();
    assert_eq!(count(&pool2, "users").await, 1);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let pool = init_memory_database().await.unwrap();

    let open: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'registration_open'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(open, "true");

    let limit: String =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'max_reviewers_per_submission'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(limit, "0");
}

#[tokio::test]
async fn test_unique_email_reports_field() {
    let pool = init_memory_database().await.unwrap();
    insert_user(&pool, "u1", "alice", "alice@x.com").await.unwrap();

    let err = insert_user(&pool, "u2", "alice2", "alice@x.com").await.unwrap_err();
    assert!(matches!(err, Error::Conflict { ref field } if field == "email"), "{:?}", err);

    let err = insert_user(&pool, "u3", "alice", "other@x.com").await.unwrap_err();
    assert!(matches!(err, Error::Conflict { ref field } if field == "username"), "{:?}", err);
}

#[tokio::test]
async fn test_registration_pair_unique() {
    let pool = init_memory_database().await.unwrap();
    insert_user(&pool, "u1", "alice", "alice@x.com").await.unwrap();
    insert_conference(&pool, "c1", "u1").await;

    let insert = |id: &'static str| {
        let pool = pool.clone();
        async move {
            sqlx::query(
                "INSERT INTO registrations (id, user_id, conference_id, registered_at)
                 VALUES (?, 'u1', 'c1', ?)",
            )
            .bind(id)
            .bind(NOW)
            .execute(&pool)
            .await
            .map_err(Error::from)
        }
    };

    insert("r1").await.unwrap();
    let err = insert("r2").await.unwrap_err();
    assert!(matches!(err, Error::Conflict { ref field } if field == "registration"));
}

#[tokio::test]
async fn test_end_before_start_rejected_by_schema() {
    let pool = init_memory_database().await.unwrap();
    insert_user(&pool, "u1", "chair", "chair@x.com").await.unwrap();

    let result = sqlx::query(
        "INSERT INTO conferences (id, title, start_date, end_date, mode, created_by, created_at, updated_at)
         VALUES ('c1', 'Conf', '2026-01-12', '2026-01-10', 'Online', 'u1', ?, ?)",
    )
    .bind(NOW)
    .bind(NOW)
    .execute(&pool)
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_conference_delete_cascades() {
    let pool = init_memory_database().await.unwrap();
    insert_user(&pool, "chair", "chair", "chair@x.com").await.unwrap();
    insert_user(&pool, "author", "author", "author@x.com").await.unwrap();
    insert_user(&pool, "rev", "rev", "rev@x.com").await.unwrap();
    insert_conference(&pool, "c1", "chair").await;

    sqlx::query("INSERT INTO registrations (id, user_id, conference_id, registered_at) VALUES ('r1', 'author', 'c1', ?)")
        .bind(NOW)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO submissions (id, title, abstract, author_id, conference_id, file_url, submitted_at)
         VALUES ('s1', 'Paper', 'Abstract', 'author', 'c1', 'blob://1', ?)",
    )
    .bind(NOW)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO reviews (id, submission_id, reviewer_id, conference_id, assigned_at)
         VALUES ('v1', 's1', 'rev', 'c1', ?)",
    )
    .bind(NOW)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM conferences WHERE id = 'c1'")
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(count(&pool, "registrations").await, 0);
    assert_eq!(count(&pool, "submissions").await, 0);
    assert_eq!(count(&pool, "reviews").await, 0);
}

#[tokio::test]
async fn test_conference_owner_delete_restricted() {
    let pool = init_memory_database().await.unwrap();
    insert_user(&pool, "chair", "chair", "chair@x.com").await.unwrap();
    insert_conference(&pool, "c1", "chair").await;

    let result = sqlx::query("DELETE FROM users WHERE id = 'chair'")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "Owner deletion must be refused while conferences exist");
    assert_eq!(count(&pool, "conferences").await, 1);
}
