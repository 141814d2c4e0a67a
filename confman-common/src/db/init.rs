//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table
//! idempotently. Uniqueness and referential rules live in the schema:
//! - `users.username`, `users.email` unique
//! - one registration per (user, conference)
//! - one review per (submission, reviewer)
//! - deleting a conference cascades to its registrations, submissions, reviews
//! - deleting a user cascades to their registrations, submissions, reviews and
//!   codes, but is refused while they still own a conference

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Single connection: every SQLite `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and default settings (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_verification_codes_table(pool).await?;
    create_conferences_table(pool).await?;
    create_registrations_table(pool).await?;
    create_submissions_table(pool).await?;
    create_reviews_table(pool).await?;

    init_default_settings(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores admin-managed global settings and the generated token secret.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'Attendee'
                CHECK (role IN ('Attendee', 'Author', 'Reviewer', 'Chair', 'Admin')),
            is_email_verified INTEGER NOT NULL DEFAULT 0,
            is_phone_verified INTEGER NOT NULL DEFAULT 0,
            affiliation TEXT,
            bio TEXT,
            social_links TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_verification_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verification_codes (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            channel TEXT NOT NULL CHECK (channel IN ('email', 'phone')),
            code TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, channel)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_conferences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conferences (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            submission_deadline TEXT,
            location TEXT NOT NULL DEFAULT '',
            mode TEXT NOT NULL CHECK (mode IN ('In-Person', 'Online', 'Hybrid')),
            themes TEXT NOT NULL DEFAULT '[]',
            registration_fees TEXT NOT NULL DEFAULT '{}',
            contact TEXT NOT NULL DEFAULT '{}',
            convenors TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'upcoming'
                CHECK (status IN ('upcoming', 'ongoing', 'completed', 'cancelled')),
            created_by TEXT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (end_date >= start_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conferences_created_by ON conferences(created_by)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_registrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS registrations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            conference_id TEXT NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'Confirmed'
                CHECK (status IN ('Pending', 'Confirmed', 'Cancelled')),
            intend_to_submit INTEGER NOT NULL DEFAULT 0,
            registered_at TEXT NOT NULL,
            UNIQUE (user_id, conference_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            abstract TEXT NOT NULL,
            author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            conference_id TEXT NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
            file_url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Under Review'
                CHECK (status IN ('Under Review', 'Accepted', 'Rejected')),
            submitted_at TEXT NOT NULL,
            decided_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_conference ON submissions(conference_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_author ON submissions(author_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            reviewer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            conference_id TEXT NOT NULL REFERENCES conferences(id) ON DELETE CASCADE,
            score INTEGER CHECK (score IS NULL OR score BETWEEN 1 AND 5),
            feedback TEXT,
            status TEXT NOT NULL DEFAULT 'Pending'
                CHECK (status IN ('Pending', 'Completed')),
            assigned_at TEXT NOT NULL,
            completed_at TEXT,
            UNIQUE (submission_id, reviewer_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert default values for admin-managed settings that are missing
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "registration_open", "true").await?;
    ensure_setting(pool, "max_reviewers_per_submission", "0").await?;
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;
    Ok(())
}
