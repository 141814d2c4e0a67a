//! Verification code storage
//!
//! One live code per (user, channel). Issuing a new code replaces the old
//! one and resets its failed-attempt counter.

use chrono::{DateTime, Utc};
use confman_common::auth::Channel;
use confman_common::{time, Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// A stored, not yet consumed code
#[derive(Debug, Clone)]
pub struct StoredCode {
    pub channel: Channel,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i64,
}

impl StoredCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Store (or replace) the code for one channel
pub async fn upsert_code(
    pool: &SqlitePool,
    user_id: Uuid,
    channel: Channel,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO verification_codes (user_id, channel, code, expires_at, attempts)
        VALUES (?, ?, ?, ?, 0)
        ON CONFLICT(user_id, channel) DO UPDATE SET
            code = excluded.code,
            expires_at = excluded.expires_at,
            attempts = 0
        "#,
    )
    .bind(user_id.to_string())
    .bind(channel.as_str())
    .bind(code)
    .bind(time::to_storage(expires_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all live codes for a user
pub async fn get_codes(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<StoredCode>> {
    let rows = sqlx::query(
        "SELECT channel, code, expires_at, attempts FROM verification_codes WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let channel: String = row.get("channel");
            let expires_at: String = row.get("expires_at");
            Ok(StoredCode {
                channel: channel
                    .parse()
                    .map_err(|_| Error::Internal(format!("Corrupt channel '{}'", channel)))?,
                code: row.get("code"),
                expires_at: time::parse_timestamp(&expires_at)?,
                attempts: row.get("attempts"),
            })
        })
        .collect()
}

/// Count a failed attempt; discards the code once `max_attempts` is reached
///
/// Returns `true` if the code was discarded.
pub async fn record_failure(
    pool: &SqlitePool,
    user_id: Uuid,
    channel: Channel,
    max_attempts: i64,
) -> Result<bool> {
    let attempts: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE verification_codes SET attempts = attempts + 1
        WHERE user_id = ? AND channel = ?
        RETURNING attempts
        "#,
    )
    .bind(user_id.to_string())
    .bind(channel.as_str())
    .fetch_optional(pool)
    .await?;

    match attempts {
        Some(n) if n >= max_attempts => {
            let mut conn = pool.acquire().await?;
            delete_code(&mut conn, user_id, channel).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Remove a consumed or discarded code
pub async fn delete_code(conn: &mut SqliteConnection, user_id: Uuid, channel: Channel) -> Result<()> {
    sqlx::query("DELETE FROM verification_codes WHERE user_id = ? AND channel = ?")
        .bind(user_id.to_string())
        .bind(channel.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
