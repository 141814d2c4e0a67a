//! Global settings database operations
//!
//! Key-value accessors over the settings table, plus the catalog of keys an
//! admin may read and change. Keys outside the catalog (the token secret)
//! are never listed or writable through the API.

use confman_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;

/// Kind of value a setting holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingKind {
    Bool,
    /// Non-negative integer
    Count,
}

/// Admin-managed setting definition
struct SettingMeta {
    key: &'static str,
    kind: SettingKind,
    default_value: &'static str,
    description: &'static str,
}

const CATALOG: &[SettingMeta] = &[
    SettingMeta {
        key: "registration_open",
        kind: SettingKind::Bool,
        default_value: "true",
        description: "Whether new accounts may be created through /user/register. \
                      Admin-created accounts are unaffected.",
    },
    SettingMeta {
        key: "max_reviewers_per_submission",
        kind: SettingKind::Count,
        default_value: "0",
        description: "Upper bound on reviewer assignments per submission. 0 means unlimited.",
    },
];

/// One row of the admin settings listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    pub default_value: String,
    pub description: String,
}

fn meta(key: &str) -> Option<&'static SettingMeta> {
    CATALOG.iter().find(|m| m.key == key)
}

/// Generic setting getter
async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter
async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Whether self-registration is enabled
///
/// **Default:** true
pub async fn registration_open(db: &SqlitePool) -> Result<bool> {
    get_setting(db, "registration_open")
        .await
        .map(|opt| opt.unwrap_or(true))
}

/// Reviewer cap per submission; `None` when unlimited
///
/// **Default:** unlimited (stored as 0)
pub async fn max_reviewers_per_submission(db: &SqlitePool) -> Result<Option<i64>> {
    let cap: i64 = get_setting(db, "max_reviewers_per_submission")
        .await?
        .unwrap_or(0);
    Ok((cap > 0).then_some(cap))
}

/// Every catalogued setting with its current value
pub async fn list_settings(db: &SqlitePool) -> Result<Vec<SettingEntry>> {
    let mut entries = Vec::with_capacity(CATALOG.len());
    for m in CATALOG {
        let value: Option<String> = get_setting(db, m.key).await?;
        entries.push(SettingEntry {
            key: m.key.to_string(),
            value: value.unwrap_or_else(|| m.default_value.to_string()),
            default_value: m.default_value.to_string(),
            description: m.description.to_string(),
        });
    }
    Ok(entries)
}

/// Validate and store an admin-supplied setting value
pub async fn update_setting(db: &SqlitePool, key: &str, value: &str) -> Result<SettingEntry> {
    let m = meta(key).ok_or_else(|| Error::validation("key", format!("unknown setting '{}'", key)))?;

    let normalized = match m.kind {
        SettingKind::Bool => value
            .trim()
            .parse::<bool>()
            .map_err(|_| Error::validation(key, "expected true or false"))?
            .to_string(),
        SettingKind::Count => match value.trim().parse::<i64>() {
            Ok(n) if n >= 0 => n.to_string(),
            _ => return Err(Error::validation(key, "expected a non-negative integer")),
        },
    };

    set_setting(db, key, &normalized).await?;

    Ok(SettingEntry {
        key: m.key.to_string(),
        value: normalized,
        default_value: m.default_value.to_string(),
        description: m.description.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use confman_common::db::init_memory_database;

    #[tokio::test]
    async fn test_defaults() {
        let pool = init_memory_database().await.unwrap();
        assert!(registration_open(&pool).await.unwrap());
        assert_eq!(max_reviewers_per_submission(&pool).await.unwrap(), None);

        let listed = list_settings(&pool).await.unwrap();
        assert_eq!(listed.len(), CATALOG.len());
        assert!(listed.iter().all(|e| e.key != "token_secret"));
    }

    #[tokio::test]
    async fn test_update_validates_kind() {
        let pool = init_memory_database().await.unwrap();

        update_setting(&pool, "registration_open", "false").await.unwrap();
        assert!(!registration_open(&pool).await.unwrap());

        update_setting(&pool, "max_reviewers_per_submission", " 3 ").await.unwrap();
        assert_eq!(max_reviewers_per_submission(&pool).await.unwrap(), Some(3));

        assert!(update_setting(&pool, "registration_open", "maybe").await.is_err());
        assert!(update_setting(&pool, "max_reviewers_per_submission", "-1").await.is_err());
        assert!(matches!(
            update_setting(&pool, "token_secret", "x").await,
            Err(Error::Validation { field, .. }) if field == "key"
        ));
    }
}
