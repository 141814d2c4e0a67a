//! Registration database operations

use confman_common::db::{Registration, RegistrationStatus};
use confman_common::{time, uuid_utils, Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// A registration joined with its conference's headline fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    #[serde(flatten)]
    pub registration: Registration,
    pub conference_title: String,
    pub conference_start_date: String,
    pub conference_status: String,
}

fn registration_from_row(row: &SqliteRow) -> Result<Registration> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let conference_id: String = row.get("conference_id");
    let status: String = row.get("status");
    let registered_at: String = row.get("registered_at");

    Ok(Registration {
        id: uuid_utils::parse_stored(&id)?,
        user_id: uuid_utils::parse_stored(&user_id)?,
        conference_id: uuid_utils::parse_stored(&conference_id)?,
        status: status.parse()?,
        intend_to_submit: row.get("intend_to_submit"),
        registered_at: time::parse_timestamp(&registered_at)?,
    })
}

/// Register a user for a conference
///
/// A second registration for the same pair is rejected by the schema and
/// surfaces as `Error::Conflict { field: "registration" }`.
pub async fn insert_registration(
    pool: &SqlitePool,
    user_id: Uuid,
    conference_id: Uuid,
    intend_to_submit: bool,
) -> Result<Registration> {
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO registrations (id, user_id, conference_id, status, intend_to_submit, registered_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(conference_id.to_string())
    .bind(RegistrationStatus::Confirmed.as_str())
    .bind(intend_to_submit)
    .bind(time::to_storage(time::now()))
    .execute(pool)
    .await?;

    let row = sqlx::query(
        "SELECT id, user_id, conference_id, status, intend_to_submit, registered_at \
         FROM registrations WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::Internal(format!("Registration {} vanished after insert", id)))?;

    registration_from_row(&row)
}

/// A user's registrations with conference details, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<RegistrationSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.user_id, r.conference_id, r.status, r.intend_to_submit, r.registered_at,
               c.title AS conference_title, c.start_date AS conference_start_date,
               c.status AS conference_status
        FROM registrations r
        JOIN conferences c ON c.id = r.conference_id
        WHERE r.user_id = ?
        ORDER BY r.registered_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(RegistrationSummary {
                registration: registration_from_row(row)?,
                conference_title: row.get("conference_title"),
                conference_start_date: row.get("conference_start_date"),
                conference_status: row.get("conference_status"),
            })
        })
        .collect()
}

/// The user's registrations keyed by conference id
pub async fn registrations_by_conference(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<HashMap<Uuid, Registration>> {
    let rows = sqlx::query(
        "SELECT id, user_id, conference_id, status, intend_to_submit, registered_at \
         FROM registrations WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| registration_from_row(row).map(|r| (r.conference_id, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::conferences::insert_conference;
    use crate::db::users::{insert_user, NewUser};
    use chrono::NaiveDate;
    use confman_common::db::{init_memory_database, ConferenceDraft, ConferenceMode, Role};

    async fn fixture(pool: &SqlitePool) -> (Uuid, Uuid) {
        let user = insert_user(
            pool,
            &NewUser {
                username: "alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: "x".to_string(),
                phone: "+1555".to_string(),
                role: Role::Attendee,
                verified: true,
            },
        )
        .await
        .unwrap();

        let draft: ConferenceDraft = serde_json::from_value(serde_json::json!({
            "title": "Data Days",
            "startDate": "2026-03-01",
            "endDate": "2026-03-02",
            "mode": "Online"
        }))
        .unwrap();
        assert_eq!(draft.mode, ConferenceMode::Online);
        assert_eq!(draft.start_date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let conf = insert_conference(pool, &draft, user.id).await.unwrap();
        (user.id, conf.id)
    }

    #[tokio::test]
    async fn test_register_once() {
        let pool = init_memory_database().await.unwrap();
        let (user_id, conference_id) = fixture(&pool).await;

        let reg = insert_registration(&pool, user_id, conference_id, true).await.unwrap();
        assert_eq!(reg.status, RegistrationStatus::Confirmed);
        assert!(reg.intend_to_submit);

        let again = insert_registration(&pool, user_id, conference_id, false).await;
        assert!(matches!(again, Err(Error::Conflict { field }) if field == "registration"));
    }

    #[tokio::test]
    async fn test_list_and_map() {
        let pool = init_memory_database().await.unwrap();
        let (user_id, conference_id) = fixture(&pool).await;
        insert_registration(&pool, user_id, conference_id, false).await.unwrap();

        let summaries = list_for_user(&pool, user_id).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].conference_title, "Data Days");

        let by_conf = registrations_by_conference(&pool, user_id).await.unwrap();
        assert!(by_conf.contains_key(&conference_id));
    }
}
