//! Conference database operations

use confman_common::db::{Conference, ConferenceDraft, SubmissionStatus};
use confman_common::{time, uuid_utils, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Per-conference workload counters for the chair view
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceStats {
    pub registrations: i64,
    pub submissions: i64,
    pub under_review: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub reviews_assigned: i64,
    pub reviews_completed: i64,
}

const CONFERENCE_COLUMNS: &str = "id, title, description, start_date, end_date, \
    submission_deadline, location, mode, themes, registration_fees, contact, convenors, \
    status, created_by, created_at, updated_at";

fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).map_err(|e| Error::Internal(format!("Corrupt {}: {}", column, e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Serialize failed: {}", e)))
}

fn conference_from_row(row: &SqliteRow) -> Result<Conference> {
    let id: String = row.get("id");
    let start_date: String = row.get("start_date");
    let end_date: String = row.get("end_date");
    let deadline: Option<String> = row.get("submission_deadline");
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    let created_by: String = row.get("created_by");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Conference {
        id: uuid_utils::parse_stored(&id)?,
        details: ConferenceDraft {
            title: row.get("title"),
            description: row.get("description"),
            start_date: time::parse_date(&start_date)?,
            end_date: time::parse_date(&end_date)?,
            submission_deadline: deadline.as_deref().map(time::parse_date).transpose()?,
            location: row.get("location"),
            mode: mode.parse()?,
            themes: json_column(row, "themes")?,
            registration_fees: json_column(row, "registration_fees")?,
            contact: json_column(row, "contact")?,
            convenors: json_column(row, "convenors")?,
            status: status.parse()?,
        },
        created_by: uuid_utils::parse_stored(&created_by)?,
        created_at: time::parse_timestamp(&created_at)?,
        updated_at: time::parse_timestamp(&updated_at)?,
    })
}

/// Insert a validated conference owned by `owner`
pub async fn insert_conference(
    pool: &SqlitePool,
    draft: &ConferenceDraft,
    owner: Uuid,
) -> Result<Conference> {
    let id = uuid_utils::generate();
    let now = time::to_storage(time::now());

    sqlx::query(
        r#"
        INSERT INTO conferences (
            id, title, description, start_date, end_date, submission_deadline,
            location, mode, themes, registration_fees, contact, convenors,
            status, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(draft.title.trim())
    .bind(&draft.description)
    .bind(draft.start_date.to_string())
    .bind(draft.end_date.to_string())
    .bind(draft.submission_deadline.map(|d| d.to_string()))
    .bind(&draft.location)
    .bind(draft.mode.as_str())
    .bind(to_json(&draft.themes)?)
    .bind(to_json(&draft.registration_fees)?)
    .bind(to_json(&draft.contact)?)
    .bind(to_json(&draft.convenors)?)
    .bind(draft.status.as_str())
    .bind(owner.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_conference(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Conference {} vanished after insert", id)))
}

/// Load conference by id
pub async fn get_conference(pool: &SqlitePool, id: Uuid) -> Result<Option<Conference>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM conferences WHERE id = ?",
        CONFERENCE_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(conference_from_row).transpose()
}

/// All conferences, soonest first
pub async fn list_conferences(pool: &SqlitePool) -> Result<Vec<Conference>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conferences ORDER BY start_date, title",
        CONFERENCE_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(conference_from_row).collect()
}

/// Conferences created by `owner`, soonest first
pub async fn list_by_owner(pool: &SqlitePool, owner: Uuid) -> Result<Vec<Conference>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM conferences WHERE created_by = ? ORDER BY start_date, title",
        CONFERENCE_COLUMNS
    ))
    .bind(owner.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(conference_from_row).collect()
}

/// Replace a conference's editable fields; ownership is unchanged
pub async fn update_conference(
    pool: &SqlitePool,
    id: Uuid,
    draft: &ConferenceDraft,
) -> Result<Option<Conference>> {
    let result = sqlx::query(
        r#"
        UPDATE conferences SET
            title = ?, description = ?, start_date = ?, end_date = ?,
            submission_deadline = ?, location = ?, mode = ?, themes = ?,
            registration_fees = ?, contact = ?, convenors = ?, status = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(draft.title.trim())
    .bind(&draft.description)
    .bind(draft.start_date.to_string())
    .bind(draft.end_date.to_string())
    .bind(draft.submission_deadline.map(|d| d.to_string()))
    .bind(&draft.location)
    .bind(draft.mode.as_str())
    .bind(to_json(&draft.themes)?)
    .bind(to_json(&draft.registration_fees)?)
    .bind(to_json(&draft.contact)?)
    .bind(to_json(&draft.convenors)?)
    .bind(draft.status.as_str())
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_conference(pool, id).await
}

/// Delete a conference; registrations, submissions and reviews cascade
pub async fn delete_conference(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM conferences WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Registration, submission and review counters for one conference
pub async fn conference_stats(pool: &SqlitePool, id: Uuid) -> Result<ConferenceStats> {
    let id = id.to_string();

    let registrations = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE conference_id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    let by_status: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM submissions WHERE conference_id = ? GROUP BY status",
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;

    let (reviews_assigned, reviews_completed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'Completed' THEN 1 ELSE 0 END), 0)
        FROM reviews WHERE conference_id = ?
        "#,
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    let mut stats = ConferenceStats {
        registrations,
        reviews_assigned,
        reviews_completed,
        ..ConferenceStats::default()
    };
    for (status, count) in by_status {
        stats.submissions += count;
        match status.parse::<SubmissionStatus>()? {
            SubmissionStatus::UnderReview => stats.under_review = count,
            SubmissionStatus::Accepted => stats.accepted = count,
            SubmissionStatus::Rejected => stats.rejected = count,
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{insert_user, NewUser};
    use chrono::NaiveDate;
    use confman_common::db::{
        init_memory_database, ConferenceMode, ConferenceStatus, ContactInfo, RegistrationFees, Role,
    };

    async fn chair(pool: &SqlitePool) -> Uuid {
        insert_user(
            pool,
            &NewUser {
                username: "chair".to_string(),
                email: "chair@x.com".to_string(),
                password_hash: "x".to_string(),
                phone: "+1555".to_string(),
                role: Role::Chair,
                verified: true,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn draft() -> ConferenceDraft {
        ConferenceDraft {
            title: "  Systems Week ".to_string(),
            description: "Annual".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            submission_deadline: NaiveDate::from_ymd_opt(2025, 12, 1),
            location: "Oslo".to_string(),
            mode: ConferenceMode::InPerson,
            themes: vec!["storage".to_string(), "networks".to_string()],
            registration_fees: RegistrationFees {
                early_bird: 100.0,
                regular: 150.0,
                student: 50.0,
                late: 200.0,
            },
            contact: ContactInfo {
                email: Some("pc@systems.week".to_string()),
                ..ContactInfo::default()
            },
            convenors: vec!["Dr. Ada".to_string()],
            status: ConferenceStatus::Upcoming,
        }
    }

    #[tokio::test]
    async fn test_insert_round_trips_all_fields() {
        let pool = init_memory_database().await.unwrap();
        let owner = chair(&pool).await;

        let conf = insert_conference(&pool, &draft(), owner).await.unwrap();
        let loaded = get_conference(&pool, conf.id).await.unwrap().unwrap();

        assert_eq!(loaded.details.title, "Systems Week");
        assert_eq!(loaded.details.themes, vec!["storage", "networks"]);
        assert_eq!(loaded.details.registration_fees.student, 50.0);
        assert_eq!(loaded.details.submission_deadline, NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(loaded.created_by, owner);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = init_memory_database().await.unwrap();
        let owner = chair(&pool).await;
        let conf = insert_conference(&pool, &draft(), owner).await.unwrap();

        let mut changed = draft();
        changed.status = ConferenceStatus::Ongoing;
        changed.mode = ConferenceMode::Online;
        let updated = update_conference(&pool, conf.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.details.status, ConferenceStatus::Ongoing);
        assert_eq!(updated.details.mode, ConferenceMode::Online);

        assert!(update_conference(&pool, Uuid::new_v4(), &changed).await.unwrap().is_none());

        assert!(delete_conference(&pool, conf.id).await.unwrap());
        assert!(!delete_conference(&pool, conf.id).await.unwrap());
        assert!(list_by_owner(&pool, owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_empty_conference() {
        let pool = init_memory_database().await.unwrap();
        let owner = chair(&pool).await;
        let conf = insert_conference(&pool, &draft(), owner).await.unwrap();

        let stats = conference_stats(&pool, conf.id).await.unwrap();
        assert_eq!(stats.submissions, 0);
        assert_eq!(stats.reviews_completed, 0);
    }
}
