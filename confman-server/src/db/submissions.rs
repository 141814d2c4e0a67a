//! Submission database operations

use confman_common::db::{Submission, SubmissionStatus};
use confman_common::{time, uuid_utils, Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Fields for a new submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub title: String,
    pub abstract_text: String,
    pub file_url: String,
    pub author_id: Uuid,
    pub conference_id: Uuid,
}

/// Submission as shown to its conference's chair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOverview {
    #[serde(flatten)]
    pub submission: Submission,
    pub author_username: String,
    pub author_email: String,
    pub reviews_assigned: i64,
    pub reviews_completed: i64,
    /// Mean of completed review scores
    pub average_score: Option<f64>,
}

/// Submission as shown to its author
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    pub conference_title: String,
}

const SUBMISSION_COLUMNS: &str =
    "s.id, s.title, s.abstract, s.author_id, s.conference_id, s.file_url, s.status, \
     s.submitted_at, s.decided_at";

fn submission_from_row(row: &SqliteRow) -> Result<Submission> {
    let id: String = row.get("id");
    let author_id: String = row.get("author_id");
    let conference_id: String = row.get("conference_id");
    let status: String = row.get("status");
    let submitted_at: String = row.get("submitted_at");
    let decided_at: Option<String> = row.get("decided_at");

    Ok(Submission {
        id: uuid_utils::parse_stored(&id)?,
        title: row.get("title"),
        abstract_text: row.get("abstract"),
        author_id: uuid_utils::parse_stored(&author_id)?,
        conference_id: uuid_utils::parse_stored(&conference_id)?,
        file_url: row.get("file_url"),
        status: status.parse()?,
        submitted_at: time::parse_timestamp(&submitted_at)?,
        decided_at: decided_at.as_deref().map(time::parse_timestamp).transpose()?,
    })
}

/// Insert a submission on the caller's connection
///
/// Takes a connection rather than the pool so the author promotion can
/// commit in the same transaction.
pub async fn insert_submission(
    conn: &mut SqliteConnection,
    new: &NewSubmission,
) -> Result<Submission> {
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO submissions (
            id, title, abstract, author_id, conference_id, file_url, status, submitted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.title.trim())
    .bind(new.abstract_text.trim())
    .bind(new.author_id.to_string())
    .bind(new.conference_id.to_string())
    .bind(new.file_url.trim())
    .bind(SubmissionStatus::INITIAL.as_str())
    .bind(time::to_storage(time::now()))
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query(&format!(
        "SELECT {} FROM submissions s WHERE s.id = ?",
        SUBMISSION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::Internal(format!("Submission {} vanished after insert", id)))?;

    submission_from_row(&row)
}

/// Load submission by id
pub async fn get_submission(pool: &SqlitePool, id: Uuid) -> Result<Option<Submission>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM submissions s WHERE s.id = ?",
        SUBMISSION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// An author's submissions, newest first
pub async fn list_for_author(pool: &SqlitePool, author_id: Uuid) -> Result<Vec<AuthoredSubmission>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}, c.title AS conference_title
        FROM submissions s
        JOIN conferences c ON c.id = s.conference_id
        WHERE s.author_id = ?
        ORDER BY s.submitted_at DESC
        "#,
        SUBMISSION_COLUMNS
    ))
    .bind(author_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(AuthoredSubmission {
                submission: submission_from_row(row)?,
                conference_title: row.get("conference_title"),
            })
        })
        .collect()
}

/// A conference's submissions with author and review progress, oldest first
pub async fn list_for_conference(
    pool: &SqlitePool,
    conference_id: Uuid,
) -> Result<Vec<SubmissionOverview>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {},
               u.username AS author_username,
               u.email AS author_email,
               (SELECT COUNT(*) FROM reviews r WHERE r.submission_id = s.id) AS reviews_assigned,
               (SELECT COUNT(*) FROM reviews r
                 WHERE r.submission_id = s.id AND r.status = 'Completed') AS reviews_completed,
               (SELECT AVG(r.score) FROM reviews r
                 WHERE r.submission_id = s.id AND r.status = 'Completed') AS average_score
        FROM submissions s
        JOIN users u ON u.id = s.author_id
        WHERE s.conference_id = ?
        ORDER BY s.submitted_at
        "#,
        SUBMISSION_COLUMNS
    ))
    .bind(conference_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SubmissionOverview {
                submission: submission_from_row(row)?,
                author_username: row.get("author_username"),
                author_email: row.get("author_email"),
                reviews_assigned: row.get("reviews_assigned"),
                reviews_completed: row.get("reviews_completed"),
                average_score: row.get("average_score"),
            })
        })
        .collect()
}

/// Move a submission `from → to`, stamping the decision time
///
/// The write is conditional on the current status, so of two racing
/// decisions only one applies. Returns `false` if the status had already
/// moved on.
pub async fn update_status(
    pool: &SqlitePool,
    id: Uuid,
    from: SubmissionStatus,
    to: SubmissionStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE submissions SET status = ?, decided_at = ? WHERE id = ? AND status = ?",
    )
    .bind(to.as_str())
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .bind(from.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::conferences::insert_conference;
    use crate::db::users::{insert_user, NewUser};
    use confman_common::db::{init_memory_database, ConferenceDraft, Role};

    async fn fixture(pool: &SqlitePool) -> NewSubmission {
        let author = insert_user(
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
            "mode": "Hybrid"
        }))
        .unwrap();
        let conf = insert_conference(pool, &draft, author.id).await.unwrap();

        NewSubmission {
            title: "Lock-free Queues".to_string(),
            abstract_text: "We measure things.".to_string(),
            file_url: "https://files.example/paper.pdf".to_string(),
            author_id: author.id,
            conference_id: conf.id,
        }
    }

    #[tokio::test]
    async fn test_insert_starts_under_review() {
        let pool = init_memory_database().await.unwrap();
        let new = fixture(&pool).await;

        let mut conn = pool.acquire().await.unwrap();
        let sub = insert_submission(&mut conn, &new).await.unwrap();
        drop(conn);

        assert_eq!(sub.status, SubmissionStatus::UnderReview);
        assert!(sub.decided_at.is_none());

        let listed = list_for_conference(&pool, new.conference_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].author_username, "alice");
        assert_eq!(listed[0].reviews_assigned, 0);
        assert!(listed[0].average_score.is_none());

        let mine = list_for_author(&pool, new.author_id).await.unwrap();
        assert_eq!(mine[0].conference_title, "Data Days");
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let pool = init_memory_database().await.unwrap();
        let new = fixture(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let sub = insert_submission(&mut conn, &new).await.unwrap();
        drop(conn);

        assert!(update_status(&pool, sub.id, SubmissionStatus::UnderReview, SubmissionStatus::Accepted)
            .await
            .unwrap());
        // Second decision loses: the row is no longer Under Review
        assert!(!update_status(&pool, sub.id, SubmissionStatus::UnderReview, SubmissionStatus::Rejected)
            .await
            .unwrap());

        let stored = get_submission(&pool, sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Accepted);
        assert!(stored.decided_at.is_some());
    }
}
