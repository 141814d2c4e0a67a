//! Review assignment database operations

use confman_common::db::{Review, ReviewStatus, Score};
use confman_common::{time, uuid_utils, Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// An assignment with the paper details a reviewer needs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedReview {
    #[serde(flatten)]
    pub review: Review,
    pub submission_title: String,
    pub submission_abstract: String,
    pub file_url: String,
    pub conference_title: String,
}

/// A review as shown to the conference's chair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithReviewer {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_username: String,
}

const REVIEW_COLUMNS: &str = "r.id, r.submission_id, r.reviewer_id, r.conference_id, r.score, \
    r.feedback, r.status, r.assigned_at, r.completed_at";

fn review_from_row(row: &SqliteRow) -> Result<Review> {
    let id: String = row.get("id");
    let submission_id: String = row.get("submission_id");
    let reviewer_id: String = row.get("reviewer_id");
    let conference_id: String = row.get("conference_id");
    let status: String = row.get("status");
    let assigned_at: String = row.get("assigned_at");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(Review {
        id: uuid_utils::parse_stored(&id)?,
        submission_id: uuid_utils::parse_stored(&submission_id)?,
        reviewer_id: uuid_utils::parse_stored(&reviewer_id)?,
        conference_id: uuid_utils::parse_stored(&conference_id)?,
        score: row.get("score"),
        feedback: row.get("feedback"),
        status: status.parse()?,
        assigned_at: time::parse_timestamp(&assigned_at)?,
        completed_at: completed_at.as_deref().map(time::parse_timestamp).transpose()?,
    })
}

/// Create a pending assignment
///
/// A repeat assignment of the same reviewer to the same submission surfaces
/// as `Error::Conflict { field: "assignment" }`.
///
/// With a `cap`, the row is only written while the submission has fewer than
/// `cap` reviews; the count and the insert are one statement. Returns `None`
/// when the cap is already reached.
pub async fn insert_review(
    pool: &SqlitePool,
    submission_id: Uuid,
    reviewer_id: Uuid,
    conference_id: Uuid,
    cap: Option<i64>,
) -> Result<Option<Review>> {
    let id = uuid_utils::generate();

    let result = sqlx::query(
        r#"
        INSERT INTO reviews (id, submission_id, reviewer_id, conference_id, status, assigned_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6
        WHERE ?7 IS NULL
           OR (SELECT COUNT(*) FROM reviews WHERE submission_id = ?2) < ?7
        "#,
    )
    .bind(id.to_string())
    .bind(submission_id.to_string())
    .bind(reviewer_id.to_string())
    .bind(conference_id.to_string())
    .bind(ReviewStatus::INITIAL.as_str())
    .bind(time::to_storage(time::now()))
    .bind(cap)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_review(pool, id)
        .await?
        .map(Some)
        .ok_or_else(|| Error::Internal(format!("Review {} vanished after insert", id)))
}

/// Load review by id
pub async fn get_review(pool: &SqlitePool, id: Uuid) -> Result<Option<Review>> {
    let row = sqlx::query(&format!("SELECT {} FROM reviews r WHERE r.id = ?", REVIEW_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(review_from_row).transpose()
}

/// Number of reviewers assigned to a submission
pub async fn count_for_submission(pool: &SqlitePool, submission_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE submission_id = ?")
        .bind(submission_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// A reviewer's assignments, pending first then newest
pub async fn list_for_reviewer(pool: &SqlitePool, reviewer_id: Uuid) -> Result<Vec<AssignedReview>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {},
               s.title AS submission_title,
               s.abstract AS submission_abstract,
               s.file_url AS file_url,
               c.title AS conference_title
        FROM reviews r
        JOIN submissions s ON s.id = r.submission_id
        JOIN conferences c ON c.id = r.conference_id
        WHERE r.reviewer_id = ?
        ORDER BY r.status = 'Completed', r.assigned_at DESC
        "#,
        REVIEW_COLUMNS
    ))
    .bind(reviewer_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(AssignedReview {
                review: review_from_row(row)?,
                submission_title: row.get("submission_title"),
                submission_abstract: row.get("submission_abstract"),
                file_url: row.get("file_url"),
                conference_title: row.get("conference_title"),
            })
        })
        .collect()
}

/// All reviews of one submission
pub async fn list_for_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> Result<Vec<ReviewWithReviewer>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}, u.username AS reviewer_username
        FROM reviews r
        JOIN users u ON u.id = r.reviewer_id
        WHERE r.submission_id = ?
        ORDER BY r.assigned_at
        "#,
        REVIEW_COLUMNS
    ))
    .bind(submission_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ReviewWithReviewer {
                review: review_from_row(row)?,
                reviewer_username: row.get("reviewer_username"),
            })
        })
        .collect()
}

/// Record score and feedback, moving Pending → Completed
///
/// Conditional on the row still being Pending; returns `false` when it was
/// already completed.
pub async fn complete_review(
    pool: &SqlitePool,
    id: Uuid,
    score: Score,
    feedback: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE reviews SET score = ?, feedback = ?, status = ?, completed_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(score.value())
    .bind(feedback.trim())
    .bind(ReviewStatus::Completed.as_str())
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .bind(ReviewStatus::Pending.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
