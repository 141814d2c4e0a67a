//! Reviewer endpoints (Reviewer, Chair, Admin)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use confman_common::db::{ReviewStatus, Score};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{path_id, success, ApiJson};
use crate::db::reviews;
use crate::error::{ApiError, ApiResult};
use crate::policy::{authorize, Action, Identity, Resource};
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewSubmission {
    /// Missing score is a validation error, not a deserialization one
    pub score: Option<i64>,
    #[serde(default)]
    pub feedback: String,
}

/// GET /reviewer/assigned
pub async fn assigned_reviews(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let assigned = reviews::list_for_reviewer(&state.db, identity.user_id).await?;
    Ok(success(json!({ "reviews": assigned })))
}

/// POST /reviewer/submit/:reviewId
pub async fn submit_review(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(review_id): Path<String>,
    ApiJson(req): ApiJson<ReviewSubmission>,
) -> ApiResult<Json<Value>> {
    let review_id = path_id(&review_id, "Review")?;
    let review = reviews::get_review(&state.db, review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review".to_string()))?;

    authorize(
        &identity,
        Action::CompleteReview,
        Resource::Review {
            reviewer: review.reviewer_id,
        },
    )?;

    let score = req
        .score
        .ok_or_else(|| ApiError::validation("score", "score is required"))
        .and_then(|s| Score::new(s).map_err(ApiError::from))?;
    validation::non_blank("feedback", &req.feedback)?;

    review.status.transition_to(ReviewStatus::Completed)?;
    if !reviews::complete_review(&state.db, review.id, score, &req.feedback).await? {
        return Err(ApiError::validation("status", "review was already completed"));
    }

    info!(
        review_id = %review.id,
        submission_id = %review.submission_id,
        user_id = %identity.user_id,
        score = score.value(),
        "Review completed"
    );

    let completed = reviews::get_review(&state.db, review.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review".to_string()))?;
    Ok(success(json!({
        "message": "Review submitted",
        "review": completed,
    })))
}

/// Build reviewer routes
pub fn reviewer_routes() -> Router<AppState> {
    Router::new()
        .route("/reviewer/assigned", get(assigned_reviews))
        .route("/reviewer/submit/:review_id", post(submit_review))
}
