//! Chair endpoints (Chair, Admin)
//!
//! Every conference-scoped action passes the ownership gate in
//! [`crate::policy`]: holding the Chair role is not enough to touch another
//! chair's conference.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use confman_common::db::{Conference, ConferenceDraft, Role, Submission, SubmissionStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{body_id, path_id, success, ApiJson};
use crate::db::conferences::{self, ConferenceStats};
use crate::db::{reviews, settings, submissions, users};
use crate::error::{ApiError, ApiResult};
use crate::policy::{authorize, Action, Identity, Resource};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairConference {
    #[serde(flatten)]
    pub conference: Conference,
    pub stats: ConferenceStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub submission_id: String,
    pub reviewer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub(crate) async fn load_conference(state: &AppState, raw_id: &str) -> ApiResult<Conference> {
    let id = path_id(raw_id, "Conference")?;
    conferences::get_conference(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference".to_string()))
}

/// A submission together with the conference that scopes it
pub(crate) async fn load_submission(
    state: &AppState,
    id: Uuid,
) -> ApiResult<(Submission, Conference)> {
    let submission = submissions::get_submission(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission".to_string()))?;
    let conference = conferences::get_conference(&state.db, submission.conference_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference".to_string()))?;
    Ok((submission, conference))
}

fn conference_scope(conference: &Conference) -> Resource {
    Resource::Conference {
        owner: conference.created_by,
    }
}

/// Authorize and apply a submission status change
///
/// The requested transition must be in the submission table; the write is
/// conditional on the status read here, so a concurrent decision wins or
/// loses as a whole.
pub(crate) async fn change_submission_status(
    state: &AppState,
    identity: &Identity,
    action: Action,
    raw_id: &str,
    requested: &str,
) -> ApiResult<Submission> {
    let (submission, conference) = load_submission(state, path_id(raw_id, "Submission")?).await?;
    authorize(identity, action, conference_scope(&conference))?;

    let next: SubmissionStatus = requested.trim().parse()?;
    let next = submission.status.transition_to(next)?;

    if !submissions::update_status(&state.db, submission.id, submission.status, next).await? {
        return Err(ApiError::validation(
            "status",
            "submission status changed concurrently; reload and retry",
        ));
    }

    info!(
        submission_id = %submission.id,
        conference_id = %conference.id,
        user_id = %identity.user_id,
        from = %submission.status,
        to = %next,
        "Submission status changed"
    );

    submissions::get_submission(&state.db, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission".to_string()))
}

/// GET /chair/conferences
pub async fn list_own_conferences(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let owned = conferences::list_by_owner(&state.db, identity.user_id).await?;

    let mut listing = Vec::with_capacity(owned.len());
    for conference in owned {
        let stats = conferences::conference_stats(&state.db, conference.id).await?;
        listing.push(ChairConference { conference, stats });
    }

    Ok(success(json!({ "conferences": listing })))
}

/// POST /chair/conferences
pub async fn create_conference(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(draft): ApiJson<ConferenceDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    draft.validate()?;
    let conference = conferences::insert_conference(&state.db, &draft, identity.user_id).await?;

    info!(conference_id = %conference.id, user_id = %identity.user_id, "Conference created");
    Ok((
        StatusCode::CREATED,
        success(json!({ "conference": conference })),
    ))
}

/// PUT /chair/conferences/:id
pub async fn update_conference(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<ConferenceDraft>,
) -> ApiResult<Json<Value>> {
    let conference = load_conference(&state, &id).await?;
    authorize(&identity, Action::UpdateConference, conference_scope(&conference))?;
    draft.validate()?;

    let updated = conferences::update_conference(&state.db, conference.id, &draft)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference".to_string()))?;

    info!(conference_id = %conference.id, user_id = %identity.user_id, "Conference updated");
    Ok(success(json!({ "conference": updated })))
}

/// DELETE /chair/conferences/:id
///
/// Registrations, submissions and reviews of the conference go with it.
pub async fn delete_conference(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let conference = load_conference(&state, &id).await?;
    authorize(&identity, Action::DeleteConference, conference_scope(&conference))?;

    if !conferences::delete_conference(&state.db, conference.id).await? {
        return Err(ApiError::NotFound("Conference".to_string()));
    }

    info!(conference_id = %conference.id, user_id = %identity.user_id, "Conference deleted");
    Ok(success(json!({ "message": "Conference deleted" })))
}

/// GET /chair/reviewers
pub async fn list_reviewers(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reviewers = users::list_by_role(&state.db, Role::Reviewer).await?;
    Ok(success(json!({ "reviewers": reviewers })))
}

/// POST /chair/assign
pub async fn assign_reviewer(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let submission_id = body_id(&req.submission_id, "submissionId")?;
    let reviewer_id = body_id(&req.reviewer_id, "reviewerId")?;
    let (submission, conference) = load_submission(&state, submission_id).await?;
    authorize(&identity, Action::AssignReviewer, conference_scope(&conference))?;

    if submission.status.is_terminal() {
        return Err(ApiError::validation(
            "submissionId",
            format!("submission is already {}", submission.status),
        ));
    }

    let reviewer = users::get_user(&state.db, reviewer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reviewer".to_string()))?;
    if reviewer.role != Role::Reviewer {
        return Err(ApiError::validation(
            "reviewerId",
            format!("{} does not hold the Reviewer role", reviewer.username),
        ));
    }
    if reviewer.id == submission.author_id {
        return Err(ApiError::validation(
            "reviewerId",
            "authors may not review their own submission",
        ));
    }

    // A repeat pair is rejected by the schema; the cap is enforced by the insert
    let cap = settings::max_reviewers_per_submission(&state.db).await?;
    let review = reviews::insert_review(&state.db, submission.id, reviewer.id, conference.id, cap)
        .await?
        .ok_or_else(|| {
            ApiError::validation(
                "submissionId",
                format!(
                    "submission already has the maximum of {} reviewers",
                    cap.unwrap_or_default()
                ),
            )
        })?;

    info!(
        review_id = %review.id,
        submission_id = %submission.id,
        reviewer_id = %reviewer.id,
        user_id = %identity.user_id,
        "Reviewer assigned"
    );

    Ok((
        StatusCode::CREATED,
        success(json!({
            "message": "Reviewer assigned",
            "review": review,
        })),
    ))
}

/// GET /chair/conferences/:id/submissions
pub async fn conference_submissions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let conference = load_conference(&state, &id).await?;
    authorize(&identity, Action::ViewConferenceSubmissions, conference_scope(&conference))?;

    let submissions = submissions::list_for_conference(&state.db, conference.id).await?;
    Ok(success(json!({
        "conference": conference,
        "submissions": submissions,
    })))
}

/// PATCH /chair/submissions/:id/status
pub async fn decide_submission(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let submission =
        change_submission_status(&state, &identity, Action::DecideSubmission, &id, &req.status)
            .await?;
    Ok(success(json!({ "submission": submission })))
}

/// GET /chair/submissions/:id/reviews
pub async fn submission_reviews(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let (submission, conference) = load_submission(&state, path_id(&id, "Submission")?).await?;
    authorize(&identity, Action::ViewSubmissionReviews, conference_scope(&conference))?;

    let reviews = reviews::list_for_submission(&state.db, submission.id).await?;
    Ok(success(json!({
        "submission": submission,
        "reviews": reviews,
    })))
}

/// Build chair routes
pub fn chair_routes() -> Router<AppState> {
    Router::new()
        .route("/chair/conferences", get(list_own_conferences).post(create_conference))
        .route("/chair/conferences/:id", put(update_conference).delete(delete_conference))
        .route("/chair/conferences/:id/submissions", get(conference_submissions))
        .route("/chair/reviewers", get(list_reviewers))
        .route("/chair/assign", post(assign_reviewer))
        .route("/chair/submissions/:id/status", patch(decide_submission))
        .route("/chair/submissions/:id/reviews", get(submission_reviews))
}
