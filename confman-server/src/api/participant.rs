//! Participant endpoints (any authenticated user)

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use confman_common::db::{Conference, Registration};
use confman_common::time;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use super::{body_id, success, ApiJson};
use crate::db::{conferences, registrations, submissions, users};
use crate::error::{ApiError, ApiResult};
use crate::policy::Identity;
use crate::validation;
use crate::AppState;

/// A conference annotated with the caller's registration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceListing {
    #[serde(flatten)]
    pub conference: Conference,
    pub is_registered: bool,
    pub registration: Option<Registration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForConference {
    pub conference_id: String,
    #[serde(default)]
    pub intend_to_submit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaper {
    pub conference_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub affiliation: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

async fn load_conference(state: &AppState, raw_id: &str) -> ApiResult<Conference> {
    let id = body_id(raw_id, "conferenceId")?;
    conferences::get_conference(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference".to_string()))
}

/// GET /participant/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let user = users::get_user(&state.db, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
    let registrations = registrations::list_for_user(&state.db, identity.user_id).await?;
    let submissions = submissions::list_for_author(&state.db, identity.user_id).await?;

    Ok(success(json!({
        "user": user,
        "registrations": registrations,
        "submissions": submissions,
    })))
}

/// GET /participant/conferences
pub async fn list_conferences(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let all = conferences::list_conferences(&state.db).await?;
    let mut mine = registrations::registrations_by_conference(&state.db, identity.user_id).await?;

    let listings: Vec<ConferenceListing> = all
        .into_iter()
        .map(|conference| {
            let registration = mine.remove(&conference.id);
            ConferenceListing {
                is_registered: registration.is_some(),
                registration,
                conference,
            }
        })
        .collect();

    Ok(success(json!({ "conferences": listings })))
}

/// POST /participant/register
pub async fn register_for_conference(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<RegisterForConference>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let conference = load_conference(&state, &req.conference_id).await?;
    if !conference.details.status.is_open() {
        return Err(ApiError::validation(
            "conferenceId",
            format!(
                "conference is {} and no longer takes registrations",
                conference.details.status.as_str()
            ),
        ));
    }

    // Uniqueness is the schema's job; a repeat surfaces as a conflict
    let registration = registrations::insert_registration(
        &state.db,
        identity.user_id,
        conference.id,
        req.intend_to_submit,
    )
    .await?;

    info!(
        user_id = %identity.user_id,
        conference_id = %conference.id,
        intend_to_submit = req.intend_to_submit,
        "Registered for conference"
    );

    Ok((
        StatusCode::CREATED,
        success(json!({
            "message": "Registered for conference",
            "registration": registration,
        })),
    ))
}

/// POST /participant/submit
///
/// The first submission promotes an Attendee to Author in the same
/// transaction as the insert.
pub async fn submit_paper(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<SubmitPaper>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validation::non_blank("title", &req.title)?;
    validation::non_blank("abstract", &req.abstract_text)?;
    validation::non_blank("fileUrl", &req.file_url)?;

    let conference = load_conference(&state, &req.conference_id).await?;
    if !conference.details.status.is_open() {
        return Err(ApiError::validation(
            "conferenceId",
            format!(
                "conference is {} and no longer takes submissions",
                conference.details.status.as_str()
            ),
        ));
    }
    if !conference.accepts_submissions_on(time::today()) {
        return Err(ApiError::validation("conferenceId", "submission deadline has passed"));
    }

    let mut tx = state.db.begin().await?;
    let submission = submissions::insert_submission(
        &mut tx,
        &submissions::NewSubmission {
            title: req.title,
            abstract_text: req.abstract_text,
            file_url: req.file_url,
            author_id: identity.user_id,
            conference_id: conference.id,
        },
    )
    .await?;
    let promoted = users::promote_to_author(&mut tx, identity.user_id).await?;
    tx.commit().await?;

    info!(
        user_id = %identity.user_id,
        conference_id = %conference.id,
        submission_id = %submission.id,
        promoted,
        "Paper submitted"
    );

    Ok((
        StatusCode::CREATED,
        success(json!({
            "message": "Paper submitted",
            "submission": submission,
            "promotedToAuthor": promoted,
        })),
    ))
}

/// GET /participant/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let user = users::get_user(&state.db, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
    Ok(success(json!({ "user": user })))
}

/// PUT /participant/profile
///
/// Replaces the profile fields. A new phone number has to be verified again
/// before the next login.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let phone = req.phone.as_deref().map(str::trim);
    if let Some(phone) = phone {
        validation::phone(phone)?;
    }

    let profile = confman_common::db::Profile {
        affiliation: req.affiliation.filter(|s| !s.trim().is_empty()),
        bio: req.bio.filter(|s| !s.trim().is_empty()),
        social_links: req.social_links,
    };
    users::update_profile(&state.db, identity.user_id, phone, &profile).await?;

    let user = users::get_user(&state.db, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
    Ok(success(json!({
        "message": "Profile updated",
        "user": user,
    })))
}

/// Build participant routes
pub fn participant_routes() -> Router<AppState> {
    Router::new()
        .route("/participant/dashboard", get(dashboard))
        .route("/participant/conferences", get(list_conferences))
        .route("/participant/register", post(register_for_conference))
        .route("/participant/submit", post(submit_paper))
        .route("/participant/profile", get(get_profile).put(update_profile))
}
