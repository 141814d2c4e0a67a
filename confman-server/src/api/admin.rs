//! Admin endpoints (Admin only)
//!
//! Conference create/update/delete share their handlers with the chair
//! routes; the ownership gate lets Admins act on any conference.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use confman_common::db::Role;
use confman_common::error::REFERENCE_FIELD;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::chair::{self, change_submission_status, load_conference};
use super::user::hash_password;
use super::{path_id, success, ApiJson, ApiQuery};
use crate::db::{conferences, settings, users};
use crate::error::{ApiError, ApiResult};
use crate::pagination::PageQuery;
use crate::policy::{Action, Identity};
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    pub role: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingRequest {
    pub key: String,
    pub value: Value,
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> ApiResult<Json<Value>> {
    let role: Option<Role> = query.role.as_deref().map(str::parse::<Role>).transpose()?;

    let total = users::count_users(&state.db, role).await?;
    let page = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve(total);
    let listed = users::list_users(&state.db, role, page.page_size, page.offset).await?;

    Ok(success(json!({
        "users": listed,
        "pagination": page,
    })))
}

/// POST /admin/users
///
/// Admin-created accounts start with both channels verified.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let username = req.username.trim();
    let email = req.email.trim();
    let phone = req.phone.trim();
    validation::username(username)?;
    validation::email(email)?;
    validation::password(&req.password)?;
    validation::phone(phone)?;
    let role = match req.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::Attendee,
    };

    let password_hash = hash_password(&state, &req.password).await?;
    let user = users::insert_user(
        &state.db,
        &users::NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            phone: phone.to_string(),
            role,
            verified: true,
        },
    )
    .await?;

    info!(user_id = %user.id, role = %user.role, admin_id = %identity.user_id, "User created by admin");
    Ok((StatusCode::CREATED, success(json!({ "user": user }))))
}

/// PATCH /admin/users/:id/role
pub async fn change_role(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = path_id(&id, "User")?;
    let role: Role = req.role.trim().parse()?;

    if !users::set_role(&state.db, user_id, role).await? {
        return Err(ApiError::NotFound("User".to_string()));
    }
    info!(user_id = %user_id, role = %role, admin_id = %identity.user_id, "Role changed");

    let user = users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
    Ok(success(json!({ "user": user })))
}

/// DELETE /admin/users/:id
///
/// The user's registrations, submissions and reviews are removed with them.
/// Refused while they still own conferences.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = path_id(&id, "User")?;
    if user_id == identity.user_id {
        return Err(ApiError::validation("id", "admins cannot delete their own account"));
    }

    let owned = users::count_owned_conferences(&state.db, user_id).await?;
    if owned > 0 {
        warn!(user_id = %user_id, owned, "Refusing to delete conference owner");
        return Err(ApiError::validation(
            "conferences",
            format!("user still owns {} conference(s); delete or reassign them first", owned),
        ));
    }

    // A conference created since the check above is caught by the schema
    let deleted = match users::delete_user(&state.db, user_id).await {
        Err(confman_common::Error::Validation { field, .. }) if field == REFERENCE_FIELD => {
            return Err(ApiError::validation(
                "conferences",
                "user still owns conferences; delete or reassign them first",
            ));
        }
        other => other?,
    };
    if !deleted {
        return Err(ApiError::NotFound("User".to_string()));
    }

    info!(user_id = %user_id, admin_id = %identity.user_id, "User deleted");
    Ok(success(json!({ "message": "User deleted" })))
}

/// GET /admin/conferences
pub async fn list_conferences(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let all = conferences::list_conferences(&state.db).await?;
    Ok(success(json!({ "conferences": all })))
}

/// GET /admin/conferences/:id
pub async fn get_conference(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let conference = load_conference(&state, &id).await?;
    let stats = conferences::conference_stats(&state.db, conference.id).await?;
    Ok(success(json!({
        "conference": conference,
        "stats": stats,
    })))
}

/// PATCH /admin/submissions/:id/status
///
/// Any conference, but only along the submission transition table.
pub async fn force_submission_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<chair::StatusRequest>,
) -> ApiResult<Json<Value>> {
    let submission = change_submission_status(
        &state,
        &identity,
        Action::ForceSubmissionStatus,
        &id,
        &req.status,
    )
    .await?;
    Ok(success(json!({ "submission": submission })))
}

/// GET /admin/settings
pub async fn list_settings(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let entries = settings::list_settings(&state.db).await?;
    Ok(success(json!({ "settings": entries })))
}

/// PUT /admin/settings
///
/// Accepts the value as a JSON string, boolean or number.
pub async fn update_setting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<SettingRequest>,
) -> ApiResult<Json<Value>> {
    let raw = match &req.value {
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => req.value.to_string(),
        _ => {
            return Err(ApiError::validation(
                "value",
                "value must be a string, boolean or number",
            ))
        }
    };

    let entry = settings::update_setting(&state.db, req.key.trim(), &raw).await?;
    info!(key = %entry.key, value = %entry.value, admin_id = %identity.user_id, "Setting updated");
    Ok(success(json!({ "setting": entry })))
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/role", patch(change_role))
        .route(
            "/admin/conferences",
            get(list_conferences).post(chair::create_conference),
        )
        .route(
            "/admin/conferences/:id",
            get(get_conference)
                .put(chair::update_conference)
                .delete(chair::delete_conference),
        )
        .route("/admin/submissions/:id/status", patch(force_submission_status))
        .route("/admin/settings", get(list_settings).put(update_setting))
}
