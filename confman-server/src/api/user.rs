//! Account endpoints: registration, verification, login
//!
//! All public; no token required.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use confman_common::auth::Channel;
use confman_common::db::Role;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{body_id, success, ApiJson};
use crate::db::{settings, users};
use crate::error::{ApiError, ApiResult};
use crate::validation;
use crate::verification;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub user_id: String,
    pub email_code: Option<String>,
    pub phone_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub user_id: String,
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

/// Hash on the blocking pool; Argon2 is CPU-bound
pub(crate) async fn hash_password(state: &AppState, password: &str) -> ApiResult<String> {
    let hasher = state.hasher.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn check_password(state: &AppState, password: &str, stored_hash: &str) -> ApiResult<bool> {
    let hasher = state.hasher.clone();
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// POST /user/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if !settings::registration_open(&state.db).await? {
        return Err(ApiError::Forbidden("Registration is currently closed".to_string()));
    }

    let username = req.username.trim();
    let email = req.email.trim();
    let phone = req.phone.trim();
    validation::username(username)?;
    validation::email(email)?;
    validation::password(&req.password)?;
    validation::phone(phone)?;

    let password_hash = hash_password(&state, &req.password).await?;
    let user = users::insert_user(
        &state.db,
        &users::NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            phone: phone.to_string(),
            role: Role::Attendee,
            verified: false,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "Account registered");

    let issued = verification::issue_codes(&state, &user).await?;

    let body = success(json!({
        "message": "Registered. Verify your email and phone to log in.",
        "userId": user.id,
        "requiresVerification": true,
        "emailDelivered": issued.email_delivered.unwrap_or(false),
        "phoneCode": issued.phone_code,
    }));
    Ok((StatusCode::CREATED, body))
}

/// POST /user/verify
pub async fn verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = body_id(&req.user_id, "userId")?;
    let user = verification::verify_codes(
        &state,
        user_id,
        req.email_code.as_deref(),
        req.phone_code.as_deref(),
    )
    .await?;

    let message = if user.is_fully_verified() {
        "Account verified. You can now log in."
    } else {
        "Code accepted. The other channel still needs verifying."
    };

    Ok(success(json!({
        "message": message,
        "isEmailVerified": user.is_email_verified,
        "isPhoneVerified": user.is_phone_verified,
    })))
}

/// POST /user/resend-code
pub async fn resend_code(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResendRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = body_id(&req.user_id, "userId")?;
    let user = users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

    let issued = verification::resend_code(&state, &user, req.channel).await?;

    let mut body = json!({
        "message": format!("New {} code issued", req.channel),
        "channel": req.channel,
    });
    if let Some(delivered) = issued.email_delivered {
        body["emailDelivered"] = Value::Bool(delivered);
    }
    if let Some(code) = issued.phone_code {
        body["phoneCode"] = Value::String(code);
    }
    Ok(success(body))
}

/// POST /user/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let invalid = || ApiError::Unauthenticated("Invalid credentials".to_string());

    let user = users::find_by_login(&state.db, req.login.trim())
        .await?
        .ok_or_else(invalid)?;

    if !check_password(&state, &req.password, &user.password_hash).await? {
        return Err(invalid());
    }

    if !user.may_log_in() {
        return Err(ApiError::VerificationRequired {
            user_id: user.id,
            is_email_verified: user.is_email_verified,
            is_phone_verified: user.is_phone_verified,
        });
    }

    let token = state.tokens.issue(user.id, user.role)?;
    info!(user_id = %user.id, role = %user.role, "Login");

    Ok(success(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

/// Build account routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/verify", post(verify))
        .route("/user/resend-code", post(resend_code))
        .route("/user/login", post(login))
}
