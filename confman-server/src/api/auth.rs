//! Authentication middleware
//!
//! Resolves the `x-auth-token` header to the live user record and applies a
//! route group's role gate. The token's role claim is never trusted: a role
//! change or account deletion takes effect on the next request.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::policy::{Identity, RoleSet};
use crate::AppState;

/// Header carrying the bearer token
pub const TOKEN_HEADER: &str = "x-auth-token";

fn token_from_headers(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(TOKEN_HEADER)
        .ok_or_else(|| ApiError::Unauthenticated("Authentication token required".to_string()))?;
    let token = value
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed authentication token".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated(
            "Authentication token required".to_string(),
        ));
    }
    Ok(token)
}

/// Verify the token and load the identity from the live user record
pub async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> ApiResult<Identity> {
    let token = token_from_headers(headers)?;
    let claims = state.tokens.verify(token)?;
    let user_id = claims.user_id()?;

    let user = users::get_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Account no longer exists".to_string()))?;

    if claims.role != user.role {
        debug!(user_id = %user.id, claimed = %claims.role, live = %user.role, "Token role is stale");
    }

    Ok(Identity {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}

async fn gate(state: AppState, roles: RoleSet, mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = resolve_identity(&state, request.headers()).await?;

    if !roles.allows(identity.role) {
        warn!(
            user_id = %identity.user_id,
            role = %identity.role,
            group = roles.name(),
            path = %request.uri().path(),
            "Role gate denied"
        );
        return Err(ApiError::Forbidden(format!(
            "{} role may not access {} routes",
            identity.role,
            roles.name()
        )));
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_authenticated(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    gate(state, RoleSet::AUTHENTICATED, request, next).await
}

pub async fn require_reviewer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    gate(state, RoleSet::REVIEWER, request, next).await
}

pub async fn require_chair(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    gate(state, RoleSet::CHAIR, request, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    gate(state, RoleSet::ADMIN, request, next).await
}
