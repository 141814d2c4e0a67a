//! HTTP API handlers for confman-server

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{header, request::Parts, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub mod admin;
pub mod auth;
pub mod chair;
pub mod health;
pub mod participant;
pub mod reviewer;
pub mod user;

/// JSON body extractor whose rejection uses the common error shape
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation {
                field: None,
                message: rejection.body_text(),
            }),
        }
    }
}

/// Query string extractor whose rejection uses the common error shape
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::Validation {
                field: None,
                message: rejection.body_text(),
            }),
        }
    }
}

/// Router fallback: no route matches the path
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {}", uri.path()))
}

/// Give the router's bare 405 responses the JSON error body
pub async fn json_method_not_allowed(response: Response) -> Response {
    let bare = response.status() == StatusCode::METHOD_NOT_ALLOWED
        && !response.headers().contains_key(header::CONTENT_TYPE);
    if !bare {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replaced = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        replaced.headers_mut().insert(header::ALLOW, allow);
    }
    replaced
}

/// Parse an id path segment; a malformed id cannot name a record
pub(crate) fn path_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Ok(confman_common::uuid_utils::parse_id(raw, what)?)
}

/// Parse an id carried in a body field; malformed is a 400 naming the field
pub(crate) fn body_id(raw: &str, field: &str) -> ApiResult<Uuid> {
    Ok(confman_common::uuid_utils::parse_field_id(raw, field)?)
}

/// `{"success": true, ...fields}`
pub(crate) fn success(fields: Value) -> Json<Value> {
    let mut body = json!({ "success": true });
    if let (Value::Object(target), Value::Object(extra)) = (&mut body, fields) {
        target.extend(extra);
    }
    Json(body)
}
