//! confman-server library - conference management REST API
//!
//! Route groups, each behind its role gate:
//! - public: health, account registration, verification, login
//! - `/participant`: any authenticated user
//! - `/reviewer`: Reviewer, Chair, Admin
//! - `/chair`: Chair, Admin
//! - `/admin`: Admin

use axum::Router;
use confman_common::auth::{load_token_secret, PasswordHasher, TokenAuthority};
use confman_common::config::AppConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod db;
pub mod error;
pub mod notifier;
pub mod pagination;
pub mod policy;
pub mod validation;
pub mod verification;

use notifier::{LogNotifier, Notifier, WebhookNotifier};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub tokens: Arc<TokenAuthority>,
    pub hasher: Arc<PasswordHasher>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build state from resolved configuration
    ///
    /// Uses the configured token secret, or the one persisted in the
    /// database (generated on first start).
    pub async fn from_config(db: SqlitePool, config: AppConfig) -> confman_common::Result<Self> {
        config.validate()?;
        let secret = match &config.auth.token_secret {
            Some(secret) => secret.clone(),
            None => {
                info!("No token secret configured; using database-managed secret");
                load_token_secret(&db).await?
            }
        };
        let tokens = TokenAuthority::new(
            secret.as_bytes(),
            chrono::Duration::hours(config.auth.token_ttl_hours),
        );

        let hasher = PasswordHasher::new(config.auth.argon2_memory_kib, config.auth.argon2_iterations)?;

        let notifier: Arc<dyn Notifier> = match &config.verification.notifier_url {
            Some(url) => {
                info!(url = %url, "Email codes will be posted to notifier");
                Arc::new(WebhookNotifier::new(url.as_str()).map_err(|e| {
                    confman_common::Error::Config(format!("Notifier setup failed: {}", e))
                })?)
            }
            None => Arc::new(LogNotifier),
        };

        Ok(Self {
            db,
            tokens: Arc::new(tokens),
            hasher: Arc::new(hasher),
            notifier,
            config: Arc::new(config),
        })
    }

    /// Replace the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware::from_fn_with_state;

    let participant = api::participant::participant_routes()
        .route_layer(from_fn_with_state(state.clone(), api::auth::require_authenticated));

    let reviewer = api::reviewer::reviewer_routes()
        .route_layer(from_fn_with_state(state.clone(), api::auth::require_reviewer));

    let chair = api::chair::chair_routes()
        .route_layer(from_fn_with_state(state.clone(), api::auth::require_chair));

    let admin = api::admin::admin_routes()
        .route_layer(from_fn_with_state(state.clone(), api::auth::require_admin));

    // Public routes (no authentication)
    let public = Router::new()
        .merge(api::health::health_routes())
        .merge(api::user::user_routes());

    Router::new()
        .merge(public)
        .merge(participant)
        .merge(reviewer)
        .merge(chair)
        .merge(admin)
        .fallback(api::not_found)
        .layer(axum::middleware::map_response(api::json_method_not_allowed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
