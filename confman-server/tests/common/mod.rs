//! Shared helpers for confman-server integration tests
//!
//! Every test gets its own in-memory database with the real schema, a cheap
//! password hasher and a notifier that captures outgoing emails.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use confman_common::config::AppConfig;
use confman_common::db::{init_memory_database, Role};
use confman_server::db::users::{insert_user, NewUser};
use confman_server::notifier::{EmailMessage, Notifier, NotifierError};
use confman_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

pub const PASSWORD: &str = "secret1";

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

impl CapturingNotifier {
    /// Most recent 6-digit code mailed to `to`
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter().rev().find(|m| m.to == to).and_then(|m| {
            m.body
                .split_whitespace()
                .map(|w| w.trim_end_matches('.'))
                .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string)
        })
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Rejects every message
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotifierError> {
        Err(NotifierError::Rejected(502, "relay down".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailbox: Arc<CapturingNotifier>,
}

/// Test helper: app over a fresh in-memory database
pub async fn setup_app() -> TestApp {
    setup_app_with(|config| config).await
}

pub async fn setup_app_with(adjust: impl FnOnce(AppConfig) -> AppConfig) -> TestApp {
    let db = init_memory_database().await.expect("Should init memory database");

    let mut config = AppConfig::default();
    config.auth.token_secret = Some("integration-test-secret".to_string());
    config.auth.argon2_memory_kib = 8;
    config.auth.argon2_iterations = 1;
    let config = adjust(config);

    let mailbox = Arc::new(CapturingNotifier::default());
    let state = AppState::from_config(db, config)
        .await
        .expect("Should build state")
        .with_notifier(mailbox.clone());

    TestApp {
        router: build_router(state.clone()),
        state,
        mailbox,
    }
}

/// Test helper: Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

impl TestApp {
    /// Send one request; returns status and parsed JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("x-auth-token", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(token), Some(body)).await
    }

    /// Register through the API; returns the response body
    pub async fn register(&self, username: &str, email: &str, phone: &str) -> Value {
        let (status, body) = self
            .post(
                "/user/register",
                None,
                json!({
                    "username": username,
                    "email": email,
                    "password": PASSWORD,
                    "phone": phone,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    /// Register and verify both channels; returns the user id
    pub async fn register_verified(&self, username: &str) -> String {
        let email = format!("{}@x.com", username);
        let body = self.register(username, &email, "+1555").await;
        let user_id = body["userId"].as_str().unwrap().to_string();

        let (status, verified) = self
            .post(
                "/user/verify",
                None,
                json!({
                    "userId": user_id,
                    "emailCode": self.mailbox.last_code_for(&email).unwrap(),
                    "phoneCode": body["phoneCode"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", verified);
        user_id
    }

    pub async fn login(&self, login: &str) -> String {
        let (status, body) = self
            .post("/user/login", None, json!({ "login": login, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Insert a pre-verified user with `role` and log in; returns (id, token)
    pub async fn user_with_role(&self, username: &str, role: Role) -> (Uuid, String) {
        let user = insert_user(
            &self.state.db,
            &NewUser {
                username: username.to_string(),
                email: format!("{}@x.com", username),
                password_hash: self.state.hasher.hash(PASSWORD).unwrap(),
                phone: "+1555".to_string(),
                role,
                verified: true,
            },
        )
        .await
        .unwrap();
        let token = self.login(username).await;
        (user.id, token)
    }

    /// Create a conference as `token`'s owner; returns its id
    pub async fn create_conference(&self, token: &str, extra: Value) -> String {
        let mut body = json!({
            "title": "Systems Week",
            "startDate": "2026-01-10",
            "endDate": "2026-01-12",
            "mode": "In-Person",
            "location": "Oslo",
            "themes": ["storage"],
            "registrationFees": { "earlyBird": 100.0, "regular": 150.0, "student": 50.0, "late": 200.0 },
        });
        if let (Value::Object(target), Value::Object(extra)) = (&mut body, extra) {
            target.extend(extra);
        }

        let (status, created) = self.post("/chair/conferences", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        created["conference"]["id"].as_str().unwrap().to_string()
    }

    /// Submit a paper as `token`; returns the response
    pub async fn submit(&self, token: &str, conference_id: &str, title: &str) -> (StatusCode, Value) {
        self.post(
            "/participant/submit",
            Some(token),
            json!({
                "conferenceId": conference_id,
                "title": title,
                "abstract": "We measure things carefully.",
                "fileUrl": "https://files.example/paper.pdf",
            }),
        )
        .await
    }
}
