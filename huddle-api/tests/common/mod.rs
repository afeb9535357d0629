/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - A full router over the in-memory store
/// - A mailer that records reset emails
/// - Request helpers returning status and parsed JSON
/// - User registration shortcuts

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use huddle_api::app::{build_router, identity_settings, AppState};
use huddle_api::config::Config;
use huddle_shared::auth::password::HashParams;
use huddle_shared::mail::{Email, MailError, Mailer};
use huddle_shared::store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "MyP@ssw0rd!";

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    /// Reset token from the URL in the most recent message
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last()?.body;
        body.trim().rsplit('/').next().map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// A registered user and their token
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config::from_source(|key| match key {
        "DATABASE_URL" => Some("postgresql://unused/huddle_test".to_string()),
        "JWT_SECRET" => Some("test_secret_key_at_least_32_bytes_long!!".to_string()),
        "PUBLIC_URL" => Some("http://huddle.test".to_string()),
        _ => None,
    })
    .expect("Test config should be valid")
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());

        let settings = identity_settings(&config, HashParams::insecure_fast());
        let state = AppState::with_settings(store.clone(), mailer.clone(), config.clone(), settings);

        Self {
            app: build_router(state),
            store,
            mailer,
            config,
        }
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Non-JSON bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    /// Registers a user named `name` with an email derived from it
    pub async fn register(&self, name: &str) -> TestUser {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");

        let token = body["token"].as_str().unwrap().to_string();
        let (_, me) = self.get("/api/v1/auth/me", Some(&token)).await;
        let id = me["data"]["id"].as_str().unwrap().parse().unwrap();

        TestUser { id, token }
    }

    /// Creates a group as `owner` and returns its id
    pub async fn create_group(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/groups",
                Some(&owner.token),
                Some(json!({ "name": name, "description": "A place to meet" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create group failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Creates a game in `group_id` as `owner` and returns its id
    pub async fn create_game(&self, owner: &TestUser, group_id: &str, title: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                &format!("/api/v1/groups/{group_id}/games"),
                Some(&owner.token),
                Some(json!({ "title": title, "description": "Bring snacks" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create game failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Files a join request as `user` on `base` (e.g. `/api/v1/groups/<id>`)
    /// and returns the request id
    pub async fn request_join(&self, base: &str, user: &TestUser) -> String {
        let (status, body) = self
            .send("POST", &format!("{base}/request"), Some(&user.token), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "request failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Requests and accepts a membership in one go
    pub async fn join(&self, base: &str, user: &TestUser, moderator: &TestUser) {
        let request_id = self.request_join(base, user).await;
        let (status, body) = self
            .send(
                "PUT",
                &format!("{base}/request/{request_id}"),
                Some(&moderator.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "accept failed: {body}");
    }
}
