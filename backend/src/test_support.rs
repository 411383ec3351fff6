//! Fixtures shared by unit tests and the `test-utils` integration suites.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    config::{Config, Environment},
    error::AppError,
    handlers::auth::issue_access_token,
    models::{
        analysis::SentimentScore,
        user::{User, UserRole},
    },
    repositories::memory::{
        InMemoryBlobStore, InMemorySessionRepository, InMemoryTokenStore, InMemoryUserRepository,
    },
    services::inference::{EmotionClassifier, InferenceError, SentimentAnalyzer},
    state::AppState,
    utils::{data_url::DecodedImage, email::Mailer, password::hash_password},
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

pub fn test_config() -> Config {
    Config {
        environment: Environment::Testing,
        database_url: "postgres://127.0.0.1:5432/uxtracking_test".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration_hours: 1,
        cookie_secure: false,
        time_zone: chrono_tz::UTC,
        inference_url: None,
        inference_timeout_secs: 5,
        max_body_bytes: 2 * 1024 * 1024,
        example_user_password: None,
    }
}

/// Inference backend that was never configured.
pub struct NoInference;

#[async_trait]
impl EmotionClassifier for NoInference {
    async fn logits(&self, _image: &DecodedImage) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::NotConfigured)
    }
}

#[async_trait]
impl SentimentAnalyzer for NoInference {
    async fn analyze(&self, _texts: &[String]) -> Result<Vec<SentimentScore>, InferenceError> {
        Err(InferenceError::NotConfigured)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub username: String,
    pub password: String,
}

/// Keeps outgoing mail in memory instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_generated_password(
        &self,
        to_email: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        self.sent.lock().await.push(SentMail {
            to: to_email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }
}

/// State backed entirely by in-memory stores. The mailer is returned so
/// tests can inspect what was sent.
pub fn test_state() -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let inference = Arc::new(NoInference);
    let state = AppState {
        config: test_config(),
        users: Arc::new(InMemoryUserRepository::new()),
        tokens: Arc::new(InMemoryTokenStore::new()),
        sessions: Arc::new(InMemorySessionRepository::new()),
        blobs: Arc::new(InMemoryBlobStore::new()),
        emotions: inference.clone(),
        sentiment: inference,
        mailer: mailer.clone(),
    };
    (state, mailer)
}

pub async fn seed_user(state: &AppState, username: &str, password: &str) -> User {
    let hash = hash_password(password).unwrap();
    let user = User::new(
        username.to_string(),
        format!("{}@example.com", username),
        hash,
        UserRole::User,
    );
    state.users.create(&user).await.unwrap()
}

/// Issues an access token for `user` the same way login does.
pub async fn token_for(state: &AppState, user: &User) -> String {
    let result: Result<_, AppError> = issue_access_token(state, user).await;
    result.unwrap().0
}

pub fn json_request(
    method: axum::http::Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", token),
        );
    }
    builder
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", token),
        );
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
