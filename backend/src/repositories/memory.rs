//! In-process store implementations used by router tests and local tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::telemetry::{IngestBatch, IngestOutcome, SessionDocument, SessionSummary};
use crate::models::user::User;
use crate::repositories::blob::{Blob, BlobStore};
use crate::repositories::session::SessionRepository;
use crate::repositories::token::TokenStore;
use crate::repositories::user::UserRepository;
use crate::types::{BlobId, SessionId, UserId};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.lock().await;
        let taken = users.iter().any(|u| {
            u.username == user.username || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(AppError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.users.lock().await.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, (UserId, DateTime<Utc>)>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.tokens
            .lock()
            .await
            .insert(jti.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn is_active(&self, jti: &str) -> Result<bool, AppError> {
        let tokens = self.tokens.lock().await;
        Ok(tokens
            .get(jti)
            .is_some_and(|(_, expires_at)| *expires_at > Utc::now()))
    }

    async fn revoke(&self, jti: &str) -> Result<(), AppError> {
        self.tokens.lock().await.remove(jti);
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, (owner, _)| *owner != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        let now = Utc::now();
        tokens.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<Vec<SessionDocument>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn append_batch(
        &self,
        user_id: UserId,
        batch: IngestBatch,
    ) -> Result<(SessionId, IngestOutcome), AppError> {
        let mut sessions = self.sessions.lock().await;
        let existing = sessions
            .iter_mut()
            .find(|doc| doc.user_id == user_id && doc.datetime == batch.captured_at);
        match existing {
            Some(doc) => {
                let outcome = doc.ingest(batch);
                Ok((doc.id, outcome))
            }
            None => {
                let doc = SessionDocument::create(SessionId::new(), user_id, batch);
                let id = doc.id;
                sessions.push(doc);
                Ok((id, IngestOutcome::CreatedSession))
            }
        }
    }

    async fn find(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<Option<SessionDocument>, AppError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .iter()
            .find(|doc| doc.id == id && doc.user_id == user_id)
            .cloned())
    }

    async fn find_many(
        &self,
        user_id: UserId,
        ids: &[SessionId],
    ) -> Result<Vec<SessionDocument>, AppError> {
        let sessions = self.sessions.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                sessions
                    .iter()
                    .find(|doc| doc.id == *id && doc.user_id == user_id)
                    .cloned()
            })
            .collect())
    }

    async fn list(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionSummary>, i64), AppError> {
        let sessions = self.sessions.lock().await;
        let owned: Vec<&SessionDocument> = sessions
            .iter()
            .rev()
            .filter(|doc| doc.user_id == user_id)
            .collect();
        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(SessionDocument::summary)
            .collect();
        Ok((page, total))
    }
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<BlobId, Blob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, content_type: &str, data: Vec<u8>) -> Result<BlobId, AppError> {
        let blob = Blob::new(content_type, data);
        let id = blob.id;
        self.blobs.lock().await.insert(id, blob);
        Ok(id)
    }

    async fn get(&self, id: BlobId) -> Result<Option<Blob>, AppError> {
        Ok(self.blobs.lock().await.get(&id).cloned())
    }

    async fn delete(&self, id: BlobId) -> Result<bool, AppError> {
        Ok(self.blobs.lock().await.remove(&id).is_some())
    }
}
