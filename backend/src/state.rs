use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        BlobStore, PgBlobStore, PgSessionRepository, PgTokenStore, PgUserRepository,
        SessionRepository, TokenStore, UserRepository,
    },
    services::{
        inference::{EmotionClassifier, HttpInferenceClient, SentimentAnalyzer},
        ingestion::Ingestor,
    },
    utils::email::Mailer,
};

/// Shared handles cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenStore>,
    pub sessions: Arc<dyn SessionRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub emotions: Arc<dyn EmotionClassifier>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wires the Postgres stores and the HTTP inference client.
    pub fn from_pool(pool: DbPool, config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let inference = Arc::new(HttpInferenceClient::new(
            config.inference_url.clone(),
            Duration::from_secs(config.inference_timeout_secs),
        )?);
        Ok(Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tokens: Arc::new(PgTokenStore::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            blobs: Arc::new(PgBlobStore::new(pool)),
            emotions: inference.clone(),
            sentiment: inference,
            mailer,
            config,
        })
    }

    pub fn ingestor(&self) -> Ingestor<'_> {
        Ingestor {
            users: self.users.as_ref(),
            sessions: self.sessions.as_ref(),
            blobs: self.blobs.as_ref(),
        }
    }
}
