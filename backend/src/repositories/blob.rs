//! Binary storage for screenshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::types::BlobId;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Blob {
    pub id: BlobId,
    pub content_type: String,
    /// Hex-encoded SHA-256 of `data`.
    pub sha256: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Blob {
    pub fn new(content_type: &str, data: Vec<u8>) -> Self {
        Self {
            id: BlobId::new(),
            content_type: content_type.to_string(),
            sha256: sha256_hex(&data),
            data,
            created_at: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns the new blob's id.
    async fn put(&self, content_type: &str, data: Vec<u8>) -> Result<BlobId, AppError>;

    async fn get(&self, id: BlobId) -> Result<Option<Blob>, AppError>;

    /// Removes a blob nothing references yet. Returns whether it existed.
    async fn delete(&self, id: BlobId) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn put(&self, content_type: &str, data: Vec<u8>) -> Result<BlobId, AppError> {
        let blob = Blob::new(content_type, data);
        sqlx::query(
            "INSERT INTO blobs (id, content_type, sha256, size_bytes, data, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(blob.id)
        .bind(&blob.content_type)
        .bind(&blob.sha256)
        .bind(blob.size() as i64)
        .bind(&blob.data)
        .bind(blob.created_at)
        .execute(&self.pool)
        .await?;
        tracing::debug!(blob_id = %blob.id, size = blob.size(), "Stored blob");
        Ok(blob.id)
    }

    async fn get(&self, id: BlobId) -> Result<Option<Blob>, AppError> {
        let blob = sqlx::query_as::<_, Blob>(
            "SELECT id, content_type, sha256, data, created_at FROM blobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blob)
    }

    async fn delete(&self, id: BlobId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
