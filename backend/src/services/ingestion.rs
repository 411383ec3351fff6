//! Turns an upload from the capture tool into a stored batch.

use crate::error::AppError;
use crate::models::ingest::{ReceivePayload, ReceiveReceipt};
use crate::models::telemetry::IngestBatch;
use crate::repositories::{BlobStore, SessionRepository, UserRepository};
use crate::types::{BlobId, UserId};
use crate::utils::data_url::decode_image;
use crate::validation::rules::validate_site;

pub struct Ingestor<'a> {
    pub users: &'a dyn UserRepository,
    pub sessions: &'a dyn SessionRepository,
    pub blobs: &'a dyn BlobStore,
}

impl Ingestor<'_> {
    /// Validates the upload, stores its screenshot and appends its
    /// interactions to the matching session.
    ///
    /// Nothing is written unless the whole payload is valid.
    pub async fn receive(&self, payload: ReceivePayload) -> Result<ReceiveReceipt, AppError> {
        let metadata = payload.metadata;

        let raw_user = metadata
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Forbidden("No user ID provided".to_string()))?;
        let user_id: UserId = raw_user
            .parse()
            .map_err(|_| AppError::Forbidden("User not found".to_string()))?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("User not found".to_string()))?;

        let captured_at = metadata
            .date_time
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("metadata.dateTime is required".to_string()))?;
        let site = metadata
            .site
            .ok_or_else(|| AppError::BadRequest("metadata.site is required".to_string()))?;
        validate_site(&site)
            .map_err(|_| AppError::BadRequest("metadata.site is invalid".to_string()))?;
        let raw_image = metadata
            .image
            .ok_or_else(|| AppError::BadRequest("metadata.image is required".to_string()))?;
        let image = decode_image(&raw_image)
            .map_err(|err| AppError::BadRequest(format!("Invalid image: {}", err)))?;

        // Rows are checked before the screenshot is stored so a bad batch
        // leaves no orphan blob behind.
        let mut interactions = payload
            .data
            .into_interactions(BlobId::default(), metadata.height)
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        let image_id = self.blobs.put(&image.content_type, image.bytes).await?;
        for interaction in &mut interactions {
            interaction.image = image_id;
        }
        let count = interactions.len();

        let appended = self
            .sessions
            .append_batch(
                user.id,
                IngestBatch {
                    captured_at,
                    site,
                    image: image_id,
                    interactions,
                },
            )
            .await;
        let (session_id, outcome) = match appended {
            Ok(applied) => applied,
            Err(err) => {
                // The screenshot is only referenced through the batch.
                if let Err(cleanup) = self.blobs.delete(image_id).await {
                    tracing::warn!(
                        blob_id = %image_id,
                        error = ?cleanup,
                        "Failed to remove unreferenced screenshot"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            user_id = %user.id,
            %session_id,
            ?outcome,
            interactions = count,
            "Received capture batch"
        );

        Ok(ReceiveReceipt {
            session_id,
            outcome,
            interactions: count,
        })
    }
}
