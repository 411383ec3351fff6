//! Capture session storage.
//!
//! A [`SessionDocument`] is spread over `capture_sessions`, `capture_sites`,
//! `site_images` and `interactions`. Rows are only ever inserted, so the
//! insertion order of the serial ids is the arrival order of the data.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::telemetry::{
    IngestBatch, IngestOutcome, Interaction, SessionDocument, SessionSummary, SiteRecord,
};
use crate::types::{BlobId, SessionId, UserId};

/// Rows per multi-value INSERT; 11 binds each keeps us below the 65535
/// parameter limit of the Postgres protocol.
const INTERACTION_CHUNK: usize = 4000;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Applies one upload to the user's session for `batch.captured_at`,
    /// creating the session or the site as needed.
    async fn append_batch(
        &self,
        user_id: UserId,
        batch: IngestBatch,
    ) -> Result<(SessionId, IngestOutcome), AppError>;

    async fn find(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<Option<SessionDocument>, AppError>;

    /// Sessions owned by the user among `ids`, in the requested order.
    /// Unknown or foreign ids are skipped.
    async fn find_many(
        &self,
        user_id: UserId,
        ids: &[SessionId],
    ) -> Result<Vec<SessionDocument>, AppError>;

    /// Newest first; returns the page and the total number of sessions.
    async fn list(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionSummary>, i64), AppError>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: SessionId,
    user_id: UserId,
    captured_at: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SiteRow {
    id: i64,
    session_id: SessionId,
    site: String,
}

#[derive(Debug, FromRow)]
struct ImageRow {
    site_id: i64,
    blob_id: BlobId,
}

#[derive(Debug, FromRow)]
struct InteractionRow {
    site_id: i64,
    kind: String,
    time_offset: f64,
    x: Option<f64>,
    y: Option<f64>,
    scroll: Option<f64>,
    height: Option<f64>,
    class_name: Option<String>,
    element_id: Option<String>,
    image_id: BlobId,
    value: Value,
}

impl InteractionRow {
    fn into_interaction(self) -> Result<Interaction, AppError> {
        let kind = self
            .kind
            .parse()
            .map_err(|err| anyhow!("corrupt interaction row: {}", err))?;
        Ok(Interaction {
            kind,
            time: self.time_offset,
            x: self.x,
            y: self.y,
            scroll: self.scroll,
            height: self.height,
            class_name: self.class_name,
            element_id: self.element_id,
            image: self.image_id,
            value: self.value,
        })
    }
}

fn uuids(ids: &[SessionId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

/// Rebuilds documents from their rows. `sites`, `images` and `interactions`
/// must already be sorted in storage order.
fn assemble(
    sessions: Vec<SessionRow>,
    sites: Vec<SiteRow>,
    images: Vec<ImageRow>,
    interactions: Vec<InteractionRow>,
) -> Result<Vec<SessionDocument>, AppError> {
    let mut documents: Vec<SessionDocument> = sessions
        .into_iter()
        .map(|row| SessionDocument {
            id: row.id,
            user_id: row.user_id,
            datetime: row.captured_at,
            sites: Vec::new(),
            data: Vec::new(),
            created_at: row.created_at,
        })
        .collect();
    let by_session: HashMap<SessionId, usize> = documents
        .iter()
        .enumerate()
        .map(|(index, doc)| (doc.id, index))
        .collect();

    // site row id -> (document index, record index)
    let mut locations: HashMap<i64, (usize, usize)> = HashMap::new();
    for site in sites {
        let Some(&doc_index) = by_session.get(&site.session_id) else {
            continue;
        };
        let doc = &mut documents[doc_index];
        locations.insert(site.id, (doc_index, doc.data.len()));
        doc.sites.push(site.site.clone());
        doc.data.push(SiteRecord {
            site: site.site,
            images: Vec::new(),
            interactions: Vec::new(),
        });
    }

    for image in images {
        if let Some(&(doc, record)) = locations.get(&image.site_id) {
            documents[doc].data[record].images.push(image.blob_id);
        }
    }

    for row in interactions {
        if let Some(&(doc, record)) = locations.get(&row.site_id) {
            let interaction = row.into_interaction()?;
            documents[doc].data[record].interactions.push(interaction);
        }
    }

    Ok(documents)
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn append_batch(
        &self,
        user_id: UserId,
        batch: IngestBatch,
    ) -> Result<(SessionId, IngestOutcome), AppError> {
        let batch = batch.without_nul();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, SessionId>(
            "SELECT id FROM capture_sessions WHERE user_id = $1 AND captured_at = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(&batch.captured_at)
        .fetch_optional(&mut *tx)
        .await?;

        let (session_id, session_exists) = match existing {
            Some(id) => (id, true),
            None => {
                let inserted = sqlx::query_scalar::<_, SessionId>(
                    "INSERT INTO capture_sessions (id, user_id, captured_at) VALUES ($1, $2, $3) \
                     ON CONFLICT (user_id, captured_at) DO NOTHING RETURNING id",
                )
                .bind(SessionId::new())
                .bind(user_id)
                .bind(&batch.captured_at)
                .fetch_optional(&mut *tx)
                .await?;
                match inserted {
                    Some(id) => (id, false),
                    // Another upload created the session after our lookup.
                    None => {
                        let id = sqlx::query_scalar::<_, SessionId>(
                            "SELECT id FROM capture_sessions \
                             WHERE user_id = $1 AND captured_at = $2 FOR UPDATE",
                        )
                        .bind(user_id)
                        .bind(&batch.captured_at)
                        .fetch_one(&mut *tx)
                        .await?;
                        (id, true)
                    }
                }
            }
        };

        let existing_site = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM capture_sites WHERE session_id = $1 AND site = $2",
        )
        .bind(session_id)
        .bind(&batch.site)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = IngestOutcome::classify(session_exists, existing_site.is_some());
        let site_id = match existing_site {
            Some(id) => id,
            None => {
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO capture_sites (session_id, position, site) \
                     VALUES ($1, (SELECT COUNT(*)::INTEGER FROM capture_sites WHERE session_id = $1), $2) \
                     RETURNING id",
                )
                .bind(session_id)
                .bind(&batch.site)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        sqlx::query("INSERT INTO site_images (site_id, blob_id) VALUES ($1, $2)")
            .bind(site_id)
            .bind(batch.image)
            .execute(&mut *tx)
            .await?;

        for chunk in batch.interactions.chunks(INTERACTION_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO interactions \
                 (site_id, kind, time_offset, x, y, scroll, height, class_name, element_id, image_id, value) ",
            );
            builder.push_values(chunk, |mut row, interaction| {
                row.push_bind(site_id)
                    .push_bind(interaction.kind.as_str())
                    .push_bind(interaction.time)
                    .push_bind(interaction.x)
                    .push_bind(interaction.y)
                    .push_bind(interaction.scroll)
                    .push_bind(interaction.height)
                    .push_bind(interaction.class_name.clone())
                    .push_bind(interaction.element_id.clone())
                    .push_bind(interaction.image)
                    .push_bind(interaction.value.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            %user_id,
            %session_id,
            site = %batch.site,
            ?outcome,
            interactions = batch.interactions.len(),
            "Applied capture batch"
        );
        Ok((session_id, outcome))
    }

    async fn find(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<Option<SessionDocument>, AppError> {
        Ok(self.find_many(user_id, &[id]).await?.into_iter().next())
    }

    async fn find_many(
        &self,
        user_id: UserId,
        ids: &[SessionId],
    ) -> Result<Vec<SessionDocument>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sessions = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, captured_at, created_at FROM capture_sessions \
             WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<SessionId> = sessions.iter().map(|row| row.id).collect();
        let found_uuids = uuids(&found);

        let sites = sqlx::query_as::<_, SiteRow>(
            "SELECT id, session_id, site FROM capture_sites \
             WHERE session_id = ANY($1) ORDER BY session_id, position",
        )
        .bind(&found_uuids)
        .fetch_all(&self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(
            "SELECT i.site_id, i.blob_id FROM site_images i \
             JOIN capture_sites s ON s.id = i.site_id \
             WHERE s.session_id = ANY($1) ORDER BY i.id",
        )
        .bind(&found_uuids)
        .fetch_all(&self.pool)
        .await?;

        let interactions = sqlx::query_as::<_, InteractionRow>(
            "SELECT i.site_id, i.kind, i.time_offset, i.x, i.y, i.scroll, i.height, \
                    i.class_name, i.element_id, i.image_id, i.value \
             FROM interactions i \
             JOIN capture_sites s ON s.id = i.site_id \
             WHERE s.session_id = ANY($1) ORDER BY i.id",
        )
        .bind(&found_uuids)
        .fetch_all(&self.pool)
        .await?;

        let mut documents = assemble(sessions, sites, images, interactions)?;
        documents.sort_by_key(|doc| ids.iter().position(|id| *id == doc.id));
        Ok(documents)
    }

    async fn list(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionSummary>, i64), AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM capture_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let sessions = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, captured_at, created_at FROM capture_sessions \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        if sessions.is_empty() {
            return Ok((Vec::new(), total));
        }
        let page: Vec<SessionId> = sessions.iter().map(|row| row.id).collect();
        let page_uuids = uuids(&page);

        let sites = sqlx::query_as::<_, SiteRow>(
            "SELECT id, session_id, site FROM capture_sites \
             WHERE session_id = ANY($1) ORDER BY session_id, position",
        )
        .bind(&page_uuids)
        .fetch_all(&self.pool)
        .await?;

        let counts = sqlx::query_as::<_, (SessionId, String, i64)>(
            "SELECT s.session_id, i.kind, COUNT(*) FROM interactions i \
             JOIN capture_sites s ON s.id = i.site_id \
             WHERE s.session_id = ANY($1) GROUP BY s.session_id, i.kind",
        )
        .bind(&page_uuids)
        .fetch_all(&self.pool)
        .await?;

        let summaries = sessions
            .into_iter()
            .map(|row| {
                let sites = sites
                    .iter()
                    .filter(|site| site.session_id == row.id)
                    .map(|site| site.site.clone())
                    .collect();
                let interaction_counts: std::collections::BTreeMap<String, u64> = counts
                    .iter()
                    .filter(|(session_id, _, _)| *session_id == row.id)
                    .map(|(_, kind, count)| (kind.clone(), (*count).max(0) as u64))
                    .collect();
                SessionSummary {
                    id: row.id,
                    datetime: row.captured_at,
                    sites,
                    total_interactions: interaction_counts.values().sum(),
                    interaction_counts,
                }
            })
            .collect();

        Ok((summaries, total))
    }
}
