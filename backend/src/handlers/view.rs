use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};

use crate::{
    error::AppError,
    models::{
        envelope::Envelope,
        user::User,
        view::{HeatmapPayload, RecordingPayload, SessionSelector},
    },
    services::visualization,
    state::AppState,
};

use super::owned_session;

pub async fn heatmap(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<SessionSelector>, JsonRejection>,
) -> Result<Envelope<HeatmapPayload>, AppError> {
    let doc = owned_session(&state, &user, payload).await?;
    let payload = visualization::heatmap(state.blobs.as_ref(), &doc).await;
    Ok(Envelope::ok("Success", payload))
}

pub async fn recording(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<SessionSelector>, JsonRejection>,
) -> Result<Envelope<RecordingPayload>, AppError> {
    let doc = owned_session(&state, &user, payload).await?;
    let payload = visualization::recording(state.blobs.as_ref(), &doc).await;
    Ok(Envelope::ok("Success", payload))
}
