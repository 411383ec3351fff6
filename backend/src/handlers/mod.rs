pub mod analysis;
pub mod auth;
pub mod data;
pub mod sessions;
pub mod view;

use axum::{extract::rejection::JsonRejection, Json};

use crate::{
    error::AppError,
    models::{telemetry::SessionDocument, user::User, view::SessionSelector},
    state::AppState,
    types::SessionId,
};

/// Resolves the `dir` of a view/analysis request to a session of the caller.
/// Ids that do not parse are reported like ids that do not exist.
async fn owned_session(
    state: &AppState,
    user: &User,
    payload: Result<Json<SessionSelector>, JsonRejection>,
) -> Result<SessionDocument, AppError> {
    let Json(selector) = payload?;
    let dir = selector
        .dir
        .as_deref()
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .ok_or_else(|| AppError::BadRequest("The 'dir' field is required".to_string()))?;

    let not_found = || AppError::NotFound("Session not found".to_string());
    let id: SessionId = dir.parse().map_err(|_| not_found())?;
    state.sessions.find(user.id, id).await?.ok_or_else(not_found)
}
