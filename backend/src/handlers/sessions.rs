use axum::{
    extract::{rejection::QueryRejection, Extension, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        envelope::Envelope,
        telemetry::SessionSummary,
        user::User,
        view::{split_list, ExportQuery, SitesQuery},
        PaginatedResponse, PaginationQuery,
    },
    services::export::{export_csv, export_filename},
    state::AppState,
    types::SessionId,
};

fn parse_session_ids(raw: &str) -> Result<Vec<SessionId>, AppError> {
    let ids = split_list(raw)
        .iter()
        .map(|id| id.parse::<SessionId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AppError::BadRequest("`ids` must be a list of session ids".to_string()))?;
    if ids.is_empty() {
        return Err(AppError::BadRequest("`ids` is required".to_string()));
    }
    Ok(ids)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Envelope<PaginatedResponse<SessionSummary>>, AppError> {
    let Query(query) = query?;
    let (limit, offset) = (query.limit(), query.offset());
    let (items, total) = state.sessions.list(user.id, limit, offset).await?;
    Ok(Envelope::ok(
        "Success",
        PaginatedResponse::new(items, total, limit, offset),
    ))
}

/// Sites visited across the selected sessions, in first-seen order.
pub async fn session_sites(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<SitesQuery>, QueryRejection>,
) -> Result<Envelope<Vec<String>>, AppError> {
    let Query(query) = query?;
    let ids = parse_session_ids(&query.ids)?;
    let docs = state.sessions.find_many(user.id, &ids).await?;

    let mut sites: Vec<String> = Vec::new();
    for site in docs.iter().flat_map(|doc| doc.sites.iter()) {
        if !sites.contains(site) {
            sites.push(site.clone());
        }
    }
    Ok(Envelope::ok("Success", sites))
}

pub async fn export_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let ids = parse_session_ids(&query.ids)?;
    let sites = query.sites.as_deref().map(split_list).unwrap_or_default();
    let kind = query.kind;
    let docs = state.sessions.find_many(user.id, &ids).await?;
    if docs.is_empty() {
        return Err(AppError::NotFound("No sessions found".to_string()));
    }

    let tz = state.config.time_zone;
    let csv = tokio::task::spawn_blocking(move || export_csv(&docs, &sites, kind, &tz))
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))??;

    tracing::info!(
        user_id = %user.id,
        sessions = ids.len(),
        kind = kind.as_str(),
        "Exported sessions"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"{}\"", export_filename(kind));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| AppError::InternalServerError(e.into()))?,
    );
    Ok((headers, csv))
}
