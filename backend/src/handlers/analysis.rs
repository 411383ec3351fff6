use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};

use crate::{
    error::AppError,
    models::{analysis::SentimentReport, envelope::Envelope, user::User, view::SessionSelector},
    services::sentiment::sentiment_report,
    state::AppState,
};

use super::owned_session;

pub async fn sentiment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<SessionSelector>, JsonRejection>,
) -> Result<Envelope<SentimentReport>, AppError> {
    let doc = owned_session(&state, &user, payload).await?;
    let report = sentiment_report(state.sentiment.as_ref(), &doc).await?;
    tracing::debug!(
        session_id = %doc.id,
        transcripts = report.timeline.len(),
        "Sentiment analysis finished"
    );
    Ok(Envelope::ok("Success", report))
}
