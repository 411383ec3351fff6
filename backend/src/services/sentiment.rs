//! Sentiment analysis of the voice transcripts of a session.

use crate::error::AppError;
use crate::models::analysis::{
    RadarEntry, SentimentLabel, SentimentPoint, SentimentReport, SentimentScore,
};
use crate::models::telemetry::{InteractionKind, SessionDocument};
use crate::services::inference::SentimentAnalyzer;
use crate::utils::text::sanitize_text;

struct Transcript {
    time: f64,
    site: String,
    text: String,
}

fn transcripts(doc: &SessionDocument) -> Vec<Transcript> {
    doc.interactions_of(&[InteractionKind::Voice])
        .filter_map(|(record, interaction)| {
            let text = sanitize_text(interaction.text()?.trim());
            (!text.is_empty()).then(|| Transcript {
                time: interaction.time,
                site: record.site.clone(),
                text,
            })
        })
        .collect()
}

/// Counts per label in radar axis order.
pub fn radar(scores: &[SentimentScore]) -> Vec<RadarEntry> {
    SentimentLabel::ALL
        .iter()
        .map(|label| RadarEntry {
            label: *label,
            count: scores.iter().filter(|s| s.label == *label).count() as u64,
        })
        .collect()
}

pub async fn sentiment_report(
    analyzer: &dyn SentimentAnalyzer,
    doc: &SessionDocument,
) -> Result<SentimentReport, AppError> {
    let transcripts = transcripts(doc);
    if transcripts.is_empty() {
        return Err(AppError::BadRequest("No voice data in session".to_string()));
    }

    let texts: Vec<String> = transcripts.iter().map(|t| t.text.clone()).collect();
    let scores = analyzer.analyze(&texts).await?;
    if scores.len() != transcripts.len() {
        return Err(AppError::InternalServerError(anyhow::anyhow!(
            "sentiment analyzer returned {} scores for {} transcripts",
            scores.len(),
            transcripts.len()
        )));
    }

    let radar = radar(&scores);
    let timeline = transcripts
        .into_iter()
        .zip(scores)
        .map(|(transcript, score)| SentimentPoint {
            time: transcript.time,
            site: transcript.site,
            text: transcript.text,
            label: score.label,
            score: score.score,
        })
        .collect();

    Ok(SentimentReport { radar, timeline })
}
