//! Client side of the model inference service.
//!
//! The facial-expression and sentiment models run out of process. This module
//! owns the wire format, turns raw logits into labelled probabilities and
//! exposes both models as traits so handlers can be tested without a network.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::models::analysis::{EmotionScores, SentimentLabel, SentimentScore, EMOTION_LABELS};
use crate::utils::data_url::DecodedImage;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference backend not configured")]
    NotConfigured,
    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid inference response: {0}")]
    InvalidResponse(String),
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NotConfigured => {
                AppError::ServiceUnavailable("Inference backend not configured".to_string())
            }
            other => AppError::InternalServerError(other.into()),
        }
    }
}

/// Facial-expression model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Raw logits, one per entry of [`EMOTION_LABELS`].
    async fn logits(&self, image: &DecodedImage) -> Result<Vec<f32>, InferenceError>;
}

/// Transcript sentiment model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    /// One score per input text, in input order.
    async fn analyze(&self, texts: &[String]) -> Result<Vec<SentimentScore>, InferenceError>;
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Maps model logits to label probabilities.
pub fn label_emotions(logits: &[f32]) -> Result<EmotionScores, InferenceError> {
    if logits.len() != EMOTION_LABELS.len() {
        return Err(InferenceError::InvalidResponse(format!(
            "expected {} logits, got {}",
            EMOTION_LABELS.len(),
            logits.len()
        )));
    }
    if logits.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::InvalidResponse(
            "logits must be finite".to_string(),
        ));
    }
    Ok(EMOTION_LABELS
        .iter()
        .zip(softmax(logits))
        .map(|(label, p)| (label.to_string(), p))
        .collect())
}

pub async fn classify_emotion(
    classifier: &dyn EmotionClassifier,
    image: &DecodedImage,
) -> Result<EmotionScores, InferenceError> {
    let logits = classifier.logits(image).await?;
    label_emotions(&logits)
}

/// Accepts the label spellings produced by common sentiment models.
pub fn parse_sentiment_label(raw: &str) -> Option<SentimentLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "positive" | "pos" => Some(SentimentLabel::Positive),
        "neutral" | "neu" => Some(SentimentLabel::Neutral),
        "negative" | "neg" => Some(SentimentLabel::Negative),
        _ => None,
    }
}

#[derive(Serialize)]
struct EmotionRequest<'a> {
    image: String,
    content_type: &'a str,
}

#[derive(Deserialize)]
struct EmotionResponse {
    logits: Vec<f32>,
}

#[derive(Serialize)]
struct SentimentRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct SentimentWire {
    label: String,
    score: f32,
}

/// HTTP client for the inference service at `INFERENCE_URL`.
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpInferenceClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("uxtracking-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build inference HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, InferenceError> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, path))
            .ok_or(InferenceError::NotConfigured)
    }
}

#[async_trait]
impl EmotionClassifier for HttpInferenceClient {
    async fn logits(&self, image: &DecodedImage) -> Result<Vec<f32>, InferenceError> {
        let url = self.endpoint("emotion")?;
        let request = EmotionRequest {
            image: STANDARD.encode(&image.bytes),
            content_type: &image.content_type,
        };
        let response: EmotionResponse = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(logits = response.logits.len(), "Emotion inference done");
        Ok(response.logits)
    }
}

#[async_trait]
impl SentimentAnalyzer for HttpInferenceClient {
    async fn analyze(&self, texts: &[String]) -> Result<Vec<SentimentScore>, InferenceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint("sentiment")?;
        let response: Vec<SentimentWire> = self
            .client
            .post(&url)
            .json(&SentimentRequest { texts })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.len() != texts.len() {
            return Err(InferenceError::InvalidResponse(format!(
                "expected {} sentiment scores, got {}",
                texts.len(),
                response.len()
            )));
        }
        response
            .into_iter()
            .map(|wire| {
                let label = parse_sentiment_label(&wire.label).ok_or_else(|| {
                    InferenceError::InvalidResponse(format!(
                        "unknown sentiment label '{}'",
                        wire.label
                    ))
                })?;
                Ok(SentimentScore {
                    label,
                    score: wire.score,
                })
            })
            .collect()
    }
}
