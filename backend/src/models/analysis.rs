//! Inference results: facial emotion probabilities and transcript sentiment.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Output classes of the facial-expression model, in logit order.
pub const EMOTION_LABELS: [&str; 8] = [
    "anger", "contempt", "disgust", "fear", "happy", "neutral", "sad", "surprise",
];

/// Label → probability; probabilities sum to 1.
pub type EmotionScores = BTreeMap<String, f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Order used for the radar chart axes.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for a single transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SentimentPoint {
    pub time: f64,
    pub site: String,
    pub text: String,
    pub label: SentimentLabel,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RadarEntry {
    pub label: SentimentLabel,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SentimentReport {
    pub radar: Vec<RadarEntry>,
    pub timeline: Vec<SentimentPoint>,
}

/// Form body of the facial-expression endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FaceExpressionForm {
    /// Image as a `data:image/...;base64,` URL.
    pub data: String,
}
