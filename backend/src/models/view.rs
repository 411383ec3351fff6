//! Request and response bodies of the visualization, listing and export endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::types::BlobId;

use super::telemetry::InteractionKind;

/// Selects one capture session ("dir" in the capture tool's vocabulary).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SessionSelector {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TracePoint {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub image: BlobId,
    pub scroll: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VoicePoint {
    pub text: String,
    pub time: f64,
    pub image: BlobId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordingPoint {
    pub site: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub time: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scroll: Option<f64>,
    pub height: Option<f64>,
}

/// Pointer activity plotted over the page screenshots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeatmapPayload {
    pub plot: String,
    /// Blob id → `data:` URL.
    pub images: BTreeMap<String, String>,
    pub trace: Vec<TracePoint>,
    pub voice: Vec<VoicePoint>,
}

/// Everything needed to replay a capture.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordingPayload {
    pub plot: String,
    /// Site → `data:` URL of its most recent screenshot.
    pub images: BTreeMap<String, String>,
    /// Interaction type → icon drawn by the player.
    pub icons: BTreeMap<String, String>,
    pub trace: Vec<RecordingPoint>,
}

/// Comma-separated session ids.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct SitesQuery {
    pub ids: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Trace,
    Voice,
    Face,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Trace => "trace",
            ExportKind::Voice => "voice",
            ExportKind::Face => "face",
        }
    }

    pub fn kinds(&self) -> &'static [InteractionKind] {
        match self {
            ExportKind::Trace => &InteractionKind::TRACE,
            ExportKind::Voice => &[InteractionKind::Voice],
            ExportKind::Face => &[InteractionKind::Face],
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ExportQuery {
    /// Comma-separated session ids.
    pub ids: String,
    /// Comma-separated site names; all sites when absent.
    pub sites: Option<String>,
    pub kind: ExportKind,
}

/// Splits a comma-separated query value, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
