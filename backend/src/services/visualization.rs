//! Builds the heatmap and recording payloads from a stored session.

use std::collections::BTreeMap;

use crate::models::telemetry::{InteractionKind, SessionDocument};
use crate::models::view::{HeatmapPayload, RecordingPayload, RecordingPoint, TracePoint, VoicePoint};
use crate::repositories::blob::BlobStore;
use crate::types::BlobId;
use crate::utils::data_url::{blank_image_data_url, encode_data_url};
use crate::utils::text::sanitize_text;

/// Icon the recording player draws for each interaction type.
pub fn icon_for(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Click => "mouse-pointer",
        InteractionKind::Wheel => "arrows-v",
        InteractionKind::Mousemove => "mouse",
        InteractionKind::Eye => "eye",
        InteractionKind::Keyboard => "keyboard",
        InteractionKind::Freeze => "pause",
        InteractionKind::Voice => "microphone",
        InteractionKind::Face => "smile",
    }
}

/// Loads a screenshot as a `data:` URL; missing or unreadable blobs become
/// a blank image so one bad screenshot does not break the whole view.
pub async fn image_data_url(blobs: &dyn BlobStore, id: BlobId) -> String {
    match blobs.get(id).await {
        Ok(Some(blob)) => encode_data_url(&blob.content_type, &blob.data),
        Ok(None) => {
            tracing::warn!(blob_id = %id, "Screenshot not found, using blank image");
            blank_image_data_url()
        }
        Err(err) => {
            tracing::warn!(blob_id = %id, error = ?err, "Failed to load screenshot, using blank image");
            blank_image_data_url()
        }
    }
}

pub async fn heatmap(blobs: &dyn BlobStore, doc: &SessionDocument) -> HeatmapPayload {
    let trace: Vec<TracePoint> = doc
        .interactions_of(&InteractionKind::HEATMAP)
        .map(|(_, interaction)| TracePoint {
            time: interaction.time,
            kind: interaction.kind,
            x: interaction.x,
            y: interaction.y,
            image: interaction.image,
            scroll: interaction.scroll,
        })
        .collect();

    let voice: Vec<VoicePoint> = doc
        .interactions_of(&[InteractionKind::Voice])
        .filter_map(|(_, interaction)| {
            interaction.text().map(|text| VoicePoint {
                text: sanitize_text(text),
                time: interaction.time,
                image: interaction.image,
            })
        })
        .collect();

    let mut images = BTreeMap::new();
    for id in doc.image_ids(&[]) {
        images.insert(id.to_string(), image_data_url(blobs, id).await);
    }

    HeatmapPayload {
        plot: "heatmap".to_string(),
        images,
        trace,
        voice,
    }
}

pub async fn recording(blobs: &dyn BlobStore, doc: &SessionDocument) -> RecordingPayload {
    let trace: Vec<RecordingPoint> = doc
        .interactions_of(&InteractionKind::TRACE)
        .map(|(record, interaction)| RecordingPoint {
            site: sanitize_text(&record.site),
            kind: interaction.kind,
            time: interaction.time,
            x: interaction.x,
            y: interaction.y,
            scroll: interaction.scroll,
            height: interaction.height,
        })
        .collect();

    let icons = InteractionKind::TRACE
        .iter()
        .map(|kind| (kind.as_str().to_string(), icon_for(*kind).to_string()))
        .collect();

    let mut images = BTreeMap::new();
    for record in &doc.data {
        if let Some(latest) = record.images.last() {
            images.insert(sanitize_text(&record.site), image_data_url(blobs, *latest).await);
        }
    }

    RecordingPayload {
        plot: "recording".to_string(),
        images,
        icons,
        trace,
    }
}
