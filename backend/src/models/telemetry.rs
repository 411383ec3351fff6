//! Capture sessions and the interactions recorded inside them.
//!
//! A [`SessionDocument`] aggregates everything one user captured under one
//! client timestamp. Interactions are grouped per visited site; each batch the
//! capture tool uploads either creates the document, adds a site to it, or
//! extends an existing site. Nothing is ever rewritten or removed.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BlobId, SessionId, UserId};
use crate::utils::text::{strip_nul, strip_nul_value};

/// Kind of recorded user action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Wheel,
    Mousemove,
    Eye,
    Keyboard,
    Freeze,
    Voice,
    Face,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 8] = [
        InteractionKind::Click,
        InteractionKind::Wheel,
        InteractionKind::Mousemove,
        InteractionKind::Eye,
        InteractionKind::Keyboard,
        InteractionKind::Freeze,
        InteractionKind::Voice,
        InteractionKind::Face,
    ];

    /// Pointer interactions plotted on a heatmap.
    pub const HEATMAP: [InteractionKind; 3] = [
        InteractionKind::Click,
        InteractionKind::Wheel,
        InteractionKind::Mousemove,
    ];

    /// Interactions replayed in a recording and exported as the trace CSV.
    pub const TRACE: [InteractionKind; 6] = [
        InteractionKind::Eye,
        InteractionKind::Keyboard,
        InteractionKind::Freeze,
        InteractionKind::Click,
        InteractionKind::Wheel,
        InteractionKind::Mousemove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::Wheel => "wheel",
            InteractionKind::Mousemove => "mousemove",
            InteractionKind::Eye => "eye",
            InteractionKind::Keyboard => "keyboard",
            InteractionKind::Freeze => "freeze",
            InteractionKind::Voice => "voice",
            InteractionKind::Face => "face",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InteractionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ColumnError::UnknownKind(s.to_string()))
    }
}

/// A single recorded user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Offset of the action within the capture, as reported by the client.
    pub time: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scroll: Option<f64>,
    /// Page height at capture time, copied from the batch metadata.
    pub height: Option<f64>,
    /// DOM class of the target element.
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    /// DOM id of the target element.
    #[serde(rename = "id")]
    pub element_id: Option<String>,
    /// Screenshot that was current when the action happened.
    pub image: BlobId,
    /// Free-form payload: key names, voice transcripts, emotion scores, ...
    #[schema(value_type = Object)]
    pub value: Value,
}

impl Interaction {
    /// Text carried by the payload; transcripts are plain JSON strings.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("text").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// All interactions captured on one site within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SiteRecord {
    pub site: String,
    pub images: Vec<BlobId>,
    pub interactions: Vec<Interaction>,
}

/// One upload from the capture tool, already converted to rows.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestBatch {
    pub captured_at: String,
    pub site: String,
    pub image: BlobId,
    pub interactions: Vec<Interaction>,
}

impl IngestBatch {
    /// Copy of the batch with NUL removed from every stored string.
    pub fn without_nul(self) -> Self {
        let clean = |s: Option<String>| s.map(|s| strip_nul(&s).into_owned());
        Self {
            captured_at: strip_nul(&self.captured_at).into_owned(),
            site: strip_nul(&self.site).into_owned(),
            image: self.image,
            interactions: self
                .interactions
                .into_iter()
                .map(|interaction| Interaction {
                    class_name: clean(interaction.class_name),
                    element_id: clean(interaction.element_id),
                    value: strip_nul_value(interaction.value),
                    ..interaction
                })
                .collect(),
        }
    }
}

/// Which of the three document shapes a batch landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// No document existed for the timestamp; one was created.
    CreatedSession,
    /// The document existed but had never seen the site.
    AddedSite,
    /// The site already existed; its arrays were extended.
    ExtendedSite,
}

impl IngestOutcome {
    pub fn classify(session_exists: bool, site_exists: bool) -> Self {
        match (session_exists, site_exists) {
            (false, _) => IngestOutcome::CreatedSession,
            (true, false) => IngestOutcome::AddedSite,
            (true, true) => IngestOutcome::ExtendedSite,
        }
    }
}

/// One user's telemetry capture for a given timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionDocument {
    pub id: SessionId,
    pub user_id: UserId,
    /// Capture timestamp exactly as sent by the client.
    pub datetime: String,
    /// Visited sites in first-visit order, without duplicates.
    pub sites: Vec<String>,
    pub data: Vec<SiteRecord>,
    pub created_at: DateTime<Utc>,
}

impl SessionDocument {
    /// Creates the document for the first batch of a capture.
    pub fn create(id: SessionId, user_id: UserId, batch: IngestBatch) -> Self {
        Self {
            id,
            user_id,
            datetime: batch.captured_at,
            sites: vec![batch.site.clone()],
            data: vec![SiteRecord {
                site: batch.site,
                images: vec![batch.image],
                interactions: batch.interactions,
            }],
            created_at: Utc::now(),
        }
    }

    /// Applies a follow-up batch of the same capture.
    pub fn ingest(&mut self, batch: IngestBatch) -> IngestOutcome {
        debug_assert_eq!(self.datetime, batch.captured_at);
        match self.data.iter_mut().find(|record| record.site == batch.site) {
            Some(record) => {
                record.interactions.extend(batch.interactions);
                record.images.push(batch.image);
                IngestOutcome::ExtendedSite
            }
            None => {
                if !self.sites.contains(&batch.site) {
                    self.sites.push(batch.site.clone());
                }
                self.data.push(SiteRecord {
                    site: batch.site,
                    images: vec![batch.image],
                    interactions: batch.interactions,
                });
                IngestOutcome::AddedSite
            }
        }
    }

    pub fn site(&self, name: &str) -> Option<&SiteRecord> {
        self.data.iter().find(|record| record.site == name)
    }

    /// Interactions of the given kinds, in site order then arrival order.
    pub fn interactions_of<'a>(
        &'a self,
        kinds: &'a [InteractionKind],
    ) -> impl Iterator<Item = (&'a SiteRecord, &'a Interaction)> + 'a {
        self.data.iter().flat_map(move |record| {
            record
                .interactions
                .iter()
                .filter(move |interaction| kinds.contains(&interaction.kind))
                .map(move |interaction| (record, interaction))
        })
    }

    /// Screenshots of the selected sites (all sites when `sites` is empty).
    pub fn image_ids(&self, sites: &[String]) -> Vec<BlobId> {
        let mut ids = Vec::new();
        for record in &self.data {
            if !sites.is_empty() && !sites.contains(&record.site) {
                continue;
            }
            for id in &record.images {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        ids
    }

    pub fn summary(&self) -> SessionSummary {
        let mut interaction_counts = BTreeMap::new();
        for record in &self.data {
            for interaction in &record.interactions {
                *interaction_counts
                    .entry(interaction.kind.as_str().to_string())
                    .or_insert(0u64) += 1;
            }
        }
        SessionSummary {
            id: self.id,
            datetime: self.datetime.clone(),
            sites: self.sites.clone(),
            total_interactions: interaction_counts.values().sum(),
            interaction_counts,
        }
    }
}

/// Listing entry for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub id: SessionId,
    pub datetime: String,
    pub sites: Vec<String>,
    pub interaction_counts: BTreeMap<String, u64>,
    pub total_interactions: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColumnError {
    #[error("column '{column}' has {found} entries but 'type' has {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("unknown interaction type '{0}'")]
    UnknownKind(String),
}

/// Columnar interaction arrays as uploaded by the capture tool: entry `i` of
/// every column describes interaction `i`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InteractionColumns {
    #[serde(rename = "type", default)]
    pub kind: Vec<String>,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(rename = "class", default)]
    pub class_name: Vec<Option<String>>,
    #[serde(rename = "id", default)]
    pub element_id: Vec<Option<String>>,
    #[serde(default)]
    pub x: Vec<Option<f64>>,
    #[serde(default)]
    pub y: Vec<Option<f64>>,
    #[serde(default)]
    pub scroll: Vec<Option<f64>>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub value: Vec<Value>,
}

impl InteractionColumns {
    pub fn len(&self) -> usize {
        self.kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    fn check_lengths(&self) -> Result<(), ColumnError> {
        let expected = self.kind.len();
        let columns = [
            ("time", self.time.len()),
            ("class", self.class_name.len()),
            ("id", self.element_id.len()),
            ("x", self.x.len()),
            ("y", self.y.len()),
            ("scroll", self.scroll.len()),
            ("value", self.value.len()),
        ];
        for (column, found) in columns {
            if found != expected {
                return Err(ColumnError::LengthMismatch {
                    column,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Zips the columns into rows sharing one screenshot and page height.
    pub fn into_interactions(
        self,
        image: BlobId,
        height: Option<f64>,
    ) -> Result<Vec<Interaction>, ColumnError> {
        self.check_lengths()?;
        let kinds = self
            .kind
            .iter()
            .map(|raw| raw.parse::<InteractionKind>())
            .collect::<Result<Vec<_>, _>>()?;

        let rows = kinds
            .into_iter()
            .zip(self.time)
            .zip(self.class_name)
            .zip(self.element_id)
            .zip(self.x)
            .zip(self.y)
            .zip(self.scroll)
            .zip(self.value)
            .map(
                |(((((((kind, time), class_name), element_id), x), y), scroll), value)| {
                    Interaction {
                        kind,
                        time,
                        x,
                        y,
                        scroll,
                        height,
                        class_name,
                        element_id,
                        image,
                        value,
                    }
                },
            )
            .collect();
        Ok(rows)
    }
}
