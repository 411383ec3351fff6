//! Upload format of the capture tool.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::telemetry::InteractionColumns;

/// Batch metadata. Every field is optional on the wire so that a missing
/// user id can be answered with 403 before anything else is checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReceiveMetadata {
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
    /// Capture timestamp; identifies the session document.
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    /// Screenshot as a base64 string, optionally prefixed with a `data:` header.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReceivePayload {
    #[serde(default)]
    pub metadata: ReceiveMetadata,
    #[serde(default)]
    pub data: InteractionColumns,
}

/// Acknowledges a stored batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiveReceipt {
    pub session_id: crate::types::SessionId,
    pub outcome: super::telemetry::IngestOutcome,
    pub interactions: usize,
}
