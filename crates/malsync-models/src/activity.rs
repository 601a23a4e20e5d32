use serde::{Deserialize, Serialize};
use crate::source_ref::MetadataType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// An episode or movie was watched to the end
    Progress,
    /// The user rated an item
    Rating,
}

/// One inbound activity event reported by the media server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Identity of the originating event, used as the status record key
    pub event_id: String,
    pub kind: ActivityKind,
    /// Metadata GUID as produced by the Plex agent
    pub guid: String,
    pub metadata_type: MetadataType,
    /// Show (or movie) title used for mapping lookups
    pub title: String,
    /// Plex user rating (0-10), only for rating activities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Activity {
    pub fn progress(event_id: impl Into<String>, guid: impl Into<String>, metadata_type: MetadataType, title: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            kind: ActivityKind::Progress,
            guid: guid.into(),
            metadata_type,
            title: title.into(),
            rating: None,
        }
    }

    pub fn rating(event_id: impl Into<String>, guid: impl Into<String>, metadata_type: MetadataType, title: impl Into<String>, rating: f32) -> Self {
        Self {
            event_id: event_id.into(),
            kind: ActivityKind::Rating,
            guid: guid.into(),
            metadata_type,
            title: title.into(),
            rating: Some(rating),
        }
    }
}
