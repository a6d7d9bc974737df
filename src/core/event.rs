//! Change feed event types

use crate::core::temporal::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId {
    /// UUID of the event
    pub id: Uuid,
}

impl EventId {
    /// Generate a new event ID
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self { id: uuid }
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Kind of mutation recorded by an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeFeedEventType {
    BlobCreated,
    BlobDeleted,
    BlobPropertiesUpdated,
    BlobSnapshotCreated,
    /// Feed-internal bookkeeping record
    Control,
    /// Any type this reader does not know about; kept verbatim
    Unknown(String),
}

impl ChangeFeedEventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BlobCreated => "BlobCreated",
            Self::BlobDeleted => "BlobDeleted",
            Self::BlobPropertiesUpdated => "BlobPropertiesUpdated",
            Self::BlobSnapshotCreated => "BlobSnapshotCreated",
            Self::Control => "Control",
            Self::Unknown(other) => other,
        }
    }
}

impl From<String> for ChangeFeedEventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "BlobCreated" => Self::BlobCreated,
            "BlobDeleted" => Self::BlobDeleted,
            "BlobPropertiesUpdated" => Self::BlobPropertiesUpdated,
            "BlobSnapshotCreated" => Self::BlobSnapshotCreated,
            "Control" => Self::Control,
            _ => Self::Unknown(s),
        }
    }
}

impl From<ChangeFeedEventType> for String {
    fn from(t: ChangeFeedEventType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ChangeFeedEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of the blob operation behind an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeFeedEventData {
    /// Storage API that caused the change, e.g. `PutBlob`
    pub api: String,
    pub client_request_id: Option<String>,
    pub request_id: Option<String>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub blob_type: Option<String>,
    pub url: Option<String>,
    /// Opaque per-blob ordering token
    pub sequencer: Option<String>,
    pub previous_version_id: Option<String>,
    pub version_id: Option<String>,
}

/// A single decoded change feed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedEvent {
    pub id: EventId,
    /// Resource path of the storage account
    #[serde(default)]
    pub topic: String,
    /// Path of the blob the event refers to
    pub subject: String,
    pub event_type: ChangeFeedEventType,
    /// Time the change was recorded in the feed
    pub event_time: Timestamp,
    #[serde(default)]
    pub data_version: i64,
    #[serde(default)]
    pub metadata_version: String,
    #[serde(default)]
    pub data: ChangeFeedEventData,
}

impl ChangeFeedEvent {
    /// Create an event with empty data
    pub fn new(subject: impl Into<String>, event_type: ChangeFeedEventType, event_time: Timestamp) -> Self {
        Self {
            id: EventId::new(),
            topic: String::new(),
            subject: subject.into(),
            event_type,
            event_time,
            data_version: 0,
            metadata_version: "1".to_string(),
            data: ChangeFeedEventData::default(),
        }
    }

    /// Set the storage API that produced the change
    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.data.api = api.into();
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Get event ID
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Get emission time
    pub fn event_time(&self) -> Timestamp {
        self.event_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let ts: Timestamp = "2021-03-05T14:10:00Z".parse().unwrap();
        let event = ChangeFeedEvent::new(
            "/blobServices/default/containers/photos/blobs/cat.png",
            ChangeFeedEventType::BlobCreated,
            ts,
        )
        .with_api("PutBlob");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "BlobCreated");
        assert_eq!(json["data"]["api"], "PutBlob");
        assert!(json["eventTime"].as_str().unwrap().starts_with("2021-03-05T14:10:00"));

        let back: ChangeFeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unknown_event_type_is_preserved() {
        let json = serde_json::json!({
            "id": "0b0e8a9e-8c7a-4a4e-9d44-0d7c7b0a1f22",
            "subject": "/containers/a/blobs/b",
            "eventType": "BlobTierChanged",
            "eventTime": "2021-03-05T14:10:00Z",
        });
        let event: ChangeFeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(
            event.event_type,
            ChangeFeedEventType::Unknown("BlobTierChanged".to_string())
        );
        assert_eq!(event.event_type.to_string(), "BlobTierChanged");
        assert_eq!(event.data, ChangeFeedEventData::default());
    }

    #[test]
    fn test_id_and_topic_survive_roundtrip() {
        let uuid = Uuid::parse_str("0b0e8a9e-8c7a-4a4e-9d44-0d7c7b0a1f22").unwrap();
        let mut event = ChangeFeedEvent::new(
            "/containers/a/blobs/b",
            ChangeFeedEventType::BlobDeleted,
            "2021-03-05T14:10:00Z".parse().unwrap(),
        )
        .with_topic("/subscriptions/s/storageAccounts/acct");
        event.id = EventId::from_uuid(uuid);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], "0b0e8a9e-8c7a-4a4e-9d44-0d7c7b0a1f22");
        assert_eq!(json["topic"], "/subscriptions/s/storageAccounts/acct");

        let back: ChangeFeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), EventId::from_uuid(uuid));
        assert_eq!(back.id().to_string(), uuid.to_string());
        assert_eq!(back.topic, event.topic);
    }
}
