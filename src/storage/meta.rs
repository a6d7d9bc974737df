//! Control blob describing the consumable extent of the feed

use crate::core::temporal::Timestamp;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default location of the control blob inside the change feed container
pub const DEFAULT_META_PATH: &str = "meta/segments.json";

/// Contents of `meta/segments.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentsMeta {
    #[serde(default)]
    pub version: i64,
    /// Segments at or before this time will not receive further writes
    pub last_consumable: Timestamp,
}

impl SegmentsMeta {
    pub fn new(last_consumable: Timestamp) -> Self {
        Self {
            version: 0,
            last_consumable,
        }
    }

    /// Parse the control blob; unknown fields are ignored
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_parse_control_blob() {
        let raw = br#"{
            "version": 0,
            "lastConsumable": "2021-03-05T15:00:00.000Z",
            "storageDiagnostics": {"version": 0, "lastModifiedTime": "2021-03-05T15:02:11.000Z"}
        }"#;
        let meta = SegmentsMeta::from_bytes(raw).unwrap();
        assert_eq!(meta.last_consumable, "2021-03-05T15:00:00Z".parse::<Timestamp>().unwrap());
    }

    #[test]
    fn test_missing_bound_is_an_error() {
        assert!(matches!(
            SegmentsMeta::from_bytes(br#"{"version": 0}"#),
            Err(Error::Serialization(_))
        ));
    }
}
