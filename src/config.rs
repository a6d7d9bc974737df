//! Reader configuration

use crate::core::path::{PathLayout, DEFAULT_INITIALIZATION_SEGMENT, DEFAULT_SEGMENT_ROOT};
use crate::error::{Error, Result};
use crate::storage::meta::DEFAULT_META_PATH;
use serde::Deserialize;
use std::path::Path;

/// Name of the container that holds the change feed
pub const DEFAULT_CONTAINER_NAME: &str = "$blobchangefeed";

/// Default number of events per page
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Where the feed lives inside its container and how it is paged
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangeFeedConfig {
    pub container_name: String,
    /// Prefix under which year directories are listed; must end with `/`
    pub segment_root: String,
    /// Control blob holding the last-consumable bound
    pub meta_path: String,
    /// Year directory reserved for initialization records
    pub initialization_segment: String,
    pub page_size: usize,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            segment_root: DEFAULT_SEGMENT_ROOT.to_string(),
            meta_path: DEFAULT_META_PATH.to_string(),
            initialization_segment: DEFAULT_INITIALIZATION_SEGMENT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ChangeFeedConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&raw)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container_name.is_empty() {
            return Err(Error::Configuration("container_name must not be empty".into()));
        }
        if self.segment_root.is_empty() || !self.segment_root.ends_with('/') {
            return Err(Error::Configuration(format!(
                "segment_root must end with '/': {:?}",
                self.segment_root
            )));
        }
        if self.meta_path.is_empty() || self.meta_path.ends_with('/') {
            return Err(Error::Configuration(format!(
                "meta_path must name a blob: {:?}",
                self.meta_path
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Configuration("page_size must be positive".into()));
        }
        Ok(())
    }

    /// Path layout described by this configuration
    pub fn layout(&self) -> PathLayout {
        PathLayout::new(&self.segment_root, &self.initialization_segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = ChangeFeedConfig::default();
        config.validate().unwrap();
        assert_eq!(config.layout(), PathLayout::default());
    }

    #[test]
    fn test_validation() {
        let bad_root = ChangeFeedConfig {
            segment_root: "idx/segments".into(),
            ..Default::default()
        };
        assert!(matches!(bad_root.validate(), Err(Error::Configuration(_))));

        let zero_page = ChangeFeedConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(zero_page.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"page_size": 10, "segment_root": "feed/"}}"#).unwrap();
        let config = ChangeFeedConfig::from_file(file.path()).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.segment_root, "feed/");
        assert_eq!(config.meta_path, DEFAULT_META_PATH);

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"pagesize": 10}}"#).unwrap();
        assert!(matches!(
            ChangeFeedConfig::from_file(file.path()),
            Err(Error::Configuration(_))
        ));
    }
}
