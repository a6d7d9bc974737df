//! Path layout of a time-partitioned change feed
//!
//! Segments live under a root prefix as `<root>YYYY/MM/DD/HH/`, and chunk blobs
//! live underneath their segment prefix. A year prefix is `<root>YYYY/`. All
//! functions here are pure: they never touch storage.

use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};

/// Default segment root inside the change feed container
pub const DEFAULT_SEGMENT_ROOT: &str = "idx/segments/";

/// Year prefix that holds initialization metadata rather than events
pub const DEFAULT_INITIALIZATION_SEGMENT: &str = "1601";

/// Naming convention for years, segments and chunks under a root prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    root: String,
    initialization_segment: String,
}

impl PathLayout {
    /// Create a layout rooted at `root` (expected to end with `/`)
    pub fn new(root: impl Into<String>, initialization_segment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            initialization_segment: initialization_segment.into(),
        }
    }

    /// Root prefix all year prefixes are listed under
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether a listed year prefix is the initialization marker
    pub fn is_initialization_path(&self, path: &str) -> bool {
        self.relative(path)
            .map(|rest| rest.trim_end_matches('/') == self.initialization_segment)
            .unwrap_or(false)
    }

    /// Prefix for a given year, e.g. `idx/segments/2021/`
    pub fn year_path(&self, year: i32) -> String {
        format!("{}{:04}/", self.root, year)
    }

    /// Prefix for the hour bucket containing `ts`
    pub fn segment_path(&self, ts: Timestamp) -> String {
        let dt = ts.to_datetime();
        format!("{}{}/", self.root, dt.format("%Y/%m/%d/%H"))
    }

    /// Parse a year prefix into the start of that year
    pub fn parse_year_path(&self, path: &str) -> Result<Timestamp> {
        let rest = self.relative(path)?;
        let parts = components(rest);
        match parts.as_slice() {
            [year] => {
                let year = parse_field(path, year, 4)?;
                Timestamp::from_ymdh(year as i32, 1, 1, 0)
                    .ok_or_else(|| Error::MalformedPath(path.to_string()))
            }
            _ => Err(Error::MalformedPath(path.to_string())),
        }
    }

    /// Parse a segment prefix into its hour bucket time
    pub fn parse_segment_path(&self, path: &str) -> Result<Timestamp> {
        let rest = self.relative(path)?;
        match components(rest).as_slice() {
            [year, month, day, hour] => parse_hour(path, year, month, day, hour),
            _ => Err(Error::MalformedPath(path.to_string())),
        }
    }

    /// Map a blob name somewhere below a segment to that segment's prefix
    pub fn segment_of(&self, blob_name: &str) -> Result<String> {
        let rest = self.relative(blob_name)?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() < 5 || parts[4].is_empty() {
            return Err(Error::MalformedPath(blob_name.to_string()));
        }
        parse_hour(blob_name, parts[0], parts[1], parts[2], parts[3])?;
        Ok(format!("{}{}/", self.root, parts[..4].join("/")))
    }

    fn relative<'a>(&self, path: &'a str) -> Result<&'a str> {
        path.strip_prefix(self.root.as_str())
            .ok_or_else(|| Error::MalformedPath(path.to_string()))
    }
}

impl Default for PathLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_ROOT, DEFAULT_INITIALIZATION_SEGMENT)
    }
}

fn components(rest: &str) -> Vec<&str> {
    rest.strip_suffix('/').unwrap_or(rest).split('/').collect()
}

fn parse_hour(path: &str, year: &str, month: &str, day: &str, hour: &str) -> Result<Timestamp> {
    let year = parse_field(path, year, 4)?;
    let month = parse_field(path, month, 2)?;
    let day = parse_field(path, day, 2)?;
    let hour = parse_field(path, hour, 2)?;
    Timestamp::from_ymdh(year as i32, month, day, hour)
        .ok_or_else(|| Error::MalformedPath(path.to_string()))
}

fn parse_field(path: &str, field: &str, width: usize) -> Result<u32> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedPath(path.to_string()));
    }
    field
        .parse()
        .map_err(|_| Error::MalformedPath(path.to_string()))
}
