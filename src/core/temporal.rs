//! Temporal data types and hour-granularity time handling

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const SECS_PER_HOUR: i64 = 3_600;

/// Timestamp representing a point in time (UTC)
///
/// Serialized as an RFC 3339 string so it can appear in cursors and control
/// blobs unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct Timestamp {
    inner: DateTime<Utc>,
}

impl Timestamp {
    /// Create a timestamp from seconds since Unix epoch.
    ///
    /// Returns `None` outside the range chrono can represent.
    pub fn from_secs(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self::from)
    }

    /// Build a timestamp at the start of the given UTC hour.
    ///
    /// Returns `None` for calendar values that do not exist.
    pub fn from_ymdh(year: i32, month: u32, day: u32, hour: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .map(Self::from)
    }

    /// Get seconds since Unix epoch
    pub fn as_secs(&self) -> i64 {
        self.inner.timestamp()
    }

    /// Calendar year of this timestamp
    pub fn year(&self) -> i32 {
        self.inner.year()
    }

    /// Convert to chrono DateTime
    pub fn to_datetime(&self) -> DateTime<Utc> {
        self.inner
    }

    /// Start of the hour containing this timestamp
    pub fn floor_to_hour(&self) -> Self {
        let secs = self.as_secs();
        // chrono's minimum is itself on an hour boundary, so flooring stays in range
        Self::from_secs(secs - secs.rem_euclid(SECS_PER_HOUR)).unwrap_or(*self)
    }

    /// Start of the hour after the one containing this timestamp.
    ///
    /// A timestamp already on an hour boundary still moves forward one hour.
    /// Returns `None` when that hour is past the representable range.
    pub fn ceil_to_hour(&self) -> Option<Self> {
        self.floor_to_hour().checked_add_hours(1)
    }

    /// Start of the calendar year containing this timestamp
    pub fn floor_to_year(&self) -> Self {
        Self::from_ymdh(self.year(), 1, 1, 0).unwrap_or(*self)
    }

    /// Add a number of whole hours, `None` on overflow
    pub fn checked_add_hours(&self, hours: i64) -> Option<Self> {
        let delta = TimeDelta::try_hours(hours)?;
        self.inner.checked_add_signed(delta).map(Self::from)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from(dt.with_timezone(&Utc)))
            .map_err(|e| Error::Serialization(format!("invalid timestamp {s:?}: {e}")))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self { inner: dt }
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.inner
    }
}

/// Effective upper read bound: the caller's end if present and earlier, else the bound
pub fn min_end(bound: Timestamp, end: Option<Timestamp>) -> Timestamp {
    match end {
        Some(end) if end < bound => end,
        _ => bound,
    }
}

/// Optional time window over segment bucket times, already hour-normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindow {
    /// Create a window, flooring `start` and ceiling `end` to hour boundaries.
    ///
    /// An `end` whose next hour cannot be represented leaves the window open.
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self {
            start: start.map(|t| t.floor_to_hour()),
            end: end.and_then(|t| t.ceil_to_hour()),
        }
    }

    /// A window with no lower or upper limit
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a window from bounds that are already normalized (e.g. from a cursor)
    pub(crate) fn from_normalized(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }

    /// Normalized start, if any
    pub fn start(&self) -> Option<Timestamp> {
        self.start
    }

    /// Normalized end, if any
    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    /// Check whether a segment bucket time falls inside `[start, end)`.
    ///
    /// The end is the start of the hour after the caller's end time, so the
    /// bucket beginning there holds only later events and is left out.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start.map(|s| ts >= s).unwrap_or(true) && self.end.map(|e| ts < e).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_floor_and_ceil() {
        let t = ts("2021-03-05T14:30:12.250Z");
        assert_eq!(t.floor_to_hour(), ts("2021-03-05T14:00:00Z"));
        assert_eq!(t.ceil_to_hour(), Some(ts("2021-03-05T15:00:00Z")));

        // Boundaries still round outward on the upper side
        let on_hour = ts("2021-03-05T14:00:00Z");
        assert_eq!(on_hour.floor_to_hour(), on_hour);
        assert_eq!(on_hour.ceil_to_hour(), Some(ts("2021-03-05T15:00:00Z")));

        assert_eq!(t.floor_to_year(), ts("2021-01-01T00:00:00Z"));
    }

    #[test]
    fn test_min_end() {
        let bound = ts("2021-03-05T15:00:00Z");
        assert_eq!(min_end(bound, None), bound);
        assert_eq!(min_end(bound, Some(ts("2021-03-05T14:00:00Z"))), ts("2021-03-05T14:00:00Z"));
        assert_eq!(min_end(bound, Some(ts("2022-01-01T00:00:00Z"))), bound);
    }

    #[test]
    fn test_time_window() {
        let window = TimeWindow::new(
            Some(ts("2021-03-05T13:20:00Z")),
            Some(ts("2021-03-05T14:30:00Z")),
        );
        assert_eq!(window.start(), Some(ts("2021-03-05T13:00:00Z")));
        assert_eq!(window.end(), Some(ts("2021-03-05T15:00:00Z")));
        assert!(window.contains(ts("2021-03-05T13:00:00Z")));
        assert!(window.contains(ts("2021-03-05T14:00:00Z")));
        assert!(!window.contains(ts("2021-03-05T15:00:00Z")));
        assert!(!window.contains(ts("2021-03-05T12:00:00Z")));
        assert!(!window.contains(ts("2021-03-05T16:00:00Z")));
        assert!(TimeWindow::unbounded().contains(ts("1999-01-01T00:00:00Z")));
    }

    #[test]
    fn test_out_of_range_is_reported() {
        assert_eq!(Timestamp::from_secs(i64::MAX), None);
        assert_eq!(Timestamp::from_secs(0), Some(ts("1970-01-01T00:00:00Z")));

        let last = Timestamp::from(DateTime::<Utc>::MAX_UTC);
        assert_eq!(last.ceil_to_hour(), None);
        assert_eq!(last.checked_add_hours(1), None);
        assert_eq!(ts("2021-03-05T14:00:00Z").checked_add_hours(i64::MAX), None);
        assert_eq!(
            ts("2021-03-05T14:00:00Z").checked_add_hours(-2),
            Some(ts("2021-03-05T12:00:00Z"))
        );

        let open = TimeWindow::new(None, Some(last));
        assert_eq!(open.end(), None);

        let first = Timestamp::from(DateTime::<Utc>::MIN_UTC);
        assert_eq!(first.floor_to_hour(), first);
    }

    #[test]
    fn test_serde_as_rfc3339() {
        let t = ts("2021-03-05T14:00:00Z");
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("2021-03-05T14:00:00"));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    proptest! {
        #[test]
        fn prop_floor_ceil_bracket(secs in 0i64..4_102_444_800) {
            let t = Timestamp::from_secs(secs).unwrap();
            let floor = t.floor_to_hour();
            let ceil = t.ceil_to_hour().unwrap();
            prop_assert!(floor <= t);
            prop_assert!(t < ceil);
            prop_assert_eq!(floor.as_secs() % 3600, 0);
            prop_assert_eq!(ceil.as_secs() - floor.as_secs(), 3600);
        }
    }
}
