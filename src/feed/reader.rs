//! ChangeFeed: flat, resumable page stream over years, segments and chunks
//!
//! The reader keeps two FIFO queues (years not yet opened, and segments of the
//! current year) plus the active segment. Nothing is listed up front beyond
//! the year prefixes; each year's segments are listed when the reader reaches
//! that year.
//!
//! Every mutating step is staged in locals and committed only once all of its
//! I/O has succeeded, so a failed or abandoned call leaves the reader exactly
//! where it was.

use crate::config::ChangeFeedConfig;
use crate::core::cursor::{container_hash, ChangeFeedCursor, SegmentCursor};
use crate::core::event::ChangeFeedEvent;
use crate::core::path::PathLayout;
use crate::core::temporal::{min_end, TimeWindow, Timestamp};
use crate::error::{Error, Result};
use crate::feed::segment::Segment;
use crate::storage::{BlobStore, ChunkDecoder, SegmentsMeta};
use futures::stream::{self, Stream};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A batch of events returned by one `get_page` call.
///
/// An empty page does not mean the feed has ended; check `has_next`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub events: Vec<ChangeFeedEvent>,
}

impl Page {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl IntoIterator for Page {
    type Item = ChangeFeedEvent;
    type IntoIter = std::vec::IntoIter<ChangeFeedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Read the last-consumable bound from the control blob
pub async fn fetch_last_consumable(store: &dyn BlobStore, meta_path: &str) -> Result<Timestamp> {
    let raw = store.download(meta_path).await?;
    Ok(SegmentsMeta::from_bytes(&raw)?.last_consumable)
}

/// Everything the reader needs that never changes after construction
struct FeedContext {
    store: Arc<dyn BlobStore>,
    decoder: Arc<dyn ChunkDecoder>,
    layout: PathLayout,
    meta_path: String,
    window: TimeWindow,
}

impl FeedContext {
    /// Year prefixes in chronological order, initialization marker excluded
    async fn list_years(&self) -> Result<Vec<String>> {
        let mut years = Vec::new();
        for prefix in self.store.list_prefixes(self.layout.root(), "/").await? {
            if self.layout.is_initialization_path(&prefix) {
                continue;
            }
            self.layout.parse_year_path(&prefix)?;
            years.push(prefix);
        }
        years.sort();
        Ok(years)
    }

    /// In-window segment prefixes of one year, in chronological order
    async fn segments_in_year(&self, year: &str) -> Result<VecDeque<String>> {
        let mut segments = BTreeSet::new();
        for blob in self.store.list_blobs(year).await? {
            let segment = self.layout.segment_of(&blob.name)?;
            if segments.contains(&segment) {
                continue;
            }
            let time = self.layout.parse_segment_path(&segment)?;
            if self.window.contains(time) {
                segments.insert(segment);
            }
        }
        Ok(segments.into_iter().collect())
    }

    async fn open_segment(&self, path: &str, cursor: Option<&SegmentCursor>) -> Result<Segment> {
        Segment::open(
            self.store.clone(),
            self.decoder.clone(),
            &self.layout,
            path,
            cursor,
        )
        .await
    }

    /// Pop the next in-window segment, refilling from later years as needed.
    ///
    /// Mutates only the queues passed in, so callers can stage the result.
    async fn next_segment(
        &self,
        segments: &mut VecDeque<String>,
        years: &mut VecDeque<String>,
        resume: Option<&SegmentCursor>,
    ) -> Result<Option<Segment>> {
        loop {
            if let Some(path) = segments.pop_front() {
                let cursor = resume.filter(|c| c.segment_path == path);
                if resume.is_some() && cursor.is_none() {
                    warn!(segment = %path, "Cursor segment no longer listed, starting at next segment");
                }
                return self.open_segment(&path, cursor).await.map(Some);
            }
            let Some(year) = years.pop_front() else {
                return Ok(None);
            };
            if let Some(end) = self.window.end() {
                if self.layout.parse_year_path(&year)? >= end {
                    years.clear();
                    return Ok(None);
                }
            }
            *segments = self.segments_in_year(&year).await?;
            info!(year = %year, segments = segments.len(), "Advanced to year");
        }
    }
}

/// Mutable reader state, present once initialization succeeded
struct FeedState {
    last_consumable: Timestamp,
    years: VecDeque<String>,
    segments: VecDeque<String>,
    /// `None` only when the feed had nothing in window at initialization
    current: Option<Segment>,
}

impl FeedState {
    fn end_bound(&self, window: &TimeWindow) -> Timestamp {
        min_end(self.last_consumable, window.end())
    }

    fn readable(&self, window: &TimeWindow, time: Timestamp) -> bool {
        segment_readable(self.last_consumable, window, time)
    }
}

/// A segment is readable up to and including the bound, and strictly before
/// the window end
fn segment_readable(bound: Timestamp, window: &TimeWindow, time: Timestamp) -> bool {
    time <= bound && window.contains(time)
}

/// Sequential, resumable reader over a change feed container
///
/// Not internally concurrent: one reader serves one consumer, and calls must
/// not overlap (enforced by `&mut self`).
pub struct ChangeFeed {
    ctx: FeedContext,
    resume_from: Option<SegmentCursor>,
    state: Option<FeedState>,
}

impl ChangeFeed {
    /// Create a reader over `window`
    pub fn new(
        store: Arc<dyn BlobStore>,
        decoder: Arc<dyn ChunkDecoder>,
        config: &ChangeFeedConfig,
        window: TimeWindow,
    ) -> Self {
        Self {
            ctx: FeedContext {
                store,
                decoder,
                layout: config.layout(),
                meta_path: config.meta_path.clone(),
                window,
            },
            resume_from: None,
            state: None,
        }
    }

    /// Create a reader that continues exactly where `cursor` was taken
    pub fn from_cursor(
        store: Arc<dyn BlobStore>,
        decoder: Arc<dyn ChunkDecoder>,
        config: &ChangeFeedConfig,
        cursor: ChangeFeedCursor,
    ) -> Result<Self> {
        cursor.validate_for(store.address())?;
        let layout = config.layout();
        let start = layout
            .parse_segment_path(&cursor.segment_cursor.segment_path)
            .map_err(|e| Error::InvalidCursor(e.to_string()))?;
        let window = TimeWindow::from_normalized(Some(start), cursor.end_time);

        let mut feed = Self::new(store, decoder, config, window);
        feed.resume_from = Some(cursor.segment_cursor);
        Ok(feed)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Discover years, the consumable bound and the first segment.
    ///
    /// Runs at most once; `get_page` calls it lazily.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let ctx = &self.ctx;

        if !ctx.store.exists().await? {
            return Err(Error::NotEnabled);
        }

        let last_consumable = fetch_last_consumable(ctx.store.as_ref(), &ctx.meta_path).await?;

        let mut years: VecDeque<String> = ctx.list_years().await?.into();
        if let Some(start) = ctx.window.start() {
            let start_year = start.floor_to_year();
            while let Some(year) = years.front() {
                if ctx.layout.parse_year_path(year)? >= start_year {
                    break;
                }
                years.pop_front();
            }
        }

        let mut segments = VecDeque::new();
        let current = ctx
            .next_segment(&mut segments, &mut years, self.resume_from.as_ref())
            .await?;

        info!(
            container = ctx.store.address(),
            last_consumable = %last_consumable,
            years_remaining = years.len(),
            first_segment = current.as_ref().map(|s| s.path()),
            "Change feed initialized"
        );

        self.state = Some(FeedState {
            last_consumable,
            years,
            segments,
            current,
        });
        Ok(())
    }

    /// Whether another `get_page` call is allowed
    pub fn has_next(&self) -> bool {
        let Some(state) = &self.state else {
            return true;
        };
        let Some(current) = &state.current else {
            return false;
        };
        if state.segments.is_empty() && state.years.is_empty() && !current.has_next() {
            return false;
        }
        state.readable(&self.ctx.window, current.date_time())
    }

    /// Return the next page of at most `page_size` events
    pub async fn get_page(&mut self, page_size: usize) -> Result<Page> {
        if !self.has_next() {
            return Err(Error::ExhaustedStream);
        }
        self.initialize().await?;

        let ctx = &self.ctx;
        let Some(state) = self.state.as_mut() else {
            return Err(Error::NotInitialized);
        };
        let end = state.end_bound(&ctx.window);
        let bound = state.last_consumable;
        let Some(current) = state.current.as_mut() else {
            return Ok(Page::empty());
        };

        if !segment_readable(bound, &ctx.window, current.date_time()) {
            debug!(segment = current.path(), end = %end, "Segment beyond read bound");
            return Ok(Page::empty());
        }

        let (events, progress) = current.read_page(page_size).await?;

        if current.has_next_at(progress.position()) {
            current.commit(progress);
        } else {
            let mut segments = state.segments.clone();
            let mut years = state.years.clone();
            let next = ctx.next_segment(&mut segments, &mut years, None).await?;

            current.commit(progress);
            state.segments = segments;
            state.years = years;
            if let Some(next) = next {
                // The finished segment's terminal position is kept until here so
                // a cursor taken at the end of the feed still points past it.
                state.current = Some(next);
            }
        }

        Ok(Page { events })
    }

    /// Bound fetched at initialization; `None` before that
    pub fn last_consumable(&self) -> Option<Timestamp> {
        self.state.as_ref().map(|s| s.last_consumable)
    }

    /// Snapshot the current position as a resumable cursor
    pub fn cursor(&self) -> Result<ChangeFeedCursor> {
        let segment_cursor = match &self.state {
            Some(state) => state.current.as_ref().map(Segment::cursor),
            None => self.resume_from.clone(),
        }
        .ok_or(Error::NotInitialized)?;

        Ok(ChangeFeedCursor::new(
            container_hash(self.ctx.store.address()),
            self.ctx.window.end(),
            segment_cursor,
        ))
    }

    /// Normalized window this reader covers
    pub fn window(&self) -> TimeWindow {
        self.ctx.window
    }

    /// Consume the reader as a stream of pages, ending when `has_next` is false
    pub fn into_stream(self, page_size: usize) -> impl Stream<Item = Result<Page>> + Send {
        stream::try_unfold(self, move |mut feed| async move {
            if !feed.has_next() {
                return Ok(None);
            }
            let page = feed.get_page(page_size).await?;
            Ok(Some((page, feed)))
        })
    }
}
