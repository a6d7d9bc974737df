//! Segment: one hour bucket of the change feed
//!
//! A segment flattens its sorted list of chunk blobs into a page stream. Its
//! position is `(chunk index, events consumed from that chunk)`, which is what
//! ends up in a cursor.

use crate::core::cursor::SegmentCursor;
use crate::core::event::ChangeFeedEvent;
use crate::core::path::PathLayout;
use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};
use crate::storage::{BlobStore, ChunkDecoder};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Read position inside a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub chunk_index: usize,
    pub event_offset: usize,
}

/// Chunk bytes kept between pages so a chunk is downloaded once
#[derive(Debug, Clone)]
struct LoadedChunk {
    index: usize,
    data: Bytes,
}

/// Outcome of a page read, applied with [`Segment::commit`]
#[derive(Debug, Clone)]
pub struct Progress {
    position: Position,
    loaded: Option<LoadedChunk>,
}

impl Progress {
    /// Position just after the events that were read
    pub fn position(&self) -> Position {
        self.position
    }
}

/// Reader over the chunks of a single hour bucket
pub struct Segment {
    store: Arc<dyn BlobStore>,
    decoder: Arc<dyn ChunkDecoder>,
    path: String,
    date_time: Timestamp,
    chunks: Vec<String>,
    position: Position,
    loaded: Option<LoadedChunk>,
}

impl Segment {
    /// Open the segment at `path`, listing its chunks.
    ///
    /// With a cursor, the segment resumes exactly where the cursor points.
    pub async fn open(
        store: Arc<dyn BlobStore>,
        decoder: Arc<dyn ChunkDecoder>,
        layout: &PathLayout,
        path: &str,
        cursor: Option<&SegmentCursor>,
    ) -> Result<Self> {
        let date_time = layout.parse_segment_path(path)?;

        let mut chunks: Vec<String> = store
            .list_blobs(path)
            .await?
            .into_iter()
            .map(|item| item.name)
            .collect();
        chunks.sort();

        let position = match cursor {
            Some(cursor) => resume_position(path, &chunks, cursor)?,
            None => Position::default(),
        };

        debug!(
            segment = path,
            chunks = chunks.len(),
            chunk_index = position.chunk_index,
            event_offset = position.event_offset,
            "Opened segment"
        );

        Ok(Self {
            store,
            decoder,
            path: path.to_string(),
            date_time,
            chunks,
            position,
            loaded: None,
        })
    }

    /// Read up to `page_size` events and advance past them
    pub async fn get_page(&mut self, page_size: usize) -> Result<Vec<ChangeFeedEvent>> {
        let (events, progress) = self.read_page(page_size).await?;
        self.commit(progress);
        Ok(events)
    }

    /// Read up to `page_size` events without moving the segment.
    ///
    /// Returns the events and the progress just after them; nothing changes
    /// until that progress is handed to [`Segment::commit`].
    pub async fn read_page(&self, page_size: usize) -> Result<(Vec<ChangeFeedEvent>, Progress)> {
        let mut position = self.position;
        let mut loaded = self.loaded.clone();
        let mut events = Vec::with_capacity(page_size.min(1024));

        while events.len() < page_size && position.chunk_index < self.chunks.len() {
            let chunk = &self.chunks[position.chunk_index];
            let cached = loaded
                .as_ref()
                .filter(|c| c.index == position.chunk_index)
                .map(|c| c.data.clone());
            let data = match cached {
                Some(data) => data,
                None => {
                    let raw = self.store.download(chunk).await?;
                    let data = self.decoder.load(chunk, raw)?;
                    debug!(chunk = chunk.as_str(), bytes = data.len(), "Loaded chunk");
                    loaded = Some(LoadedChunk {
                        index: position.chunk_index,
                        data: data.clone(),
                    });
                    data
                }
            };

            // One event past the page tells whether the chunk is drained
            let wanted = page_size - events.len();
            let decoded = self.decoder.decode(
                chunk,
                &data,
                position.event_offset,
                wanted.saturating_add(1),
            )?;
            if decoded.len() > wanted {
                events.extend(decoded.into_iter().take(wanted));
                position.event_offset += wanted;
            } else {
                events.extend(decoded);
                position.chunk_index += 1;
                position.event_offset = 0;
                loaded = None;
            }
        }

        Ok((events, Progress { position, loaded }))
    }

    /// Apply progress previously returned by [`Segment::read_page`]
    pub fn commit(&mut self, progress: Progress) {
        self.position = progress.position;
        self.loaded = progress.loaded;
    }

    /// Whether unread chunks remain
    pub fn has_next(&self) -> bool {
        self.has_next_at(self.position)
    }

    /// Whether unread chunks would remain at `position`
    pub fn has_next_at(&self, position: Position) -> bool {
        position.chunk_index < self.chunks.len()
    }

    /// Hour bucket of this segment
    pub fn date_time(&self) -> Timestamp {
        self.date_time
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sorted chunk blob names
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Snapshot of the current position
    pub fn cursor(&self) -> SegmentCursor {
        SegmentCursor {
            segment_path: self.path.clone(),
            chunk_index: self.position.chunk_index,
            event_offset: self.position.event_offset,
        }
    }
}

fn resume_position(path: &str, chunks: &[String], cursor: &SegmentCursor) -> Result<Position> {
    if cursor.segment_path != path {
        return Err(Error::InvalidCursor(format!(
            "cursor is for segment {}, not {}",
            cursor.segment_path, path
        )));
    }
    let past_end = cursor.chunk_index == chunks.len() && cursor.event_offset == 0;
    if cursor.chunk_index >= chunks.len() && !past_end {
        return Err(Error::InvalidCursor(format!(
            "segment {} has {} chunks, cursor points at chunk {} offset {}",
            path,
            chunks.len(),
            cursor.chunk_index,
            cursor.event_offset
        )));
    }
    Ok(Position {
        chunk_index: cursor.chunk_index,
        event_offset: cursor.event_offset,
    })
}
