//! Chunk decoding: raw chunk bytes to ordered events

use crate::core::event::ChangeFeedEvent;
use crate::error::{Error, Result};
use bytes::Bytes;

/// Extension marking a zstd-compressed chunk
pub const ZSTD_EXTENSION: &str = ".zst";

/// Trait for turning the bytes of one chunk into events
///
/// A reader calls [`ChunkDecoder::load`] once per downloaded chunk and then
/// [`ChunkDecoder::decode`] once per page against the loaded bytes. Decoding
/// must be deterministic: the same bytes and offset always yield the same
/// events in the same order, so a cursor offset can be replayed.
pub trait ChunkDecoder: Send + Sync {
    /// Prepare downloaded bytes for repeated decoding (e.g. decompress them)
    fn load(&self, _chunk_path: &str, data: Bytes) -> Result<Bytes> {
        Ok(data)
    }

    /// Decode at most `max_events` events of `chunk_path`, skipping the first
    /// `start_offset`. Events past the limit are not parsed.
    fn decode(
        &self,
        chunk_path: &str,
        data: &[u8],
        start_offset: usize,
        max_events: usize,
    ) -> Result<Vec<ChangeFeedEvent>>;
}

/// Decoder for newline-delimited JSON chunks
///
/// Each non-blank line is one event. Chunks whose name ends in `.zst` are
/// decompressed on load.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesDecoder;

impl JsonLinesDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkDecoder for JsonLinesDecoder {
    fn load(&self, chunk_path: &str, data: Bytes) -> Result<Bytes> {
        if !chunk_path.ends_with(ZSTD_EXTENSION) {
            return Ok(data);
        }
        zstd::decode_all(&data[..])
            .map(Bytes::from)
            .map_err(|e| Error::Decode(format!("{chunk_path}: zstd decompression failed: {e}")))
    }

    fn decode(
        &self,
        chunk_path: &str,
        data: &[u8],
        start_offset: usize,
        max_events: usize,
    ) -> Result<Vec<ChangeFeedEvent>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::Decode(format!("{chunk_path}: {e}")))?;

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .skip(start_offset)
            .take(max_events)
            .map(|(line_no, line)| {
                serde_json::from_str::<ChangeFeedEvent>(line).map_err(|e| {
                    Error::Decode(format!("{chunk_path}, line {}: {e}", line_no + 1))
                })
            })
            .collect()
    }
}

/// Encode events as a JSON-lines chunk (the inverse of [`JsonLinesDecoder`])
pub fn encode_json_lines(events: &[ChangeFeedEvent]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.push(b'\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::ChangeFeedEventType;
    use crate::core::temporal::Timestamp;

    fn events(n: usize) -> Vec<ChangeFeedEvent> {
        (0..n)
            .map(|i| {
                ChangeFeedEvent::new(
                    format!("/containers/c/blobs/{i}"),
                    ChangeFeedEventType::BlobCreated,
                    Timestamp::from_secs(1_614_952_800 + i as i64 * 60).unwrap(),
                )
            })
            .collect()
    }

    fn decode_all(path: &str, data: &[u8], offset: usize) -> Result<Vec<ChangeFeedEvent>> {
        let decoder = JsonLinesDecoder::new();
        let loaded = decoder.load(path, Bytes::copy_from_slice(data))?;
        decoder.decode(path, &loaded, offset, usize::MAX)
    }

    #[test]
    fn test_decode_with_offset() {
        let evts = events(4);
        let mut chunk = encode_json_lines(&evts).unwrap();
        chunk.extend_from_slice(b"\n   \n");

        assert_eq!(decode_all("a.jsonl", &chunk, 0).unwrap(), evts);
        assert_eq!(decode_all("a.jsonl", &chunk, 3).unwrap(), evts[3..].to_vec());
        assert!(decode_all("a.jsonl", &chunk, 9).unwrap().is_empty());
    }

    #[test]
    fn test_decode_stops_at_limit() {
        let evts = events(3);
        let mut chunk = encode_json_lines(&evts).unwrap();
        chunk.extend_from_slice(b"{broken\n");

        let decoder = JsonLinesDecoder::new();
        assert_eq!(decoder.decode("a.jsonl", &chunk, 1, 2).unwrap(), evts[1..].to_vec());
        assert!(decoder.decode("a.jsonl", &chunk, 0, 0).unwrap().is_empty());
        assert!(matches!(
            decoder.decode("a.jsonl", &chunk, 1, 3),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_decode_zstd_chunk() {
        let evts = events(3);
        let chunk = encode_json_lines(&evts).unwrap();
        let compressed = zstd::encode_all(&chunk[..], 3).unwrap();

        assert_eq!(decode_all("a.jsonl.zst", &compressed, 1).unwrap(), evts[1..].to_vec());
        assert!(matches!(
            decode_all("b.jsonl.zst", b"not zstd", 0),
            Err(Error::Decode(_))
        ));

        // Uncompressed names pass through load untouched
        let raw = Bytes::from(chunk);
        assert_eq!(JsonLinesDecoder::new().load("a.jsonl", raw.clone()).unwrap(), raw);
    }

    #[test]
    fn test_decode_reports_bad_line() {
        let mut chunk = encode_json_lines(&events(1)).unwrap();
        chunk.extend_from_slice(b"{broken\n");
        let err = decode_all("c.jsonl", &chunk, 0).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
