//! Server-Sent Events (SSE) processing for streamed completions.
//!
//! The chat-completions endpoint answers a streaming request with a
//! `text/event-stream` body: one `data: <json>` line per completion chunk,
//! terminated by the `data: [DONE]` sentinel. This module turns the raw
//! byte stream into a stream of parsed [`StreamEvent`]s, handling line
//! buffering across chunk boundaries and error conditions.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_LINES, STREAM_PARSE_ERRORS};
use crate::types::CompletionChunk;
use crate::{Error, Result};

/// The prefix that marks a data line on the event stream.
const DATA_PREFIX: &str = "data: ";

/// The payload that signals the end of the event stream.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded unit of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A completion chunk carrying a role announcement and/or content.
    Chunk(CompletionChunk),

    /// The end-of-stream sentinel; no further lines should be read.
    Done,
}

/// Process a stream of bytes into a stream of completion events.
///
/// Lines without the `data: ` prefix (including blank keep-alives) are
/// skipped. A payload that fails to parse as a completion chunk yields an
/// `Err` item; the caller is expected to stop reading at that point.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::transport(format!("error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Buffer raw bytes: a chunk boundary may fall inside a multi-byte
    // UTF-8 sequence, so decoding happens per complete line.
    let buffer = BytesMut::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // Drain complete lines already buffered
                while let Some(line) = extract_line(&mut buffer) {
                    if let Some(event) = classify_line(&line) {
                        return Some((event, (stream, buffer)));
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream; a final line may lack its newline
                        if !buffer.is_empty() {
                            let line = buffer.split().freeze();
                            if let Some(event) = classify_line(&line) {
                                return Some((event, (stream, buffer)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract one complete line from the buffer, without its newline.
fn extract_line(buffer: &mut BytesMut) -> Option<Bytes> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut line = buffer.split_to(pos + 1);
    line.truncate(pos);
    Some(line.freeze())
}

/// Classify a single line of the event stream.
///
/// Returns `None` for lines the protocol says to ignore: keep-alive blanks
/// and anything not prefixed with the data marker.
fn classify_line(line: &[u8]) -> Option<Result<StreamEvent>> {
    STREAM_LINES.click();
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            STREAM_PARSE_ERRORS.click();
            return Some(Err(Error::stream_parse(
                format!("invalid UTF-8 in stream line: {e}"),
                Some(Box::new(e)),
            )));
        }
    };
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();

    if payload == DONE_SENTINEL {
        return Some(Ok(StreamEvent::Done));
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => Some(Ok(StreamEvent::Chunk(chunk))),
        Err(e) => {
            STREAM_PARSE_ERRORS.click();
            Some(Err(Error::stream_parse(
                format!("failed to parse completion chunk: {e}"),
                Some(Box::new(e)),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(data: &'static [u8]) -> Vec<Result<StreamEvent>> {
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));
        process_sse(stream).collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn parse_content_chunks_and_sentinel() {
        let events = collect(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
              data: [DONE]\n",
        )
        .await;

        assert_eq!(events.len(), 3);
        let contents: Vec<_> = events[..2]
            .iter()
            .map(|event| match event {
                Ok(StreamEvent::Chunk(chunk)) => chunk
                    .first_payload()
                    .and_then(|payload| payload.content.clone())
                    .unwrap(),
                other => panic!("expected chunk, got {other:?}"),
            })
            .collect();
        assert_eq!(contents, vec!["Hel", "lo"]);
        assert!(matches!(events[2], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn keep_alive_and_unprefixed_lines_skipped() {
        let events = collect(
            b"\n\
              : keep-alive comment\n\
              event: message\n\
              data: [DONE]\n",
        )
        .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let events = collect(b"data: {not json}\n").await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(e) => assert!(e.is_stream_parse()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn line_split_across_chunks() {
        let chunk1: &[u8] = b"data: {\"choices\":[{\"delta\":";
        let chunk2: &[u8] = b"{\"content\":\"Hi\"}}]}\ndata: [DONE]\n";
        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(chunk1)),
            Ok(Bytes::from(chunk2)),
        ]));

        let events = process_sse(stream).collect::<Vec<_>>().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            Ok(StreamEvent::Chunk(chunk)) => {
                assert_eq!(
                    chunk.first_payload().unwrap().content.as_deref(),
                    Some("Hi")
                );
            }
            other => panic!("expected chunk, got {other:?}"),
        }
        assert!(matches!(events[1], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn multi_byte_character_split_across_chunks() {
        let payload: &'static str =
            "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\ndata: [DONE]\n";
        let bytes = payload.as_bytes();
        // Split one byte into the two-byte encoding of 'é'
        let split = payload.find('\u{e9}').unwrap() + 1;
        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(&bytes[..split])),
            Ok(Bytes::from(&bytes[split..])),
        ]));

        let events = process_sse(stream).collect::<Vec<_>>().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            Ok(StreamEvent::Chunk(chunk)) => {
                assert_eq!(
                    chunk.first_payload().unwrap().content.as_deref(),
                    Some("caf\u{e9}")
                );
            }
            other => panic!("expected chunk, got {other:?}"),
        }
        assert!(matches!(events[1], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_an_error() {
        let events = collect(b"data: \xff\xfe\n").await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(e) => assert!(e.is_stream_parse()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let events = collect(b"data: [DONE]").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn crlf_lines_are_trimmed() {
        let events = collect(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n").await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Ok(StreamEvent::Chunk(chunk)) => {
                assert_eq!(chunk.first_payload().unwrap().content.as_deref(), Some("x"));
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }
}
