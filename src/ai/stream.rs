//! Server-sent-event consumption for streamed predictions.
//!
//! Chunks are decoded and handed to the caller in arrival order. The loop
//! has three states: awaiting the next chunk, rendering it, and terminal
//! (stream exhausted or context cancelled).

use crate::{Error, Result};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// How a stream ended. Cancellation is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Exhausted,
    Cancelled,
}

/// Incremental decoder for `data:` lines carrying one JSON document each.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Result<Vec<Value>> {
        let line = std::mem::take(&mut self.buffer);
        Ok(parse_line(&line)?.into_iter().collect())
    }
}

fn parse_line(line: &[u8]) -> Result<Option<Value>> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    serde_json::from_str(data)
        .map(Some)
        .map_err(|e| Error::Remote(format!("malformed stream chunk: {}", e)))
}

/// Drive `chunks` until exhausted or `ctx` is cancelled, calling `on_event`
/// for every decoded JSON event.
pub async fn consume<S, B, E, F>(
    ctx: &CancellationToken,
    mut chunks: S,
    mut on_event: F,
) -> Result<StreamEnd>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Error>,
    F: FnMut(Value) -> Result<()>,
{
    let mut decoder = SseDecoder::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::debug!("Stream cancelled; dropping remaining chunks");
                return Ok(StreamEnd::Cancelled);
            }
            next = chunks.next() => next,
        };

        match next {
            Some(chunk) => {
                let chunk = chunk.map_err(Into::into)?;
                for event in decoder.push(chunk.as_ref())? {
                    on_event(event)?;
                }
            }
            None => {
                for event in decoder.finish()? {
                    on_event(event)?;
                }
                return Ok(StreamEnd::Exhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").unwrap().is_empty());
        let events = decoder.push(b"1}\r\n\r\ndata: {\"a\":2}\n").unwrap();
        assert_eq!(events, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_done() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\nevent: message\ndata: [DONE]\n").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_decoder_flushes_trailing_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"last\":true}").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec![json!({"last": true})]);
    }

    #[test]
    fn test_malformed_chunk_is_remote_error() {
        let mut decoder = SseDecoder::default();
        assert!(matches!(decoder.push(b"data: {oops\n"), Err(Error::Remote(_))));
    }

    #[tokio::test]
    async fn test_consume_in_arrival_order() {
        let chunks = futures::stream::iter(vec![
            Ok::<_, Error>(b"data: {\"n\":1}\n\n".to_vec()),
            Ok(b"data: {\"n\":2}\n\n".to_vec()),
        ]);

        let mut seen = Vec::new();
        let end = consume(&CancellationToken::new(), chunks, |v| {
            seen.push(v["n"].as_i64().unwrap());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(end, StreamEnd::Exhausted);
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_consume_stops_on_cancel() {
        let ctx = CancellationToken::new();
        ctx.cancel();

        let chunks = futures::stream::iter(vec![Ok::<_, Error>(b"data: {\"n\":1}\n".to_vec())]);
        let mut calls = 0;
        let end = consume(&ctx, chunks, |_| {
            calls += 1;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(end, StreamEnd::Cancelled);
        assert_eq!(calls, 0);
    }
}
