use bytes::BytesMut;
use claimdesk_core::BusMessage;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::live::MessageBus;

// ─── SseDecoder ───────────────────────────────────────────────────────────

/// One server-sent event: the `event:` name and the joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder.
///
/// Bytes are fed as they arrive; complete frames (terminated by a blank
/// line) are returned and the remainder stays buffered.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(end) = find_frame_end(&self.buf) {
            let raw = self.buf.split_to(end.0);
            let _ = self.buf.split_to(end.1);
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Returns (frame length, separator length) for the first complete frame.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}

// ─── EventFeed ────────────────────────────────────────────────────────────

/// An open `GET /events` response.
pub struct EventFeed {
    response: reqwest::Response,
}

impl EventFeed {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self { response }
    }

    /// Publish every decodable frame into `bus` until the stream ends.
    ///
    /// Frames on unknown channels and malformed payloads are skipped.
    pub async fn forward(self, bus: MessageBus) -> Result<(), ApiError> {
        let mut decoder = SseDecoder::new();
        let mut stream = self.response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for frame in decoder.push(&chunk) {
                match BusMessage::decode(&frame.event, &frame.data) {
                    Ok(Some(msg)) => bus.publish(msg),
                    Ok(None) => debug!(event = %frame.event, "ignoring event on unknown channel"),
                    Err(e) => warn!(event = %frame.event, "malformed event payload: {e}"),
                }
            }
        }
        debug!("event stream closed");
        Ok(())
    }
}
