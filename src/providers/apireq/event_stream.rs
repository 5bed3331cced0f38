//! Incremental parser for the `text/event-stream` bodies returned by
//! OpenAI-compatible completion endpoints. It expects a byte stream, as produced by
//! [`reqwest::Response::bytes_stream`], and yields one JSON object per event.
//!
//! Only the subset of Server-Sent-Events used by these APIs is understood: `data`
//! fields (joined with newlines when an event spans several lines), comment lines and
//! the terminal `[DONE]` marker. Any other field name is rejected.

use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::marker::Unpin;

use super::ReqwestError;

const DEFAULT_MAX_BUFFER: usize = 1 << 24; // 16 MiB
const DEFAULT_CAPACITY: usize = 1 << 10;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("only the \"data\" event field is supported, received \"{0}\"")]
    UnsupportedField(String),
    #[error("the response overflowed the streaming buffer")]
    ResponseExceededBuffer,
    #[error("failed to deserialize streamed event \"{blob}\": {source}")]
    Deserialization {
        blob: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("the source stream failed: {0}")]
    StreamFailed(#[source] ReqwestError),
}

#[derive(Debug)]
pub(crate) struct EventStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    stream: S,
    buf: Vec<u8>,
    max_size: usize,
    cursor: usize,
    data: Vec<u8>,
}

impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin> EventStream<S> {
    pub(crate) fn new(stream: S) -> EventStream<S> {
        Self::with_max_size(stream, DEFAULT_MAX_BUFFER)
    }

    pub(crate) fn with_max_size(stream: S, max_size: usize) -> EventStream<S> {
        EventStream {
            stream,
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
            max_size,
            cursor: 0,
            data: Vec::new(),
        }
    }

    async fn refill_buffer(&mut self) -> Result<bool, Error> {
        match self.stream.next().await {
            Some(Ok(b)) => {
                if b.len() + self.buf.len() > self.max_size {
                    return Err(Error::ResponseExceededBuffer);
                }

                self.buf.extend_from_slice(&b);

                Ok(true)
            }
            Some(Err(err)) => Err(Error::StreamFailed(err.into())),
            None => Ok(false),
        }
    }

    // Positions the cursor on the next '\n', returns false if more data is needed
    fn advance_to_line(&mut self) -> bool {
        while self.cursor < self.buf.len() && self.buf[self.cursor] != b'\n' {
            self.cursor += 1;
        }

        self.cursor != self.buf.len()
    }

    fn consume_line(&mut self) {
        self.buf.drain(..=self.cursor);
        self.cursor = 0;
    }

    // Moves the next complete event into `data`
    fn extract_event(&mut self) -> Result<bool, Error> {
        loop {
            if !self.advance_to_line() {
                return Ok(false);
            }

            let mut line = &self.buf[..self.cursor];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }

            let end_of_event = if line.is_empty() {
                // A blank line after comments alone carries no event
                !self.data.is_empty()
            } else {
                let mut split = line.splitn(2, |x| *x == b':');

                let field = split.next().unwrap_or_default();
                let value = split.next().unwrap_or_default();
                let value = value.strip_prefix(b" ").unwrap_or(value);

                if field.is_empty() {
                    false
                } else if field == b"data" {
                    if value != b"[DONE]" {
                        self.data.extend_from_slice(value);
                        self.data.push(b'\n');
                    }

                    false
                } else {
                    let field = String::from_utf8_lossy(field).into_owned();
                    self.consume_line();
                    return Err(Error::UnsupportedField(field));
                }
            };

            self.consume_line();

            if end_of_event {
                self.data.pop();
                return Ok(true);
            }
        }
    }

    async fn next_event(&mut self) -> Option<Result<&[u8], Error>> {
        self.data.clear();

        loop {
            match self.extract_event() {
                Ok(true) => return Some(Ok(&self.data)),
                Ok(false) => {}
                Err(err) => return Some(Err(err)),
            }

            match self.refill_buffer().await {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Returns the next event decoded as `T`, or `None` once the stream is exhausted.
    pub(crate) async fn next<T: DeserializeOwned>(&mut self) -> Option<Result<T, Error>> {
        let event = self.next_event().await?;

        Some(event.and_then(|bytes| {
            serde_json::from_slice::<T>(bytes).map_err(|source| Error::Deserialization {
                blob: String::from_utf8_lossy(bytes).into_owned(),
                source,
            })
        }))
    }
}
