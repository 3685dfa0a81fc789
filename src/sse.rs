//! Server-sent event decoding for streaming chat completions.
//!
//! A streaming body is a sequence of newline-delimited records.  Each record is either
//! `data: <json>` carrying an incremental delta, or the sentinel `data: [DONE]`.  The
//! [`StreamDecoder`] turns those records into [`StreamFragment`]s whose `accumulated` field is
//! the running concatenation of every delta seen so far.
//!
//! Per-line parse failures are not fatal: chunked transport sometimes delivers garbled
//! records, and the decoder skips them and keeps going.  The only record that aborts a decode
//! is a structured provider error embedded in the stream.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_FRAGMENTS, STREAM_SKIPPED_LINES};
use crate::types::{ChatCompletionChunk, StreamFragment};
use crate::{Error, Result};

/// Prefix of every data record.
pub const DATA_PREFIX: &str = "data:";

/// Payload of the record that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for a chat-completion event stream.
///
/// Bytes may be pushed in arbitrary chunks; a record is only decoded once its terminating
/// newline has arrived, or when [`finish`](Self::finish) flushes the trailing partial line.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    accumulated: String,
    fragments: usize,
    skipped: usize,
    done: bool,
    failure: Option<Error>,
}

impl StreamDecoder {
    /// Creates a decoder with nothing accumulated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the fragments completed by them, in order.
    ///
    /// Bytes arriving after the sentinel are ignored.  When an embedded error follows content
    /// in the same chunk, the content is returned first and the error is held for
    /// [`finish`](Self::finish).
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamFragment>> {
        let mut emitted = Vec::new();
        if self.done {
            return Ok(emitted);
        }
        self.pending.extend_from_slice(chunk);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            match self.decode_line(&line) {
                Ok(Some(fragment)) => emitted.push(fragment),
                Ok(None) => {}
                Err(err) if emitted.is_empty() => return Err(err),
                Err(err) => self.failure = Some(err),
            }
            if self.done {
                self.pending.clear();
                break;
            }
        }
        Ok(emitted)
    }

    /// Flush the trailing partial line and close the stream.
    ///
    /// Returns the fragments produced by the flush, followed by a closing fragment marked
    /// `done` when at least one fragment was emitted over the life of the decoder.  An error
    /// held back by [`push`](Self::push) is returned here instead.
    pub fn finish(&mut self) -> Result<Vec<StreamFragment>> {
        if let Some(err) = self.failure.take() {
            self.done = true;
            return Err(err);
        }
        let mut emitted = Vec::new();
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            if let Some(fragment) = self.decode_line(&line)? {
                emitted.push(fragment);
            }
        }
        self.done = true;
        if self.fragments > 0 {
            emitted.push(StreamFragment::new("", self.accumulated.clone()).finished());
        }
        Ok(emitted)
    }

    /// Returns true once the sentinel has been seen or the decoder was finished.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The text accumulated so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Number of content fragments emitted so far.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Number of records that failed to parse and were skipped.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<StreamFragment>> {
        let Ok(line) = std::str::from_utf8(raw) else {
            self.skip("record is not valid UTF-8");
            return Ok(None);
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let payload = line
            .strip_prefix(DATA_PREFIX)
            .map(str::trim_start)
            .unwrap_or(line);
        if payload == DONE_SENTINEL {
            self.done = true;
            return Ok(None);
        }
        let chunk = match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.skip(&format!("{err}: {payload}"));
                return Ok(None);
            }
        };
        if let Some(error) = chunk.error {
            self.done = true;
            return Err(error.into_error(200));
        }
        match chunk.content() {
            Some(delta) if !delta.is_empty() => {
                self.accumulated.push_str(delta);
                self.fragments += 1;
                STREAM_FRAGMENTS.click();
                Ok(Some(StreamFragment::new(delta, self.accumulated.clone())))
            }
            _ => Ok(None),
        }
    }

    fn skip(&mut self, why: &str) {
        self.skipped += 1;
        STREAM_SKIPPED_LINES.click();
        tracing::warn!("skipping malformed stream record: {why}");
    }
}

/// The outcome of decoding a complete body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedStream {
    /// The full accumulated text.
    pub text: String,
    /// Every content fragment in emission order.
    pub fragments: Vec<StreamFragment>,
}

impl DecodedStream {
    /// Returns true if no fragment was ever emitted.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Decode a complete event-stream body.
///
/// An empty result is not an error here; callers map it to [`Error::NoData`].
pub fn decode(body: &str) -> Result<DecodedStream> {
    let mut decoder = StreamDecoder::new();
    let mut fragments = decoder.push(body.as_bytes())?;
    fragments.extend(decoder.finish()?.into_iter().filter(|f| !f.done));
    Ok(DecodedStream {
        text: decoder.accumulated().to_string(),
        fragments,
    })
}

/// Decode a byte stream into a stream of fragments.
///
/// Content fragments are yielded as they complete.  If any were yielded, the stream ends with
/// one fragment marked `done` carrying the full text.  Transport errors and in-stream provider
/// errors are yielded once and end the stream.
pub fn fragments<S>(byte_stream: S) -> impl Stream<Item = Result<StreamFragment>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = (byte_stream, StreamDecoder::new(), VecDeque::new(), false);
    stream::unfold(
        state,
        |(mut stream, mut decoder, mut ready, mut closed)| async move {
            loop {
                if let Some(fragment) = ready.pop_front() {
                    return Some((Ok(fragment), (stream, decoder, ready, closed)));
                }
                if closed {
                    return None;
                }
                if decoder.is_done() {
                    closed = true;
                    match decoder.finish() {
                        Ok(tail) => ready.extend(tail),
                        Err(err) => return Some((Err(err), (stream, decoder, ready, closed))),
                    }
                    continue;
                }
                match stream.next().await {
                    Some(Ok(bytes)) => match decoder.push(&bytes) {
                        Ok(emitted) => ready.extend(emitted),
                        Err(err) => {
                            closed = true;
                            return Some((Err(err), (stream, decoder, ready, closed)));
                        }
                    },
                    Some(Err(err)) => {
                        closed = true;
                        return Some((Err(err), (stream, decoder, ready, closed)));
                    }
                    None => {
                        closed = true;
                        match decoder.finish() {
                            Ok(tail) => ready.extend(tail),
                            Err(err) => {
                                return Some((Err(err), (stream, decoder, ready, closed)));
                            }
                        }
                    }
                }
            }
        },
    )
}
