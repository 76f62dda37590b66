//! Incremental NDJSON (newline-delimited JSON) stream decoding.
//!
//! Turns a live, chunked byte stream into a lazy sequence of decoded
//! values, one per non-blank line, in arrival order. Partial lines are
//! buffered across chunk boundaries; blank lines are ignored per the
//! NDJSON spec; a final line with no trailing newline is still decoded
//! when the stream ends.

use crate::error::Error;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Incremental NDJSON line splitter.
///
/// Buffers partial data and emits complete lines. The buffer only ever
/// holds bytes after the last observed `\n`.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    buffer: Vec<u8>,
}

impl NdjsonParser {
    /// Create a new NDJSON parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return the complete lines it finishes.
    ///
    /// A trailing `\r` is stripped from each line so CRLF streams decode
    /// the same as LF streams. Blank lines are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop(); // the terminator itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }

        lines
    }

    /// Drain the unterminated remainder at end of stream, if any.
    ///
    /// NDJSON tolerates a missing terminator on the last line, so a
    /// non-empty remainder is one final line.
    pub fn finish(&mut self) -> Option<String> {
        let mut line = std::mem::take(&mut self.buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&line).into_owned())
        }
    }

    /// Check if there's pending data in the buffer.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

struct DecodeState<S, F> {
    source: S,
    parser: NdjsonParser,
    ready: VecDeque<String>,
    decode: F,
    cancel: Option<CancellationToken>,
    source_done: bool,
    done: bool,
}

/// Decode an NDJSON byte stream into a lazy sequence of values.
///
/// `decode` is applied to the text of each complete non-blank line. The
/// returned stream is finite and not restartable: a decode failure or a
/// transport read failure yields one `Err` item and then terminates, even
/// if further complete lines are already buffered. Dropping the stream
/// drops `source` (and with it the transport response). If `cancel` is
/// supplied and fires mid-stream, the decoder stops reading the
/// transport, yields [`Error::Cancelled`], and terminates.
///
/// Items are yielded in strict FIFO line order. No work happens until
/// the consumer polls for the next item.
pub fn ndjson_stream<S, E, T, F>(
    source: S,
    decode: F,
    cancel: Option<CancellationToken>,
) -> impl Stream<Item = Result<T, Error>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Error>,
    F: FnMut(&str) -> Result<T, serde_json::Error>,
{
    let state = DecodeState {
        source,
        parser: NdjsonParser::new(),
        ready: VecDeque::new(),
        decode,
        cancel,
        source_done: false,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            // Serve already-split lines before touching the transport.
            if let Some(line) = st.ready.pop_front() {
                match (st.decode)(&line) {
                    Ok(item) => return Some((Ok(item), st)),
                    Err(source) => {
                        st.done = true;
                        return Some((Err(Error::Decode { content: line, source }), st));
                    }
                }
            }

            if st.source_done {
                st.done = true;
                return None;
            }

            let next = match &st.cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        st.done = true;
                        return Some((Err(Error::Cancelled), st));
                    }
                    chunk = st.source.next() => chunk,
                },
                None => st.source.next().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    st.ready.extend(st.parser.feed(&chunk));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.source_done = true;
                    if let Some(line) = st.parser.finish() {
                        st.ready.push_back(line);
                    }
                }
            }
        }
    })
}

/// [`ndjson_stream`] with `serde_json` as the decode function.
pub fn ndjson_json_stream<S, E, T>(
    source: S,
    cancel: Option<CancellationToken>,
) -> impl Stream<Item = Result<T, Error>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Error>,
    T: DeserializeOwned,
{
    ndjson_stream(source, |line| serde_json::from_str(line), cancel)
}
