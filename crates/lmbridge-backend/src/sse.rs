//! Server-sent event decoding for the LM Studio completion stream.
//!
//! LM Studio streams `data: {chunk json}\n\n` frames and ends with
//! `data: [DONE]`. The decoder turns the raw byte stream into
//! [`BackendStreamEvent`]s, one per frame, as soon as each line is complete.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use lmbridge_core::{BackendChunkStream, BackendError, BackendStreamEvent};
use tracing::{debug, warn};

use crate::wire::{StreamFrame, error_value_message};

/// State threaded through the `unfold` stream.
struct DecodeState<G> {
    stream: futures_util::stream::BoxStream<'static, Result<Bytes, String>>,
    buf: BytesMut,
    done: bool,
    /// Held for the lifetime of the stream; dropped with it.
    _guard: G,
}

/// Decode an SSE byte stream into backend events.
///
/// The stream ends after `[DONE]`, after the first error, or when the
/// upstream ends (without a `Done` event, which the relay treats as a
/// dropped connection). `guard` lives exactly as long as the returned
/// stream.
pub(crate) fn decode_events<S, E, G>(byte_stream: S, guard: G) -> BackendChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
    G: Send + 'static,
{
    let state = DecodeState {
        stream: byte_stream.map(|r| r.map_err(|e| e.to_string())).boxed(),
        buf: BytesMut::new(),
        done: false,
        _guard: guard,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end + 1);
                let line = String::from_utf8_lossy(&line);
                let trimmed = line.trim();

                // Blank separators, comments, and non-data fields.
                let Some(data) = trimmed.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();

                if data == "[DONE]" {
                    st.done = true;
                    return Some((Ok(BackendStreamEvent::Done), st));
                }

                let frame = match serde_json::from_str::<StreamFrame>(data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(error = %e, "Skipping undecodable stream frame");
                        continue;
                    }
                };

                if let Some(error) = frame.error.as_ref() {
                    let message = error_value_message(error);
                    warn!(error = %message, "LM Studio reported an error mid-stream");
                    st.done = true;
                    return Some((
                        Err(BackendError::InvalidResponse(format!(
                            "LM Studio stream error: {message}"
                        ))),
                        st,
                    ));
                }

                match frame.into_chunk() {
                    Some(chunk) => return Some((Ok(BackendStreamEvent::Chunk(chunk)), st)),
                    None => continue,
                }
            }

            match st.stream.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    warn!(error = %e, "LM Studio stream read failed");
                    st.done = true;
                    return Some((Err(BackendError::Unreachable(e)), st));
                }
                None => {
                    // A trailing line without a newline still counts.
                    if !st.buf.is_empty() && !st.buf.ends_with(b"\n") {
                        st.buf.extend_from_slice(b"\n");
                        continue;
                    }
                    return None;
                }
            }
        }
    })
    .boxed()
}

fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}
