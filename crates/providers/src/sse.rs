//! SSE plumbing shared by the native-streaming adapters.
//!
//! A `reqwest::Response` body is buffered as bytes, split on `\n\n`, and every
//! `data:` payload is handed to a provider-specific parser producing
//! [`StreamEvent`]s. [`into_fragments`] then reduces those events to the
//! fragment contract: non-empty tokens only, ending at `Done`, failing at
//! `Error`.

use crate::util::from_reqwest;
use futures_util::{Stream, StreamExt};
use sb_domain::error::{Error, Result};
use sb_domain::stream::{BoxStream, FragmentStream, StreamEvent};

/// Position of the first `\n\n` event delimiter in `buffer`.
fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Extract complete `data:` payloads from an SSE byte buffer.
///
/// The buffer is drained in place; a trailing partial event stays for the
/// next call. Only complete events are decoded, so a multi-byte character
/// split across network chunks survives intact.
pub(crate) fn drain_data_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = find_delimiter(buffer) {
        let block: Vec<u8> = buffer.drain(..pos + 2).collect();
        let block = String::from_utf8_lossy(&block[..pos]);

        for line in block.lines() {
            if let Some(data) = line.trim().strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Build an event stream from an SSE response and a parser closure.
///
/// `FnMut` so that parsers can keep state between payloads. Nothing is read
/// from the body until the stream is polled, and dropping the stream drops
/// the response, which closes the connection.
pub(crate) fn sse_response_stream<F>(
    provider: String,
    response: reqwest::Response,
    parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    sse_event_stream(provider, response.bytes_stream(), parse_data)
}

fn sse_event_stream<S, B, F>(
    provider: String,
    chunks: S,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match chunks.next().await {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    for data in drain_data_lines(&mut buffer) {
                        for event in parse_data(&data) {
                            yield event;
                        }
                    }
                }
                None => {
                    // Body closed: flush a trailing event without delimiter.
                    if !buffer.iter().all(u8::is_ascii_whitespace) {
                        buffer.extend_from_slice(b"\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            for event in parse_data(&data) {
                                yield event;
                            }
                        }
                    }
                    break;
                }
                Some(Err(e)) => {
                    yield Err(from_reqwest(&provider, e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

/// Reduce provider events to answer fragments.
///
/// Empty tokens are skipped. The fragment stream ends at the first `Done`
/// (or when the body closes), and ends with an `Err` item at the first
/// backend error event or transport failure.
pub(crate) fn into_fragments(
    provider: String,
    mut events: BoxStream<'static, Result<StreamEvent>>,
) -> FragmentStream {
    let stream = async_stream::stream! {
        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Token { text }) => {
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
                Ok(StreamEvent::Done { finish_reason }) => {
                    tracing::trace!(provider = %provider, ?finish_reason, "stream finished");
                    break;
                }
                Ok(StreamEvent::Error { message }) => {
                    yield Err(Error::Upstream {
                        provider: provider.clone(),
                        message,
                    });
                    break;
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
