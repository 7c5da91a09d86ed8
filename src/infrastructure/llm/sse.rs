//! Server-sent events decoding shared by the streaming providers

use std::collections::VecDeque;

use futures::{Stream, StreamExt, future, stream};

use super::http_client::ByteStream;
use crate::domain::DomainError;

/// Incremental decoder that turns raw bytes into SSE `data` payloads.
///
/// Events may be split across network chunks, and one chunk may carry
/// several events. Lines end in `\r\n`, `\n` or `\r`. Multi-line `data`
/// fields are joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning every event completed by it
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();

        while let Some(line) = self.next_line() {
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Take the next complete line off the buffer, without its terminator
    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|b| matches!(b, b'\n' | b'\r'))?;

        let terminator = match (self.buffer[pos], self.buffer.get(pos + 1)) {
            (b'\r', Some(b'\n')) => 2,
            // A trailing CR may be the first half of a CRLF split across chunks
            (b'\r', None) => return None,
            _ => 1,
        };

        let line: Vec<u8> = self.buffer.drain(..pos + terminator).collect();
        Some(String::from_utf8_lossy(&line[..pos]).into_owned())
    }

    /// Flush whatever is left once the connection has closed
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();

        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest).into_owned();
            let line = rest.strip_suffix('\r').unwrap_or(&rest);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        if let Some(event) = self.dispatch() {
            events.push(event);
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment lines, e.g. DashScope's ":HTTP_STATUS/200"
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }

        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }

        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

struct DecodeState {
    inner: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Adapt a byte stream into a stream of SSE `data` payloads.
///
/// A transport error is yielded once, in order, and ends the stream.
pub fn data_events(inner: ByteStream) -> impl Stream<Item = Result<String, DomainError>> + Send {
    let state = DecodeState {
        inner,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }

            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.feed(&bytes);
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
}

/// End a stream right after its first error
pub fn stop_after_error<S, T>(inner: S) -> impl Stream<Item = Result<T, DomainError>> + Send
where
    S: Stream<Item = Result<T, DomainError>> + Send,
    T: Send,
{
    inner.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }

        *failed = item.is_err();
        future::ready(Some(item))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_decodes_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: one\n\ndata: two\n\n");
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn test_decodes_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        assert!(decoder.feed(b"1}\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_decodes_cr_only_line_endings() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: one\r\rdata: two\r\r"), vec!["one"]);
        assert_eq!(decoder.feed(b"data: three\r\r"), vec!["two"]);
        assert_eq!(decoder.finish(), vec!["three"]);
    }

    #[test]
    fn test_crlf_split_between_chunks_is_one_terminator() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: a\r").is_empty());
        assert!(decoder.feed(b"\n\r").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec!["a"]);
    }

    #[test]
    fn test_finish_treats_trailing_cr_as_terminator() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: last\r").is_empty());
        assert_eq!(decoder.finish(), vec!["last"]);
    }

    #[test]
    fn test_ignores_comments_and_other_fields() {
        let mut decoder = SseDecoder::new();
        let chunk = b"id:1\nevent:result\n:HTTP_STATUS/200\ndata:{\"x\":1}\n\n";
        let events = decoder.feed(chunk);
        assert_eq!(events, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec!["[DONE]"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let text = "data: 成绩\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&text[..8]).is_empty());
        assert_eq!(decoder.feed(&text[8..]), vec!["成绩"]);
    }

    #[tokio::test]
    async fn test_data_events_surfaces_error_then_ends() {
        let chunks: Vec<Result<Bytes, DomainError>> = vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err(DomainError::provider("http", "connection reset")),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ];
        let inner: ByteStream = Box::pin(stream::iter(chunks));

        let items: Vec<Result<String, DomainError>> = data_events(inner).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_stop_after_error_drops_later_items() {
        let items: Vec<Result<u32, DomainError>> = vec![
            Ok(1),
            Err(DomainError::provider("openai", "bad event")),
            Ok(2),
        ];

        let items: Vec<_> = stop_after_error(stream::iter(items)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert!(items[1].is_err());
    }
}
