//! Incremental answer stream: raw body bytes in, text increments out.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{BoxStream, Stream};
use futures_util::{ready, StreamExt};

use crate::error::ClientError;

/// UTF-8 decoder that carries incomplete multi-byte sequences over to the next chunk.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `carry + bytes` as is complete. Invalid sequences become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    out.push_str(text);
                    self.carry.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + bad);
                        }
                        None => {
                            self.carry.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush a dangling partial sequence at end of input.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        tail
    }

    pub fn has_pending(&self) -> bool {
        !self.carry.is_empty()
    }
}

/// Lazy, finite, non-restartable sequence of answer text increments.
///
/// Body chunks are re-sliced to at most `chunk_size` bytes and decoded as
/// they arrive. Everything yielded is accumulated; [`AnswerStream::into_completed_text`]
/// hands the full response back only once the body has been fully drained
/// without error.
pub struct AnswerStream {
    body: BoxStream<'static, Result<Vec<u8>, ClientError>>,
    decoder: Utf8ChunkDecoder,
    chunk_size: usize,
    ready: VecDeque<String>,
    full_text: String,
    drained: bool,
    failed: bool,
}

impl AnswerStream {
    pub fn new(body: BoxStream<'static, Result<Vec<u8>, ClientError>>, chunk_size: usize) -> Self {
        Self {
            body,
            decoder: Utf8ChunkDecoder::new(),
            chunk_size: chunk_size.max(1),
            ready: VecDeque::new(),
            full_text: String::new(),
            drained: false,
            failed: false,
        }
    }

    /// Wrap a streaming HTTP response body.
    pub fn from_response(response: reqwest::Response, chunk_size: usize) -> Self {
        let body = response
            .bytes_stream()
            .map(|item| item.map(|bytes| bytes.to_vec()).map_err(ClientError::from))
            .boxed();
        Self::new(body, chunk_size)
    }

    fn enqueue(&mut self, bytes: &[u8]) {
        for slice in bytes.chunks(self.chunk_size) {
            let text = self.decoder.decode(slice);
            if !text.is_empty() {
                self.ready.push_back(text);
            }
        }
    }

    /// Whether the body ended cleanly and every increment has been yielded.
    pub fn is_complete(&self) -> bool {
        self.drained && !self.failed && self.ready.is_empty()
    }

    /// Text yielded so far.
    pub fn text_so_far(&self) -> &str {
        &self.full_text
    }

    /// The full response, or `None` if the stream was not consumed to a clean end.
    pub fn into_completed_text(self) -> Option<String> {
        if self.is_complete() {
            Some(self.full_text)
        } else {
            None
        }
    }
}

impl Stream for AnswerStream {
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(text) = this.ready.pop_front() {
                this.full_text.push_str(&text);
                return Poll::Ready(Some(Ok(text)));
            }
            if this.drained {
                return Poll::Ready(None);
            }
            match ready!(this.body.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => this.enqueue(&bytes),
                Some(Err(e)) => {
                    this.failed = true;
                    this.drained = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.drained = true;
                    let tail = this.decoder.finish();
                    if !tail.is_empty() {
                        this.ready.push_back(tail);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(chunks: &[&str]) -> BoxStream<'static, Result<Vec<u8>, ClientError>> {
        let owned: Vec<Result<Vec<u8>, ClientError>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        stream::iter(owned).boxed()
    }

    #[test]
    fn test_decoder_buffers_split_multibyte_sequence() {
        let snow = "☃".as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(&snow[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&snow[1..]), "☃");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_flushes_dangling_tail_lossily() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }

    #[tokio::test]
    async fn test_stream_accumulates_full_text() {
        let mut answer = AnswerStream::new(body(&["Thought: x\n", "Final Answer: 42"]), 2048);
        let mut parts = Vec::new();
        while let Some(part) = answer.next().await {
            parts.push(part.unwrap());
        }
        assert_eq!(parts, ["Thought: x\n", "Final Answer: 42"]);
        assert_eq!(
            answer.into_completed_text().as_deref(),
            Some("Thought: x\nFinal Answer: 42")
        );
    }

    #[tokio::test]
    async fn test_stream_respects_chunk_size_across_multibyte_text() {
        let text = "día soleado";
        let mut answer = AnswerStream::new(body(&[text]), 2);
        let mut parts = Vec::new();
        while let Some(part) = answer.next().await {
            parts.push(part.unwrap());
        }
        assert!(parts.iter().all(|p| p.len() <= 3));
        assert_eq!(parts.concat(), text);
    }

    #[tokio::test]
    async fn test_partially_consumed_stream_is_not_complete() {
        let mut answer = AnswerStream::new(body(&["one", "two"]), 2048);
        assert_eq!(answer.next().await.unwrap().unwrap(), "one");
        assert_eq!(answer.text_so_far(), "one");
        assert!(answer.into_completed_text().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_marks_stream_failed() {
        let items: Vec<Result<Vec<u8>, ClientError>> = vec![
            Ok(b"partial".to_vec()),
            Err(ClientError::Status {
                status: 500,
                body: String::new(),
            }),
        ];
        let mut answer = AnswerStream::new(stream::iter(items).boxed(), 2048);
        assert!(answer.next().await.unwrap().is_ok());
        assert!(answer.next().await.unwrap().is_err());
        assert!(answer.next().await.is_none());
        assert!(answer.into_completed_text().is_none());
    }
}
