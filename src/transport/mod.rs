//! Executes a request and exposes the response body as a stream of decoded records.
//!
//! A transport owns one request. The HTTP call runs on a spawned task that
//! feeds a bounded channel; the consumer drains it through a
//! [`ResponseStream`]. Dropping or cancelling the stream aborts the task,
//! which drops the response body and releases the connection.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::OpenAIError;
use crate::models::ResponseStream;
use crate::request::StreamRequest;

/// Room for one in-flight record between producer and consumer.
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 1;

/// How a response body is turned into records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every received chunk is decoded as one complete JSON document.
    /// Chunks that fail to decode are logged and skipped.
    Incremental,
    /// The whole body is collected and decoded once.
    #[default]
    SingleShot,
    /// The body is a server-sent event stream. Each `data:` line carries one
    /// JSON document and `data: [DONE]` ends the stream.
    EventStream,
}

/// Issues exactly one request and streams its decoded response.
#[derive(Debug, Clone)]
pub struct StreamingTransport {
    client: reqwest::Client,
    mode: DeliveryMode,
}

impl StreamingTransport {
    /// Creates a transport over a shared HTTP client.
    pub fn new(client: reqwest::Client, mode: DeliveryMode) -> Self {
        Self { client, mode }
    }

    /// The delivery mode this transport decodes with.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Sends `request` and returns the stream of records it produces.
    ///
    /// Network failures surface as the stream's terminal error. The status
    /// code is not inspected: an error body fails to decode like any other
    /// unexpected body.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn send<T>(self, request: StreamRequest) -> ResponseStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (method, url, headers, body) = request.into_parts();
        let pending = self.client.request(method, url).headers(headers).body(body);
        let mode = self.mode;

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            let response = tokio::select! {
                _ = tx.closed() => {
                    debug!("consumer dropped before the response arrived");
                    return;
                }
                response = pending.send() => response,
            };

            match response {
                Ok(response) => {
                    debug!(status = %response.status(), ?mode, "response received");
                    pump(response.bytes_stream(), mode, tx).await;
                }
                Err(e) => {
                    error!(error = %e, "request failed");
                    let _ = tx.send(Err(OpenAIError::from(e))).await;
                }
            }
        });

        ResponseStream::new(rx, Some(handle.abort_handle()))
    }

    /// Sends `request` and returns the raw response body.
    ///
    /// Used for endpoints that answer with binary data rather than JSON
    /// records, so the status code is checked instead of decoding the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not a success.
    pub async fn bytes(self, request: StreamRequest) -> Result<Bytes, OpenAIError> {
        let (method, url, headers, body) = request.into_parts();
        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(%status, "request failed");
            return Err(OpenAIError::new(format!(
                "Request failed with status {}: {}",
                status, error_body
            )));
        }

        let body = response.bytes().await?;
        debug!(body_len = body.len(), "binary response received");
        Ok(body)
    }
}

/// Decodes an arbitrary byte stream the way a transport decodes a response body.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn decode_chunks<S, E, T>(chunks: S, mode: DeliveryMode) -> ResponseStream<T>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<OpenAIError> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER_SIZE);
    let handle = tokio::spawn(pump(chunks, mode, tx));
    ResponseStream::new(rx, Some(handle.abort_handle()))
}

async fn pump<S, E, T>(chunks: S, mode: DeliveryMode, tx: mpsc::Sender<Result<T, OpenAIError>>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<OpenAIError>,
    T: DeserializeOwned,
{
    match mode {
        DeliveryMode::Incremental => pump_incremental(chunks, tx).await,
        DeliveryMode::SingleShot => pump_single_shot(chunks, tx).await,
        DeliveryMode::EventStream => pump_event_stream(chunks, tx).await,
    }
}

async fn pump_incremental<S, E, T>(chunks: S, tx: mpsc::Sender<Result<T, OpenAIError>>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<OpenAIError>,
    T: DeserializeOwned,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut yielded = 0usize;
    let mut last_error = None;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(records = yielded, "stream cancelled");
                return;
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => match decode_chunk::<T>(&chunk) {
                Ok(Some(record)) => {
                    if tx.send(Ok(record)).await.is_err() {
                        debug!(records = yielded, "stream cancelled");
                        return;
                    }
                    yielded += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, chunk_len = chunk.len(), "dropping undecodable chunk");
                    last_error = Some(e);
                }
            },
            Some(Err(e)) => {
                let e: OpenAIError = e.into();
                error!(error = %e, "response stream failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
            None => break,
        }
    }

    // A body that never produced a record is reported rather than ending silently.
    if yielded == 0 {
        if let Some(e) = last_error {
            let _ = tx.send(Err(e)).await;
            return;
        }
    }
    debug!(records = yielded, "stream complete");
}

async fn pump_single_shot<S, E, T>(chunks: S, tx: mpsc::Sender<Result<T, OpenAIError>>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<OpenAIError>,
    T: DeserializeOwned,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut body = BytesMut::new();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!("stream cancelled");
                return;
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => body.extend_from_slice(&chunk),
            Some(Err(e)) => {
                let e: OpenAIError = e.into();
                error!(error = %e, "response stream failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
            None => break,
        }
    }

    let record = serde_json::from_slice::<T>(&body).map_err(|e| OpenAIError::decode(e, &body));
    if let Err(e) = &record {
        warn!(error = %e, body_len = body.len(), "undecodable response body");
    }
    let _ = tx.send(record).await;
    debug!(body_len = body.len(), "stream complete");
}

async fn pump_event_stream<S, E, T>(chunks: S, tx: mpsc::Sender<Result<T, OpenAIError>>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<OpenAIError>,
    T: DeserializeOwned,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut buffer = BytesMut::new();
    // Lines that are not part of the event stream, e.g. a plain JSON error body.
    let mut stray = BytesMut::new();
    let mut yielded = 0usize;
    let mut last_error = None;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(records = yielded, "stream cancelled");
                return;
            }
            next = chunks.next() => next,
        };

        let ended = match next {
            Some(Ok(chunk)) => {
                buffer.extend_from_slice(&chunk);
                false
            }
            Some(Err(e)) => {
                let e: OpenAIError = e.into();
                error!(error = %e, "response stream failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
            None => true,
        };

        while let Some(line) = next_line(&mut buffer, ended) {
            let line = line.trim_ascii();
            match line.strip_prefix(b"data:").map(<[u8]>::trim_ascii) {
                Some(b"[DONE]") => {
                    debug!(records = yielded, "stream complete");
                    return;
                }
                Some(data) => match decode_chunk::<T>(data) {
                    Ok(Some(record)) => {
                        if tx.send(Ok(record)).await.is_err() {
                            debug!(records = yielded, "stream cancelled");
                            return;
                        }
                        yielded += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable event");
                        last_error = Some(e);
                    }
                },
                None if line.is_empty() || is_event_field(line) => {}
                None => {
                    stray.extend_from_slice(line);
                    stray.extend_from_slice(b"\n");
                }
            }
        }

        if ended {
            break;
        }
    }

    if yielded == 0 {
        if let Some(e) = last_error {
            let _ = tx.send(Err(e)).await;
            return;
        }
        if !stray.is_empty() {
            let record =
                serde_json::from_slice::<T>(&stray).map_err(|e| OpenAIError::decode(e, &stray));
            let _ = tx.send(record).await;
            return;
        }
    }
    debug!(records = yielded, "stream complete");
}

/// Splits the next complete line off `buffer`, or the remainder once the body has ended.
fn next_line(buffer: &mut BytesMut, ended: bool) -> Option<Bytes> {
    match buffer.iter().position(|&b| b == b'\n') {
        Some(pos) => Some(buffer.split_to(pos + 1).freeze()),
        None if ended && !buffer.is_empty() => Some(buffer.split().freeze()),
        None => None,
    }
}

fn is_event_field(line: &[u8]) -> bool {
    line.starts_with(b":")
        || line.starts_with(b"event:")
        || line.starts_with(b"id:")
        || line.starts_with(b"retry:")
}

/// Decodes one chunk. Whitespace-only chunks carry no record.
fn decode_chunk<T: DeserializeOwned>(chunk: &[u8]) -> Result<Option<T>, OpenAIError> {
    let trimmed = chunk.trim_ascii();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(trimmed)
        .map(Some)
        .map_err(|e| OpenAIError::decode(e, trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde::Deserialize;
    use std::time::Duration;
    use tokio_stream::wrappers::ReceiverStream;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Text {
        text: String,
    }

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, OpenAIError>> + Send + 'static {
        let parts: Vec<Result<Bytes, OpenAIError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        stream::iter(parts)
    }

    async fn texts(mut stream: ResponseStream<Text>) -> Vec<Result<String, OpenAIError>> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.map(|t| t.text));
        }
        out
    }

    #[tokio::test]
    async fn test_incremental_yields_each_chunk_in_order() {
        let stream = decode_chunks(
            chunks(&[r#"{"text":"t1"}"#, r#"{"text":"t2"}"#, r#"{"text":"t3"}"#]),
            DeliveryMode::Incremental,
        );
        let out: Vec<String> = texts(stream)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(out, vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_incremental_skips_malformed_chunk() {
        let stream = decode_chunks(
            chunks(&[r#"{"text":"#, r#"{"text":"ok"}"#]),
            DeliveryMode::Incremental,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_incremental_skips_whitespace_chunks() {
        let stream = decode_chunks(
            chunks(&["\n", "  {\"text\":\"a\"}\r\n", " "]),
            DeliveryMode::Incremental,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "a");
    }

    #[tokio::test]
    async fn test_incremental_reports_body_without_records() {
        let stream = decode_chunks(
            chunks(&[r#"{"error":{"message":"bad key"}}"#]),
            DeliveryMode::Incremental,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_incremental_empty_body_completes() {
        let stream = decode_chunks(chunks(&[]), DeliveryMode::Incremental);
        assert!(texts(stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_terminates_stream() {
        let parts: Vec<Result<Bytes, OpenAIError>> = vec![
            Ok(Bytes::from_static(br#"{"text":"first"}"#)),
            Err(OpenAIError::new("connection reset")),
            Ok(Bytes::from_static(br#"{"text":"never"}"#)),
        ];
        let stream = decode_chunks(stream::iter(parts), DeliveryMode::Incremental);
        let out = texts(stream).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "first");
        assert!(matches!(out[1], Err(OpenAIError::Base { .. })));
    }

    #[tokio::test]
    async fn test_single_shot_joins_chunks() {
        let stream = decode_chunks(
            chunks(&[r#"{"te"#, r#"xt":"whole"}"#]),
            DeliveryMode::SingleShot,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "whole");
    }

    #[tokio::test]
    async fn test_single_shot_decode_error_is_terminal() {
        let stream = decode_chunks(chunks(&["not json"]), DeliveryMode::SingleShot);
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_cancel_stops_records_and_releases_source() {
        let (chunk_tx, chunk_rx) = mpsc::channel::<Result<Bytes, OpenAIError>>(4);
        let mut stream: ResponseStream<Text> =
            decode_chunks(ReceiverStream::new(chunk_rx), DeliveryMode::Incremental);

        chunk_tx
            .send(Ok(Bytes::from_static(br#"{"text":"one"}"#)))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().text, "one");

        let _ = chunk_tx
            .send(Ok(Bytes::from_static(br#"{"text":"two"}"#)))
            .await;
        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().await.is_none());

        tokio::time::timeout(Duration::from_secs(1), chunk_tx.closed())
            .await
            .expect("source was not released after cancel");
    }

    #[tokio::test]
    async fn test_drop_releases_source() {
        let (chunk_tx, chunk_rx) = mpsc::channel::<Result<Bytes, OpenAIError>>(4);
        let stream: ResponseStream<Text> =
            decode_chunks(ReceiverStream::new(chunk_rx), DeliveryMode::SingleShot);
        drop(stream);

        tokio::time::timeout(Duration::from_secs(1), chunk_tx.closed())
            .await
            .expect("source was not released after drop");
    }

    #[tokio::test]
    async fn test_incremental_split_body_fails_where_single_shot_succeeds() {
        let body = format!(r#"{{"text":"{}"}}"#, "word ".repeat(4000));
        let (head, tail) = body.split_at(body.len() / 2);

        let stream = decode_chunks(chunks(&[head, tail]), DeliveryMode::SingleShot);
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().len(), 20000);

        let stream = decode_chunks(chunks(&[head, tail]), DeliveryMode::Incremental);
        let out = texts(stream).await;
        assert!(out[0].as_ref().unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_event_stream_yields_data_lines() {
        let stream = decode_chunks(
            chunks(&[
                ": keep-alive\n\ndata: {\"text\":\"a\"}\n\nda",
                "ta: {\"te",
                "xt\":\"b\"}\r\n\ndata: [DONE]\n\ndata: {\"text\":\"never\"}\n\n",
            ]),
            DeliveryMode::EventStream,
        );
        let out: Vec<String> = texts(stream)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_event_stream_final_line_without_newline() {
        let stream = decode_chunks(chunks(&["data: {\"text\":\"tail\"}"]), DeliveryMode::EventStream);
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn test_event_stream_skips_bad_event() {
        let stream = decode_chunks(
            chunks(&["data: {oops\n\ndata: {\"text\":\"ok\"}\n\n"]),
            DeliveryMode::EventStream,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_event_stream_reports_plain_error_body() {
        let stream = decode_chunks(
            chunks(&[r#"{"error":{"message":"bad key"}}"#]),
            DeliveryMode::EventStream,
        );
        let out = texts(stream).await;
        assert_eq!(out.len(), 1);
        match &out[0] {
            Err(OpenAIError::Decode { body, .. }) => assert!(body.contains("bad key")),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_default_mode_is_single_shot() {
        assert_eq!(DeliveryMode::default(), DeliveryMode::SingleShot);
    }
}
