//! Client for the remote rewriting service.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::bridge::RewriteStream;
use crate::error::BridgeError;
use crate::message::{RewriteRequest, RewriteResponse, StreamMessage};

#[derive(Serialize)]
struct ApiRequest<'a> {
    #[serde(flatten)]
    request: &'a RewriteRequest,
    stream: bool,
}

/// HTTP client for the rewriting service.
pub struct RewriteClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RewriteClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &RewriteRequest, stream: bool) -> Result<reqwest::Response, BridgeError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&ApiRequest { request, stream });
        if stream {
            builder = builder.header("Accept", "application/x-ndjson");
        }
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(BridgeError::Remote(format!("HTTP {}: {}", status, text)));
        }
        Ok(response)
    }

    /// Rewrite in one request.
    pub async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse, BridgeError> {
        let response = self.send(request, false).await?;
        let parsed: RewriteResponse = response.json().await?;
        debug!("Rewrite response success={}", parsed.success);
        Ok(parsed)
    }

    /// Rewrite as a stream of `{chunk}` messages ending in `{complete}` or `{error}`.
    pub async fn rewrite_stream(&self, request: &RewriteRequest) -> Result<RewriteStream, BridgeError> {
        let response = self.send(request, true).await?;
        Ok(decode_stream(Box::pin(response.bytes_stream())))
    }
}

/// Splits a byte stream into newline-delimited stream messages.
///
/// Lines may carry an SSE style `data: ` prefix. A line split across two
/// network frames is held until its newline arrives.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamMessage> {
        self.buffer.extend_from_slice(bytes);
        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(message) = parse_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    /// Flush whatever is left once the body ends.
    pub fn finish(&mut self) -> Vec<StreamMessage> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(raw: &[u8]) -> Option<StreamMessage> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    let line = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    if line == "[DONE]" {
        return Some(StreamMessage::complete());
    }
    match serde_json::from_str::<StreamMessage>(line) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Skipping undecodable stream line: {}", e);
            None
        }
    }
}

struct DecodeState<S> {
    body: S,
    decoder: LineDecoder,
    queue: VecDeque<StreamMessage>,
    finished: bool,
}

/// Turn a raw body stream into a `RewriteStream`.
pub fn decode_stream<S, B, E>(body: S) -> RewriteStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body,
        decoder: LineDecoder::default(),
        queue: VecDeque::new(),
        finished: false,
    };

    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(message) = st.queue.pop_front() {
                return Some((message, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let messages = st.decoder.push(bytes.as_ref());
                    st.queue.extend(messages);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.queue.push_back(StreamMessage::error(e.to_string()));
                }
                None => {
                    st.finished = true;
                    let rest = st.decoder.finish();
                    st.queue.extend(rest);
                }
            }
        }
    });

    Box::pin(stream)
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
