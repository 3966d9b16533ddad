//! RAG Agent Client
//!
//! reqwest implementation of `AgentClient` for the remote retrieval agent.
//! Streams SSE over `bytes_stream()` and falls back to the single-shot query
//! endpoint on request.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{parse_http_error, parse_stream_http_error, AgentClient};
use crate::http_client::build_http_client;
use crate::streaming_adapters::SseEventAdapter;
use crate::types::{AgentConfig, AgentError, AgentResult, ChatRequest, QueryRequest, QueryResponse};
use doc_chat_core::streaming::{AgentStreamEvent, StreamAdapter};

/// HTTP client for the remote RAG agent
pub struct RagAgentClient {
    config: AgentConfig,
    base_url: Url,
    client: reqwest::Client,
}

impl RagAgentClient {
    /// Create a new client from connection settings
    pub fn new(config: AgentConfig) -> AgentResult<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            AgentError::config(format!("Invalid agent base URL {}: {}", config.base_url, e))
        })?;
        // Keep the base path when joining relative endpoints
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = build_http_client(config.proxy_url.as_deref())?;
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Resolve an endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> AgentResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| AgentError::config(format!("Invalid endpoint path {}: {}", path, e)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[async_trait]
impl AgentClient for RagAgentClient {
    fn name(&self) -> &'static str {
        "rag-agent"
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<AgentStreamEvent>,
        cancel: CancellationToken,
    ) -> AgentResult<()> {
        let url = self.endpoint(&self.config.stream_path)?;
        debug!("[RagAgentClient] opening stream to {}", url);

        let builder = self
            .authorize(self.client.post(url))
            .header("Accept", "text/event-stream")
            .json(&request);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            response = builder.send() => response.map_err(|e| AgentError::network(e.to_string()))?,
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("[RagAgentClient] stream request failed with HTTP {}", status);
            return Err(parse_stream_http_error(status, &body));
        }

        let mut adapter = SseEventAdapter::new();
        forward_event_stream(response.bytes_stream(), &mut adapter, &tx, &cancel).await
    }

    async fn query(&self, request: ChatRequest) -> AgentResult<QueryResponse> {
        let url = self.endpoint(&self.config.query_path)?;
        info!("[RagAgentClient] sending non-streaming query to {}", url);

        let response = self
            .authorize(self.client.post(url))
            .json(&QueryRequest::from(&request))
            .send()
            .await
            .map_err(|e| AgentError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|e| AgentError::network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body_text));
        }

        serde_json::from_str(&body_text)
            .map_err(|e| AgentError::parse(format!("Failed to parse query response: {}", e)))
    }

    async fn health_check(&self) -> AgentResult<()> {
        let url = self.endpoint(&self.config.health_path)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| AgentError::network(e.to_string()))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body))
        }
    }
}

/// Split a byte stream into lines, adapt them to events and forward the
/// events in delivery order.
///
/// Returns after forwarding a terminal event (remaining bytes are not read and
/// the stream is dropped), at end of stream, or with `AgentError::Cancelled`
/// once `cancel` fires. Frames that fail to decode are logged and skipped.
pub async fn forward_event_stream<S, E>(
    stream: S,
    adapter: &mut dyn StreamAdapter,
    tx: &mpsc::Sender<AgentStreamEvent>,
    cancel: &CancellationToken,
) -> AgentResult<()>
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: std::fmt::Display + Send,
{
    let mut stream = Box::pin(stream);
    let mut buffer: Vec<u8> = Vec::new();
    let mut line_count = 0u32;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[RagAgentClient] stream cancelled after {} lines", line_count);
                return Err(AgentError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| AgentError::network(e.to_string()))?;
        buffer.extend_from_slice(&chunk);

        // Process complete lines
        while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_end]);
            line_count += 1;

            let events = match adapter.adapt(&line) {
                Ok(events) => events,
                Err(e) => {
                    warn!(
                        "[RagAgentClient] dropping undecodable frame at line {}: {}",
                        line_count, e
                    );
                    continue;
                }
            };

            if forward(events, tx).await? {
                debug!("[RagAgentClient] terminal event after {} lines", line_count);
                return Ok(());
            }
        }
    }

    // End of stream: a trailing line without newline, then whatever the
    // adapter still buffers
    let mut events = Vec::new();
    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        match adapter.adapt(&line) {
            Ok(tail) => events.extend(tail),
            Err(e) => warn!("[RagAgentClient] dropping undecodable trailing frame: {}", e),
        }
    }
    match adapter.finish() {
        Ok(tail) => events.extend(tail),
        Err(e) => warn!("[RagAgentClient] dropping undecodable trailing frame: {}", e),
    }
    forward(events, tx).await?;

    debug!("[RagAgentClient] stream ended after {} lines", line_count);
    Ok(())
}

/// Send events to the consumer. Returns whether a terminal event was sent.
async fn forward(
    events: Vec<AgentStreamEvent>,
    tx: &mpsc::Sender<AgentStreamEvent>,
) -> AgentResult<bool> {
    for event in events {
        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            debug!("[RagAgentClient] consumer dropped, stopping stream");
            return Err(AgentError::Cancelled);
        }
        if terminal {
            return Ok(true);
        }
    }
    Ok(false)
}
