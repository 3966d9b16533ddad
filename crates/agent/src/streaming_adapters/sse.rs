//! SSE Event Adapter
//!
//! Handles the agent's server-sent event framing: `data:` lines carrying JSON,
//! optional `event:` lines naming the event, comments and keep-alives.

use doc_chat_core::streaming::{AdapterError, AgentStreamEvent, StreamAdapter};
use serde_json::Value;
use tracing::debug;

/// Value of an SSE field line (`name: value` or `name:value`).
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Adapter for the agent's SSE stream.
///
/// Payloads are dispatched as soon as the buffered `data:` lines form a
/// complete JSON document, so agents that skip the blank separator line
/// still stream event by event.
#[derive(Debug, Default)]
pub struct SseEventAdapter {
    /// Name from the most recent `event:` line of the current frame
    event_name: Option<String>,
    /// Buffered `data:` payload of the current frame
    data: String,
}

impl SseEventAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to decode the buffered payload. `Ok(None)` means the JSON is not
    /// complete yet.
    fn try_decode(&mut self) -> Result<Option<AgentStreamEvent>, AdapterError> {
        match serde_json::from_str::<Value>(&self.data) {
            Ok(value) => {
                self.data.clear();
                self.to_event(value).map(Some)
            }
            Err(e) if e.is_eof() => Ok(None),
            Err(e) => {
                self.data.clear();
                Err(AdapterError::ParseError(e.to_string()))
            }
        }
    }

    fn to_event(&self, mut value: Value) -> Result<AgentStreamEvent, AdapterError> {
        let Some(map) = value.as_object_mut() else {
            return Err(AdapterError::InvalidFormat(
                "event payload is not a JSON object".to_string(),
            ));
        };

        if !map.contains_key("event") {
            if let Some(kind) = map.get("type").cloned() {
                map.insert("event".to_string(), kind);
            } else if let Some(name) = self
                .event_name
                .as_ref()
                .filter(|name| name.as_str() != "message")
            {
                map.insert("event".to_string(), Value::String(name.clone()));
            }
        }

        serde_json::from_value(value).map_err(|e| AdapterError::ParseError(e.to_string()))
    }

    /// Dispatch whatever the current frame buffered.
    fn flush(&mut self) -> Result<Vec<AgentStreamEvent>, AdapterError> {
        if self.data.trim().is_empty() {
            self.data.clear();
            return Ok(vec![]);
        }
        match self.try_decode()? {
            Some(event) => Ok(vec![event]),
            None => {
                let partial = std::mem::take(&mut self.data);
                Err(AdapterError::InvalidFormat(format!(
                    "incomplete event payload: {}",
                    partial
                )))
            }
        }
    }
}

impl StreamAdapter for SseEventAdapter {
    fn adapter_name(&self) -> &'static str {
        "sse"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<AgentStreamEvent>, AdapterError> {
        let line = input.trim_end_matches(&['\r', '\n'][..]);

        // Blank line terminates the frame
        if line.is_empty() {
            let events = self.flush();
            self.event_name = None;
            return events;
        }

        if line.starts_with(':') {
            return Ok(vec![]);
        }

        if let Some(data) = field_value(line, "data") {
            if data.trim() == "[DONE]" {
                return Ok(vec![]);
            }
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(data);
            return Ok(self.try_decode()?.into_iter().collect());
        }

        if let Some(name) = field_value(line, "event") {
            self.event_name = Some(name.trim().to_string());
            return Ok(vec![]);
        }

        if field_value(line, "id").is_some() || field_value(line, "retry").is_some() {
            return Ok(vec![]);
        }

        // Raw JSON without SSE prefix
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            let value: Value =
                serde_json::from_str(trimmed).map_err(|e| AdapterError::ParseError(e.to_string()))?;
            return Ok(vec![self.to_event(value)?]);
        }

        debug!("[SseEventAdapter] ignoring unrecognized line: {}", trimmed);
        Ok(vec![])
    }

    fn finish(&mut self) -> Result<Vec<AgentStreamEvent>, AdapterError> {
        let events = self.flush();
        self.event_name = None;
        events
    }

    fn reset(&mut self) {
        self.event_name = None;
        self.data.clear();
    }
}
