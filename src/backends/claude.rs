// Claude (Anthropic) backend adapter
//
// The messages API streams server-sent events; text arrives in
// `content_block_delta` events under `delta.text`. The system prompt
// travels through the dedicated top-level `system` field, so inline system
// turns are stripped from the message list before sending.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::messages;
use super::types::{ChatTurn, Fragment, FragmentErrorKind, FragmentStream, GenerationRequest};
use super::{TextBackend, STREAM_BUFFER};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const MAX_TOKENS: u32 = 2048;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Adapter for the Anthropic messages API.
#[derive(Clone)]
pub struct ClaudeBackend {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl ClaudeBackend {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Point the adapter at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextBackend for ClaudeBackend {
    async fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let system = request
            .system_prompt
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let turns = messages::strip_system(&request.turns);
        let url = format!("{}/v1/messages", self.base_url);
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        tokio::spawn(async move {
            let body = MessagesRequest {
                model: &model,
                max_tokens: MAX_TOKENS,
                system: &system,
                messages: &turns,
                stream: true,
            };

            tracing::debug!(%model, turns = turns.len(), "sending streaming request to claude");

            let response = client
                .post(&url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(request_failure(&e)).await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let _ = tx
                    .send(Fragment::error(
                        FragmentErrorKind::Transport,
                        format!("Claude API returned status {}", status.as_u16()),
                    ))
                    .await;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);

                        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);
                            let line = line.trim();

                            let Some(json_str) = line.strip_prefix("data: ") else {
                                continue;
                            };

                            let event: StreamEvent = match serde_json::from_str(json_str) {
                                Ok(event) => event,
                                Err(_) => {
                                    tracing::debug!("skipping malformed claude event");
                                    continue;
                                }
                            };

                            match event.event_type.as_str() {
                                "content_block_delta" => {
                                    let text = event.delta.and_then(|d| d.text);
                                    if let Some(text) = text.filter(|t| !t.is_empty()) {
                                        if tx.send(Fragment::Delta(text)).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                "message_stop" => return,
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(request_failure(&e)).await;
                        return;
                    }
                }
            }
        });

        rx
    }

    fn name(&self) -> &str {
        "claude"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

fn request_failure(e: &reqwest::Error) -> Fragment {
    if e.is_timeout() {
        Fragment::error(FragmentErrorKind::Timeout, "Request to Claude timed out.")
    } else {
        Fragment::error(FragmentErrorKind::Connectivity, format!("Error: {e}"))
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<EventDelta>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_identity() {
        let backend = ClaudeBackend::new("test-key").unwrap();
        assert_eq!(backend.name(), "claude");
        assert_eq!(backend.default_model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_content_block_delta_parses() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "content_block_delta");
        assert_eq!(event.delta.unwrap().text.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_other_events_carry_no_text() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"message_stop"}"#).unwrap();
        assert_eq!(event.event_type, "message_stop");
        assert!(event.delta.is_none());
    }
}
