// OpenAI-compatible backend adapter
//
// Serves both ChatGPT (OpenAI) and Grok (xAI); the two expose the same
// chat-completions wire format. Deltas arrive as server-sent events, one
// JSON object per `data: ` line, terminated by `data: [DONE]`. The system
// prompt is resent as a fresh leading system message; inline system turns
// are stripped first.

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

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Adapter for OpenAI-compatible chat-completions APIs.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    backend_name: &'static str,
    api_name: &'static str,
}

impl OpenAiBackend {
    /// ChatGPT via the OpenAI API.
    pub fn new_chatgpt(api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            api_key.into(),
            "https://api.openai.com".to_string(),
            "gpt-4o-mini".to_string(),
            "chatgpt",
            "OpenAI",
        )
    }

    /// Grok via the xAI API (OpenAI-compatible).
    pub fn new_grok(api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            api_key.into(),
            "https://api.x.ai".to_string(),
            "grok-beta".to_string(),
            "grok",
            "xAI",
        )
    }

    /// Point the adapter at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn new(
        api_key: String,
        base_url: String,
        default_model: String,
        backend_name: &'static str,
        api_name: &'static str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            default_model,
            backend_name,
            api_name,
        })
    }

    /// Build the outgoing message list: optional fresh system message first,
    /// then the dialogue turns with any inline system turns removed.
    fn build_messages(&self, request: &GenerationRequest) -> Vec<ChatTurn> {
        let mut out = Vec::new();
        if let Some(prompt) = request.system_prompt.as_deref() {
            if !prompt.is_empty() {
                out.push(ChatTurn::system(prompt));
            }
        }
        out.extend(messages::strip_system(&request.turns));
        out
    }
}

#[async_trait]
impl TextBackend for OpenAiBackend {
    async fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let turns = self.build_messages(request);
        let url = format!("{}/v1/chat/completions", self.base_url);
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let api_name = self.api_name;

        tokio::spawn(async move {
            let body = ChatCompletionsRequest {
                model: &model,
                messages: &turns,
                stream: true,
            };

            tracing::debug!(%model, api = api_name, "sending streaming chat-completions request");

            let response = client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(request_failure(api_name, &e)).await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let _ = tx
                    .send(Fragment::error(
                        FragmentErrorKind::Transport,
                        format!("{api_name} API returned status {}", status.as_u16()),
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

                            if json_str == "[DONE]" {
                                return;
                            }

                            let chunk: ChatCompletionChunk = match serde_json::from_str(json_str) {
                                Ok(chunk) => chunk,
                                Err(_) => {
                                    tracing::debug!("skipping malformed chat-completions chunk");
                                    continue;
                                }
                            };

                            // Only forward chunks that actually carry text.
                            let delta = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content);
                            if let Some(content) = delta.filter(|c| !c.is_empty()) {
                                if tx.send(Fragment::Delta(content)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(request_failure(api_name, &e)).await;
                        return;
                    }
                }
            }
        });

        rx
    }

    fn name(&self) -> &str {
        self.backend_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

fn request_failure(api_name: &str, e: &reqwest::Error) -> Fragment {
    if e.is_timeout() {
        Fragment::error(
            FragmentErrorKind::Timeout,
            format!("Request to {api_name} timed out."),
        )
    } else {
        Fragment::error(FragmentErrorKind::Connectivity, format!("Error: {e}"))
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}
