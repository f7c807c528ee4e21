// Ollama (local) backend adapter and model directory
//
// Ollama streams newline-delimited JSON objects over a chunked HTTP body;
// chat chunks carry the delta under `message.content`, registry pulls under
// `status`. The model directory operations (list/pull/delete) treat every
// transport failure as a soft failure, consistent with the errors-as-data
// policy of the generation stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::Config;

use super::messages;
use super::types::{ChatTurn, Fragment, FragmentErrorKind, FragmentStream, GenerationRequest};
use super::{TextBackend, STREAM_BUFFER};

const PROBE_TIMEOUT_SECS: u64 = 5;
const CHAT_TIMEOUT_SECS: u64 = 120;
// Model downloads are large; give pulls a generous deadline.
const PULL_TIMEOUT_SECS: u64 = 600;
const DELETE_TIMEOUT_SECS: u64 = 30;

/// Adapter for a local Ollama server.
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    host: String,
    default_model: String,
}

impl OllamaBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            host: config.ollama_host.clone(),
            default_model: config.default_model.clone(),
        })
    }
}

#[async_trait]
impl TextBackend for OllamaBackend {
    async fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let turns = messages::normalize(&request.turns, request.system_prompt.as_deref());
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = format!("{}/api/chat", self.host);
        let host = self.host.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let body = ChatRequest {
                model: &model,
                messages: &turns,
                stream: true,
            };

            tracing::debug!(%model, turns = turns.len(), "sending chat request to ollama");

            let response = client
                .post(&url)
                .timeout(Duration::from_secs(CHAT_TIMEOUT_SECS))
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(request_failure(&host, &e)).await;
                    return;
                }
            };

            if response.status() != StatusCode::OK {
                let message = format!(
                    "Ollama returned status code {}",
                    response.status().as_u16()
                );
                let _ = tx
                    .send(Fragment::error(FragmentErrorKind::Transport, message))
                    .await;
                return;
            }

            forward_ndjson(response, &tx, &host, |line| {
                let chunk: ChatChunk = serde_json::from_str(line).ok()?;
                chunk.message.and_then(|m| m.content)
            })
            .await;
        });

        rx
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Check if the Ollama server is running and accessible.
pub async fn check_connection(config: &Config) -> bool {
    let Ok(client) = Client::builder().build() else {
        return false;
    };

    match client
        .get(format!("{}/api/tags", config.ollama_host))
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .send()
        .await
    {
        Ok(response) => response.status() == StatusCode::OK,
        Err(_) => false,
    }
}

/// Fetch the available model names, sorted and deduplicated.
///
/// Returns an empty list on any failure. Tolerates both tag formats: entries
/// as `{"name": …}` objects and as plain name strings.
pub async fn list_models(config: &Config) -> Vec<String> {
    let Ok(client) = Client::builder().build() else {
        return Vec::new();
    };

    let response = match client
        .get(format!("{}/api/tags", config.ollama_host))
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .send()
        .await
    {
        Ok(r) if r.status() == StatusCode::OK => r,
        _ => return Vec::new(),
    };

    let tags: TagsResponse = match response.json().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("failed to parse ollama tags response: {e}");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = tags
        .models
        .into_iter()
        .map(|entry| match entry {
            ModelEntry::Named { name } => name,
            ModelEntry::Bare(name) => name,
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Pull a model from the Ollama registry, streaming its status lines.
pub async fn pull_model(config: &Config, name: &str) -> FragmentStream {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);

    let host = config.ollama_host.clone();
    let name = name.to_string();

    let client = match Client::builder().build() {
        Ok(c) => c,
        Err(e) => {
            let _ = tx.try_send(Fragment::error(
                FragmentErrorKind::Connectivity,
                format!("Error: {e}"),
            ));
            return rx;
        }
    };

    tokio::spawn(async move {
        let response = client
            .post(format!("{host}/api/pull"))
            .timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
            .json(&NamedModel { name: &name })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                let _ = tx.send(request_failure(&host, &e)).await;
                return;
            }
        };

        if response.status() != StatusCode::OK {
            let _ = tx
                .send(Fragment::error(
                    FragmentErrorKind::Transport,
                    format!("Could not pull model {name}"),
                ))
                .await;
            return;
        }

        forward_ndjson(response, &tx, &host, |line| {
            let chunk: PullChunk = serde_json::from_str(line).ok()?;
            chunk.status
        })
        .await;
    });

    rx
}

/// Delete a model from the local server. False on any failure.
pub async fn delete_model(config: &Config, name: &str) -> bool {
    let Ok(client) = Client::builder().build() else {
        return false;
    };

    match client
        .delete(format!("{}/api/delete", config.ollama_host))
        .timeout(Duration::from_secs(DELETE_TIMEOUT_SECS))
        .json(&NamedModel { name })
        .send()
        .await
    {
        Ok(response) => response.status() == StatusCode::OK,
        Err(_) => false,
    }
}

/// Forward a newline-delimited JSON body as fragments.
///
/// `extract` maps one complete line to its text delta; lines it rejects
/// (malformed JSON, missing fields) are skipped without ending the stream.
/// Empty deltas are dropped.
async fn forward_ndjson<F>(
    response: reqwest::Response,
    tx: &mpsc::Sender<Fragment>,
    host: &str,
    extract: F,
) where
    F: Fn(&str) -> Option<String>,
{
    let mut stream = response.bytes_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                buffer.extend_from_slice(&bytes);

                while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    if !emit_line(&line_bytes, tx, &extract).await {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(request_failure(host, &e)).await;
                return;
            }
        }
    }

    // The final object may arrive without a trailing newline.
    if !buffer.is_empty() {
        emit_line(&buffer, tx, &extract).await;
    }
}

/// Send one parsed line's delta. False when the receiver is gone.
async fn emit_line<F>(line_bytes: &[u8], tx: &mpsc::Sender<Fragment>, extract: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let line = String::from_utf8_lossy(line_bytes);
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    match extract(line) {
        Some(delta) if !delta.is_empty() => tx.send(Fragment::Delta(delta)).await.is_ok(),
        Some(_) => true,
        None => {
            tracing::debug!("skipping malformed ollama chunk");
            true
        }
    }
}

/// Map a reqwest error to the matching terminal fragment.
fn request_failure(host: &str, e: &reqwest::Error) -> Fragment {
    if e.is_timeout() {
        Fragment::error(
            FragmentErrorKind::Timeout,
            "Request to Ollama timed out. Is the model running?",
        )
    } else if e.is_connect() {
        Fragment::error(
            FragmentErrorKind::Connectivity,
            format!("Could not connect to Ollama at {host}."),
        )
    } else {
        Fragment::error(FragmentErrorKind::Connectivity, format!("Error: {e}"))
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullChunk {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct NamedModel<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelEntry {
    Named { name: String },
    Bare(String),
}
