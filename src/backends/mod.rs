// Multi-backend text generation
//
// Abstraction layer over the four generation backends (local Ollama plus
// the Claude, ChatGPT, and Grok cloud APIs), normalizing their
// heterogeneous streaming wire protocols into one lazy sequence of text
// fragments.

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod claude;
pub mod messages;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod types;

pub use registry::{
    available_backends, backend_for_label, descriptor, BackendDescriptor, CredentialFlags,
    DESCRIPTORS,
};
pub use types::{
    BackendKey, ChatTurn, Fragment, FragmentErrorKind, FragmentStream, GenerationRequest, Role,
};

use crate::config::Config;

/// Channel capacity for fragment streams; producers block once the consumer
/// falls this far behind.
pub(crate) const STREAM_BUFFER: usize = 100;

/// Common interface implemented by every transport adapter.
///
/// `stream` never returns an error: every failure mode is delivered as a
/// terminal [`Fragment::Error`] so consumers can render partial output up
/// to the point of failure. Streams are not restartable; callers build a
/// new one to retry.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Stream text fragments in response to the request.
    async fn stream(&self, request: &GenerationRequest) -> FragmentStream;

    /// Backend name for logging (e.g. "ollama", "claude").
    fn name(&self) -> &str;

    /// Model used when the request names none.
    fn default_model(&self) -> &str;
}

/// Single entry point for text generation.
///
/// Dispatches to the adapter selected by `request.backend`. Cloud backends
/// with an absent or empty credential yield exactly one
/// `MissingCredential` fragment; no adapter is constructed and no network
/// I/O happens. Selection is single-shot per call: no retries, no
/// cross-backend merging.
pub async fn generate(config: &Config, request: &GenerationRequest) -> FragmentStream {
    match request.backend {
        BackendKey::Ollama => match ollama::OllamaBackend::new(config) {
            Ok(backend) => backend.stream(request).await,
            Err(e) => failure_stream(e),
        },

        BackendKey::Claude => match credential(request) {
            None => missing_credential("Claude"),
            Some(key) => match claude::ClaudeBackend::new(key) {
                Ok(backend) => backend.stream(request).await,
                Err(e) => failure_stream(e),
            },
        },

        BackendKey::ChatGpt => match credential(request) {
            None => missing_credential("ChatGPT"),
            Some(key) => match openai::OpenAiBackend::new_chatgpt(key) {
                Ok(backend) => backend.stream(request).await,
                Err(e) => failure_stream(e),
            },
        },

        BackendKey::Grok => match credential(request) {
            None => missing_credential("Grok"),
            Some(key) => match openai::OpenAiBackend::new_grok(key) {
                Ok(backend) => backend.stream(request).await,
                Err(e) => failure_stream(e),
            },
        },
    }
}

fn credential(request: &GenerationRequest) -> Option<String> {
    request
        .credential
        .as_deref()
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// One-fragment stream for a cloud backend selected without its API key.
fn missing_credential(backend: &str) -> FragmentStream {
    one_fragment(Fragment::error(
        FragmentErrorKind::MissingCredential,
        format!("{backend} API key not provided."),
    ))
}

/// One-fragment stream for an adapter that could not be constructed.
fn failure_stream(e: anyhow::Error) -> FragmentStream {
    one_fragment(Fragment::error(
        FragmentErrorKind::Connectivity,
        format!("Error: {e}"),
    ))
}

fn one_fragment(fragment: Fragment) -> FragmentStream {
    let (tx, rx) = mpsc::channel(1);
    let _ = tx.try_send(fragment);
    rx
}
