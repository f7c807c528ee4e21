// Shared request/response types for the generation backends
//
// These abstract over backend-specific wire formats (Ollama, Claude,
// ChatGPT, Grok) so the rest of the codebase works with a single shape.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation entry.
///
/// Insertion order is conversation order and is replayed verbatim to the
/// backend. Turns are appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Closed set of selectable generation backends.
///
/// One local (Ollama) and three cloud providers. Dispatch over this enum is
/// exhaustive, so an unconfigured backend is a compile error rather than a
/// runtime fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKey {
    Ollama,
    Claude,
    ChatGpt,
    Grok,
}

/// Unified request format for all backends.
///
/// Constructed fresh per generation call; never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Conversation turns to replay, oldest first.
    pub turns: Vec<ChatTurn>,

    /// Which backend handles this request.
    pub backend: BackendKey,

    /// Model name; each backend applies its own default when absent.
    pub model: Option<String>,

    /// Behavior-shaping instruction. Each adapter decides whether this
    /// travels inline as a system turn or through a dedicated field.
    pub system_prompt: Option<String>,

    /// API key for the cloud backends; ignored by Ollama.
    pub credential: Option<String>,
}

impl GenerationRequest {
    pub fn new(backend: BackendKey, turns: Vec<ChatTurn>) -> Self {
        Self {
            turns,
            backend,
            model: None,
            system_prompt: None,
            credential: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// Why a generation stream failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentErrorKind {
    /// Could not reach the backend (refused connection, DNS, TLS).
    Connectivity,
    /// The backend stopped responding within the adapter's deadline.
    Timeout,
    /// The backend answered with a non-success HTTP status.
    Transport,
    /// A cloud backend was selected without an API key.
    MissingCredential,
}

/// One item of a generation stream: a text delta, or a terminal error.
///
/// Errors travel in-band so a consumer rendering fragments incrementally can
/// keep whatever partial output it already showed. Nothing follows an
/// `Error` fragment; callers build a new stream to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Delta(String),
    Error {
        kind: FragmentErrorKind,
        message: String,
    },
}

impl Fragment {
    pub fn error(kind: FragmentErrorKind, message: impl Into<String>) -> Self {
        Fragment::Error {
            kind,
            message: message.into(),
        }
    }

    /// Extract the text delta, if this is one.
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            Fragment::Delta(text) => Some(text),
            Fragment::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fragment::Error { .. })
    }
}

/// Lazy pull-based sequence of fragments.
///
/// Advancing blocks on the next chunk of network I/O; dropping the receiver
/// abandons the transfer and lets the underlying connection close.
pub type FragmentStream = mpsc::Receiver<Fragment>;
