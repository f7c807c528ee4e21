// Per-session chat state
//
// Credentials and conversation history live in an explicit session object
// passed into the generation entry points; nothing is ambient. Keys are
// held in process memory only.

use crate::backends::{BackendKey, ChatTurn, CredentialFlags, GenerationRequest, Role};

/// Cloud API keys for the current session.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub claude: Option<String>,
    pub openai: Option<String>,
    pub grok: Option<String>,
}

impl Credentials {
    /// Read keys from `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, and
    /// `XAI_API_KEY`. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            claude: env_key("ANTHROPIC_API_KEY"),
            openai: env_key("OPENAI_API_KEY"),
            grok: env_key("XAI_API_KEY"),
        }
    }

    /// Presence flags for the availability resolver.
    pub fn flags(&self) -> CredentialFlags {
        CredentialFlags {
            claude: self.claude.is_some(),
            openai: self.openai.is_some(),
            grok: self.grok.is_some(),
        }
    }

    /// Key for the given backend; the local backend needs none.
    pub fn for_backend(&self, backend: BackendKey) -> Option<&str> {
        match backend {
            BackendKey::Ollama => None,
            BackendKey::Claude => self.claude.as_deref(),
            BackendKey::ChatGpt => self.openai.as_deref(),
            BackendKey::Grok => self.grok.as_deref(),
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// One user's chat session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub username: String,
    pub credentials: Credentials,
    pub history: Vec<ChatTurn>,
}

impl Session {
    pub fn new(username: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            username: username.into(),
            credentials,
            history: Vec::new(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::assistant(content));
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Turns eligible for replay. System instructions are injected per
    /// backend at request time, never stored in history.
    pub fn dialogue(&self) -> Vec<ChatTurn> {
        self.history
            .iter()
            .filter(|t| t.role != Role::System)
            .cloned()
            .collect()
    }

    /// Build a generation request for this session's history, attaching the
    /// matching credential when the backend needs one.
    pub fn request(
        &self,
        backend: BackendKey,
        model: Option<String>,
        system_prompt: Option<String>,
    ) -> GenerationRequest {
        let mut request = GenerationRequest::new(backend, self.dialogue());
        if let Some(model) = model {
            request = request.with_model(model);
        }
        if let Some(prompt) = system_prompt {
            request = request.with_system_prompt(prompt);
        }
        if let Some(key) = self.credentials.for_backend(backend) {
            request = request.with_credential(key);
        }
        request
    }
}
