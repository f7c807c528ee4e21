// Backend registry and availability resolution
//
// Static descriptor table for the four backends, a live availability
// resolver, and the display-label mapping used by chat surfaces.

use crate::config::Config;

use super::ollama;
use super::types::BackendKey;

/// Static description of one backend. Process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct BackendDescriptor {
    pub key: BackendKey,
    pub label: &'static str,
    pub requires_credential: bool,
    pub default_model: &'static str,
}

pub const DESCRIPTORS: [BackendDescriptor; 4] = [
    BackendDescriptor {
        key: BackendKey::Ollama,
        label: "Ollama (Local)",
        requires_credential: false,
        default_model: "llama3",
    },
    BackendDescriptor {
        key: BackendKey::Claude,
        label: "Claude (Anthropic)",
        requires_credential: true,
        default_model: "claude-3-5-sonnet-20241022",
    },
    BackendDescriptor {
        key: BackendKey::ChatGpt,
        label: "ChatGPT (OpenAI)",
        requires_credential: true,
        default_model: "gpt-4o-mini",
    },
    BackendDescriptor {
        key: BackendKey::Grok,
        label: "Grok (xAI)",
        requires_credential: true,
        default_model: "grok-beta",
    },
];

/// Descriptor for a backend key.
pub fn descriptor(key: BackendKey) -> &'static BackendDescriptor {
    match key {
        BackendKey::Ollama => &DESCRIPTORS[0],
        BackendKey::Claude => &DESCRIPTORS[1],
        BackendKey::ChatGpt => &DESCRIPTORS[2],
        BackendKey::Grok => &DESCRIPTORS[3],
    }
}

/// Which cloud API keys are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialFlags {
    pub claude: bool,
    pub openai: bool,
    pub grok: bool,
}

/// Display labels of the backends usable right now.
///
/// Ollama's slot depends on a live connectivity probe, re-checked on every
/// call. Cloud backends appear iff their key is configured. Never returns
/// an empty list: with nothing available the Ollama label is force-included
/// as a fallback even though its own probe just failed, so callers must not
/// assume that fallback is reachable.
pub async fn available_backends(config: &Config, flags: CredentialFlags) -> Vec<&'static str> {
    let mut labels = Vec::new();

    if ollama::check_connection(config).await {
        labels.push(descriptor(BackendKey::Ollama).label);
    }
    if flags.claude {
        labels.push(descriptor(BackendKey::Claude).label);
    }
    if flags.openai {
        labels.push(descriptor(BackendKey::ChatGpt).label);
    }
    if flags.grok {
        labels.push(descriptor(BackendKey::Grok).label);
    }

    if labels.is_empty() {
        labels.push(descriptor(BackendKey::Ollama).label);
    }

    labels
}

/// Map a display label back to its backend key.
///
/// Total: unrecognized labels fall back to the local backend, never an
/// error.
pub fn backend_for_label(label: &str) -> BackendKey {
    DESCRIPTORS
        .iter()
        .find(|d| d.label == label)
        .map(|d| d.key)
        .unwrap_or(BackendKey::Ollama)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_covers_every_key() {
        for key in [
            BackendKey::Ollama,
            BackendKey::Claude,
            BackendKey::ChatGpt,
            BackendKey::Grok,
        ] {
            assert_eq!(descriptor(key).key, key);
        }
    }

    #[test]
    fn test_only_local_backend_needs_no_credential() {
        for d in &DESCRIPTORS {
            assert_eq!(d.requires_credential, d.key != BackendKey::Ollama);
        }
    }

    #[test]
    fn test_label_mapping_roundtrips() {
        for d in &DESCRIPTORS {
            assert_eq!(backend_for_label(d.label), d.key);
        }
    }

    #[test]
    fn test_label_mapping_is_total() {
        assert_eq!(backend_for_label("something else"), BackendKey::Ollama);
        assert_eq!(backend_for_label(""), BackendKey::Ollama);
        assert_eq!(backend_for_label("claude"), BackendKey::Ollama);
    }
}
