// Message-list normalization
//
// Builds the canonical ordered turn list for a request. Each adapter owns
// its own flavor: Ollama keeps system turns inline in the message list,
// while Claude and the OpenAI-compatible backends carry the system text
// out-of-band and strip inline system turns instead.

use super::types::{ChatTurn, Role};

/// Prepend a system turn when `system_prompt` is non-empty and the list has
/// none yet. An existing system turn always wins and the argument is
/// ignored. Idempotent.
pub fn normalize(turns: &[ChatTurn], system_prompt: Option<&str>) -> Vec<ChatTurn> {
    let mut out = turns.to_vec();

    if let Some(prompt) = system_prompt {
        let has_system = out.iter().any(|t| t.role == Role::System);
        if !prompt.is_empty() && !has_system {
            out.insert(0, ChatTurn::system(prompt));
        }
    }

    out
}

/// Drop system turns from the list.
///
/// Used by adapters that resend the system prompt through a dedicated
/// request field or a freshly built leading message.
pub fn strip_system(turns: &[ChatTurn]) -> Vec<ChatTurn> {
    turns
        .iter()
        .filter(|t| t.role != Role::System)
        .cloned()
        .collect()
}
