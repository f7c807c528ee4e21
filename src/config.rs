// Process-wide configuration
//
// The original deployment sources everything from the environment; there is
// no config file.

/// Default Ollama endpoint, matching the server's own default bind address.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Model used for local generation when none is selected.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the local Ollama server.
    pub ollama_host: String,

    /// Default model name for local generation.
    pub default_model: String,
}

impl Config {
    /// Load configuration from `OLLAMA_HOST` and `DEFAULT_MODEL`, falling
    /// back to the built-in defaults when unset or empty.
    pub fn from_env() -> Self {
        Self {
            ollama_host: env_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST),
            default_model: env_or("DEFAULT_MODEL", DEFAULT_OLLAMA_MODEL),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            default_model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => fallback.to_string(),
    }
}
