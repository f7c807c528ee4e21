// Availability resolution against live probe state

use atelier::backends::{available_backends, backend_for_label, BackendKey, CredentialFlags};
use atelier::config::Config;

fn config_for(server: &mockito::Server) -> Config {
    Config {
        ollama_host: server.url(),
        default_model: "m".to_string(),
    }
}

fn unreachable_config() -> Config {
    Config {
        ollama_host: "http://127.0.0.1:1".to_string(),
        default_model: "m".to_string(),
    }
}

#[tokio::test]
async fn all_backends_listed_in_order_when_everything_is_available() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[]}"#)
        .create_async()
        .await;

    let flags = CredentialFlags {
        claude: true,
        openai: true,
        grok: true,
    };
    let labels = available_backends(&config_for(&server), flags).await;

    assert_eq!(
        labels,
        vec![
            "Ollama (Local)",
            "Claude (Anthropic)",
            "ChatGPT (OpenAI)",
            "Grok (xAI)",
        ]
    );
}

#[tokio::test]
async fn failed_probe_drops_the_local_backend() {
    let flags = CredentialFlags {
        claude: true,
        ..Default::default()
    };
    let labels = available_backends(&unreachable_config(), flags).await;
    assert_eq!(labels, vec!["Claude (Anthropic)"]);
}

#[tokio::test]
async fn never_returns_an_empty_list() {
    // No credentials, probe failing: the local label is force-included even
    // though it is not actually reachable.
    let labels = available_backends(&unreachable_config(), CredentialFlags::default()).await;
    assert_eq!(labels, vec!["Ollama (Local)"]);
}

#[tokio::test]
async fn probe_is_rechecked_on_every_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let config = config_for(&server);
    let flags = CredentialFlags::default();
    available_backends(&config, flags).await;
    available_backends(&config, flags).await;

    mock.assert_async().await;
}

#[test]
fn label_mapping_is_total() {
    assert_eq!(backend_for_label("Ollama (Local)"), BackendKey::Ollama);
    assert_eq!(backend_for_label("Claude (Anthropic)"), BackendKey::Claude);
    assert_eq!(backend_for_label("ChatGPT (OpenAI)"), BackendKey::ChatGpt);
    assert_eq!(backend_for_label("Grok (xAI)"), BackendKey::Grok);

    // Anything else resolves to the local backend, never an error.
    for junk in ["", "gpt-4", "Claude", "OLLAMA (LOCAL)", "🤖"] {
        assert_eq!(backend_for_label(junk), BackendKey::Ollama);
    }
}
