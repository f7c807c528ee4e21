// Cloud adapter streaming behavior against mock servers
//
// Covers the two SSE dialects (Anthropic events, OpenAI-compatible
// chat-completions) and the credential precondition in `generate`.

use atelier::backends::claude::ClaudeBackend;
use atelier::backends::openai::OpenAiBackend;
use atelier::backends::{
    self, BackendKey, ChatTurn, Fragment, FragmentErrorKind, FragmentStream, GenerationRequest,
    TextBackend,
};
use atelier::config::Config;

async fn collect(mut stream: FragmentStream) -> Vec<Fragment> {
    let mut out = Vec::new();
    while let Some(fragment) = stream.recv().await {
        out.push(fragment);
    }
    out
}

fn request_for(backend: BackendKey) -> GenerationRequest {
    GenerationRequest::new(backend, vec![ChatTurn::user("hi")])
}

#[tokio::test]
async fn chatgpt_forwards_sse_deltas_until_done() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"finish_reason\":null}]}\n",
        "\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"},\"finish_reason\":null}]}\n",
        "\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
        "\n",
        "data: [DONE]\n",
    );
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = OpenAiBackend::new_chatgpt("test-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::ChatGpt)).await).await;

    assert_eq!(
        fragments,
        vec![
            Fragment::Delta("Hello".to_string()),
            Fragment::Delta(" world".to_string()),
        ]
    );
}

#[tokio::test]
async fn chatgpt_drops_empty_deltas_and_junk_lines() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"\"},\"finish_reason\":null}]}\n",
        "data: not json\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\n",
        "data: [DONE]\n",
    );
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = OpenAiBackend::new_chatgpt("test-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::ChatGpt)).await).await;

    assert_eq!(fragments, vec![Fragment::Delta("ok".to_string())]);
}

#[tokio::test]
async fn grok_shares_the_chat_completions_wire() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"id\":\"g1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hey\"},\"finish_reason\":null}]}\n",
        "data: [DONE]\n",
    );
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = OpenAiBackend::new_grok("test-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::Grok)).await).await;

    assert_eq!(fragments, vec![Fragment::Delta("hey".to_string())]);
}

#[tokio::test]
async fn grok_non_200_yields_one_fragment_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let backend = OpenAiBackend::new_grok("test-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::Grok)).await).await;

    assert_eq!(fragments.len(), 1);
    match &fragments[0] {
        Fragment::Error { kind, message } => {
            assert_eq!(*kind, FragmentErrorKind::Transport);
            assert!(message.contains("403"));
            assert!(message.contains("xAI"));
        }
        other => panic!("expected error fragment, got {other:?}"),
    }
}

#[tokio::test]
async fn claude_forwards_content_block_deltas() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"m1\"}}\n",
        "\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n",
        "\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n",
        "\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n",
    );
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = ClaudeBackend::new("test-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::Claude)).await).await;

    assert_eq!(
        fragments,
        vec![
            Fragment::Delta("Hi".to_string()),
            Fragment::Delta(" there".to_string()),
        ]
    );
}

#[tokio::test]
async fn claude_non_200_yields_one_fragment_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_body(r#"{"error":{"message":"bad key"}}"#)
        .create_async()
        .await;

    let backend = ClaudeBackend::new("bad-key")
        .unwrap()
        .with_base_url(server.url());
    let fragments = collect(backend.stream(&request_for(BackendKey::Claude)).await).await;

    assert_eq!(fragments.len(), 1);
    match &fragments[0] {
        Fragment::Error { kind, message } => {
            assert_eq!(*kind, FragmentErrorKind::Transport);
            assert!(message.contains("401"));
        }
        other => panic!("expected error fragment, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_short_circuits_every_cloud_backend() {
    let config = Config::default();

    for (backend, name) in [
        (BackendKey::Claude, "Claude"),
        (BackendKey::ChatGpt, "ChatGPT"),
        (BackendKey::Grok, "Grok"),
    ] {
        let request = request_for(backend);
        let fragments = collect(backends::generate(&config, &request).await).await;

        assert_eq!(fragments.len(), 1, "{name} should yield exactly one fragment");
        assert_eq!(
            fragments[0],
            Fragment::error(
                FragmentErrorKind::MissingCredential,
                format!("{name} API key not provided.")
            )
        );
    }
}

#[tokio::test]
async fn empty_credential_counts_as_missing() {
    let config = Config::default();
    let request = request_for(BackendKey::Claude).with_credential("");
    let fragments = collect(backends::generate(&config, &request).await).await;

    assert_eq!(fragments.len(), 1);
    assert!(matches!(
        fragments[0],
        Fragment::Error {
            kind: FragmentErrorKind::MissingCredential,
            ..
        }
    ));
}
