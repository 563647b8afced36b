//! OpenAI-compatible client against a mock HTTP server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vault_core::domain::{ChatRole, ChatTurn};
use vault_core::error::DomainError;
use vault_core::ports::{CompletionClient, CompletionRequest};
use vault_infrastructure::OpenAiCompletionClient;
use vault_shared::config::ChatSettings;

fn settings(base_url: String, api_key: Option<&str>) -> ChatSettings {
    ChatSettings {
        base_url,
        api_key: api_key.map(String::from),
        referer: Some("http://localhost:3001".into()),
        ..Default::default()
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "openai/gpt-4o".into(),
        messages: vec![ChatTurn { role: ChatRole::User, content: "Hello".into() }],
        temperature: 0.7,
        max_tokens: 1000,
    }
}

#[tokio::test]
async fn forwards_request_and_extracts_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("x-title", "Audit Vault"))
        .and(header("http-referer", "http://localhost:3001"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4o",
            "max_tokens": 1000,
            "messages": [{ "role": "user", "content": "Hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiCompletionClient::new(&settings(server.uri(), Some("test-key"))).unwrap();
    let response = client.complete(&request()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("Hi there"));
    assert_eq!(response.raw["id"], "gen-1");
}

#[tokio::test]
async fn missing_api_key_is_unavailable_without_a_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiCompletionClient::new(&settings(server.uri(), None)).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(DomainError::UpstreamUnavailable(_))
    ));
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": { "message": "slow down" } })))
        .mount(&server)
        .await;

    let client = OpenAiCompletionClient::new(&settings(server.uri(), Some("k"))).unwrap();
    assert!(matches!(client.complete(&request()).await, Err(DomainError::RateLimited(_))));
}

#[tokio::test]
async fn upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": { "message": "model not found" } })),
        )
        .mount(&server)
        .await;

    let client = OpenAiCompletionClient::new(&settings(server.uri(), Some("k"))).unwrap();
    match client.complete(&request()).await {
        Err(DomainError::Upstream(message)) => assert_eq!(message, "model not found"),
        other => panic!("unexpected result: {:?}", other),
    }
}
