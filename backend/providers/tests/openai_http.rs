use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storytalk_core::{LlmProvider, LlmRequest, PromptSegment, ProviderError, TokenUsage};
use storytalk_providers::OpenAiProvider;

#[tokio::test]
async fn inlined_system_prompt_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.3,
            "messages": [{ "role": "system", "content": "prompt\n\nUser: Привіт\nAssistant:" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello! Let's speak English." } }],
            "usage": { "prompt_tokens": 80, "completion_tokens": 9, "total_tokens": 89 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("sk-test").with_base_url(mock_server.uri());
    let request = LlmRequest::new(vec![PromptSegment::plain(
        "prompt\n\nUser: Привіт\nAssistant:",
    )]);
    let response = provider.complete(&request).await.unwrap();

    assert_eq!(response.content, "Hello! Let's speak English.");
    assert_eq!(response.model, "gpt-4o-mini");
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 80);
    assert_eq!(usage.output_tokens, 9);
}

#[tokio::test]
async fn rate_limit_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("sk-test").with_base_url(mock_server.uri());
    let err = provider
        .complete(&LlmRequest::new(vec![PromptSegment::plain("x")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn null_content_is_empty_response_with_usage() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 0 }
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("sk-test").with_base_url(mock_server.uri());
    let err = provider
        .complete(&LlmRequest::new(vec![PromptSegment::plain("x")]))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    match err {
        ProviderError::EmptyResponse { response } => {
            assert_eq!(response.model, "gpt-4o-mini");
            assert_eq!(
                response.usage,
                Some(TokenUsage {
                    input_tokens: 12,
                    output_tokens: 0
                })
            );
        }
        other => panic!("expected EmptyResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("sk-test").with_base_url(mock_server.uri());
    let err = provider
        .complete(&LlmRequest::new(vec![PromptSegment::plain("x")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)));
}
