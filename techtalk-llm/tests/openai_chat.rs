mod common;

use serde_json::json;
use techtalk_common::TechTalkError;
use techtalk_llm::openai::OpenAiClient;
use techtalk_llm::traits::LlmClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_endpoint(
        &format!("{}/v1", server.uri()),
        "sk-test".to_string(),
        "gpt-3.5-turbo".to_string(),
    )
    .expect("client")
}

#[tokio::test]
async fn sends_system_and_user_messages() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 500,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-3.5-turbo-0125",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi there"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .generate("hello", Some("be brief"), Some(500), Some(0.3))
        .await
        .expect("generate");

    assert_eq!(resp.text, "hi there");
    assert_eq!(resp.model.as_deref(), Some("gpt-3.5-turbo-0125"));
    assert_eq!(resp.tokens_used, Some(7));
}

#[tokio::test]
async fn null_content_becomes_empty_text() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .generate("hello", None, None, None)
        .await
        .expect("generate");
    assert!(resp.text.is_empty());
}

#[tokio::test]
async fn rate_limits_are_not_retried() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate("hello", None, Some(5), Some(0.0))
        .await
        .err()
        .expect("should fail");

    match err {
        TechTalkError::Provider(msg) => {
            assert!(msg.contains("429"), "{msg}");
            assert!(msg.contains("Rate limit reached"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn health_check_reports_false_on_failure() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!client_for(&server).health_check().await.unwrap());
}
