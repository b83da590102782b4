/*!
 * Tests for the OpenAI-compatible transport, against a local fake server
 */

use srtai::app_config::Config;
use srtai::errors::ProviderError;
use srtai::providers::openai::OpenAI;
use srtai::providers::Provider;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

use crate::common::fake_server::{self, FakeServer};

const OK_BODY: &str = r#"{
    "id": "chatcmpl-1",
    "choices": [{"index": 0, "message": {"role": "assistant", "content": "<answer><text id=\"1\">Bonjour</text></answer>"}, "finish_reason": "stop"}],
    "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
}"#;

fn provider(base_url: &str, api_key: &str) -> OpenAI {
    let url = Url::parse(base_url).expect("valid test url");
    OpenAI::new(&url, api_key, "test-model").expect("client builds")
}

fn config_for(base_url: &str) -> Config {
    let mut config = Config {
        target_language: "fr".to_string(),
        model: "test-model".to_string(),
        endpoint: base_url.to_string(),
        ..Config::default()
    };
    config.translation.retry_backoff_ms = 10;
    config
}

#[tokio::test]
async fn test_complete_withSuccess_shouldReturnTextAndUsage() {
    let server = FakeServer::start(vec![(200, OK_BODY.to_string())]).await;
    let openai = provider(&server.base_url, "sk-test");

    let completion = openai.complete("Translate this").await.unwrap();

    assert_eq!(completion.text, "<answer><text id=\"1\">Bonjour</text></answer>");
    assert_eq!(completion.prompt_tokens, Some(42));
    assert_eq!(completion.completion_tokens, Some(7));

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_lowercase();
    assert!(request.starts_with("post /v1/chat/completions"));
    assert!(request.contains("authorization: bearer sk-test"));
    assert!(requests[0].contains("\"model\":\"test-model\""));
    assert!(requests[0].contains("Translate this"));
}

#[tokio::test]
async fn test_complete_withEmptyKey_shouldNotSendAuthorization() {
    let server = FakeServer::start(vec![(200, OK_BODY.to_string())]).await;
    let openai = provider(&server.base_url, "");

    openai.complete("hi").await.unwrap();

    let requests = server.requests().await;
    assert!(!requests[0].to_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_complete_withUnauthorized_shouldFailWithoutRetry() {
    let server = FakeServer::start(vec![(401, r#"{"error":{"message":"invalid key"}}"#.to_string())]).await;
    let openai = OpenAI::from_config(&config_for(&server.base_url)).unwrap();

    let err = openai.complete("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::AuthenticationError(ref m) if m.contains("invalid key")));
    assert_eq!(server.requests().await.len(), 1);
}

#[tokio::test]
async fn test_complete_withUnknownModel_shouldReportModelNotFound() {
    let server = FakeServer::start(vec![(404, r#"{"error":"no such model"}"#.to_string())]).await;
    let openai = provider(&server.base_url, "");

    let err = openai.complete("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m.contains("test-model")));
}

#[tokio::test]
async fn test_complete_withServerErrorThenSuccess_shouldRetry() {
    let server = FakeServer::start(vec![
        (503, "overloaded".to_string()),
        (200, OK_BODY.to_string()),
    ])
    .await;
    let openai = OpenAI::from_config(&config_for(&server.base_url)).unwrap();

    let completion = openai.complete("hi").await.unwrap();

    assert!(completion.text.contains("Bonjour"));
    assert_eq!(server.requests().await.len(), 2);
}

#[tokio::test]
async fn test_complete_withPersistentServerError_shouldGiveUpAfterRetries() {
    let server = FakeServer::start(vec![
        (500, "down".to_string()),
        (500, "down".to_string()),
        (500, "still down".to_string()),
    ])
    .await;
    let openai = OpenAI::from_config(&config_for(&server.base_url)).unwrap();

    let err = openai.complete("hi").await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::ApiError {
            status_code: 500,
            message: "still down".to_string()
        }
    );
    assert_eq!(server.requests().await.len(), 3);
}

#[tokio::test]
async fn test_complete_withNoChoices_shouldBeParseError() {
    let server = FakeServer::start(vec![(200, r#"{"choices": []}"#.to_string())]).await;
    let openai = provider(&server.base_url, "");

    let err = openai.complete("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::ParseError(_)));
}

#[tokio::test]
async fn test_complete_withNonJsonBody_shouldBeParseError() {
    let server = FakeServer::start(vec![(200, "<html>proxy page</html>".to_string())]).await;
    let openai = provider(&server.base_url, "");

    let err = openai.complete("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::ParseError(_)));
}

#[tokio::test]
async fn test_complete_withClosedPort_shouldBeConnectionError() {
    let base_url = fake_server::closed_port_url().await;
    let openai = provider(&base_url, "");

    let err = openai.complete("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::ConnectionError(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_complete_withSilentServer_shouldTimeOut() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _holder = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let mut config = config_for(&format!("http://{}/v1", addr));
    config.translation.timeout_secs = 1;
    let openai = OpenAI::from_config(&config).unwrap();

    let err = openai.complete("hi").await.unwrap_err();

    assert_eq!(err, ProviderError::Timeout(1));
}

#[tokio::test]
async fn test_testConnection_shouldAcceptServersWithoutModelList() {
    let server = FakeServer::start(vec![(404, "not here".to_string())]).await;
    let openai = provider(&server.base_url, "");

    openai.test_connection().await.unwrap();

    let requests = server.requests().await;
    assert!(requests[0].starts_with("GET /v1/models"));
}

#[tokio::test]
async fn test_testConnection_withBadKey_shouldFail() {
    let server = FakeServer::start(vec![(401, "nope".to_string())]).await;
    let openai = provider(&server.base_url, "wrong");

    let err = openai.test_connection().await.unwrap_err();

    assert!(matches!(err, ProviderError::AuthenticationError(_)));
}
