//! Mock API tests for the Azure Content Safety provider.
//!
//! Response shapes follow the `text:analyze` REST reference (2023-10-01).

use std::time::Duration;

use serde_json::json;
use trustify_analyzer::config::AppConfig;
use trustify_analyzer::moderation::azure::AzureContentSafetyProvider;
use trustify_analyzer::moderation::{
    ContentSafetyProvider, ModerationError, RiskLevel, SeverityBands,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> AzureContentSafetyProvider {
    AzureContentSafetyProvider::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        "test-key",
        SeverityBands::default(),
    )
}

#[tokio::test]
async fn test_analyze_text_maps_severities() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contentsafety/text:analyze"))
        .and(query_param("api-version", "2023-10-01"))
        .and(header("Ocp-Apim-Subscription-Key", "test-key"))
        .and(body_json(json!({
            "text": "Hello, nice day!",
            "outputType": "EightSeverityLevels"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "blocklistsMatch": [],
            "categoriesAnalysis": [
                {"category": "Hate", "severity": 0},
                {"category": "SelfHarm", "severity": 0},
                {"category": "Sexual", "severity": 3, "confidence": 0.42},
                {"category": "Violence", "severity": 6}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .analyze_text("Hello, nice day!")
        .await
        .unwrap();

    assert_eq!(result.categories["Hate"], RiskLevel::Safe);
    assert_eq!(result.categories["Sexual"], RiskLevel::Medium);
    assert_eq!(result.categories["Violence"], RiskLevel::High);
    assert_eq!(result.confidence_scores["Sexual"], 0.42);
    assert_eq!(result.confidence_scores["Hate"], 0.0);
    assert_eq!(result.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn test_custom_api_version_and_output_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("api-version", "2024-09-01"))
        .and(body_json(json!({
            "text": "x",
            "outputType": "FourSeverityLevels"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categoriesAnalysis": [{"category": "Hate", "severity": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = provider(&server)
        .with_api_version("2024-09-01")
        .with_output_type("FourSeverityLevels")
        .analyze_text("x")
        .await
        .unwrap();

    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "401", "message": "Access denied due to invalid subscription key"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).analyze_text("x").await.unwrap_err();

    match err {
        ModerationError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid subscription key"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).analyze_text("x").await.unwrap_err();
    assert!(matches!(err, ModerationError::Malformed { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_configured_timeout_bounds_the_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"categoriesAnalysis": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = AppConfig::from_lookup(|key: &str| match key {
        "AZURE_CONTENT_SAFETY_ENDPOINT" => Some(uri.clone()),
        "AZURE_CONTENT_SAFETY_KEY" => Some("test-key".to_string()),
        "HTTP_TIMEOUT_SECS" => Some("1".to_string()),
        _ => None,
    })
    .unwrap();

    let provider = AzureContentSafetyProvider::new(
        config.http_client().unwrap(),
        config.azure.endpoint.clone(),
        config.azure.api_key.clone(),
        config.severity_bands.clone(),
    );

    let started = std::time::Instant::now();
    let err = provider.analyze_text("slow").await.unwrap_err();

    assert!(matches!(err, ModerationError::Transport { .. }), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(4));
}
