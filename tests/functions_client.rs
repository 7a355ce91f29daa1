//! Mock API tests for the Edge Functions client: routing, tier keys and
//! pass-through of response bodies.

use serde_json::json;
use trustify_analyzer::functions::{
    FunctionsClient, IngestText, ModerateImage, ModerateText, OcrSource, ProcessScreenshot,
    Search, SignRead, SignUpload,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON: &str = "anon-key";
const SERVICE: &str = "service-role-key";

fn client(server: &MockServer) -> FunctionsClient {
    FunctionsClient::new(
        reqwest::Client::new(),
        format!("{}/functions/v1", server.uri()),
        ANON,
        SERVICE,
    )
}

async fn expect_call(server: &MockServer, function: &str, key: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("/functions/v1/{}", function)))
        .and(header("Authorization", format!("Bearer {}", key).as_str()))
        .and(body_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"function": function})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_public_tier_functions_use_anon_key() {
    let server = MockServer::start().await;
    expect_call(
        &server,
        "sign-upload",
        ANON,
        json!({"sessionId": "s1", "bucket": "session-uploads", "mime": "image/jpeg", "pathPrefix": "tmp"}),
    )
    .await;
    expect_call(
        &server,
        "sign-read",
        ANON,
        json!({"path": "tmp/s1/a.jpg", "bucket": "session-uploads", "expiresSec": 600}),
    )
    .await;
    expect_call(
        &server,
        "search",
        ANON,
        json!({"query_text": "drawing competition", "k": 5, "report_id": null, "min_score": 0.0}),
    )
    .await;
    expect_call(&server, "ocr-extract", ANON, json!({"imageUrl": "https://cdn/x.png"})).await;

    let functions = client(&server);
    assert_eq!(
        functions.sign_upload(&SignUpload::new("s1")).await.unwrap(),
        json!({"function": "sign-upload"})
    );
    functions.sign_read(&SignRead::new("tmp/s1/a.jpg")).await.unwrap();
    functions
        .search(&Search::new("drawing competition"))
        .await
        .unwrap();
    functions
        .ocr_extract(&OcrSource::url("https://cdn/x.png"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_privileged_functions_use_service_role_key() {
    let server = MockServer::start().await;
    expect_call(
        &server,
        "moderate-text",
        SERVICE,
        json!({"report_id": "r1", "text": "hi", "media_id": null, "chunk_id": null, "outputType": "FourSeverityLevels"}),
    )
    .await;
    expect_call(
        &server,
        "moderate-image",
        SERVICE,
        json!({"report_id": "r1", "path": "tmp/a.jpg", "bucket": "session-uploads", "expiresSec": 180, "media_id": null}),
    )
    .await;
    expect_call(
        &server,
        "ingest-text",
        SERVICE,
        json!({"report_id": "r1", "text": "chunk", "lang": "en"}),
    )
    .await;
    expect_call(
        &server,
        "process-screenshot",
        SERVICE,
        json!({"report_id": "r1", "bucket": "session-uploads", "path": "tmp/a.jpg", "mime": "image/jpeg"}),
    )
    .await;

    let functions = client(&server);
    functions
        .moderate_text(&ModerateText::new("r1", "hi"))
        .await
        .unwrap();
    functions
        .moderate_image(&ModerateImage::new("r1", "tmp/a.jpg"))
        .await
        .unwrap();
    functions
        .ingest_text(&IngestText::new("r1", "chunk"))
        .await
        .unwrap();
    functions
        .process_screenshot(&ProcessScreenshot::new("r1", "tmp/a.jpg"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid JWT"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .search(&Search::new("x"))
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("search"), "{}", err);
    assert!(err.contains("401"), "{}", err);
    assert!(err.contains("Invalid JWT"), "{}", err);
}
