//! HTTP facade: routes, handlers and response envelopes.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::detector::{ContentDetector, HarmVerdict};
use crate::moderation::policy::HarmPolicy;
use crate::ocr::{OcrExtractor, OcrInput};

pub const DEGRADED_HEADER: &str = "x-analysis-degraded";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<ContentDetector>,
    pub ocr: OcrExtractor,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(capabilities))
        .route("/health", get(health))
        .route("/analyze/text", post(analyze_text))
        .route("/analyze/screenshot", post(analyze_screenshot))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Envelopes
// ============================================================================

#[derive(Debug, Serialize)]
struct OcrOutcome {
    ocr_text: Option<String>,
    ocr_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalysisEnvelope {
    ok: bool,
    input_kind: &'static str,
    #[serde(flatten)]
    verdict: HarmVerdict,
    #[serde(flatten)]
    ocr: Option<OcrOutcome>,
}

impl IntoResponse for AnalysisEnvelope {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if self.verdict.degraded {
            headers.insert(DEGRADED_HEADER, HeaderValue::from_static("true"));
        }
        (StatusCode::OK, headers, Json(self)).into_response()
    }
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    error_envelope(StatusCode::BAD_REQUEST, message)
}

fn error_envelope(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "ok": false, "error": message.into() })))
}

/// Oversized uploads keep their 413; every other multipart failure is a 400.
fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    let status = match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    error_envelope(status, format!("{}: {}", context, e.body_text()))
}

fn parse_policy(raw: Option<&str>) -> Result<Option<HarmPolicy>, ApiError> {
    raw.map(|p| p.parse::<HarmPolicy>())
        .transpose()
        .map_err(|e| bad_request(e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Static capability descriptor.
async fn capabilities(State(state): State<AppState>) -> Json<Value> {
    let policies: Vec<&str> = HarmPolicy::ALL.iter().map(|p| p.as_str()).collect();
    Json(json!({
        "name": "Trustify Analyzer",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "capability descriptor",
            "GET /health": "liveness and configured collaborators",
            "POST /analyze/text": "JSON {text, debug?, policy?}",
            "POST /analyze/screenshot": "multipart field `file`, query ?policy=&debug="
        },
        "policies": policies,
        "default_policy": state.detector.default_policy()
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.detector.provider_name(),
        "ocr_engine": state.ocr.engine_name()
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextRequest {
    text: String,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    policy: Option<String>,
}

async fn analyze_text(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<AnalysisEnvelope, ApiError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let policy = parse_policy(req.policy.as_deref())?;

    let verdict = state.detector.analyze(&req.text, policy, req.debug).await;

    Ok(AnalysisEnvelope {
        ok: !verdict.degraded,
        input_kind: "text",
        verdict,
        ocr: None,
    })
}

#[derive(Debug, Deserialize)]
struct ScreenshotQuery {
    policy: Option<String>,
    #[serde(default)]
    debug: bool,
}

/// OCR an uploaded screenshot, then analyze the recognized text.
async fn analyze_screenshot(
    State(state): State<AppState>,
    query: Result<Query<ScreenshotQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalysisEnvelope, ApiError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let policy = parse_policy(query.policy.as_deref())?;
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    let mut file_data = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        if field.name() == Some("file") {
            file_data = field
                .bytes()
                .await
                .map_err(|e| multipart_error("Failed to read file", e))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err(bad_request("No file uploaded"));
    }

    info!("Received screenshot ({} bytes)", file_data.len());

    let envelope = match state.ocr.extract_text(OcrInput::Bytes(file_data)).await {
        Ok(text) => {
            let verdict = state.detector.analyze(&text, policy, query.debug).await;
            AnalysisEnvelope {
                ok: !verdict.degraded,
                input_kind: "image",
                verdict,
                ocr: Some(OcrOutcome {
                    ocr_text: Some(text),
                    ocr_error: None,
                }),
            }
        }
        Err(e) => {
            warn!("OCR failed: {}", e);
            let verdict = HarmVerdict::degraded(
                state.detector.provider_name(),
                policy.unwrap_or(state.detector.default_policy()),
                format!("OCR failed: {}", e),
                0,
            );
            AnalysisEnvelope {
                ok: false,
                input_kind: "image",
                verdict,
                ocr: Some(OcrOutcome {
                    ocr_text: None,
                    ocr_error: Some(e.to_string()),
                }),
            }
        }
    };

    Ok(envelope)
}
