//! Trustify Analyzer server - composition root.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trustify_analyzer::config::AppConfig;
use trustify_analyzer::detector::ContentDetector;
use trustify_analyzer::moderation::azure::AzureContentSafetyProvider;
use trustify_analyzer::ocr::sidecar::SidecarOcrEngine;
use trustify_analyzer::ocr::OcrExtractor;
use trustify_analyzer::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trustify_analyzer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let http = config.http_client()?;

    let provider = AzureContentSafetyProvider::new(
        http.clone(),
        &config.azure.endpoint,
        &config.azure.api_key,
        config.severity_bands.clone(),
    )
    .with_api_version(&config.azure.api_version)
    .with_output_type(&config.azure.output_type);
    info!("Azure Content Safety provider initialized");

    let detector = ContentDetector::new(Arc::new(provider))
        .with_thresholds(config.thresholds.clone())
        .with_default_policy(config.default_policy);

    let engine = SidecarOcrEngine::new(http, &config.ocr_url, config.ocr_languages.clone());
    info!("OCR sidecar engine at {}", config.ocr_url);

    let state = AppState {
        detector: Arc::new(detector),
        ocr: OcrExtractor::new(Arc::new(engine)),
    };

    let app = server::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
