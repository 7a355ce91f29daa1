//! Exercise every Edge Function against a live project.
//!
//! Each step logs its result and the run continues on failure, except that
//! nothing after `sign-upload` can run without the path it returns.

use std::future::Future;

use anyhow::Context;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trustify_analyzer::config;
use trustify_analyzer::functions::{
    FunctionsClient, IngestText, ModerateImage, ModerateText, OcrSource, ProcessScreenshot,
    Search, SignRead, SignUpload,
};
use uuid::Uuid;

async fn step<F>(name: &str, call: F) -> Option<Value>
where
    F: Future<Output = anyhow::Result<Value>>,
{
    info!("-- {} --", name);
    match call.await {
        Ok(value) => {
            info!("{} SUCCESS: {}", name, value);
            Some(value)
        }
        Err(e) => {
            error!("{} ERROR: {:#}", name, e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "functions_smoke=info,trustify_analyzer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let http = config::outbound_client(config::http_timeout_from_env()?)?;
    let functions = FunctionsClient::from_env(http)?;

    let session_id = format!("testsession-{}", Uuid::new_v4());
    let Some(upload) = step("sign-upload", functions.sign_upload(&SignUpload::new(&session_id))).await
    else {
        anyhow::bail!("sign-upload failed, nothing else can run");
    };
    let path = upload
        .get("path")
        .and_then(Value::as_str)
        .context("sign-upload response has no `path`")?
        .to_string();

    let report_id = Uuid::new_v4().to_string();

    step("sign-read", functions.sign_read(&SignRead::new(&path))).await;
    step(
        "moderate-text",
        functions.moderate_text(&ModerateText::new(
            &report_id,
            "This is a moderation test text unique phrase XJ092!",
        )),
    )
    .await;
    step(
        "ingest-text",
        functions.ingest_text(&IngestText::new(
            &report_id,
            "This is an ingestion test phrase ZY882!",
        )),
    )
    .await;
    step(
        "search",
        functions.search(&Search::new("ingestion test phrase ZY882")),
    )
    .await;
    step(
        "process-screenshot",
        functions.process_screenshot(&ProcessScreenshot::new(&report_id, &path)),
    )
    .await;
    step(
        "moderate-image",
        functions.moderate_image(&ModerateImage::new(&report_id, &path)),
    )
    .await;
    step("ocr-extract", functions.ocr_extract(&OcrSource::stored(&path))).await;

    Ok(())
}
