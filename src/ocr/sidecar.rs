//! OCR sidecar engine (EasyOCR-style `readtext` HTTP service).

use super::{OcrEngine, OcrError};
use serde::Deserialize;
use tracing::info;

/// Sidecar response (private deserialization type).
#[derive(Debug, Deserialize)]
struct ReadTextResponse {
    lines: Vec<String>,
}

pub struct SidecarOcrEngine {
    url: String,
    languages: Vec<String>,
    client: reqwest::Client,
}

impl SidecarOcrEngine {
    pub fn new(client: reqwest::Client, url: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            languages,
            client,
        }
    }
}

#[async_trait::async_trait]
impl OcrEngine for SidecarOcrEngine {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn read_lines(&self, png: Vec<u8>) -> Result<Vec<String>, OcrError> {
        use reqwest::multipart::{Form, Part};

        info!(
            "SidecarOcrEngine: sending {} bytes (languages={})",
            png.len(),
            self.languages.join(",")
        );

        let part = Part::bytes(png)
            .file_name("screenshot.png")
            .mime_str("image/png")?;

        let form = Form::new()
            .part("file", part)
            .text("languages", self.languages.join(","));

        let response = self
            .client
            .post(format!("{}/readtext", self.url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Engine { status, body });
        }

        let body = response.text().await?;
        let parsed: ReadTextResponse =
            serde_json::from_str(&body).map_err(|e| OcrError::Malformed(e.to_string()))?;

        Ok(parsed.lines)
    }
}
