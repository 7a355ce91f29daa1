//! OCR adapter.
//!
//! Defines the [`OcrEngine`] trait so recognition backends can be swapped, and
//! the [`OcrExtractor`] that turns any [`OcrInput`] into plain text. Failures
//! are always an [`OcrError`]; an image without text is `Ok("")`.

pub mod sidecar;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

/// Image handed to the extractor.
pub enum OcrInput {
    Path(PathBuf),
    Image(DynamicImage),
    Bytes(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to read image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image for OCR engine: {0}")]
    Encode(#[source] image::ImageError),
    #[error("OCR engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("OCR engine error ({status}): {body}")]
    Engine { status: u16, body: String },
    #[error("malformed OCR engine response: {0}")]
    Malformed(String),
    #[error("OCR task aborted: {0}")]
    Task(String),
}

/// Async trait implemented by each recognition backend.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    /// Recognize text lines in a PNG-encoded image, in reading order.
    async fn read_lines(&self, png: Vec<u8>) -> Result<Vec<String>, OcrError>;
}

/// Decodes input images and runs them through an [`OcrEngine`].
#[derive(Clone)]
pub struct OcrExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl OcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Extract text as newline-joined lines, trimmed.
    pub async fn extract_text(&self, input: OcrInput) -> Result<String, OcrError> {
        let image = match input {
            OcrInput::Image(image) => image,
            OcrInput::Bytes(data) => decode_blocking(data).await?,
            OcrInput::Path(path) => {
                let data = match tokio::fs::read(&path).await {
                    Ok(data) => data,
                    Err(source) => return Err(OcrError::Io { path, source }),
                };
                decode_blocking(data).await?
            }
        };

        info!(
            "OcrExtractor: {}x{} image via {}",
            image.width(),
            image.height(),
            self.engine.name()
        );

        let png = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| OcrError::Task(e.to_string()))??;

        let lines = self.engine.read_lines(png).await?;
        debug!("OcrExtractor: {} lines recognized", lines.len());

        Ok(join_lines(&lines))
    }
}

async fn decode_blocking(data: Vec<u8>) -> Result<DynamicImage, OcrError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&data).map_err(OcrError::Decode))
        .await
        .map_err(|e| OcrError::Task(e.to_string()))?
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(OcrError::Encode)?;
    Ok(buf)
}

/// Join recognized segments with newlines and trim the whole.
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n").trim().to_string()
}
