//! Supabase Edge Functions client.
//!
//! Every function is a JSON POST with a bearer key chosen by [`Tier`]. The
//! response body is returned as-is; non-2xx answers become errors. There is
//! no retry.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_BUCKET: &str = "session-uploads";

/// Which key a function call is authorized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Anon key, safe to hand to untrusted clients.
    Public,
    /// Service-role key, server side only.
    ServiceRole,
}

/// Edge Functions client.
#[derive(Clone)]
pub struct FunctionsClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl FunctionsClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into().trim().to_string(),
            service_role_key: service_role_key.into().trim().to_string(),
        }
    }

    /// Create a client from environment variables.
    ///
    /// `SUPABASE_FUNCTIONS_URL` wins; otherwise `SUPABASE_URL` + `/functions/v1`.
    pub fn from_env(client: Client) -> Result<Self> {
        let base_url = match std::env::var("SUPABASE_FUNCTIONS_URL") {
            Ok(url) => url,
            Err(_) => {
                let project = std::env::var("SUPABASE_URL")
                    .map_err(|_| anyhow!("SUPABASE_FUNCTIONS_URL or SUPABASE_URL not set"))?;
                format!("{}/functions/v1", project.trim_end_matches('/'))
            }
        };
        let anon_key =
            std::env::var("SUPABASE_ANON_KEY").map_err(|_| anyhow!("SUPABASE_ANON_KEY not set"))?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| anyhow!("SUPABASE_SERVICE_ROLE_KEY not set"))?;

        Ok(Self::new(client, base_url, anon_key, service_role_key))
    }

    fn key_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Public => &self.anon_key,
            Tier::ServiceRole => &self.service_role_key,
        }
    }

    /// POST a JSON body to a function and return the parsed response.
    async fn call<B: Serialize + ?Sized>(&self, function: &str, tier: Tier, body: &B) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, function);
        debug!("Calling function {} ({:?} tier)", function, tier);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.key_for(tier))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call function {}", function))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Function {} failed: {} - {}", function, status, text));
        }

        let value: Value = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", function))?;

        info!("Function {} succeeded", function);
        Ok(value)
    }

    /// Get a signed upload URL for a new object under `pathPrefix/sessionId`.
    pub async fn sign_upload(&self, req: &SignUpload) -> Result<Value> {
        self.call("sign-upload", Tier::Public, req).await
    }

    /// Get a short-lived signed read URL for a stored object.
    pub async fn sign_read(&self, req: &SignRead) -> Result<Value> {
        self.call("sign-read", Tier::Public, req).await
    }

    pub async fn moderate_text(&self, req: &ModerateText) -> Result<Value> {
        self.call("moderate-text", Tier::ServiceRole, req).await
    }

    pub async fn moderate_image(&self, req: &ModerateImage) -> Result<Value> {
        self.call("moderate-image", Tier::ServiceRole, req).await
    }

    pub async fn ocr_extract(&self, source: &OcrSource) -> Result<Value> {
        self.call("ocr-extract", Tier::Public, source).await
    }

    /// Chunk, embed and index text for a report.
    pub async fn ingest_text(&self, req: &IngestText) -> Result<Value> {
        self.call("ingest-text", Tier::ServiceRole, req).await
    }

    pub async fn search(&self, req: &Search) -> Result<Value> {
        self.call("search", Tier::Public, req).await
    }

    /// Run the server-side OCR + moderation + ingest pipeline on an upload.
    pub async fn process_screenshot(&self, req: &ProcessScreenshot) -> Result<Value> {
        self.call("process-screenshot", Tier::ServiceRole, req).await
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpload {
    pub session_id: String,
    pub bucket: String,
    pub mime: String,
    pub path_prefix: String,
}

impl SignUpload {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            mime: "image/jpeg".to_string(),
            path_prefix: "tmp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRead {
    pub path: String,
    pub bucket: String,
    pub expires_sec: u32,
}

impl SignRead {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            expires_sec: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModerateText {
    pub report_id: String,
    pub text: String,
    pub media_id: Option<String>,
    pub chunk_id: Option<String>,
    #[serde(rename = "outputType")]
    pub output_type: String,
}

impl ModerateText {
    pub fn new(report_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            text: text.into(),
            media_id: None,
            chunk_id: None,
            output_type: "FourSeverityLevels".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModerateImage {
    pub report_id: String,
    pub path: String,
    pub bucket: String,
    #[serde(rename = "expiresSec")]
    pub expires_sec: u32,
    pub media_id: Option<String>,
}

impl ModerateImage {
    pub fn new(report_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            path: path.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            expires_sec: 180,
            media_id: None,
        }
    }
}

/// Where `ocr-extract` should read the image from.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OcrSource {
    Url {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Stored {
        bucket: String,
        path: String,
        #[serde(rename = "expiresSec")]
        expires_sec: u32,
    },
}

impl OcrSource {
    pub fn url(image_url: impl Into<String>) -> Self {
        Self::Url {
            image_url: image_url.into(),
        }
    }

    pub fn stored(path: impl Into<String>) -> Self {
        Self::Stored {
            bucket: DEFAULT_BUCKET.to_string(),
            path: path.into(),
            expires_sec: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestText {
    pub report_id: String,
    pub text: String,
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl IngestText {
    pub fn new(report_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            text: text.into(),
            lang: "en".to_string(),
            media_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Search {
    pub query_text: String,
    pub k: u32,
    pub report_id: Option<String>,
    pub min_score: f64,
}

impl Search {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            k: 5,
            report_id: None,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessScreenshot {
    pub report_id: String,
    pub bucket: String,
    pub path: String,
    pub mime: String,
}

impl ProcessScreenshot {
    pub fn new(report_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            path: path.into(),
            mime: "image/jpeg".to_string(),
        }
    }
}
