//! Azure AI Content Safety provider (text:analyze REST API).

use super::{ContentSafetyProvider, ModerationError, ModerationResult, SeverityBands};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "azure";
pub const DEFAULT_API_VERSION: &str = "2023-10-01";
pub const DEFAULT_OUTPUT_TYPE: &str = "EightSeverityLevels";

pub struct AzureContentSafetyProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    output_type: String,
    bands: SeverityBands,
}

impl AzureContentSafetyProvider {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        bands: SeverityBands,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            output_type: DEFAULT_OUTPUT_TYPE.to_string(),
            bands,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// `FourSeverityLevels` answers 0/2/4/6, `EightSeverityLevels` answers 0..=7.
    pub fn with_output_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = output_type.into();
        self
    }
}

// ============================================================================
// Content Safety request/response types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeTextRequest<'a> {
    text: &'a str,
    output_type: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeTextResponse {
    #[serde(default)]
    categories_analysis: Vec<CategoryAnalysis>,
}

#[derive(Deserialize)]
struct CategoryAnalysis {
    category: String,
    #[serde(default)]
    severity: Option<i64>,
    #[serde(default)]
    confidence: Option<f64>,
}

// ============================================================================
// Provider implementation
// ============================================================================

#[async_trait::async_trait]
impl ContentSafetyProvider for AzureContentSafetyProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn analyze_text(&self, text: &str) -> Result<ModerationResult, ModerationError> {
        let url = format!(
            "{}/contentsafety/text:analyze?api-version={}",
            self.endpoint, self.api_version
        );

        let body = AnalyzeTextRequest {
            text,
            output_type: &self.output_type,
        };

        let resp = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ModerationError::Transport {
                provider: PROVIDER,
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ModerationError::Status {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let raw_text = resp.text().await.map_err(|source| ModerationError::Transport {
            provider: PROVIDER,
            source,
        })?;
        debug!(
            "AzureContentSafetyProvider: raw response ({} bytes)",
            raw_text.len()
        );

        let parsed: AnalyzeTextResponse =
            serde_json::from_str(&raw_text).map_err(|e| ModerationError::Malformed {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(ModerationResult::from_severities(
            parsed
                .categories_analysis
                .into_iter()
                .map(|c| (c.category, c.severity.unwrap_or(0), c.confidence)),
            &self.bands,
        ))
    }
}
