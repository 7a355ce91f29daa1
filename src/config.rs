//! Process configuration.
//!
//! Read once at startup from the environment (after `.env` is loaded). The
//! severity band table can be overridden from a JSON file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::moderation::azure::{DEFAULT_API_VERSION, DEFAULT_OUTPUT_TYPE};
use crate::moderation::policy::{HarmPolicy, HarmThresholds, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::moderation::SeverityBands;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OCR_URL: &str = "http://localhost:3001";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Azure Content Safety connection settings.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub output_type: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub azure: AzureConfig,
    pub ocr_url: String,
    pub ocr_languages: Vec<String>,
    pub http_timeout: Duration,
    pub max_upload_bytes: usize,
    pub default_policy: HarmPolicy,
    pub thresholds: HarmThresholds,
    pub severity_bands: SeverityBands,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = get("AZURE_CONTENT_SAFETY_ENDPOINT");
        let api_key = get("AZURE_CONTENT_SAFETY_KEY");
        let (endpoint, api_key) = match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => (endpoint, api_key),
            _ => {
                return Err(anyhow!(
                    "Missing AZURE_CONTENT_SAFETY_KEY or AZURE_CONTENT_SAFETY_ENDPOINT"
                ))
            }
        };

        let azure = AzureConfig {
            endpoint,
            api_key,
            api_version: get("AZURE_CONTENT_SAFETY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            output_type: get("AZURE_CONTENT_SAFETY_OUTPUT_TYPE")
                .unwrap_or_else(|| DEFAULT_OUTPUT_TYPE.to_string()),
        };

        let http_timeout = parse_timeout(get("HTTP_TIMEOUT_SECS"))?;

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid MAX_UPLOAD_BYTES: {}", v))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let default_policy = match get("HARM_POLICY") {
            Some(v) => v.parse()?,
            None => HarmPolicy::default(),
        };

        let confidence_threshold = match get("HARM_CONFIDENCE_THRESHOLD") {
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => {
                let value: f64 = v
                    .parse()
                    .with_context(|| format!("Invalid HARM_CONFIDENCE_THRESHOLD: {}", v))?;
                if !(0.0..=1.0).contains(&value) {
                    anyhow::bail!("HARM_CONFIDENCE_THRESHOLD must be within 0.0..=1.0, got {}", value);
                }
                Some(value)
            }
            None => Some(DEFAULT_CONFIDENCE_THRESHOLD),
        };

        let thresholds = HarmThresholds {
            confidence_threshold,
            ..HarmThresholds::default()
        };

        let severity_bands = match get("SEVERITY_BANDS_PATH") {
            Some(path) => SeverityBands::load_from_file(&PathBuf::from(path))?,
            None => SeverityBands::default(),
        };

        let ocr_languages: Vec<String> = get("OCR_LANGUAGES")
            .unwrap_or_else(|| "en".to_string())
            .split(',')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        let config = Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            azure,
            ocr_url: get("OCR_URL").unwrap_or_else(|| DEFAULT_OCR_URL.to_string()),
            ocr_languages,
            http_timeout,
            max_upload_bytes,
            default_policy,
            thresholds,
            severity_bands,
        };

        info!(
            "Config loaded: bind={} policy={} timeout={:?} ocr={}",
            config.bind_addr, config.default_policy, config.http_timeout, config.ocr_url
        );
        Ok(config)
    }

    /// Shared outbound HTTP client with explicit timeouts.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        outbound_client(self.http_timeout)
    }
}

fn parse_timeout(raw: Option<String>) -> Result<Duration> {
    match raw {
        Some(v) => Ok(Duration::from_secs(
            v.parse()
                .with_context(|| format!("Invalid HTTP_TIMEOUT_SECS: {}", v))?,
        )),
        None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    }
}

/// `HTTP_TIMEOUT_SECS` on its own, for binaries that need no vendor settings.
pub fn http_timeout_from_env() -> Result<Duration> {
    parse_timeout(
        std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    )
}

/// Outbound client with a total timeout and a connect timeout capped at 10s.
pub fn outbound_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .build()
        .context("Failed to build HTTP client")
}
