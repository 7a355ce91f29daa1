//! Content-safety provider abstraction.
//!
//! Defines the [`ContentSafetyProvider`] trait, the ordinal [`RiskLevel`] band
//! and the [`SeverityBands`] table that maps a vendor severity onto a band.
//! Concrete vendors live in submodules; the harm decision lives in [`policy`].

pub mod azure;
pub mod policy;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ordinal risk band. `Unknown` is reserved for severities the table
/// does not cover.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskLevel {
    #[default]
    Safe,
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }

    /// True for the three bands that carry an actual finding.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Low | Self::Medium | Self::High)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Safe" => Ok(Self::Safe),
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "Unknown" => Ok(Self::Unknown),
            other => anyhow::bail!("Unknown risk level: {}", other),
        }
    }
}

/// Lookup table from vendor severity (the index) to [`RiskLevel`].
///
/// The vendor documents that the scale may differ per account, so the table
/// can be replaced from a JSON file instead of being hard-wired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityBands {
    table: Vec<RiskLevel>,
}

impl Default for SeverityBands {
    fn default() -> Self {
        use RiskLevel::*;
        Self {
            table: vec![Safe, Low, Low, Medium, Medium, High, High, High],
        }
    }
}

impl SeverityBands {
    pub fn new(table: Vec<RiskLevel>) -> Self {
        Self { table }
    }

    /// Load a table from a JSON array such as `["Safe","Low","Low","Medium"]`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read severity bands: {:?}", path))?;
        let bands: SeverityBands = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse severity bands: {:?}", path))?;

        if bands.is_empty() {
            anyhow::bail!("Severity band table in {:?} is empty", path);
        }

        info!("Loaded {} severity bands from {:?}", bands.table.len(), path);
        Ok(bands)
    }

    /// Map a severity to its band. Anything outside the table is `Unknown`.
    pub fn band_for(&self, severity: i64) -> RiskLevel {
        usize::try_from(severity)
            .ok()
            .and_then(|idx| self.table.get(idx).copied())
            .unwrap_or(RiskLevel::Unknown)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Per-request classification returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub categories: BTreeMap<String, RiskLevel>,
    pub confidence_scores: BTreeMap<String, f64>,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModerationResult {
    /// Build a result from raw `(category, severity, confidence)` triples.
    ///
    /// The overall band is the band of the highest severity, floored at 0.
    /// Missing confidences are recorded as 0.0.
    pub fn from_severities<I>(analyses: I, bands: &SeverityBands) -> Self
    where
        I: IntoIterator<Item = (String, i64, Option<f64>)>,
    {
        let mut result = Self::default();
        let mut max_severity = 0i64;

        for (category, severity, confidence) in analyses {
            result
                .categories
                .insert(category.clone(), bands.band_for(severity));
            result
                .confidence_scores
                .insert(category, confidence.unwrap_or(0.0));
            max_severity = max_severity.max(severity);
        }

        result.risk_level = bands.band_for(max_severity);
        result
    }
}

/// Errors raised by a content-safety provider.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed {provider} response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
}

/// Async trait implemented by each moderation vendor.
#[async_trait::async_trait]
pub trait ContentSafetyProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn analyze_text(&self, text: &str) -> Result<ModerationResult, ModerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_cover_documented_scale() {
        let bands = SeverityBands::default();
        let expected = [
            (0, RiskLevel::Safe),
            (1, RiskLevel::Low),
            (2, RiskLevel::Low),
            (3, RiskLevel::Medium),
            (4, RiskLevel::Medium),
            (5, RiskLevel::High),
            (6, RiskLevel::High),
            (7, RiskLevel::High),
        ];
        for (severity, band) in expected {
            assert_eq!(bands.band_for(severity), band, "severity {}", severity);
        }
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let bands = SeverityBands::default();
        assert_eq!(bands.band_for(-1), RiskLevel::Unknown);
        assert_eq!(bands.band_for(8), RiskLevel::Unknown);
        assert_eq!(bands.band_for(i64::MAX), RiskLevel::Unknown);
    }

    #[test]
    fn test_custom_table_from_json() {
        let bands: SeverityBands = serde_json::from_str(r#"["Safe","Medium","High"]"#).unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands.band_for(1), RiskLevel::Medium);
        assert_eq!(bands.band_for(3), RiskLevel::Unknown);
    }

    #[test]
    fn test_from_severities_uses_max_for_overall() {
        let bands = SeverityBands::default();
        let result = ModerationResult::from_severities(
            vec![
                ("Hate".to_string(), 2, Some(0.4)),
                ("Violence".to_string(), 4, None),
                ("SelfHarm".to_string(), 0, None),
            ],
            &bands,
        );

        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.categories["Hate"], RiskLevel::Low);
        assert_eq!(result.categories["SelfHarm"], RiskLevel::Safe);
        assert_eq!(result.confidence_scores["Violence"], 0.0);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_negative_severity_keeps_overall_safe() {
        let bands = SeverityBands::default();
        let result =
            ModerationResult::from_severities(vec![("Hate".to_string(), -3, None)], &bands);
        assert_eq!(result.categories["Hate"], RiskLevel::Unknown);
        assert_eq!(result.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn test_risk_level_round_trips_through_str() {
        for level in [RiskLevel::Safe, RiskLevel::High, RiskLevel::Unknown] {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
        assert!("Severe".parse::<RiskLevel>().is_err());
    }
}
