//! Harm-verdict policies.
//!
//! A [`HarmPolicy`] turns a [`ModerationResult`] into a single boolean. Two
//! named policies exist and callers pick one per request:
//!
//! - `enhanced`: an OR of three independent heuristics (non-Safe category,
//!   non-Safe overall band, confidence above a threshold). Each heuristic is
//!   tunable through [`HarmThresholds`].
//! - `legacy`: overall band is Low or worse AND at least one category is Low
//!   or worse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ModerationResult, RiskLevel};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarmPolicy {
    #[default]
    Enhanced,
    Legacy,
}

impl HarmPolicy {
    pub const ALL: [HarmPolicy; 2] = [HarmPolicy::Enhanced, HarmPolicy::Legacy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Legacy => "legacy",
        }
    }

    /// Decide whether `result` is harmful under this policy.
    pub fn is_harmful(
        &self,
        result: &ModerationResult,
        thresholds: &HarmThresholds,
        debug: bool,
    ) -> bool {
        match self {
            Self::Enhanced => enhanced_verdict(result, thresholds, debug),
            Self::Legacy => legacy_verdict(result, debug),
        }
    }
}

impl fmt::Display for HarmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HarmPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enhanced" => Ok(Self::Enhanced),
            "legacy" => Ok(Self::Legacy),
            other => anyhow::bail!(
                "Unknown harm policy: {}. Available: enhanced, legacy",
                other
            ),
        }
    }
}

/// Tunables for the `enhanced` policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmThresholds {
    /// Flag when any category band is not `Safe`.
    pub flag_non_safe_category: bool,
    /// Flag when the overall band is not `Safe`/`Unknown`.
    pub flag_overall_band: bool,
    /// Flag when any confidence is strictly above this value. `None` disables it.
    pub confidence_threshold: Option<f64>,
}

impl Default for HarmThresholds {
    fn default() -> Self {
        Self {
            flag_non_safe_category: true,
            flag_overall_band: true,
            confidence_threshold: Some(DEFAULT_CONFIDENCE_THRESHOLD),
        }
    }
}

fn enhanced_verdict(result: &ModerationResult, thresholds: &HarmThresholds, debug: bool) -> bool {
    let harmful_categories: Vec<String> = result
        .categories
        .iter()
        .filter(|(_, level)| **level != RiskLevel::Safe)
        .map(|(category, level)| format!("{}:{}", category, level))
        .collect();

    let overall_flagged = !matches!(result.risk_level, RiskLevel::Safe | RiskLevel::Unknown);

    let high_confidence: Vec<&str> = match thresholds.confidence_threshold {
        Some(limit) => result
            .confidence_scores
            .iter()
            .filter(|(_, score)| **score > limit)
            .map(|(category, _)| category.as_str())
            .collect(),
        None => Vec::new(),
    };

    let is_harmful = (thresholds.flag_non_safe_category && !harmful_categories.is_empty())
        || (thresholds.flag_overall_band && overall_flagged)
        || !high_confidence.is_empty();

    if debug {
        info!("Harm determination (enhanced):");
        info!("  - Harmful categories: {:?}", harmful_categories);
        info!("  - Risk level: {}", result.risk_level);
        info!("  - High confidence scores: {:?}", high_confidence);
        info!(
            "  - Final decision: {}",
            if is_harmful { "HARMFUL" } else { "SAFE" }
        );
    }

    is_harmful
}

fn legacy_verdict(result: &ModerationResult, debug: bool) -> bool {
    let any_category = result.categories.values().any(RiskLevel::is_flagged);
    let is_harmful = result.risk_level.is_flagged() && any_category;

    if debug {
        info!(
            "Harm determination (legacy): risk={} any_category={} -> {}",
            result.risk_level,
            any_category,
            if is_harmful { "HARMFUL" } else { "SAFE" }
        );
    }

    is_harmful
}

/// Human-readable summary of a verdict.
pub fn summarize(result: &ModerationResult, is_harmful: bool) -> String {
    if !is_harmful {
        return "Content appears to be safe and appropriate.".to_string();
    }

    let harmful: Vec<String> = result
        .categories
        .iter()
        .filter(|(_, level)| **level != RiskLevel::Safe)
        .map(|(category, level)| format!("{} ({})", category, level))
        .collect();

    if harmful.is_empty() {
        "Content flagged for review due to risk assessment.".to_string()
    } else {
        format!(
            "Potentially harmful content detected in categories: {}",
            harmful.join(", ")
        )
    }
}
