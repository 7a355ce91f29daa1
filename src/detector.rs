//! Content detector: provider call plus harm policy, with fail-safe fallbacks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::moderation::policy::{summarize, HarmPolicy, HarmThresholds};
use crate::moderation::{ContentSafetyProvider, ModerationResult, RiskLevel};

pub const EMPTY_INPUT_ERROR: &str = "Empty or whitespace-only text provided";

/// Normalized verdict returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmVerdict {
    pub is_harmful: bool,
    pub risk_level: RiskLevel,
    pub categories: BTreeMap<String, RiskLevel>,
    pub confidence_scores: BTreeMap<String, f64>,
    pub provider: String,
    pub error: Option<String>,
    pub text_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_summary: Option<String>,
    pub policy: HarmPolicy,
    /// Set when a downstream failure produced this verdict.
    pub degraded: bool,
}

impl HarmVerdict {
    fn safe_default(provider: &str, policy: HarmPolicy, error: String, text_length: usize) -> Self {
        Self {
            is_harmful: false,
            risk_level: RiskLevel::Safe,
            categories: BTreeMap::new(),
            confidence_scores: BTreeMap::new(),
            provider: provider.to_string(),
            error: Some(error),
            text_length,
            analysis_summary: None,
            policy,
            degraded: false,
        }
    }

    /// Verdict for empty or whitespace-only input. Not degraded.
    pub fn empty_input(provider: &str, policy: HarmPolicy) -> Self {
        Self::safe_default(provider, policy, EMPTY_INPUT_ERROR.to_string(), 0)
    }

    /// Least alarming verdict after a downstream failure, flagged as degraded.
    pub fn degraded(
        provider: &str,
        policy: HarmPolicy,
        error: impl Into<String>,
        text_length: usize,
    ) -> Self {
        Self {
            degraded: true,
            ..Self::safe_default(provider, policy, error.into(), text_length)
        }
    }

    /// Derive a verdict from a provider result.
    pub fn from_result(
        provider: &str,
        result: ModerationResult,
        policy: HarmPolicy,
        thresholds: &HarmThresholds,
        text_length: usize,
        debug: bool,
    ) -> Self {
        let is_harmful = policy.is_harmful(&result, thresholds, debug);
        let analysis_summary = summarize(&result, is_harmful);

        Self {
            is_harmful,
            risk_level: result.risk_level,
            categories: result.categories,
            confidence_scores: result.confidence_scores,
            provider: provider.to_string(),
            error: result.error,
            text_length,
            analysis_summary: Some(analysis_summary),
            policy,
            degraded: false,
        }
    }
}

/// Composes a content-safety provider with the configured harm policy.
pub struct ContentDetector {
    provider: Arc<dyn ContentSafetyProvider>,
    thresholds: HarmThresholds,
    default_policy: HarmPolicy,
}

impl ContentDetector {
    pub fn new(provider: Arc<dyn ContentSafetyProvider>) -> Self {
        Self {
            provider,
            thresholds: HarmThresholds::default(),
            default_policy: HarmPolicy::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: HarmThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_default_policy(mut self, policy: HarmPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn default_policy(&self) -> HarmPolicy {
        self.default_policy
    }

    /// Analyze `text`. Never fails: provider errors become a degraded verdict.
    pub async fn analyze(&self, text: &str, policy: Option<HarmPolicy>, debug: bool) -> HarmVerdict {
        let policy = policy.unwrap_or(self.default_policy);
        let provider = self.provider.name();

        if debug {
            let preview: String = text.chars().take(100).collect();
            info!("Analyzing text: '{}...' ({} chars)", preview, text.chars().count());
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            if debug {
                info!("Empty text provided, skipping {} call", provider);
            }
            return HarmVerdict::empty_input(provider, policy);
        }

        match self.provider.analyze_text(trimmed).await {
            Ok(result) => {
                if debug {
                    info!("{} raw result: {:?}", provider, result);
                }
                let verdict = HarmVerdict::from_result(
                    provider,
                    result,
                    policy,
                    &self.thresholds,
                    trimmed.chars().count(),
                    debug,
                );
                if debug {
                    info!(
                        "Final result: harmful={} risk={} policy={}",
                        verdict.is_harmful, verdict.risk_level, verdict.policy
                    );
                }
                verdict
            }
            Err(e) => {
                error!("Content analysis failed: {}", e);
                HarmVerdict::degraded(
                    provider,
                    policy,
                    format!("Analysis failed: {}", e),
                    text.chars().count(),
                )
            }
        }
    }
}
