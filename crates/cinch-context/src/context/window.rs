//! Effective context-window resolution and the warn / block guard.
//!
//! The window a session actually gets is layered: an explicit
//! `contextWindow` in the host's model config beats the model's advertised
//! window, which beats the caller's default. An agent-wide `contextTokens`
//! cap is applied last and can only shrink the result.

use crate::config::{EngineConfig, normalize_positive_int};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Below this many tokens the host should warn that the window is small.
pub const CONTEXT_WINDOW_WARN_BELOW_TOKENS: u64 = 32_000;

/// Below this many tokens the host should refuse to start the turn.
pub const CONTEXT_WINDOW_HARD_MIN_TOKENS: u64 = 16_000;

/// Which configuration layer decided the window size. Diagnostics only.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContextWindowSource {
    ModelsConfig,
    Model,
    Default,
    AgentContextTokens,
}

impl std::fmt::Display for ContextWindowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextWindowSource::ModelsConfig => write!(f, "modelsConfig"),
            ContextWindowSource::Model => write!(f, "model"),
            ContextWindowSource::Default => write!(f, "default"),
            ContextWindowSource::AgentContextTokens => write!(f, "agentContextTokens"),
        }
    }
}

/// The resolved window and the layer it came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextWindowInfo {
    pub tokens: u64,
    pub source: ContextWindowSource,
}

/// Resolve the effective context window for `provider` / `model_id`.
///
/// Resolution order, first positive integer wins:
/// 1. `cfg.models.providers[provider].models[id == model_id].contextWindow`
/// 2. `model_context_window` (the model's advertised window)
/// 3. `default_tokens`
///
/// Then `cfg.agents.defaults.contextTokens`, when strictly smaller than the
/// chosen value, caps it.
pub fn resolve_context_window_info(
    cfg: Option<&EngineConfig>,
    provider: &str,
    model_id: &str,
    model_context_window: Option<u64>,
    default_tokens: u64,
) -> ContextWindowInfo {
    let from_models_config = cfg
        .and_then(|c| c.model_context_window(provider, model_id))
        .and_then(normalize_positive_int);

    let base = if let Some(tokens) = from_models_config {
        ContextWindowInfo {
            tokens,
            source: ContextWindowSource::ModelsConfig,
        }
    } else if let Some(tokens) = model_context_window.filter(|t| *t > 0) {
        ContextWindowInfo {
            tokens,
            source: ContextWindowSource::Model,
        }
    } else {
        ContextWindowInfo {
            tokens: default_tokens,
            source: ContextWindowSource::Default,
        }
    };

    let cap = cfg
        .and_then(|c| c.agents.defaults.context_tokens)
        .and_then(normalize_positive_int);

    match cap {
        Some(cap) if cap < base.tokens => {
            debug!(
                "Context window capped: {} -> {} (source was {})",
                base.tokens, cap, base.source
            );
            ContextWindowInfo {
                tokens: cap,
                source: ContextWindowSource::AgentContextTokens,
            }
        }
        _ => base,
    }
}

/// Token thresholds for [`evaluate_context_window_guard_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardThresholds {
    pub warn_below_tokens: u64,
    pub hard_min_tokens: u64,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            warn_below_tokens: CONTEXT_WINDOW_WARN_BELOW_TOKENS,
            hard_min_tokens: CONTEXT_WINDOW_HARD_MIN_TOKENS,
        }
    }
}

/// A resolved window plus the guard's verdict. The host decides what a
/// warning or a block means.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowGuardResult {
    pub tokens: u64,
    pub source: ContextWindowSource,
    pub should_warn: bool,
    pub should_block: bool,
}

impl ContextWindowGuardResult {
    pub fn info(&self) -> ContextWindowInfo {
        ContextWindowInfo {
            tokens: self.tokens,
            source: self.source,
        }
    }
}

/// Evaluate the guard with the default thresholds (warn below 32k, block
/// below 16k).
pub fn evaluate_context_window_guard(info: &ContextWindowInfo) -> ContextWindowGuardResult {
    evaluate_context_window_guard_with(info, GuardThresholds::default())
}

/// Evaluate the guard with explicit thresholds. Thresholds are clamped to
/// at least 1; a zero-token window is "unknown" and never warns or blocks.
pub fn evaluate_context_window_guard_with(
    info: &ContextWindowInfo,
    thresholds: GuardThresholds,
) -> ContextWindowGuardResult {
    let warn_below = thresholds.warn_below_tokens.max(1);
    let hard_min = thresholds.hard_min_tokens.max(1);
    let known = info.tokens > 0;
    ContextWindowGuardResult {
        tokens: info.tokens,
        source: info.source,
        should_warn: known && info.tokens < warn_below,
        should_block: known && info.tokens < hard_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_window_beats_default() {
        let info = resolve_context_window_info(None, "openai", "gpt-x", Some(8_000), 200_000);
        assert_eq!(
            info,
            ContextWindowInfo {
                tokens: 8_000,
                source: ContextWindowSource::Model
            }
        );
        let guard = evaluate_context_window_guard(&info);
        assert!(guard.should_warn);
        assert!(guard.should_block);
    }

    #[test]
    fn models_config_beats_model() {
        let cfg = EngineConfig::default().with_model("openai", "gpt-x", 64_000.0);
        let info = resolve_context_window_info(Some(&cfg), "openai", "gpt-x", Some(8_000), 1);
        assert_eq!(info.tokens, 64_000);
        assert_eq!(info.source, ContextWindowSource::ModelsConfig);
    }

    #[test]
    fn models_config_for_other_provider_is_ignored() {
        let cfg = EngineConfig::default().with_model("anthropic", "gpt-x", 64_000.0);
        let info = resolve_context_window_info(Some(&cfg), "openai", "gpt-x", Some(8_000), 1);
        assert_eq!(info.source, ContextWindowSource::Model);
    }

    #[test]
    fn invalid_models_config_value_falls_through() {
        let cfg = EngineConfig::default().with_model("openai", "gpt-x", 0.0);
        let info = resolve_context_window_info(Some(&cfg), "openai", "gpt-x", None, 50_000);
        assert_eq!(info.tokens, 50_000);
        assert_eq!(info.source, ContextWindowSource::Default);
    }

    #[test]
    fn zero_model_window_falls_back_to_default() {
        let info = resolve_context_window_info(None, "p", "m", Some(0), 100_000);
        assert_eq!(info.source, ContextWindowSource::Default);
        assert_eq!(info.tokens, 100_000);
    }

    #[test]
    fn cap_shrinks_window() {
        let cfg = EngineConfig::default().with_context_tokens(20_000.0);
        let info = resolve_context_window_info(Some(&cfg), "p", "m", Some(200_000), 1);
        assert_eq!(
            info,
            ContextWindowInfo {
                tokens: 20_000,
                source: ContextWindowSource::AgentContextTokens
            }
        );
        let guard = evaluate_context_window_guard(&info);
        assert!(guard.should_warn);
        assert!(!guard.should_block);
    }

    #[test]
    fn cap_never_enlarges_window() {
        let cfg = EngineConfig::default().with_context_tokens(128_000.0);
        let info = resolve_context_window_info(Some(&cfg), "p", "m", Some(64_000), 1);
        assert_eq!(info.tokens, 64_000);
        assert_eq!(info.source, ContextWindowSource::Model);
    }

    #[test]
    fn cap_equal_to_window_is_ignored() {
        let cfg = EngineConfig::default().with_context_tokens(64_000.0);
        let info = resolve_context_window_info(Some(&cfg), "p", "m", Some(64_000), 1);
        assert_eq!(info.source, ContextWindowSource::Model);
    }

    #[test]
    fn zero_tokens_never_warns_or_blocks() {
        let info = ContextWindowInfo {
            tokens: 0,
            source: ContextWindowSource::Default,
        };
        let guard = evaluate_context_window_guard(&info);
        assert!(!guard.should_warn);
        assert!(!guard.should_block);
    }

    #[test]
    fn large_window_is_fine() {
        let info = ContextWindowInfo {
            tokens: 200_000,
            source: ContextWindowSource::Model,
        };
        let guard = evaluate_context_window_guard(&info);
        assert!(!guard.should_warn);
        assert!(!guard.should_block);
        assert_eq!(guard.info(), info);
    }

    #[test]
    fn custom_thresholds_clamp_to_one() {
        let info = ContextWindowInfo {
            tokens: 1,
            source: ContextWindowSource::Model,
        };
        let guard = evaluate_context_window_guard_with(
            &info,
            GuardThresholds {
                warn_below_tokens: 0,
                hard_min_tokens: 0,
            },
        );
        assert!(!guard.should_warn);
        assert!(!guard.should_block);

        let guard = evaluate_context_window_guard_with(
            &info,
            GuardThresholds {
                warn_below_tokens: 2,
                hard_min_tokens: 2,
            },
        );
        assert!(guard.should_warn);
        assert!(guard.should_block);
    }

    #[test]
    fn source_display_matches_serde() {
        let json = serde_json::to_value(ContextWindowSource::AgentContextTokens).unwrap();
        assert_eq!(json, "agentContextTokens");
        assert_eq!(
            ContextWindowSource::AgentContextTokens.to_string(),
            "agentContextTokens"
        );
    }
}
