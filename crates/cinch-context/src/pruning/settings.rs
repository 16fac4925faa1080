//! Pruning settings.
//!
//! Hosts build these however they like (usually by deserializing a
//! `contextPruning` block); every field has a default so partial JSON
//! objects deserialize cleanly.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default time a prompt-cache prefix stays warm (5 minutes).
pub const DEFAULT_CACHE_TTL_MS: u64 = 5 * 60 * 1000;

/// Default placeholder written over hard-cleared tool results.
pub const DEFAULT_HARD_CLEAR_PLACEHOLDER: &str = "[Old tool result content cleared]";

/// When the pruner is allowed to run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PruningMode {
    /// Prune on every turn, purely by size ratio.
    ByteRatio,
    /// Prune only once the provider's prompt cache would have expired
    /// anyway, so pruning never causes an avoidable cache miss.
    #[default]
    CacheTtl,
}

/// Head/tail retention for soft-trimmed tool results.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftTrimSettings {
    /// Results at or below this many chars are left alone.
    pub max_chars: usize,
    /// Chars kept from the start.
    pub head_chars: usize,
    /// Chars kept from the end.
    pub tail_chars: usize,
}

impl Default for SoftTrimSettings {
    fn default() -> Self {
        Self {
            max_chars: 4_000,
            head_chars: 1_500,
            tail_chars: 1_500,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HardClearSettings {
    pub enabled: bool,
    pub placeholder: String,
}

impl Default for HardClearSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder: DEFAULT_HARD_CLEAR_PLACEHOLDER.to_string(),
        }
    }
}

/// Which tools' results may be pruned. Patterns are case-insensitive
/// globs over tool names. `deny` wins over `allow`; an empty `allow`
/// list allows every tool.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ToolMatchSettings {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// Full pruning configuration for a session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PruningSettings {
    pub mode: PruningMode,
    /// Cache lifetime for [`PruningMode::CacheTtl`].
    pub ttl_ms: u64,
    /// Number of most recent assistant turns whose tool results are never
    /// pruned.
    pub keep_last_assistants: usize,
    /// Usage ratio at which soft trimming starts.
    pub soft_trim_ratio: f64,
    /// Usage ratio at which hard clearing starts.
    pub hard_clear_ratio: f64,
    /// Minimum prunable tool-result volume required before hard clearing.
    pub min_prunable_tool_chars: usize,
    pub soft_trim: SoftTrimSettings,
    pub hard_clear: HardClearSettings,
    pub tools: ToolMatchSettings,
}

impl Default for PruningSettings {
    fn default() -> Self {
        Self {
            mode: PruningMode::default(),
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            keep_last_assistants: 3,
            soft_trim_ratio: 0.3,
            hard_clear_ratio: 0.5,
            min_prunable_tool_chars: 50_000,
            soft_trim: SoftTrimSettings::default(),
            hard_clear: HardClearSettings::default(),
            tools: ToolMatchSettings::default(),
        }
    }
}

impl PruningSettings {
    /// Clamp ratios into `[0, 1]` and raise `hard_clear_ratio` to at
    /// least `soft_trim_ratio`.
    pub fn normalized(mut self) -> Self {
        self.soft_trim_ratio = clamp_ratio(self.soft_trim_ratio, 0.3);
        self.hard_clear_ratio = clamp_ratio(self.hard_clear_ratio, 0.5);
        if self.hard_clear_ratio < self.soft_trim_ratio {
            warn!(
                "hardClearRatio {} is below softTrimRatio {}; raising it",
                self.hard_clear_ratio, self.soft_trim_ratio
            );
            self.hard_clear_ratio = self.soft_trim_ratio;
        }
        self
    }

    /// Switch to [`PruningMode::ByteRatio`] (builder pattern).
    pub fn byte_ratio(mut self) -> Self {
        self.mode = PruningMode::ByteRatio;
        self
    }

    /// Switch to [`PruningMode::CacheTtl`] with the given TTL (builder pattern).
    pub fn cache_ttl(mut self, ttl_ms: u64) -> Self {
        self.mode = PruningMode::CacheTtl;
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_keep_last_assistants(mut self, n: usize) -> Self {
        self.keep_last_assistants = n;
        self
    }

    pub fn with_ratios(mut self, soft_trim: f64, hard_clear: f64) -> Self {
        self.soft_trim_ratio = soft_trim;
        self.hard_clear_ratio = hard_clear;
        self
    }

    pub fn with_min_prunable_tool_chars(mut self, chars: usize) -> Self {
        self.min_prunable_tool_chars = chars;
        self
    }

    pub fn with_soft_trim(mut self, max_chars: usize, head_chars: usize, tail_chars: usize) -> Self {
        self.soft_trim = SoftTrimSettings {
            max_chars,
            head_chars,
            tail_chars,
        };
        self
    }

    pub fn with_hard_clear(mut self, enabled: bool) -> Self {
        self.hard_clear.enabled = enabled;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.hard_clear.placeholder = placeholder.into();
        self
    }

    /// Never prune results from tools matching `pattern` (builder pattern).
    pub fn deny_tool(mut self, pattern: impl Into<String>) -> Self {
        self.tools.deny.push(pattern.into());
        self
    }

    /// Restrict pruning to tools matching `pattern` (builder pattern).
    pub fn allow_tool(mut self, pattern: impl Into<String>) -> Self {
        self.tools.allow.push(pattern.into());
        self
    }
}

fn clamp_ratio(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = PruningSettings::default();
        assert_eq!(s.mode, PruningMode::CacheTtl);
        assert_eq!(s.ttl_ms, 300_000);
        assert_eq!(s.keep_last_assistants, 3);
        assert_eq!(s.min_prunable_tool_chars, 50_000);
        assert_eq!(s.soft_trim.max_chars, 4_000);
        assert_eq!(s.hard_clear.placeholder, DEFAULT_HARD_CLEAR_PLACEHOLDER);
        assert!(s.hard_clear.enabled);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: PruningSettings = serde_json::from_str(
            r#"{"mode": "byte-ratio", "softTrim": {"maxChars": 100}, "tools": {"deny": ["memory_*"]}}"#,
        )
        .unwrap();
        assert_eq!(s.mode, PruningMode::ByteRatio);
        assert_eq!(s.soft_trim.max_chars, 100);
        assert_eq!(s.soft_trim.head_chars, 1_500);
        assert_eq!(s.tools.deny, vec!["memory_*".to_string()]);
        assert!(s.tools.allow.is_empty());
        assert_eq!(s.keep_last_assistants, 3);
    }

    #[test]
    fn normalized_clamps_and_orders_ratios() {
        let s = PruningSettings::default().with_ratios(1.5, -1.0).normalized();
        assert_eq!(s.soft_trim_ratio, 1.0);
        assert_eq!(s.hard_clear_ratio, 1.0);

        let s = PruningSettings::default()
            .with_ratios(f64::NAN, 0.8)
            .normalized();
        assert_eq!(s.soft_trim_ratio, 0.3);
        assert_eq!(s.hard_clear_ratio, 0.8);
    }

    #[test]
    fn mode_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(PruningMode::CacheTtl).unwrap(),
            "cache-ttl"
        );
        assert_eq!(
            serde_json::to_value(PruningMode::ByteRatio).unwrap(),
            "byte-ratio"
        );
    }
}
