//! Per-session compaction safeguard settings.

use super::safeguard::{PrunedHistory, prune_history_for_context_share};
use crate::Message;
use crate::session::SessionRegistry;
use serde::{Deserialize, Serialize};

/// Default share of the window that kept history may occupy.
pub const DEFAULT_MAX_HISTORY_SHARE: f64 = 0.5;

/// Default number of chunks history is split into per pruning round.
pub const DEFAULT_HISTORY_PARTS: usize = 2;

/// Host-wide compaction defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompactionSettings {
    pub max_history_share: f64,
    pub history_parts: usize,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            max_history_share: DEFAULT_MAX_HISTORY_SHARE,
            history_parts: DEFAULT_HISTORY_PARTS,
        }
    }
}

/// Per-session overrides consulted by the summarization pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompactionSafeguardRuntime {
    pub max_history_share: Option<f64>,
    pub context_window_tokens: Option<u64>,
}

impl CompactionSafeguardRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history_share(mut self, share: f64) -> Self {
        self.max_history_share = Some(share);
        self
    }

    pub fn with_context_window_tokens(mut self, tokens: u64) -> Self {
        self.context_window_tokens = Some(tokens);
        self
    }

    /// This session's history share, or the host default.
    pub fn history_share(&self, settings: &CompactionSettings) -> f64 {
        self.max_history_share.unwrap_or(settings.max_history_share)
    }

    /// Drop the oldest history that does not fit this session's share of
    /// the window. The session's window override wins over
    /// `fallback_window_tokens`.
    pub fn prune_history(
        &self,
        messages: &[Message],
        settings: &CompactionSettings,
        fallback_window_tokens: u64,
    ) -> PrunedHistory {
        prune_history_for_context_share(
            messages,
            self.context_window_tokens.unwrap_or(fallback_window_tokens),
            self.history_share(settings),
            settings.history_parts,
        )
    }
}

/// Session-keyed compaction safeguard runtimes.
pub type CompactionSafeguardRegistry = SessionRegistry<CompactionSafeguardRuntime>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionHandle;

    #[test]
    fn registry_bindings_are_isolated() {
        let registry = CompactionSafeguardRegistry::new();
        let a = SessionHandle::generate();
        let b = SessionHandle::generate();
        registry.set(
            Some(&a),
            Some(CompactionSafeguardRuntime::new().with_max_history_share(0.3)),
        );
        registry.set(
            Some(&b),
            Some(CompactionSafeguardRuntime::new().with_max_history_share(0.8)),
        );

        assert_eq!(registry.get(Some(&a)).unwrap().max_history_share, Some(0.3));
        assert_eq!(registry.get(Some(&b)).unwrap().max_history_share, Some(0.8));

        registry.set(Some(&a), None);
        assert!(registry.get(Some(&a)).is_none());
        assert_eq!(registry.get(Some(&b)).unwrap().max_history_share, Some(0.8));

        registry.set(None, Some(CompactionSafeguardRuntime::new()));
        assert!(registry.get(None).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn share_falls_back_to_settings() {
        let settings = CompactionSettings::default();
        assert_eq!(CompactionSafeguardRuntime::new().history_share(&settings), 0.5);
        let runtime = CompactionSafeguardRuntime::new().with_max_history_share(0.2);
        assert_eq!(runtime.history_share(&settings), 0.2);
    }

    #[test]
    fn runtime_window_overrides_fallback() {
        let messages: Vec<Message> = (0..4).map(|_| Message::user("x".repeat(1_000))).collect();
        let settings = CompactionSettings::default();

        let roomy =
            CompactionSafeguardRuntime::new().prune_history(&messages, &settings, 100_000);
        assert_eq!(roomy.dropped_chunks, 0);

        let tight = CompactionSafeguardRuntime::new()
            .with_context_window_tokens(1_000)
            .prune_history(&messages, &settings, 100_000);
        assert!(tight.dropped_chunks > 0);
        assert!(tight.kept_chars <= tight.budget_chars);
    }

    #[test]
    fn deserializes_camel_case() {
        let runtime: CompactionSafeguardRuntime =
            serde_json::from_str(r#"{"maxHistoryShare": 0.3}"#).unwrap();
        assert_eq!(runtime.max_history_share, Some(0.3));
        assert_eq!(runtime.context_window_tokens, None);

        let settings: CompactionSettings = serde_json::from_str(r#"{"historyParts": 3}"#).unwrap();
        assert_eq!(settings.history_parts, 3);
        assert_eq!(settings.max_history_share, DEFAULT_MAX_HISTORY_SHARE);
    }
}
