//! Per-session pruning state.

use super::settings::PruningSettings;
use super::tools::{ToolMatcher, ToolPredicate};
use crate::error::ConfigError;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Pruning state bound to one session.
///
/// The host builds it when a session opens. The engine reads it on every
/// turn and, in cache-TTL mode, refreshes `last_cache_touch_at` after a
/// prune.
#[derive(Clone)]
pub struct PruningRuntime {
    pub settings: PruningSettings,
    pub is_tool_prunable: ToolPredicate,
    /// Window override in tokens; falls back to the turn's model info.
    pub context_window_tokens: Option<u64>,
    /// Epoch milliseconds of the last request known to have warmed the
    /// provider's prompt cache.
    pub last_cache_touch_at: Option<i64>,
}

impl PruningRuntime {
    /// Normalize `settings` and compile its tool patterns.
    pub fn new(settings: PruningSettings) -> Result<Self, ConfigError> {
        let settings = settings.normalized();
        let matcher = ToolMatcher::compile(&settings.tools)?;
        Ok(Self {
            settings,
            is_tool_prunable: matcher.into_predicate(),
            context_window_tokens: None,
            last_cache_touch_at: None,
        })
    }

    /// Replace the compiled tool predicate (builder pattern).
    pub fn with_tool_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_tool_prunable = Arc::new(predicate);
        self
    }

    pub fn with_context_window_tokens(mut self, tokens: u64) -> Self {
        self.context_window_tokens = Some(tokens);
        self
    }

    /// Record that the cache was warmed at `at_ms` (builder pattern).
    pub fn with_cache_touch(mut self, at_ms: i64) -> Self {
        self.last_cache_touch_at = Some(at_ms);
        self
    }

    /// Record a cache touch on a bound runtime.
    pub fn touch_cache(&mut self, at_ms: i64) {
        self.last_cache_touch_at = Some(at_ms);
    }
}

impl std::fmt::Debug for PruningRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PruningRuntime")
            .field("settings", &self.settings)
            .field("context_window_tokens", &self.context_window_tokens)
            .field("last_cache_touch_at", &self.last_cache_touch_at)
            .finish_non_exhaustive()
    }
}

/// Session-keyed pruning runtimes.
pub type PruningRuntimeRegistry = SessionRegistry<PruningRuntime>;
