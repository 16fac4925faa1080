//! The pruning context hook.
//!
//! [`PruningExtension`] connects the session registry to the pruner. On
//! every context event it:
//!
//! 1. **Looks up** the session's [`PruningRuntime`]. Unbound sessions are
//!    left alone.
//! 2. **Gates on cache TTL** in [`PruningMode::CacheTtl`]: pruning rewrites
//!    the prompt prefix, so it only runs once the provider cache has gone
//!    cold anyway.
//! 3. **Resolves the window** from the runtime override or the model.
//! 4. **Prunes**, and in cache-TTL mode records the rewrite as a fresh
//!    cache touch.

use super::pruner::prune_context_messages;
use super::runtime::{PruningRuntime, PruningRuntimeRegistry};
use super::settings::PruningMode;
use crate::hooks::{ContextEvent, ContextHook, ContextPatch, TurnContext};
use std::borrow::Cow;
use tracing::{debug, trace};

/// Context hook that prunes tool results for registered sessions.
#[derive(Debug, Clone, Default)]
pub struct PruningExtension {
    registry: PruningRuntimeRegistry,
}

impl PruningExtension {
    pub fn new(registry: PruningRuntimeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PruningRuntimeRegistry {
        &self.registry
    }

    /// Handle a context event with an explicit clock (`now_ms` is epoch
    /// milliseconds).
    pub fn apply_at(
        &self,
        event: &ContextEvent<'_>,
        ctx: &TurnContext<'_>,
        now_ms: i64,
    ) -> Option<ContextPatch> {
        let Some(runtime) = self.registry.get(ctx.session) else {
            trace!("Pruning skipped: no runtime bound for session");
            return None;
        };

        if runtime.settings.mode == PruningMode::CacheTtl && !cache_expired(&runtime, now_ms) {
            debug!(
                "Pruning skipped: cache still warm (last_touch={:?}, ttl_ms={})",
                runtime.last_cache_touch_at, runtime.settings.ttl_ms
            );
            return None;
        }

        let Some(window) = runtime
            .context_window_tokens
            .or_else(|| ctx.model.and_then(|m| m.context_window))
        else {
            trace!("Pruning skipped: no context window known");
            return None;
        };

        let outcome = prune_context_messages(
            event.messages,
            &runtime.settings,
            window,
            runtime.is_tool_prunable.as_ref(),
        );
        let messages = match outcome {
            Cow::Borrowed(_) => return None,
            Cow::Owned(messages) => messages,
        };

        if runtime.settings.mode == PruningMode::CacheTtl {
            self.registry.update(ctx.session, |r| r.touch_cache(now_ms));
        }
        Some(ContextPatch { messages })
    }
}

/// Cache-TTL gate: only prune once a known cache touch is at least one TTL
/// old.
fn cache_expired(runtime: &PruningRuntime, now_ms: i64) -> bool {
    let Some(last) = runtime.last_cache_touch_at else {
        return false;
    };
    let ttl_ms = runtime.settings.ttl_ms;
    if ttl_ms == 0 {
        return false;
    }
    let ttl_ms = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
    now_ms.saturating_sub(last) >= ttl_ms
}

impl ContextHook for PruningExtension {
    fn name(&self) -> &str {
        "context-pruning"
    }

    fn on_context(&self, event: &ContextEvent<'_>, ctx: &TurnContext<'_>) -> Option<ContextPatch> {
        self.apply_at(event, ctx, chrono::Utc::now().timestamp_millis())
    }
}
