//! Per-turn context hooks.
//!
//! Before each model call the host passes the current message list through
//! an ordered chain of hooks. A hook either leaves the messages alone
//! (`None`) or returns a [`ContextPatch`] carrying a replacement list that
//! the next hook, and finally the host, will see.
//!
//! Hooks are values, not subclasses: implement [`ContextHook`] on a struct
//! (see [`PruningExtension`](crate::pruning::PruningExtension)) or wrap a
//! plain closure in [`FnContextHook`].

use crate::Message;
use crate::session::SessionHandle;
use std::borrow::Cow;
use tracing::debug;

// ── Event and context ──────────────────────────────────────────────

/// The "context" event: the messages about to be sent for this turn.
#[derive(Debug, Clone, Copy)]
pub struct ContextEvent<'a> {
    pub messages: &'a [Message],
}

impl<'a> ContextEvent<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self { messages }
    }
}

/// Model metadata available to hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: String,
    pub id: String,
    /// Advertised context window in tokens, if known.
    pub context_window: Option<u64>,
}

impl ModelInfo {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
            context_window: None,
        }
    }

    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window = Some(tokens);
        self
    }
}

/// Per-turn context handed to hooks alongside the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnContext<'a> {
    /// The session this turn belongs to.
    pub session: Option<&'a SessionHandle>,
    /// The model that will receive the turn.
    pub model: Option<&'a ModelInfo>,
}

impl<'a> TurnContext<'a> {
    pub fn new(session: Option<&'a SessionHandle>, model: Option<&'a ModelInfo>) -> Self {
        Self { session, model }
    }
}

/// Replacement messages returned by a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPatch {
    pub messages: Vec<Message>,
}

// ── ContextHook trait ──────────────────────────────────────────────

/// A synchronous transform over the per-turn message list.
pub trait ContextHook: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Return `Some` only when the messages should be replaced.
    fn on_context(&self, event: &ContextEvent<'_>, ctx: &TurnContext<'_>) -> Option<ContextPatch>;
}

/// Wraps a closure as a [`ContextHook`].
pub struct FnContextHook<F> {
    name: String,
    f: F,
}

impl<F> FnContextHook<F>
where
    F: Fn(&ContextEvent<'_>, &TurnContext<'_>) -> Option<ContextPatch> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ContextHook for FnContextHook<F>
where
    F: Fn(&ContextEvent<'_>, &TurnContext<'_>) -> Option<ContextPatch> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_context(&self, event: &ContextEvent<'_>, ctx: &TurnContext<'_>) -> Option<ContextPatch> {
        (self.f)(event, ctx)
    }
}

// ── ContextHooks ───────────────────────────────────────────────────

/// Ordered list of context hooks, run in registration order.
#[derive(Default)]
pub struct ContextHooks {
    hooks: Vec<Box<dyn ContextHook>>,
}

impl ContextHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook.
    pub fn register(&mut self, hook: impl ContextHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Register a hook (builder pattern).
    pub fn with_hook(mut self, hook: impl ContextHook + 'static) -> Self {
        self.register(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook over `messages`. Each hook sees the output of the
    /// previous one. Returns `Cow::Borrowed` when no hook replaced anything.
    pub fn run<'m>(&self, messages: &'m [Message], ctx: &TurnContext<'_>) -> Cow<'m, [Message]> {
        let mut current: Cow<'m, [Message]> = Cow::Borrowed(messages);
        for hook in &self.hooks {
            let event = ContextEvent::new(&current);
            if let Some(patch) = hook.on_context(&event, ctx) {
                debug!(
                    "Context hook '{}' replaced messages ({} -> {})",
                    hook.name(),
                    current.len(),
                    patch.messages.len()
                );
                current = Cow::Owned(patch.messages);
            }
        }
        current
    }
}

impl std::fmt::Debug for ContextHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("ContextHooks").field("hooks", &names).finish()
    }
}
