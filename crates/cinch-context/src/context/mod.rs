//! Context window sizing and character-budget estimation.
//!
//! 1. **[`budget`]**: the shared per-message character cost used by both the
//!    pruner and the compaction safeguards. No tokenizer is invoked: a fixed
//!    4 chars/token heuristic keeps estimation fast and conservative.
//!
//! 2. **[`window`]**: resolves a session's effective context window from
//!    model config, model metadata, defaults and the agent-wide cap, then
//!    classifies it as fine / warn / block.

pub mod budget;
pub mod window;

pub use budget::{
    CHARS_PER_TOKEN_ESTIMATE, CharUsage, IMAGE_CHAR_ESTIMATE, char_window, estimate_message_chars,
    estimate_messages_chars,
};
pub use window::{
    ContextWindowGuardResult, ContextWindowInfo, ContextWindowSource, GuardThresholds,
    evaluate_context_window_guard, evaluate_context_window_guard_with,
    resolve_context_window_info,
};
