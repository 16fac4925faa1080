//! Convenience re-exports for common `cinch-context` types.
//!
//! Meant to be glob-imported by hosts wiring the engine into an agent loop:
//!
//! ```ignore
//! use cinch_context::prelude::*;
//! ```
//!
//! This pulls in message types, session registries, the hook chain, the
//! pruning runtime, and the compaction safeguards. Lower-level helpers
//! (segment scans, chunking, guard thresholds) stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ConfigError, ContentBlock, Message, MessageRole, ToolResultMessage, UserContent};

// ── Sessions and hooks ──────────────────────────────────────────────
pub use crate::hooks::{
    ContextEvent, ContextHook, ContextHooks, ContextPatch, FnContextHook, ModelInfo, TurnContext,
};
pub use crate::session::{SessionHandle, SessionRegistry};

// ── Context window ──────────────────────────────────────────────────
pub use crate::config::EngineConfig;
pub use crate::context::{
    CharUsage, ContextWindowGuardResult, ContextWindowInfo, ContextWindowSource,
    evaluate_context_window_guard, resolve_context_window_info,
};

// ── Pruning ─────────────────────────────────────────────────────────
pub use crate::pruning::{
    PruningExtension, PruningMode, PruningRuntime, PruningRuntimeRegistry, PruningSettings,
    prune_context_messages,
};

// ── Compaction ──────────────────────────────────────────────────────
pub use crate::compaction::{
    CompactionSafeguardRegistry, CompactionSafeguardRuntime, CompactionSettings,
    build_tool_failure_appendix, compute_adaptive_chunk_ratio, is_oversized_for_summary,
    prune_history_for_context_share,
};
