//! Tool-result pruning.
//!
//! - [`pruner`]: the pure soft-trim / hard-clear pass.
//! - [`extension`]: the per-turn hook that applies it to registered sessions.
//! - [`settings`], [`tools`], [`runtime`]: per-session configuration.

pub mod extension;
pub mod pruner;
pub mod runtime;
pub mod segments;
pub mod settings;
pub mod tools;

pub use extension::PruningExtension;
pub use pruner::{PruneOutcome, prune_context_messages, prune_context_messages_with_stats};
pub use runtime::{PruningRuntime, PruningRuntimeRegistry};
pub use settings::{
    DEFAULT_CACHE_TTL_MS, DEFAULT_HARD_CLEAR_PLACEHOLDER, HardClearSettings, PruningMode,
    PruningSettings, SoftTrimSettings, ToolMatchSettings,
};
pub use tools::{ToolMatcher, ToolPredicate};
