//! Compaction safeguards.
//!
//! Summarizing history is the host's job. This module supplies the pieces
//! that keep it safe: a bounded tool-failure appendix, chunk sizing for the
//! summarizer's window, and history-share pruning, plus the per-session
//! [`CompactionSafeguardRegistry`].

pub mod runtime;
pub mod safeguard;

pub use runtime::{
    CompactionSafeguardRegistry, CompactionSafeguardRuntime, CompactionSettings,
    DEFAULT_HISTORY_PARTS, DEFAULT_MAX_HISTORY_SHARE,
};
pub use safeguard::{
    BASE_CHUNK_RATIO, MAX_TOOL_FAILURE_CHARS, MAX_TOOL_FAILURES, MIN_CHUNK_RATIO, PrunedHistory,
    SAFETY_MARGIN, ToolFailureRecord, build_tool_failure_appendix, chunk_messages_by_max_chars,
    collect_tool_failures, compute_adaptive_chunk_ratio, format_tool_failures_section,
    is_oversized_for_summary, prune_history_for_context_share, split_messages_by_char_share,
};
