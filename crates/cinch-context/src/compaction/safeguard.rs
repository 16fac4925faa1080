//! Safeguards for history summarization.
//!
//! The host's summarizer condenses old history into a summary message.
//! These helpers keep that process from (a) silently losing tool failures
//! the model still needs to know about and (b) overflowing the summarizer's
//! own context window. None of them mutate their input.

use crate::context::budget::{char_window, estimate_message_chars, estimate_messages_chars};
use crate::{ContentBlock, Message};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Chunk ratio used when messages are small relative to the window.
pub const BASE_CHUNK_RATIO: f64 = 0.4;
/// Lower bound for the adaptive chunk ratio.
pub const MIN_CHUNK_RATIO: f64 = 0.15;
/// Divisor applied to the summarizer's half-window when flagging oversized
/// messages.
pub const SAFETY_MARGIN: f64 = 1.2;
/// Maximum failures listed in the report.
pub const MAX_TOOL_FAILURES: usize = 8;
/// Maximum chars of failure text kept per failure, ellipsis included.
pub const MAX_TOOL_FAILURE_CHARS: usize = 240;

const TOOL_FAILURES_HEADER: &str = "## Tool Failures";
const FAILED_PLACEHOLDER: &str = "failed";
const ELLIPSIS: &str = "...";

// ── Tool failures ──────────────────────────────────────────────────

/// One failed tool call, summarized for the compaction appendix.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolFailureRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    /// `key=value` pairs from the result's details, space separated.
    pub meta_fields: String,
    pub display_text: String,
}

impl ToolFailureRecord {
    fn to_line(&self) -> String {
        if self.meta_fields.is_empty() {
            format!("{}: {}", self.tool_name, self.display_text)
        } else {
            format!(
                "{} ({}): {}",
                self.tool_name, self.meta_fields, self.display_text
            )
        }
    }
}

/// Collect failed tool results, keeping the first record per call id.
pub fn collect_tool_failures(messages: &[Message]) -> Vec<ToolFailureRecord> {
    let mut seen = HashSet::new();
    messages
        .iter()
        .filter_map(Message::as_tool_result)
        .filter(|result| result.is_error)
        .filter(|result| seen.insert(result.tool_call_id.as_str()))
        .map(|result| ToolFailureRecord {
            tool_call_id: result.tool_call_id.clone(),
            tool_name: result.tool_name.clone(),
            meta_fields: result
                .details
                .as_ref()
                .map(|details| format_meta_fields(details.iter()))
                .unwrap_or_default(),
            display_text: failure_display_text(
                result.content.iter().find_map(ContentBlock::as_text),
            ),
        })
        .collect()
}

/// Render the failures as a markdown section. Empty input renders as `""`.
pub fn format_tool_failures_section(failures: &[ToolFailureRecord]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(failures.len().min(MAX_TOOL_FAILURES) + 2);
    lines.push(TOOL_FAILURES_HEADER.to_string());
    lines.extend(
        failures
            .iter()
            .take(MAX_TOOL_FAILURES)
            .map(ToolFailureRecord::to_line),
    );
    if failures.len() > MAX_TOOL_FAILURES {
        lines.push(format!(
            "...and {} more",
            failures.len() - MAX_TOOL_FAILURES
        ));
    }
    lines.join("\n")
}

/// [`collect_tool_failures`] followed by [`format_tool_failures_section`].
pub fn build_tool_failure_appendix(messages: &[Message]) -> String {
    format_tool_failures_section(&collect_tool_failures(messages))
}

fn format_meta_fields<'a>(details: impl Iterator<Item = (&'a String, &'a Value)>) -> String {
    details
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some(format!("{key}={s}")),
            other => Some(format!("{key}={other}")),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn failure_display_text(text: Option<&str>) -> String {
    let collapsed = text
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if collapsed.is_empty() {
        return FAILED_PLACEHOLDER.to_string();
    }
    if collapsed.chars().count() <= MAX_TOOL_FAILURE_CHARS {
        return collapsed;
    }
    let kept: String = collapsed
        .chars()
        .take(MAX_TOOL_FAILURE_CHARS - ELLIPSIS.len())
        .collect();
    format!("{}{ELLIPSIS}", kept.trim_end())
}

// ── Chunk sizing ───────────────────────────────────────────────────

/// Fraction of the summarizer window a single summarization chunk may use.
///
/// Returns [`BASE_CHUNK_RATIO`] while the average message is at most 10% of
/// the window and shrinks toward [`MIN_CHUNK_RATIO`] as messages get
/// larger. Never increases as the average grows.
pub fn compute_adaptive_chunk_ratio(messages: &[Message], context_window_tokens: u64) -> f64 {
    let window = char_window(context_window_tokens);
    if messages.is_empty() || window == 0 {
        return BASE_CHUNK_RATIO;
    }
    let avg_chars = estimate_messages_chars(messages) as f64 / messages.len() as f64;
    let avg_ratio = avg_chars / window as f64;
    if avg_ratio <= 0.1 {
        return BASE_CHUNK_RATIO;
    }
    let reduction = (avg_ratio * 2.0).min(BASE_CHUNK_RATIO - MIN_CHUNK_RATIO);
    (BASE_CHUNK_RATIO - reduction).max(MIN_CHUNK_RATIO)
}

/// Whether `message` alone would take more than half the summarizer window
/// after the safety margin. A zero window never flags anything.
pub fn is_oversized_for_summary(message: &Message, context_window_tokens: u64) -> bool {
    let window = char_window(context_window_tokens);
    if window == 0 {
        return false;
    }
    let limit = window as f64 * 0.5 / SAFETY_MARGIN;
    estimate_message_chars(message) as f64 > limit
}

// ── Chunking ───────────────────────────────────────────────────────

/// Split `messages` into at most `parts` contiguous chunks of roughly equal
/// character cost. `parts` is clamped to `1..=messages.len()`.
pub fn split_messages_by_char_share(messages: &[Message], parts: usize) -> Vec<&[Message]> {
    if messages.is_empty() {
        return Vec::new();
    }
    let parts = parts.clamp(1, messages.len());
    if parts == 1 {
        return vec![messages];
    }

    let target = estimate_messages_chars(messages) as f64 / parts as f64;
    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    let mut current_chars = 0usize;
    for (index, message) in messages.iter().enumerate() {
        let cost = estimate_message_chars(message);
        if chunks.len() < parts - 1
            && index > start
            && (current_chars + cost) as f64 > target
        {
            chunks.push(&messages[start..index]);
            start = index;
            current_chars = 0;
        }
        current_chars += cost;
    }
    chunks.push(&messages[start..]);
    chunks
}

/// Split `messages` into contiguous chunks of at most `max_chars` each.
/// A message larger than `max_chars` gets a chunk of its own.
pub fn chunk_messages_by_max_chars(messages: &[Message], max_chars: usize) -> Vec<&[Message]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut current_chars = 0usize;
    for (index, message) in messages.iter().enumerate() {
        let cost = estimate_message_chars(message);
        if index > start && current_chars + cost > max_chars {
            chunks.push(&messages[start..index]);
            start = index;
            current_chars = 0;
        }
        current_chars += cost;
        if cost > max_chars {
            chunks.push(&messages[start..=index]);
            start = index + 1;
            current_chars = 0;
        }
    }
    if start < messages.len() {
        chunks.push(&messages[start..]);
    }
    chunks
}

// ── History share ──────────────────────────────────────────────────

/// History left after dropping the oldest chunks to fit a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PrunedHistory {
    pub messages: Vec<Message>,
    pub dropped_chunks: usize,
    /// Messages removed, including tool results orphaned by the removal.
    pub dropped_messages: usize,
    pub dropped_chars: usize,
    pub kept_chars: usize,
    pub budget_chars: usize,
}

/// Drop the oldest history until it fits in `max_history_share` of the
/// window.
///
/// Each round splits the remaining history into `parts` char-balanced
/// chunks and drops the first. Tool results whose originating tool call was
/// dropped are removed too, so the kept history never starts with an
/// unmatched result. Stops when the history fits or only one chunk is left.
pub fn prune_history_for_context_share(
    messages: &[Message],
    context_window_tokens: u64,
    max_history_share: f64,
    parts: usize,
) -> PrunedHistory {
    let share = if max_history_share.is_finite() {
        max_history_share.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let budget_chars =
        ((char_window(context_window_tokens) as f64 * share).floor() as usize).max(1);

    let mut kept = messages.to_vec();
    let mut kept_chars = estimate_messages_chars(&kept);
    let mut dropped_chunks = 0;
    let mut dropped_messages = 0;
    let mut dropped_chars = 0;

    while !kept.is_empty() && kept_chars > budget_chars {
        let chunks = split_messages_by_char_share(&kept, parts);
        if chunks.len() <= 1 {
            break;
        }
        let dropped_len = chunks[0].len();
        let dropped_cost = estimate_messages_chars(chunks[0]);
        let (rest, orphans) = drop_orphaned_tool_results(&kept[dropped_len..]);

        dropped_chunks += 1;
        dropped_messages += dropped_len + orphans.count;
        dropped_chars += dropped_cost + orphans.chars;
        kept_chars -= dropped_cost + orphans.chars;
        kept = rest;
    }

    if dropped_chunks > 0 {
        debug!(
            "History share pruning: dropped {} chunks ({} messages, {} chars), kept {} chars of budget {}",
            dropped_chunks, dropped_messages, dropped_chars, kept_chars, budget_chars
        );
    }

    PrunedHistory {
        messages: kept,
        dropped_chunks,
        dropped_messages,
        dropped_chars,
        kept_chars,
        budget_chars,
    }
}

#[derive(Default)]
struct Orphans {
    count: usize,
    chars: usize,
}

/// Remove tool results whose call id has no matching tool call in `messages`.
fn drop_orphaned_tool_results(messages: &[Message]) -> (Vec<Message>, Orphans) {
    let call_ids: HashSet<&str> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Assistant(a) => Some(&a.content),
            _ => None,
        })
        .flatten()
        .filter_map(|block| match block {
            ContentBlock::ToolCall { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();

    let mut orphans = Orphans::default();
    let kept = messages
        .iter()
        .filter(|m| match m.as_tool_result() {
            Some(result) if !call_ids.contains(result.tool_call_id.as_str()) => {
                orphans.count += 1;
                orphans.chars += estimate_message_chars(m);
                false
            }
            _ => true,
        })
        .cloned()
        .collect();
    (kept, orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolResultMessage;
    use serde_json::json;

    fn failure(id: &str, tool: &str, text: &str) -> ToolResultMessage {
        ToolResultMessage {
            tool_call_id: id.into(),
            tool_name: tool.into(),
            is_error: true,
            details: None,
            content: if text.is_empty() {
                vec![]
            } else {
                vec![ContentBlock::text(text)]
            },
        }
    }

    #[test]
    fn duplicate_call_ids_keep_first() {
        let messages: Vec<Message> = vec![
            failure("call-1", "exec", "").with_detail("exitCode", 2).into(),
            failure("call-1", "exec", "second").with_detail("exitCode", 3).into(),
        ];
        let failures = collect_tool_failures(&messages);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_line(), "exec (exitCode=2): failed");
    }

    #[test]
    fn successful_results_are_ignored() {
        let ok = Message::tool_result("c1", "exec", "fine");
        assert!(collect_tool_failures(&[ok]).is_empty());
    }

    #[test]
    fn meta_fields_keep_insertion_order_and_skip_null() {
        let record = failure("c1", "exec", "boom")
            .with_detail("status", "failed")
            .with_detail("exitCode", 1)
            .with_detail("signal", Value::Null)
            .with_detail("argv", json!(["ls", "-l"]));
        let failures = collect_tool_failures(&[record.into()]);
        assert_eq!(
            failures[0].meta_fields,
            r#"status=failed exitCode=1 argv=["ls","-l"]"#
        );
    }

    #[test]
    fn display_text_collapses_whitespace() {
        let raw = "  error:\n\n  no  such file \t";
        let failures = collect_tool_failures(&[failure("c1", "exec", raw).into()]);
        assert_eq!(failures[0].display_text, "error: no such file");
        assert_eq!(failures[0].to_line(), "exec: error: no such file");
    }

    #[test]
    fn display_text_is_truncated() {
        let failures = collect_tool_failures(&[failure("c1", "exec", &"e".repeat(1_000)).into()]);
        let text = &failures[0].display_text;
        assert_eq!(text.chars().count(), MAX_TOOL_FAILURE_CHARS);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn section_caps_entries() {
        let messages: Vec<Message> = (0..9)
            .map(|i| failure(&format!("call-{i}"), "exec", "x").into())
            .collect();
        let section = build_tool_failure_appendix(&messages);
        let lines: Vec<&str> = section.lines().collect();
        assert_eq!(lines[0], "## Tool Failures");
        assert_eq!(lines.len(), 1 + MAX_TOOL_FAILURES + 1);
        assert_eq!(lines[lines.len() - 1], "...and 1 more");
    }

    #[test]
    fn empty_section() {
        assert_eq!(format_tool_failures_section(&[]), "");
        assert_eq!(build_tool_failure_appendix(&[Message::user("hi")]), "");
    }

    #[test]
    fn chunk_ratio_base_for_small_messages() {
        assert_eq!(compute_adaptive_chunk_ratio(&[], 1_000), BASE_CHUNK_RATIO);
        let small = vec![Message::user("a".repeat(100))];
        assert_eq!(compute_adaptive_chunk_ratio(&small, 0), BASE_CHUNK_RATIO);
        // 400 chars of a 4000-char window is exactly 10%.
        let edge = vec![Message::user("a".repeat(400))];
        assert_eq!(compute_adaptive_chunk_ratio(&edge, 1_000), BASE_CHUNK_RATIO);
    }

    #[test]
    fn chunk_ratio_shrinks_monotonically_to_floor() {
        let mut previous = BASE_CHUNK_RATIO;
        for size in [400, 401, 600, 1_000, 2_000, 4_000, 40_000] {
            let ratio = compute_adaptive_chunk_ratio(&[Message::user("a".repeat(size))], 1_000);
            assert!(ratio <= previous, "ratio grew at size {size}");
            assert!(ratio >= MIN_CHUNK_RATIO);
            previous = ratio;
        }
        assert!((previous - MIN_CHUNK_RATIO).abs() < 1e-9);
    }

    #[test]
    fn oversized_threshold() {
        // 1000 tokens -> 4000 chars -> limit 2000 / 1.2 = 1666.67
        assert!(!is_oversized_for_summary(&Message::user("a".repeat(1_666)), 1_000));
        assert!(is_oversized_for_summary(&Message::user("a".repeat(1_667)), 1_000));
        assert!(!is_oversized_for_summary(&Message::user("a".repeat(1_000_000)), 0));
    }

    #[test]
    fn split_balances_chars() {
        let messages: Vec<Message> = (0..6).map(|_| Message::user("a".repeat(100))).collect();
        let chunks = split_messages_by_char_share(&messages, 2);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![3, 3]);
        assert_eq!(split_messages_by_char_share(&messages, 0).len(), 1);
        assert_eq!(split_messages_by_char_share(&messages, 100).len(), 6);
        assert!(split_messages_by_char_share(&[], 3).is_empty());
    }

    #[test]
    fn max_chars_chunks_isolate_oversized() {
        let messages = vec![
            Message::user("a".repeat(40)),
            Message::user("b".repeat(40)),
            Message::user("c".repeat(500)),
            Message::user("d".repeat(40)),
        ];
        let chunks = chunk_messages_by_max_chars(&messages, 100);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![2, 1, 1]);
        assert!(chunk_messages_by_max_chars(&[], 100).is_empty());
    }

    #[test]
    fn history_share_drops_oldest_until_fit() {
        let messages: Vec<Message> = (0..8)
            .map(|i| Message::user(format!("{i}").repeat(1_000)))
            .collect();
        // 1000 tokens * 4 * 0.5 = 2000 chars of budget.
        let pruned = prune_history_for_context_share(&messages, 1_000, 0.5, 2);
        assert_eq!(pruned.budget_chars, 2_000);
        assert!(pruned.kept_chars <= pruned.budget_chars);
        assert_eq!(pruned.messages.last(), messages.last());
        assert_eq!(pruned.dropped_messages + pruned.messages.len(), messages.len());
        assert_eq!(pruned.kept_chars, estimate_messages_chars(&pruned.messages));
    }

    #[test]
    fn history_share_noop_when_under_budget() {
        let messages = vec![Message::user("hi"), Message::assistant_text("hello")];
        let pruned = prune_history_for_context_share(&messages, 1_000, 0.5, 2);
        assert_eq!(pruned.messages, messages);
        assert_eq!(pruned.dropped_chunks, 0);
    }

    #[test]
    fn history_share_drops_orphaned_results() {
        let messages = vec![
            Message::user("a".repeat(1_000)),
            Message::assistant(vec![ContentBlock::tool_call("c1", "exec", json!({}))]),
            Message::tool_result("c1", "exec", "o".repeat(1_000)),
            Message::user("b".repeat(100)),
        ];
        // The first chunk ends at the tool call; its result is orphaned.
        let pruned = prune_history_for_context_share(&messages, 100, 1.0, 2);
        assert_eq!(pruned.messages, vec![Message::user("b".repeat(100))]);
        assert_eq!(pruned.dropped_chunks, 1);
        assert_eq!(pruned.dropped_messages, 3);
        assert_eq!(pruned.dropped_chars, 2_002);
    }
}
