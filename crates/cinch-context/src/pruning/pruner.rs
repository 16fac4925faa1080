//! Soft-trim / hard-clear pruning of tool results.
//!
//! Tool results are the single largest context consumer in an agent loop,
//! and most of their bulk is irrelevant once the model has read them. The
//! pruner works in two stages, both limited to tool results that sit after
//! the first user message and before the protected tail of recent
//! assistant turns:
//!
//! 1. **Soft trim** (usage ≥ `soft_trim_ratio`): long results keep their
//!    first and last few thousand characters plus a note saying what was
//!    dropped.
//! 2. **Hard clear** (usage still ≥ `hard_clear_ratio`): oldest results
//!    first, whole contents are replaced by a placeholder until usage drops
//!    below the ratio.
//!
//! The function is pure. It returns `Cow::Borrowed` when nothing changed so
//! callers can skip re-rendering.

use super::segments::{joined_len, take_head, take_tail};
use super::settings::PruningSettings;
use crate::context::budget::{
    CharUsage, char_window, estimate_message_chars, estimate_messages_chars,
};
use crate::{ContentBlock, Message, ToolResultMessage};
use std::borrow::Cow;
use tracing::debug;

const TRIM_NOTE_PREFIX: &str = "[Tool result trimmed: kept first ";

/// Result of a pruning pass plus counters for logging.
#[derive(Debug)]
pub struct PruneOutcome<'a> {
    pub messages: Cow<'a, [Message]>,
    /// Tool results replaced with a head/tail excerpt.
    pub soft_trimmed: usize,
    /// Tool results replaced with the placeholder.
    pub hard_cleared: usize,
    pub chars_before: usize,
    pub chars_after: usize,
}

impl<'a> PruneOutcome<'a> {
    fn unchanged(messages: &'a [Message], chars: usize) -> Self {
        Self {
            messages: Cow::Borrowed(messages),
            soft_trimmed: 0,
            hard_cleared: 0,
            chars_before: chars,
            chars_after: chars,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self.messages, Cow::Owned(_))
    }
}

/// Prune `messages` against a window of `context_window_tokens` tokens.
///
/// Returns `Cow::Borrowed(messages)` iff nothing was changed.
pub fn prune_context_messages<'a>(
    messages: &'a [Message],
    settings: &PruningSettings,
    context_window_tokens: u64,
    is_tool_prunable: &dyn Fn(&str) -> bool,
) -> Cow<'a, [Message]> {
    prune_context_messages_with_stats(messages, settings, context_window_tokens, is_tool_prunable)
        .messages
}

/// Like [`prune_context_messages`], but also reports what was done.
pub fn prune_context_messages_with_stats<'a>(
    messages: &'a [Message],
    settings: &PruningSettings,
    context_window_tokens: u64,
    is_tool_prunable: &dyn Fn(&str) -> bool,
) -> PruneOutcome<'a> {
    let chars_before = estimate_messages_chars(messages);
    let char_window = char_window(context_window_tokens);
    if char_window == 0 {
        return PruneOutcome::unchanged(messages, chars_before);
    }

    let Some(cutoff_index) = assistant_cutoff_index(messages, settings.keep_last_assistants)
    else {
        return PruneOutcome::unchanged(messages, chars_before);
    };
    let prune_start_index = messages
        .iter()
        .position(Message::is_user)
        .unwrap_or(messages.len());

    let mut total_chars = chars_before;
    let ratio = |total: usize| CharUsage::new(total, char_window).ratio();

    if ratio(total_chars) < settings.soft_trim_ratio {
        return PruneOutcome::unchanged(messages, chars_before);
    }

    // ── Soft trim ──
    let mut next: Option<Vec<Message>> = None;
    let mut prunable_indexes = Vec::new();
    let mut soft_trimmed = 0;

    for (index, message) in messages
        .iter()
        .enumerate()
        .take(cutoff_index)
        .skip(prune_start_index)
    {
        let Message::ToolResult(result) = message else {
            continue;
        };
        if !is_tool_prunable(&result.tool_name) || result.has_images() {
            continue;
        }
        prunable_indexes.push(index);

        let Some(trimmed) = soft_trim_tool_result(result, settings) else {
            continue;
        };
        let before = estimate_message_chars(message);
        let after = estimate_message_chars(&trimmed);
        total_chars = total_chars - before + after;
        next.get_or_insert_with(|| messages.to_vec())[index] = trimmed;
        soft_trimmed += 1;
    }

    let finish = |next: Option<Vec<Message>>, total_chars: usize, soft: usize, hard: usize| {
        let outcome = match next {
            Some(owned) => PruneOutcome {
                messages: Cow::Owned(owned),
                soft_trimmed: soft,
                hard_cleared: hard,
                chars_before,
                chars_after: total_chars,
            },
            None => PruneOutcome::unchanged(messages, chars_before),
        };
        if outcome.changed() {
            debug!(
                "Pruned context: soft_trimmed={}, hard_cleared={}, {} -> {}",
                soft,
                hard,
                CharUsage::new(chars_before, char_window).to_log_string(),
                CharUsage::new(total_chars, char_window).to_log_string()
            );
        }
        outcome
    };

    if ratio(total_chars) < settings.hard_clear_ratio || !settings.hard_clear.enabled {
        return finish(next, total_chars, soft_trimmed, 0);
    }

    // ── Hard clear ──
    let current = |next: &Option<Vec<Message>>, index: usize| -> usize {
        let source = next.as_deref().unwrap_or(messages);
        estimate_message_chars(&source[index])
    };
    let prunable_chars: usize = prunable_indexes
        .iter()
        .map(|&index| current(&next, index))
        .sum();
    if prunable_chars < settings.min_prunable_tool_chars {
        return finish(next, total_chars, soft_trimmed, 0);
    }

    let placeholder = &settings.hard_clear.placeholder;
    let mut hard_cleared = 0;
    for &index in &prunable_indexes {
        if ratio(total_chars) < settings.hard_clear_ratio {
            break;
        }
        let source = next.as_deref().unwrap_or(messages);
        let Message::ToolResult(result) = &source[index] else {
            continue;
        };
        if is_placeholder(result, placeholder) {
            continue;
        }
        let cleared = Message::ToolResult(ToolResultMessage {
            content: vec![ContentBlock::text(placeholder.clone())],
            ..result.clone()
        });
        let before = estimate_message_chars(&source[index]);
        let after = estimate_message_chars(&cleared);
        total_chars = total_chars - before + after;
        next.get_or_insert_with(|| messages.to_vec())[index] = cleared;
        hard_cleared += 1;
    }

    finish(next, total_chars, soft_trimmed, hard_cleared)
}

/// Index of the `keep_last_assistants`-th assistant message counted from
/// the end. `None` when there are not enough assistant messages to protect.
fn assistant_cutoff_index(messages: &[Message], keep_last_assistants: usize) -> Option<usize> {
    if keep_last_assistants == 0 {
        return Some(messages.len());
    }
    messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.is_assistant())
        .nth(keep_last_assistants - 1)
        .map(|(index, _)| index)
}

/// Replace a long result's content with head + tail excerpts and a note.
/// `None` when the result is short enough, was already trimmed, or
/// trimming would not shrink it.
fn soft_trim_tool_result(
    result: &ToolResultMessage,
    settings: &PruningSettings,
) -> Option<Message> {
    if is_soft_trimmed(result) {
        return None;
    }
    let parts: Vec<&str> = result.content.iter().filter_map(ContentBlock::as_text).collect();
    let raw_len = joined_len(&parts);
    if raw_len <= settings.soft_trim.max_chars {
        return None;
    }

    let head_chars = settings.soft_trim.head_chars;
    let tail_chars = settings.soft_trim.tail_chars;
    let head = take_head(&parts, head_chars);
    let tail = take_tail(&parts, tail_chars);
    let text = format!(
        "{head}\n...\n{tail}\n\n{TRIM_NOTE_PREFIX}{head_chars} chars and last {tail_chars} chars of {raw_len} chars.]"
    );

    let original: usize = parts.iter().map(|p| p.chars().count()).sum();
    if text.chars().count() >= original {
        return None;
    }

    Some(Message::ToolResult(ToolResultMessage {
        content: vec![ContentBlock::text(text)],
        ..result.clone()
    }))
}

/// A single text block ending in the trim note.
fn is_soft_trimmed(result: &ToolResultMessage) -> bool {
    matches!(
        result.content.as_slice(),
        [ContentBlock::Text { text }]
            if text.ends_with(" chars.]")
                && text
                    .rsplit_once(TRIM_NOTE_PREFIX)
                    .is_some_and(|(body, _)| body.ends_with("\n\n"))
    )
}

fn is_placeholder(result: &ToolResultMessage, placeholder: &str) -> bool {
    matches!(result.content.as_slice(), [ContentBlock::Text { text }] if text == placeholder)
}
