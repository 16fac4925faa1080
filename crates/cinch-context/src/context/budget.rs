//! Character-budget estimation for conversation messages.
//!
//! Every size decision in this crate (soft-trim thresholds, hard-clear
//! thresholds, compaction chunk sizing) is made in characters against a
//! window of `tokens × CHARS_PER_TOKEN_ESTIMATE`. Images have no meaningful
//! character length, so each one is charged a flat estimate.

use crate::{ContentBlock, Message, UserContent};

/// Characters per token. Deliberately generous so the estimate errs
/// toward "too big" rather than "fits".
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Flat character charge for a single image block.
pub const IMAGE_CHAR_ESTIMATE: usize = 8_000;

/// Flat character charge for a custom (non user / assistant / tool) message.
pub const CUSTOM_MESSAGE_CHAR_ESTIMATE: usize = 256;

/// Charge for a tool call whose arguments fail to serialize.
pub const TOOL_CALL_ARGS_FALLBACK_CHARS: usize = 128;

/// Character budget for a context window of `tokens` tokens.
pub fn char_window(tokens: u64) -> usize {
    (tokens as usize).saturating_mul(CHARS_PER_TOKEN_ESTIMATE)
}

/// Estimate the character cost of a single message.
pub fn estimate_message_chars(message: &Message) -> usize {
    match message {
        Message::User(user) => match &user.content {
            UserContent::Text(text) => text.chars().count(),
            UserContent::Blocks(blocks) => blocks.iter().map(text_or_image_chars).sum(),
        },
        Message::Assistant(assistant) => assistant
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.chars().count(),
                ContentBlock::Thinking { thinking } => thinking.chars().count(),
                ContentBlock::ToolCall { arguments, .. } => serde_json::to_string(arguments)
                    .map_or(TOOL_CALL_ARGS_FALLBACK_CHARS, |s| s.chars().count()),
                ContentBlock::Image { .. } => 0,
            })
            .sum(),
        Message::ToolResult(result) => result.content.iter().map(text_or_image_chars).sum(),
        Message::Custom(_) => CUSTOM_MESSAGE_CHAR_ESTIMATE,
    }
}

/// Estimate the total character cost of a slice of messages.
pub fn estimate_messages_chars(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_chars).sum()
}

fn text_or_image_chars(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text { text } => text.chars().count(),
        ContentBlock::Image { .. } => IMAGE_CHAR_ESTIMATE,
        ContentBlock::Thinking { .. } | ContentBlock::ToolCall { .. } => 0,
    }
}

/// Snapshot of character usage against a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharUsage {
    /// Estimated characters consumed.
    pub total_chars: usize,
    /// Character budget of the window.
    pub char_window: usize,
}

impl CharUsage {
    pub fn new(total_chars: usize, char_window: usize) -> Self {
        Self {
            total_chars,
            char_window,
        }
    }

    pub fn measure(messages: &[Message], context_window_tokens: u64) -> Self {
        Self::new(
            estimate_messages_chars(messages),
            char_window(context_window_tokens),
        )
    }

    /// Usage as a fraction of the window. A zero window reports 0.0
    /// ("cannot evaluate") rather than infinity.
    pub fn ratio(&self) -> f64 {
        if self.char_window == 0 {
            return 0.0;
        }
        self.total_chars as f64 / self.char_window as f64
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} chars ({:.0}% of {})",
            self.total_chars,
            self.ratio() * 100.0,
            self.char_window,
        )
    }
}
