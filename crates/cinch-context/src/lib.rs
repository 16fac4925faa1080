//! Context budget engine for LLM agent sessions.
//!
//! Conversation history grows every turn, and tool results (file dumps,
//! command logs, search hits) are the part that grows fastest. `cinch-context`
//! keeps a session inside its model's context window without discarding
//! recent dialogue:
//!
//! 1. **[`context::window`]**: resolves the *effective* context window for a
//!    session from layered configuration and classifies it as fine, warn, or
//!    block.
//!
//! 2. **[`pruning`]**: trims or clears oversized tool results on every turn.
//!    The [`Pruner`](pruning::pruner) is a pure function; the
//!    [`PruningExtension`](pruning::PruningExtension) is the per-turn
//!    [`ContextHook`](hooks::ContextHook) that looks up per-session settings
//!    and applies cache-TTL gating.
//!
//! 3. **[`compaction`]**: safeguards for the host's summarization pipeline:
//!    a bounded tool-failure report, adaptive chunk sizing, oversize checks,
//!    and history-share pruning.
//!
//! Per-session settings live in [`SessionRegistry`](session::SessionRegistry)
//! side tables keyed by a [`SessionHandle`](session::SessionHandle), so the
//! host's own session type never has to carry engine state.
//!
//! # Example
//!
//! ```ignore
//! use cinch_context::prelude::*;
//!
//! let registry = PruningRuntimeRegistry::new();
//! let session = SessionHandle::generate();
//! registry.set(Some(&session), Some(PruningRuntime::new(PruningSettings::default())?));
//!
//! let hooks = ContextHooks::new().with_hook(PruningExtension::new(registry.clone()));
//!
//! let model = ModelInfo::new("anthropic", "claude-sonnet-4").with_context_window(200_000);
//! let ctx = TurnContext::new(Some(&session), Some(&model));
//! let messages = hooks.run(&history, &ctx);
//! ```
//!
//! Nothing in this crate performs I/O apart from
//! [`EngineConfig::load`](config::EngineConfig::load). Every algorithm is
//! synchronous and bounded by the size of its input.

pub mod compaction;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod prelude;
pub mod pruning;
pub mod session;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::ConfigError;

// ── Content blocks ─────────────────────────────────────────────────

/// A single block of message content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// An inline image (base64 data or a host-defined reference).
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Model reasoning / extended thinking.
    Thinking { thinking: String },
    /// A tool invocation requested by the assistant.
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentBlock::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        ContentBlock::Thinking {
            thinking: thinking.into(),
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        ContentBlock::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// The text of a `Text` block, `None` for every other kind.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Content of a user message: either a bare string or a block list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserMessage {
    pub content: UserContent,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// The result of a single tool call, fed back to the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub is_error: bool,
    /// Free-form metadata attached by the tool (exit code, status, ...).
    /// Key order is preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl ToolResultMessage {
    /// Attach a `details` entry (builder pattern).
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Mark this result as a failure (builder pattern).
    pub fn failed(mut self) -> Self {
        self.is_error = true;
        self
    }

    pub fn has_images(&self) -> bool {
        self.content.iter().any(ContentBlock::is_image)
    }
}

/// Any host-defined entry that is neither a user, assistant nor tool
/// result turn (system preamble, compaction summary, shell transcript, ...).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomMessage {
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResult(ToolResultMessage),
    Custom(CustomMessage),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User(UserMessage {
            content: UserContent::Text(content.into()),
        })
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Message::User(UserMessage {
            content: UserContent::Blocks(blocks),
        })
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: vec![ContentBlock::text(content)],
        })
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Message::Assistant(AssistantMessage { content: blocks })
    }

    /// A successful tool result with a single text block.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ToolResult(ToolResultMessage {
            tool_call_id: call_id.into(),
            tool_name: tool_name.into(),
            is_error: false,
            details: None,
            content: vec![ContentBlock::text(content)],
        })
    }

    pub fn custom(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Custom(CustomMessage {
            kind: kind.into(),
            content: vec![ContentBlock::text(content)],
        })
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Message::User(_) => MessageRole::User,
            Message::Assistant(_) => MessageRole::Assistant,
            Message::ToolResult(_) => MessageRole::ToolResult,
            Message::Custom(_) => MessageRole::Custom,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User(_))
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant(_))
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultMessage> {
        match self {
            Message::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

impl From<ToolResultMessage> for Message {
    fn from(result: ToolResultMessage) -> Self {
        Message::ToolResult(result)
    }
}

/// Role of a message, for logging and diagnostics.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageRole {
    User,
    Assistant,
    ToolResult,
    Custom,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::ToolResult => write!(f, "toolResult"),
            MessageRole::Custom => write!(f, "custom"),
        }
    }
}
