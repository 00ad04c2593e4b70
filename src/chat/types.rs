use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::chat::error::ChatError;
use crate::llm::types::{ChatMessage, ToolCall};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
    Chart,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Chart => "chart",
        }
    }
}

/// A caller-visible message. `chart` messages carry a serialized figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn chart(figure: impl Into<String>) -> Self {
        Self::new(Role::Chart, figure)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(String),
    Failure(String),
}

impl ToolResult {
    /// Body of the `tool` transcript message, whichever way the call went.
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Success(s) | ToolResult::Failure(s) => s,
        }
    }
}

/// The model-facing message list.
///
/// Tool results can only be appended for call ids that an assistant turn in
/// this transcript has issued, so a malformed `tool` message never reaches the
/// completion endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    issued: HashSet<String>,
}

impl Transcript {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            issued: HashSet::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn push_assistant(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        self.issued
            .extend(tool_calls.iter().filter_map(|c| c.id.clone()));
        self.messages
            .push(ChatMessage::assistant_with_calls(content, tool_calls));
    }

    pub fn push_tool_result(&mut self, call_id: &str, result: &ToolResult) -> Result<(), ChatError> {
        if !self.issued.contains(call_id) {
            return Err(ChatError::UnmatchedToolResult(call_id.to_string()));
        }
        self.messages
            .push(ChatMessage::tool_result(call_id, result.text()));
        Ok(())
    }
}

/// Result of one chat run: what the caller sees and what the model saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRun {
    pub output: Vec<Message>,
    pub transcript: Vec<ChatMessage>,
}
