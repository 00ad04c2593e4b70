use anyhow::Result;
use serde_json::{Map, Value};

use crate::llm::types::{ChatMessage, ChoiceMessageWithTools, ToolDef};

/// One request/response exchange with a chat-completions endpoint.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the single assistant turn produced for `messages`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> Result<ChoiceMessageWithTools>;
}

/// A tool as declared by the host that serves it.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Discovery and invocation against a tool host.
#[async_trait::async_trait]
pub trait ToolHost: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<HostTool>>;

    /// Invoke `name` and return its output as text. Host-side rejections are `Err`.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String>;
}
