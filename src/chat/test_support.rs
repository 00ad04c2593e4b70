use anyhow::{Result, anyhow, bail};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::chat::backend::{CompletionBackend, HostTool, ToolHost};
use crate::llm::types::{ChatMessage, ChoiceMessageWithTools, ToolCall, ToolCallFunction, ToolDef};

pub fn host_tool(name: &str) -> HostTool {
    HostTool {
        name: name.to_string(),
        description: Some(format!("{name} tool")),
        input_schema: json!({"type": "object"}),
    }
}

pub fn tool_call(id: Option<&str>, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.map(str::to_string),
        r#type: "function".to_string(),
        function: ToolCallFunction {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// In-memory tool host with canned per-tool responses.
#[derive(Default)]
pub struct FakeHost {
    tools: Vec<HostTool>,
    list_error: Option<String>,
    responses: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    lists: AtomicUsize,
}

impl FakeHost {
    pub fn new(tools: Vec<HostTool>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn unreachable(error: &str) -> Self {
        Self {
            list_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn respond(mut self, tool: &str, text: &str) -> Self {
        self.responses
            .insert(tool.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, tool: &str, error: &str) -> Self {
        self.responses
            .insert(tool.to_string(), Err(error.to_string()));
        self
    }

    pub fn call_log(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ToolHost for FakeHost {
    async fn list_tools(&self) -> Result<Vec<HostTool>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.list_error {
            bail!("{e}");
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        match self.responses.get(name) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => Err(anyhow!("Unknown tool: {name}")),
        }
    }
}

/// Completion backend answering by round: the first request gets `first`,
/// any request that already carries tool results gets `second`.
pub struct ScriptedBackend {
    first: Result<ChoiceMessageWithTools, String>,
    second: Result<ChoiceMessageWithTools, String>,
    requests: Mutex<Vec<(Vec<ChatMessage>, Vec<ToolDef>)>>,
}

impl ScriptedBackend {
    pub fn new(first: ChoiceMessageWithTools, second: ChoiceMessageWithTools) -> Self {
        Self {
            first: Ok(first),
            second: Ok(second),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(reply: &str) -> Self {
        Self::new(
            ChoiceMessageWithTools::text(reply),
            ChoiceMessageWithTools::text("unused"),
        )
    }

    pub fn fail_round(mut self, round: u8, error: &str) -> Self {
        match round {
            1 => self.first = Err(error.to_string()),
            _ => self.second = Err(error.to_string()),
        }
        self
    }

    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, Vec<ToolDef>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> Result<ChoiceMessageWithTools> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));
        let answer = if messages.iter().any(|m| m.role == "tool") {
            &self.second
        } else {
            &self.first
        };
        answer.clone().map_err(|e| anyhow!("{e}"))
    }
}
