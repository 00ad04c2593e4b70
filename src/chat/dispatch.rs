use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::chat::backend::ToolHost;
use crate::chat::error::ChatError;
use crate::chat::types::{Message, ToolResult, Transcript};
use crate::llm::types::ToolCall;

/// Give every call an id so its result can be correlated. Ids the endpoint
/// sent are kept; missing ones become `call_<index>`, skipping any in use.
pub fn assign_call_ids(calls: &mut [ToolCall]) {
    let mut taken: HashSet<String> = calls.iter().filter_map(|c| c.id.clone()).collect();
    for (idx, call) in calls.iter_mut().enumerate() {
        if call.id.as_deref().is_some_and(|id| !id.is_empty()) {
            continue;
        }
        let mut candidate = format!("call_{idx}");
        let mut bump = 0;
        while taken.contains(&candidate) {
            bump += 1;
            candidate = format!("call_{idx}_{bump}");
        }
        taken.insert(candidate.clone());
        call.id = Some(candidate);
    }
}

/// Parse a call's wire-encoded arguments. An empty string means no arguments.
pub fn decode_arguments(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw).context("arguments are not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("arguments must be a JSON object, got {other}"),
    }
}

/// Run one call. Every failure is captured in the returned `ToolResult`.
pub async fn dispatch_tool_call(host: &dyn ToolHost, call: &ToolCall) -> ToolResult {
    let name = &call.function.name;
    let arguments = match decode_arguments(&call.function.arguments) {
        Ok(args) => args,
        Err(e) => {
            warn!(tool_name = %name, error = %format!("{e:#}"), "undecodable tool arguments");
            return ToolResult::Failure(format!("Error calling tool {name}: {e:#}"));
        }
    };
    match host.call_tool(name, arguments).await {
        Ok(payload) => {
            info!(tool_name = %name, bytes = payload.len(), "tool call succeeded");
            ToolResult::Success(payload)
        }
        Err(e) => {
            warn!(tool_name = %name, error = %format!("{e:#}"), "tool call failed");
            ToolResult::Failure(format!("Error calling tool {name}: {e:#}"))
        }
    }
}

/// Dispatch `calls` strictly in order. Each call adds one `tool` message to
/// the transcript; each success also adds a `chart` message to `output`.
/// Returns the number of successful calls.
pub async fn dispatch_all(
    host: &dyn ToolHost,
    calls: &[ToolCall],
    transcript: &mut Transcript,
    output: &mut Vec<Message>,
) -> Result<usize, ChatError> {
    let mut succeeded = 0;
    for call in calls {
        let call_id = call.id.as_deref().unwrap_or_default();
        let result = dispatch_tool_call(host, call).await;
        transcript.push_tool_result(call_id, &result)?;
        if let ToolResult::Success(figure) = result {
            output.push(Message::chart(figure));
            succeeded += 1;
        }
    }
    Ok(succeeded)
}
