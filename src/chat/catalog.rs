use std::collections::HashSet;
use tracing::{debug, warn};

use crate::chat::backend::{HostTool, ToolHost};
use crate::chat::error::ChatError;
use crate::llm::types::ToolDef;

pub fn to_descriptor(tool: HostTool) -> ToolDef {
    ToolDef::function(
        tool.name,
        tool.description.unwrap_or_default(),
        tool.input_schema,
    )
}

/// Query the host for its current tools. Called on every run, never cached.
pub async fn discover_tools(host: &dyn ToolHost) -> Result<Vec<ToolDef>, ChatError> {
    let listed = host.list_tools().await.map_err(ChatError::Discovery)?;

    let mut seen = HashSet::new();
    let mut catalog = Vec::with_capacity(listed.len());
    for tool in listed {
        if !seen.insert(tool.name.clone()) {
            warn!(tool_name = %tool.name, "duplicate tool name from host; keeping the first");
            continue;
        }
        catalog.push(to_descriptor(tool));
    }
    debug!(count = catalog.len(), "discovered tools");
    Ok(catalog)
}
