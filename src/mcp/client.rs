use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParam, CallToolResult, JsonObject, RawContent, Tool},
    service::RunningService,
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use serde_json::Value;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

use crate::chat::{HostTool, ToolHost};
use crate::config::McpServerConfig;
use crate::mcp::service::ChartMcpService;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const LOCAL_PIPE_CAPACITY: usize = 64 * 1024;

/// One live session to a chart tool host.
pub struct McpClient {
    session: RunningService<RoleClient, ()>,
    name: String,
}

impl McpClient {
    pub async fn connect(config: &McpServerConfig) -> Result<Self> {
        debug!(server = %config.name, transport = %config.transport, "opening MCP session");
        let session = match config.transport.as_str() {
            "local" => {
                let (client_io, server_io) = tokio::io::duplex(LOCAL_PIPE_CAPACITY);
                tokio::spawn(async move {
                    match ChartMcpService::new().serve(server_io).await {
                        Ok(server) => {
                            if let Err(e) = server.waiting().await {
                                warn!(error = %e, "local MCP server task ended abnormally");
                            }
                        }
                        Err(e) => warn!(error = %e, "local MCP server failed to initialize"),
                    }
                });
                timeout(CONNECT_TIMEOUT, ().serve(client_io))
                    .await
                    .map_err(|_| anyhow!("MCP connection timeout"))?
                    .context("initialize local MCP session")?
            }
            "http" => {
                if config.address.is_empty() {
                    bail!("http transport requires an address");
                }
                let transport = StreamableHttpClientTransport::from_uri(config.address.clone());
                timeout(CONNECT_TIMEOUT, ().serve(transport))
                    .await
                    .map_err(|_| anyhow!("MCP connection timeout"))?
                    .with_context(|| format!("connect to MCP server at {}", config.address))?
            }
            "stdio" => {
                // address is the command line to spawn
                let mut parts = config.address.split_whitespace();
                let program = parts
                    .next()
                    .context("stdio transport requires a command in `address`")?;
                let mut cmd = Command::new(program);
                cmd.args(parts);
                let transport = TokioChildProcess::new(cmd)
                    .with_context(|| format!("spawn MCP server `{}`", config.address))?;
                timeout(CONNECT_TIMEOUT, ().serve(transport))
                    .await
                    .map_err(|_| anyhow!("MCP connection timeout"))?
                    .context("initialize stdio MCP session")?
            }
            other => bail!("Unsupported transport type: {other}"),
        };

        Ok(Self {
            session,
            name: config.name.clone(),
        })
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let tools = self
            .session
            .list_all_tools()
            .await
            .with_context(|| format!("list tools on {}", self.name))?;
        debug!(server = %self.name, count = tools.len(), "listed MCP tools");
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<CallToolResult> {
        info!(server = %self.name, tool_name = %name, "Calling MCP tool");
        debug!(tool_params = ?arguments, "Tool parameters");
        let result = self
            .session
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            })
            .await?;
        Ok(result)
    }

    pub async fn close(self) {
        if let Err(e) = self.session.cancel().await {
            warn!(server = %self.name, error = %e, "failed to close MCP session");
        }
    }
}

/// Flatten a tool result into the text the model and the caller consume.
pub fn result_text(result: CallToolResult) -> Result<String> {
    let texts: Vec<String> = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect();
    let text = if texts.is_empty() {
        result
            .structured_content
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    } else {
        texts.join("\n")
    };
    if result.is_error == Some(true) {
        bail!("{text}");
    }
    Ok(text)
}

impl From<Tool> for HostTool {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema: Value::Object((*tool.input_schema).clone()),
        }
    }
}

/// `ToolHost` backed by MCP sessions. Every operation opens its own session
/// and closes it before returning.
#[derive(Debug, Clone)]
pub struct McpToolHost {
    config: McpServerConfig,
}

impl McpToolHost {
    pub fn new(config: McpServerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHost for McpToolHost {
    async fn list_tools(&self) -> Result<Vec<HostTool>> {
        let client = McpClient::connect(&self.config).await?;
        let listed = client.list_tools().await;
        client.close().await;
        Ok(listed?.into_iter().map(HostTool::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<String> {
        let client = McpClient::connect(&self.config).await?;
        let called = client.call_tool(name, arguments).await;
        client.close().await;
        result_text(called?)
    }
}
