use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tracing::info;

use crate::mcp::service::ChartMcpService;

pub const MCP_PATH: &str = "/mcp";

/// Routes serving the chart tools over streamable HTTP, one service per session.
pub fn mcp_router() -> Router {
    let service = StreamableHttpService::new(
        || Ok(ChartMcpService::new()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    info!(path = MCP_PATH, "mounting chart MCP endpoint");
    Router::new().nest_service(MCP_PATH, service)
}
