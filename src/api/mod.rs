//! HTTP surface: `POST /chat/query` plus the chart MCP endpoint.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::chat::{ChartAgent, Message};
use crate::mcp::server::mcp_router;

pub struct AppState {
    pub agent: ChartAgent,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub messages: Vec<Message>,
}

/// Either the full message list or a single error description.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Messages(Vec<Message>),
    Error { error: String },
}

pub fn router(agent: ChartAgent) -> Router {
    let state = Arc::new(AppState { agent });
    Router::new()
        .route("/chat/query", post(chat_query))
        .with_state(state)
        .merge(mcp_router())
}

async fn chat_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> Json<QueryResponse> {
    let query = match payload {
        Ok(Json(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable chat query");
            return Json(QueryResponse::Error {
                error: rejection.body_text(),
            });
        }
    };
    info!(messages = query.messages.len(), "chat query");
    match state.agent.run(query.messages).await {
        Ok(run) => {
            debug!(
                output = run.output.len(),
                transcript = run.transcript.len(),
                "chat query done"
            );
            Json(QueryResponse::Messages(run.output))
        }
        Err(e) => {
            error!(error = %e, "chat query failed");
            Json(QueryResponse::Error {
                error: e.to_string(),
            })
        }
    }
}

pub async fn serve(address: &str, agent: ChartAgent) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("bind {address}"))?;
    info!(address = %listener.local_addr()?, "chart agent listening");
    axum::serve(listener, router(agent))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    info!("chart agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
}
