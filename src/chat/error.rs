use thiserror::Error;

/// Failures that end a chat run. Tool-local problems never show up here.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Error connecting to MCP server: {0:#}")]
    Discovery(anyhow::Error),

    #[error("Error calling the completion endpoint (round {round}): {error:#}")]
    Completion { round: u8, error: anyhow::Error },

    #[error("tool result for unknown call id `{0}`")]
    UnmatchedToolResult(String),
}
