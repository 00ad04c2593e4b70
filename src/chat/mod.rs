mod agent_loop;
mod backend;
pub mod catalog;
pub mod dispatch;
mod error;
pub mod prompt;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent_loop::ChartAgent;
pub use backend::{CompletionBackend, HostTool, ToolHost};
pub use types::Message;
