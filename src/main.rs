mod api;
mod chat;
mod config;
mod llm;
mod logging;
mod mcp;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::info;

use crate::chat::{ChartAgent, Message, catalog::discover_tools};
use crate::config::{AppConfig, Overrides};
use crate::mcp::client::McpToolHost;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "chart-agent",
    version,
    about = "Chat agent that answers with Plotly charts drawn by MCP tools"
)]
struct Cli {
    /// OpenAI-compatible API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// API key (set via env OPENAI_API_KEY recommended)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Log level or filter directive (error,warn,info,debug,trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Serve POST /chat/query and the /mcp chart endpoint
    Serve {
        /// Listen address, e.g. 127.0.0.1:8000
        #[arg(long)]
        address: Option<String>,
    },
    /// Send one prompt and print the resulting messages as JSON
    Ask { prompt: String },
    /// Print the tool catalog offered to the model
    Tools,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let server_address = match &self.command {
            Command::Serve { address } => address.clone(),
            _ => None,
        };
        Overrides {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            log_level: self.log_level.clone(),
            server_address,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let cfg = AppConfig::load(cli.overrides())?;
    logging::init_logging(&cfg.log)?;
    info!(?cfg, "app config");

    match cli.command {
        Command::Serve { .. } => {
            let agent = ChartAgent::from_config(&cfg)?;
            api::serve(&cfg.server.address, agent).await
        }
        Command::Ask { prompt } => {
            let agent = ChartAgent::from_config(&cfg)?;
            let run = agent.run(vec![Message::user(prompt)]).await?;
            println!("{}", serde_json::to_string_pretty(&run.output)?);
            Ok(())
        }
        Command::Tools => {
            let host = McpToolHost::new(cfg.tool_host.clone());
            let catalog = discover_tools(&host).await?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            Ok(())
        }
    }
}
