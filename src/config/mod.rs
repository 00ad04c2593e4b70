use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PROJECT_CONFIG_DIR: &str = ".chart-agent";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub tool_host: McpServerConfig,
    pub log: LogConfig,
}

/// Resolved connection descriptor for the chat-completions endpoint.
#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Where the chart tools live. `local` runs them in-process, `http` points at a
/// streamable-HTTP MCP endpoint, `stdio` spawns the command in `address`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct McpServerConfig {
    pub name: String,
    pub address: String,
    pub transport: String, // "local", "http" or "stdio"
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: "charts".to_string(),
            address: String::new(),
            transport: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub llm: Option<PartialLlmConfig>,
    pub server: Option<PartialServerConfig>,
    pub tool_host: Option<PartialMcpServerConfig>,
    pub log: Option<PartialLogConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLlmConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialServerConfig {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialMcpServerConfig {
    pub name: Option<String>,
    pub address: Option<String>,
    pub transport: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub log_level: Option<String>,
    pub server_address: Option<String>,
}

impl AppConfig {
    pub fn load(overrides: Overrides) -> Result<Self> {
        let project_root = std::env::current_dir().context("resolve current dir")?;

        // Project config overrides the global one
        let project_cfg = load_project_config(&project_root).unwrap_or_default();
        let file_cfg = load_file_config().unwrap_or_default();

        Ok(Self::merge(
            overrides,
            |key| std::env::var(key).ok(),
            project_cfg,
            file_cfg,
        ))
    }

    /// Precedence: overrides, then environment, then project file, then global file.
    pub fn merge(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
        project_cfg: FileConfig,
        file_cfg: FileConfig,
    ) -> Self {
        let connection_defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            base_url: overrides
                .base_url
                .or_else(|| env("OPENAI_BASE_URL"))
                .or(project_cfg.base_url)
                .or(file_cfg.base_url)
                .unwrap_or(connection_defaults.base_url),
            api_key: overrides
                .api_key
                .or_else(|| env("OPENAI_API_KEY"))
                .or(project_cfg.api_key)
                .or(file_cfg.api_key),
            model: overrides
                .model
                .or_else(|| env("OPENAI_MODEL"))
                .or(project_cfg.model)
                .or(file_cfg.model)
                .unwrap_or(connection_defaults.model),
        };

        let llm_defaults = LlmConfig::default();
        let project_llm = project_cfg.llm.unwrap_or_default();
        let file_llm = file_cfg.llm.unwrap_or_default();
        let llm = LlmConfig {
            connect_timeout_ms: project_llm
                .connect_timeout_ms
                .or(file_llm.connect_timeout_ms)
                .unwrap_or(llm_defaults.connect_timeout_ms),
            request_timeout_ms: project_llm
                .request_timeout_ms
                .or(file_llm.request_timeout_ms)
                .unwrap_or(llm_defaults.request_timeout_ms),
        };

        let project_server = project_cfg.server.unwrap_or_default();
        let file_server = file_cfg.server.unwrap_or_default();
        let server = ServerConfig {
            address: overrides
                .server_address
                .or(project_server.address)
                .or(file_server.address)
                .unwrap_or_else(|| ServerConfig::default().address),
        };

        let host_defaults = McpServerConfig::default();
        let project_host = project_cfg.tool_host.unwrap_or_default();
        let file_host = file_cfg.tool_host.unwrap_or_default();
        let tool_host = McpServerConfig {
            name: project_host
                .name
                .or(file_host.name)
                .unwrap_or(host_defaults.name),
            address: project_host
                .address
                .or(file_host.address)
                .unwrap_or(host_defaults.address),
            transport: project_host
                .transport
                .or(file_host.transport)
                .unwrap_or(host_defaults.transport),
        };

        let log_defaults = LogConfig::default();
        let project_log = project_cfg.log.unwrap_or_default();
        let file_log = file_cfg.log.unwrap_or_default();
        let log = LogConfig {
            level: overrides
                .log_level
                .or_else(|| env("CHART_AGENT_LOG"))
                .or(project_log.level)
                .or(file_log.level)
                .unwrap_or(log_defaults.level),
            file: project_log.file.or(file_log.file),
        };

        Self {
            connection,
            llm,
            server,
            tool_host,
            log,
        }
    }
}

pub fn load_file_config() -> Result<FileConfig> {
    fn candidate_paths() -> Vec<PathBuf> {
        let mut v = Vec::new();
        if let Ok(p) = std::env::var("CHART_AGENT_CONFIG") {
            v.push(PathBuf::from(p));
        }
        if let Some(config_dir) = dirs::config_dir() {
            v.push(config_dir.join("chart-agent/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            v.push(home.join(".config/chart-agent/config.toml"));
        }
        v
    }

    for p in candidate_paths() {
        if p.exists() {
            let s = fs::read_to_string(&p)
                .with_context(|| format!("read config file: {}", p.display()))?;
            match toml::from_str::<FileConfig>(&s) {
                Ok(cfg) => {
                    info!(path=%p.display(), "loaded config file");
                    return Ok(cfg);
                }
                Err(e) => {
                    warn!(path=%p.display(), error=%e.to_string(), "parse config failed");
                    continue;
                }
            }
        }
    }
    Ok(FileConfig::default())
}

/// Load project-specific configuration from .chart-agent/config.toml
pub fn load_project_config(project_root: &Path) -> Result<FileConfig> {
    let project_config_path = project_root.join(PROJECT_CONFIG_DIR).join("config.toml");

    if !project_config_path.exists() {
        return Ok(FileConfig::default());
    }

    let s = fs::read_to_string(&project_config_path).with_context(|| {
        format!(
            "read project config file: {}",
            project_config_path.display()
        )
    })?;
    match toml::from_str::<FileConfig>(&s) {
        Ok(cfg) => {
            info!(path=%project_config_path.display(), "loaded project config file");
            Ok(cfg)
        }
        Err(e) => {
            warn!(path=%project_config_path.display(), error=%e.to_string(), "parse project config failed");
            Ok(FileConfig::default())
        }
    }
}
