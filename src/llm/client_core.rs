use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::{ConnectionConfig, LlmConfig};

/// Chat-completions client bound to one endpoint, credential and model.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub(crate) inner: reqwest::Client,
    pub llm_cfg: LlmConfig,
}

impl OpenAIClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let inner = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            inner,
            llm_cfg: LlmConfig::default(),
        })
    }

    pub fn from_connection(conn: &ConnectionConfig, cfg: LlmConfig) -> Result<Self> {
        let api_key = conn
            .api_key
            .clone()
            .context("no API key configured (set OPENAI_API_KEY or pass --api-key)")?;
        Ok(Self::new(conn.base_url.clone(), api_key, conn.model.clone())?.with_llm_config(cfg))
    }

    pub fn with_llm_config(mut self, cfg: LlmConfig) -> Self {
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        // Keep the existing client if the builder rejects the settings
        if let Ok(c) = builder.build() {
            self.inner = c;
        }
        self.llm_cfg = cfg;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
