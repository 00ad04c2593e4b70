use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, error};

use crate::chat::CompletionBackend;
use crate::llm::client_core::OpenAIClient;
use crate::llm::types::{
    ChatMessage, ChatRequestWithTools, ChatResponseWithTools, ChoiceMessageWithTools, ToolDef,
};
use crate::llm::{COMPLETION_MAX_TOKENS, COMPLETION_TEMPERATURE, LlmErrorKind, classify_error};

/// Issue exactly one chat-completions request. Failures are returned as-is, never retried.
pub async fn chat_tools_once(
    client: &OpenAIClient,
    messages: Vec<ChatMessage>,
    tools: &[ToolDef],
) -> Result<ChoiceMessageWithTools> {
    let url = client.endpoint();
    let req = ChatRequestWithTools {
        model: client.model.clone(),
        messages,
        temperature: Some(COMPLETION_TEMPERATURE),
        max_tokens: Some(COMPLETION_MAX_TOKENS),
        // an empty `tools` array is rejected by the API
        tools: (!tools.is_empty()).then(|| tools.to_vec()),
    };

    if let Ok(payload) = serde_json::to_string_pretty(&req) {
        debug!(payload=%payload, endpoint=%url, "sending chat.completions (tools) payload");
    }

    let resp = match client
        .inner
        .post(&url)
        .bearer_auth(&client.api_key)
        .json(&req)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            let e = anyhow::Error::new(e).context("send chat request (tools)");
            error!(kind=?classify_error(None, &e), error=%format!("{e:#}"), "llm request failed");
            return Err(e);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default().trim().to_owned();
        let e = anyhow!("chat (tools) error: {} - {}", status, text);
        error!(
            status=%status.as_u16(),
            kind=?classify_error(Some(status), &e),
            body=%text,
            "llm chat_tools_once non-success status"
        );
        return Err(e);
    }

    let response_text = resp
        .text()
        .await
        .context("read chat response body (tools)")?;
    debug!(response_body=%response_text, "llm chat_tools_once response");

    let body: ChatResponseWithTools = serde_json::from_str(&response_text).map_err(|e| {
        error!(kind=?LlmErrorKind::Deserialize, error=%e, "malformed chat response");
        anyhow::Error::new(e).context("parse chat response (tools)")
    })?;

    if let Some(usage) = &body.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "llm token usage"
        );
    }

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no choices returned"))?;
    Ok(choice.message)
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> Result<ChoiceMessageWithTools> {
        chat_tools_once(self, messages.to_vec(), tools).await
    }
}
