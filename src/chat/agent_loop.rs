use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chat::backend::{CompletionBackend, ToolHost};
use crate::chat::catalog::discover_tools;
use crate::chat::dispatch::{assign_call_ids, dispatch_all};
use crate::chat::error::ChatError;
use crate::chat::prompt;
use crate::chat::types::{ChatRun, Message, Transcript};
use crate::config::AppConfig;
use crate::llm::OpenAIClient;
use crate::llm::types::{ChoiceMessageWithTools, ToolDef};
use crate::mcp::client::McpToolHost;

/// Chart-drawing chat agent.
///
/// A run is `discover -> complete -> [dispatch all -> complete]`: at most one
/// dispatch round and two completions. Tool calls requested by the second
/// completion are not executed.
#[derive(Clone)]
pub struct ChartAgent {
    completion: Arc<dyn CompletionBackend>,
    tools: Arc<dyn ToolHost>,
}

impl ChartAgent {
    pub fn new(completion: Arc<dyn CompletionBackend>, tools: Arc<dyn ToolHost>) -> Self {
        Self { completion, tools }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = OpenAIClient::from_connection(&cfg.connection, cfg.llm.clone())?;
        let host = McpToolHost::new(cfg.tool_host.clone());
        Ok(Self::new(Arc::new(client), Arc::new(host)))
    }

    /// The tool catalog as the model would see it right now.
    pub async fn catalog(&self) -> Result<Vec<ToolDef>, ChatError> {
        discover_tools(self.tools.as_ref()).await
    }

    pub async fn run(&self, caller: Vec<Message>) -> Result<ChatRun, ChatError> {
        let catalog = self.catalog().await?;
        let mut transcript = Transcript::new(prompt::assemble(&caller));
        let mut output = caller;

        let first = self.complete(1, &transcript, &catalog).await?;
        if !first.has_tool_calls() {
            debug!("first completion requested no tools");
            if let Some(text) = first.prose() {
                output.push(Message::assistant(text));
                transcript.push_assistant(Some(text.to_string()), Vec::new());
            }
            return Ok(ChatRun {
                output,
                transcript: transcript.into_messages(),
            });
        }

        let mut calls = first.calls().to_vec();
        assign_call_ids(&mut calls);
        info!(count = calls.len(), "dispatching tool calls");
        if let Some(text) = first.prose() {
            output.push(Message::assistant(text));
        }
        transcript.push_assistant(first.prose().map(str::to_string), calls.clone());

        let succeeded = dispatch_all(self.tools.as_ref(), &calls, &mut transcript, &mut output).await?;
        debug!(succeeded, failed = calls.len() - succeeded, "dispatch round finished");

        let second = self.complete(2, &transcript, &catalog).await?;
        if second.has_tool_calls() {
            warn!(
                dropped = second.calls().len(),
                "second completion requested more tools; only one dispatch round runs"
            );
        }
        if let Some(text) = second.prose() {
            output.push(Message::assistant(text));
            transcript.push_assistant(Some(text.to_string()), Vec::new());
        }

        Ok(ChatRun {
            output,
            transcript: transcript.into_messages(),
        })
    }

    async fn complete(
        &self,
        round: u8,
        transcript: &Transcript,
        catalog: &[ToolDef],
    ) -> Result<ChoiceMessageWithTools, ChatError> {
        self.completion
            .complete(transcript.messages(), catalog)
            .await
            .map_err(|error| ChatError::Completion { round, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompt::{BASE_SYSTEM_PROMPT, PERSONALITY_PROMPT};
    use crate::chat::test_support::{FakeHost, ScriptedBackend, host_tool, tool_call};
    use crate::chat::types::Role;
    use serde_json::json;

    const FIGURE: &str = r#"{"data":[{"type":"bar","x":["a","b"],"y":[1.0,2.0]}],"layout":{}}"#;

    fn chart_host() -> FakeHost {
        FakeHost::new(vec![
            host_tool("line_plot"),
            host_tool("bar_chart"),
            host_tool("heat_map"),
        ])
    }

    fn agent(backend: &Arc<ScriptedBackend>, host: &Arc<FakeHost>) -> ChartAgent {
        ChartAgent::new(backend.clone(), host.clone())
    }

    fn bar_request() -> Vec<Message> {
        vec![Message::user("make a bar chart of a=1,b=2")]
    }

    fn bar_call_backend() -> ScriptedBackend {
        ScriptedBackend::new(
            ChoiceMessageWithTools::with_calls(
                None,
                vec![tool_call(
                    Some("call_bar"),
                    "bar_chart",
                    r#"{"x":["a","b"],"y":[1,2]}"#,
                )],
            ),
            ChoiceMessageWithTools::text("Behold, thy bar chart."),
        )
    }

    #[tokio::test]
    async fn opening_turn_is_framed_by_both_system_prompts() {
        let backend = Arc::new(ScriptedBackend::text("Well met."));
        let host = Arc::new(chart_host());
        agent(&backend, &host).run(bar_request()).await.unwrap();

        let (sent, tools) = &backend.requests()[0];
        let roles: Vec<_> = sent.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "system", "user"]);
        assert_eq!(sent[0].content.as_deref(), Some(BASE_SYSTEM_PROMPT));
        assert_eq!(sent[1].content.as_deref(), Some(PERSONALITY_PROMPT));
        assert_eq!(tools.len(), 3);
    }

    #[tokio::test]
    async fn follow_up_turn_has_no_base_prompt() {
        let backend = Arc::new(ScriptedBackend::text("Aye."));
        let host = Arc::new(chart_host());
        let caller = vec![
            Message::user("make a chart"),
            Message::assistant("Which kind?"),
            Message::user("a bar chart"),
        ];
        agent(&backend, &host).run(caller).await.unwrap();

        let (sent, _) = &backend.requests()[0];
        let bases = sent
            .iter()
            .filter(|m| m.content.as_deref() == Some(BASE_SYSTEM_PROMPT))
            .count();
        assert_eq!(bases, 0);
        assert_eq!(sent[0].content.as_deref(), Some(PERSONALITY_PROMPT));
    }

    #[tokio::test]
    async fn no_tool_calls_appends_reply_and_never_calls_tools() {
        let backend = Arc::new(ScriptedBackend::text("No chart is needed, good knight."));
        let host = Arc::new(chart_host());
        let input = vec![Message::user("hello")];
        let run = agent(&backend, &host).run(input.clone()).await.unwrap();

        let mut expected = input;
        expected.push(Message::assistant("No chart is needed, good knight."));
        assert_eq!(run.output, expected);
        assert!(host.call_log().is_empty());
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn bar_chart_scenario_yields_chart_then_reply() {
        let backend = Arc::new(bar_call_backend());
        let host = Arc::new(chart_host().respond("bar_chart", FIGURE));
        let run = agent(&backend, &host).run(bar_request()).await.unwrap();

        assert_eq!(
            run.output,
            vec![
                Message::user("make a bar chart of a=1,b=2"),
                Message::chart(FIGURE),
                Message::assistant("Behold, thy bar chart."),
            ]
        );

        let calls = host.call_log();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "bar_chart");
        assert_eq!(json!(calls[0].1), json!({"x": ["a", "b"], "y": [1, 2]}));

        // second completion sees the call envelope and its result
        let (second, _) = &backend.requests()[1];
        let envelope = second.iter().find(|m| !m.tool_calls.is_empty()).unwrap();
        assert_eq!(envelope.tool_calls[0].id.as_deref(), Some("call_bar"));
        let tool_msg = second.iter().find(|m| m.role == "tool").unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_bar"));
        assert_eq!(tool_msg.content.as_deref(), Some(FIGURE));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model_not_caller() {
        let backend = Arc::new(bar_call_backend());
        let host = Arc::new(FakeHost::new(vec![host_tool("bar_chart")]));
        let run = agent(&backend, &host).run(bar_request()).await.unwrap();

        assert!(run.output.iter().all(|m| m.role != Role::Chart));
        let tool_msgs: Vec<_> = run.transcript.iter().filter(|m| m.role == "tool").collect();
        assert_eq!(tool_msgs.len(), 1);
        let text = tool_msgs[0].content.as_deref().unwrap();
        assert!(text.contains("bar_chart"));
        assert!(text.contains("Unknown tool"));
        assert_eq!(run.output.last(), Some(&Message::assistant("Behold, thy bar chart.")));
    }

    #[tokio::test]
    async fn every_call_gets_one_tool_message_in_order() {
        let backend = Arc::new(ScriptedBackend::new(
            ChoiceMessageWithTools::with_calls(
                Some("I shall draw three.".into()),
                vec![
                    tool_call(Some("a"), "line_plot", "{}"),
                    tool_call(Some("b"), "pie_chart", "{}"),
                    tool_call(None, "heat_map", "not json"),
                    tool_call(Some("d"), "bar_chart", "{}"),
                ],
            ),
            ChoiceMessageWithTools::text("Done."),
        ));
        let host = Arc::new(
            chart_host()
                .respond("line_plot", "L")
                .respond("bar_chart", "B")
                .respond("heat_map", "H"),
        );
        let run = agent(&backend, &host).run(bar_request()).await.unwrap();

        let ids: Vec<_> = run
            .transcript
            .iter()
            .filter(|m| m.role == "tool")
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "call_2", "d"]);

        let roles: Vec<_> = run.output.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::Chart,
                Role::Chart,
                Role::Assistant
            ]
        );
        assert_eq!(run.output[1].content, "I shall draw three.");
        assert_eq!(run.output[2].content, "L");
        assert_eq!(run.output[3].content, "B");
    }

    #[tokio::test]
    async fn second_round_tool_calls_are_not_executed() {
        let backend = Arc::new(ScriptedBackend::new(
            ChoiceMessageWithTools::with_calls(
                None,
                vec![tool_call(Some("a"), "bar_chart", "{}")],
            ),
            ChoiceMessageWithTools::with_calls(
                Some("One more, anon.".into()),
                vec![tool_call(Some("b"), "line_plot", "{}")],
            ),
        ));
        let host = Arc::new(chart_host().respond("bar_chart", "B").respond("line_plot", "L"));
        let run = agent(&backend, &host).run(bar_request()).await.unwrap();

        assert_eq!(host.call_log().len(), 1);
        assert_eq!(backend.requests().len(), 2);
        assert_eq!(run.output.last(), Some(&Message::assistant("One more, anon.")));
        let last = run.transcript.last().unwrap();
        assert!(last.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn discovery_failure_short_circuits() {
        let backend = Arc::new(ScriptedBackend::text("unused"));
        let host = Arc::new(FakeHost::unreachable("connection refused"));
        let err = agent(&backend, &host).run(bar_request()).await.unwrap_err();

        assert!(matches!(err, ChatError::Discovery(_)));
        assert!(err.to_string().contains("connection refused"));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn completion_failure_in_either_round_short_circuits() {
        let backend = Arc::new(ScriptedBackend::text("unused").fail_round(1, "401 Unauthorized"));
        let host = Arc::new(chart_host());
        let err = agent(&backend, &host).run(bar_request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Completion { round: 1, .. }));
        assert!(err.to_string().contains("401 Unauthorized"));
        assert!(host.call_log().is_empty());

        let backend = Arc::new(bar_call_backend().fail_round(2, "quota exceeded"));
        let host = Arc::new(chart_host().respond("bar_chart", FIGURE));
        let err = agent(&backend, &host).run(bar_request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Completion { round: 2, .. }));
        assert_eq!(host.call_log().len(), 1);
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let backend = Arc::new(bar_call_backend());
        let host = Arc::new(chart_host().respond("bar_chart", FIGURE));
        let agent = agent(&backend, &host);

        let first = agent.run(bar_request()).await.unwrap();
        let second = agent.run(bar_request()).await.unwrap();
        assert_eq!(first, second);
        // tools are rediscovered on each run
        assert_eq!(host.list_count(), 2);
    }

    #[tokio::test]
    async fn prose_alongside_calls_reaches_caller_before_charts() {
        let backend = Arc::new(ScriptedBackend::new(
            ChoiceMessageWithTools::with_calls(
                Some("Hark!".into()),
                vec![tool_call(Some("a"), "bar_chart", "{}")],
            ),
            ChoiceMessageWithTools::text(""),
        ));
        let host = Arc::new(chart_host().respond("bar_chart", "B"));
        let run = agent(&backend, &host).run(bar_request()).await.unwrap();
        assert_eq!(
            run.output[1..].to_vec(),
            vec![Message::assistant("Hark!"), Message::chart("B")]
        );
    }
}
