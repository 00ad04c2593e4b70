use tracing::debug;

use crate::chat::types::{Message, Role};
use crate::llm::types::ChatMessage;

pub const BASE_SYSTEM_PROMPT: &str = "You are an expert in data visualisation that can generate charts based on user requests. Use the available tools to complete the request. For some queries you may need to call multiple tools to get the final result.";

pub const PERSONALITY_PROMPT: &str =
    "You should always reply in the style of Thomas Malory, but don't be too verbose";

/// Build the model-facing message list for a caller stream.
///
/// The base prompt only frames an opening turn (a stream of exactly one
/// message); the personality prompt precedes every turn. Caller `tool` and
/// `chart` messages have no call issued in this run to answer, so they stay
/// out of the model's view.
pub fn assemble(caller: &[Message]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(caller.len() + 2);
    if caller.len() == 1 {
        messages.push(ChatMessage::system(BASE_SYSTEM_PROMPT));
    }
    messages.push(ChatMessage::system(PERSONALITY_PROMPT));

    for msg in caller {
        match msg.role {
            Role::System | Role::User | Role::Assistant => {
                messages.push(ChatMessage::new(msg.role.as_str(), msg.content.clone()));
            }
            Role::Tool | Role::Chart => {
                debug!(role = msg.role.as_str(), "leaving caller message out of the transcript");
            }
        }
    }
    messages
}
