use serde_json::{Value, json};

use super::{outputs::OutputContext, registry::ToolName};
use crate::{
    client::{ToolCall, ToolEvent, ToolOutput},
    context::StreamContext,
};

/// Everything known about one tool invocation, from either the live log or persisted rows.
#[derive(Debug, Clone)]
pub struct ToolEventInput<'a> {
    pub tool_name: &'a str,
    pub call_id: &'a str,
    pub agent_name: &'a str,
    pub arguments: &'a str,
    pub item: Value,
    /// `None` while the tool is still running. An empty string is a finished call with empty
    /// output.
    pub raw_output: Option<&'a str>,
    pub typed_output: Option<&'a Value>,
}

/// Builds the client-facing tool event, or `None` when the tool is not allowed.
pub async fn build_tool_event(input: ToolEventInput<'_>, stream: &StreamContext) -> Option<ToolEvent> {
    let tool = ToolName::lookup(input.tool_name)?;
    let formatters = tool.formatters();
    let arguments = formatters.arguments.format(tool, input.arguments);

    let Some(raw_output) = input.raw_output else {
        return Some(ToolEvent::Call(ToolCall {
            call_id: input.call_id.to_string(),
            item: input.item,
            agent_calling: input.agent_name.to_string(),
            tool_called: arguments.tool_called,
            arguments: arguments.arguments,
            parsed_arguments: arguments.parsed_arguments,
        }));
    };

    let output = formatters
        .output
        .format(OutputContext {
            tool,
            raw_output,
            typed_output: input.typed_output,
            stream,
        })
        .await;

    Some(ToolEvent::Output(ToolOutput {
        call_id: input.call_id.to_string(),
        item: input.item,
        tool_called: arguments.tool_called,
        agent_calling: input.agent_name.to_string(),
        raw_output: output.raw_output,
        parsed_output: output.parsed_output,
    }))
}

/// Rebuilds the run-item `item` for a tool call that was read back from storage.
pub fn build_tool_item(
    tool_name: &str,
    call_id: &str,
    arguments: &str,
    agent_name: &str,
    id: Option<&str>,
    status: Option<&str>,
) -> Value {
    let mut raw_item = json!({
        "name": tool_name,
        "call_id": call_id,
        "arguments": arguments,
        "type": "function_call",
    });
    if let Some(id) = id {
        raw_item["id"] = json!(id);
    }
    raw_item["status"] = json!(status.unwrap_or("completed"));

    json!({
        "type": "tool_call_item",
        "agent": agent_name,
        "raw_item": raw_item,
    })
}
