use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

use crate::tools::{arguments::ParsedArguments, outputs::ParsedOutput};

/// Normalized events delivered to clients, live over SSE and inside reconstructed history.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "turnStatus")]
    TurnStatus { status: String },
    #[serde(rename = "reasoningItem.added")]
    ReasoningItemAdded { item: ReasoningItem },
    #[serde(rename = "reasoningItem.done")]
    ReasoningItemDone { item: ReasoningItem },
    #[serde(rename = "assistantMessage.added")]
    AssistantMessageAdded { item: AssistantMessageItem },
    #[serde(rename = "outputText.delta")]
    OutputTextDelta {
        #[serde(rename = "itemId")]
        item_id: String,
        #[serde(rename = "contentIndex")]
        content_index: i64,
        delta: String,
        #[serde(rename = "sequenceNumber")]
        sequence_number: i64,
    },
    #[serde(rename = "functionCall.arguments.done")]
    FunctionCallArgumentsDone { item: FunctionCallArguments },
    #[serde(rename = "reasoningSummaryPart.added")]
    ReasoningSummaryPartAdded { item: ReasoningSummaryPart },
    #[serde(rename = "reasoningSummaryPart.done")]
    ReasoningSummaryPartDone { item: ReasoningSummaryPart },
    #[serde(rename = "CallToolEvent")]
    CallTool(ToolCall),
    #[serde(rename = "ToolOutputEvent")]
    ToolOutput(ToolOutput),
    #[serde(rename = "heartbeat")]
    Heartbeat {
        source: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// SSE event name; always the same string as the JSON `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::TurnStatus { .. } => "turnStatus",
            ClientEvent::ReasoningItemAdded { .. } => "reasoningItem.added",
            ClientEvent::ReasoningItemDone { .. } => "reasoningItem.done",
            ClientEvent::AssistantMessageAdded { .. } => "assistantMessage.added",
            ClientEvent::OutputTextDelta { .. } => "outputText.delta",
            ClientEvent::FunctionCallArgumentsDone { .. } => "functionCall.arguments.done",
            ClientEvent::ReasoningSummaryPartAdded { .. } => "reasoningSummaryPart.added",
            ClientEvent::ReasoningSummaryPartDone { .. } => "reasoningSummaryPart.done",
            ClientEvent::CallTool(_) => "CallToolEvent",
            ClientEvent::ToolOutput(_) => "ToolOutputEvent",
            ClientEvent::Heartbeat { .. } => "heartbeat",
            ClientEvent::Error { .. } => "error",
        }
    }

    pub fn turn_status(&self) -> Option<&str> {
        match self {
            ClientEvent::TurnStatus { status } => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct ReasoningItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub summary: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct AssistantMessageItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub content: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallArguments {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub arguments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningSummaryPart {
    pub item_id: String,
    pub summary_index: i64,
    pub part: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

/// A tool invocation that has not produced output yet.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub call_id: String,
    pub item: Value,
    pub agent_calling: String,
    pub tool_called: String,
    pub arguments: String,
    pub parsed_arguments: Option<ParsedArguments>,
}

/// A tool invocation together with its result.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub call_id: String,
    pub item: Value,
    pub tool_called: String,
    pub agent_calling: String,
    pub raw_output: String,
    pub parsed_output: Option<ParsedOutput>,
}

/// The two shapes a tool event can take. Serializes exactly like the matching
/// [`ClientEvent`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "type")]
pub enum ToolEvent {
    #[serde(rename = "CallToolEvent")]
    Call(ToolCall),
    #[serde(rename = "ToolOutputEvent")]
    Output(ToolOutput),
}

impl From<ToolEvent> for ClientEvent {
    fn from(event: ToolEvent) -> Self {
        match event {
            ToolEvent::Call(call) => ClientEvent::CallTool(call),
            ToolEvent::Output(output) => ClientEvent::ToolOutput(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_name_matches_type_tag() {
        let events = vec![
            ClientEvent::TurnStatus {
                status: "started".into(),
            },
            ClientEvent::OutputTextDelta {
                item_id: "msg_1".into(),
                content_index: 0,
                delta: "Hi".into(),
                sequence_number: 4,
            },
            ClientEvent::Heartbeat {
                source: "gateway".into(),
                timestamp: Utc::now(),
            },
            ClientEvent::ToolOutput(ToolOutput {
                call_id: "c1".into(),
                item: json!({}),
                tool_called: "gsutil".into(),
                agent_calling: "Moby".into(),
                raw_output: String::new(),
                parsed_output: None,
            }),
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }

    #[test]
    fn delta_uses_camel_case_fields() {
        let value = serde_json::to_value(ClientEvent::OutputTextDelta {
            item_id: "msg_1".into(),
            content_index: 1,
            delta: "lo".into(),
            sequence_number: 9,
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "type": "outputText.delta",
                "itemId": "msg_1",
                "contentIndex": 1,
                "delta": "lo",
                "sequenceNumber": 9
            })
        );
    }

    #[test]
    fn tool_event_serializes_like_client_event() {
        let tool = ToolEvent::Call(ToolCall {
            call_id: "c1".into(),
            item: json!({"type": "tool_call_item"}),
            agent_calling: "Moby".into(),
            tool_called: "web_search".into(),
            arguments: "{}".into(),
            parsed_arguments: None,
        });

        let as_tool = serde_json::to_value(&tool).unwrap();
        let as_client = serde_json::to_value(ClientEvent::from(tool)).unwrap();
        assert_eq!(as_tool, as_client);
        assert_eq!(as_client["type"], "CallToolEvent");
        assert_eq!(as_client["parsedArguments"], Value::Null);
    }
}
