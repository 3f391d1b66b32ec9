use serde::Deserialize;
use serde_json::Value;

/// Events written to the task log by the upstream agent process.
///
/// Only tags this gateway understands get a variant; everything else lands in `Unrecognized`
/// and is ignored downstream, so the agent can add event kinds without breaking clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum UpstreamEvent {
    #[serde(rename = "turn_status")]
    TurnStatus { status: String },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { item: OutputItem },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta(OutputTextDelta),
    #[serde(rename = "run_item_stream_event")]
    RunItem(RunItemStreamEvent),
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone(FunctionCallArgumentsDone),
    #[serde(rename = "response.reasoning_summary_part.added")]
    ReasoningSummaryPartAdded(ReasoningSummaryPartEvent),
    #[serde(rename = "response.reasoning_summary_part.done")]
    ReasoningSummaryPartDone(ReasoningSummaryPartEvent),
    #[serde(other)]
    Unrecognized,
}

impl UpstreamEvent {
    /// Lenient decode used for log payloads: anything that is not a well-formed known event
    /// becomes `Unrecognized` after a warning.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, "unexpected upstream event structure");
                UpstreamEvent::Unrecognized
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum OutputItem {
    #[serde(rename = "reasoning")]
    Reasoning {
        id: String,
        #[serde(default)]
        summary: Vec<Value>,
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(rename = "message")]
    Message {
        id: String,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        content: Vec<Value>,
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputTextDelta {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub content_index: i64,
    #[serde(default)]
    pub delta: String,
    #[serde(default)]
    pub sequence_number: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCallArgumentsDone {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningSummaryPartEvent {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub summary_index: i64,
    #[serde(default)]
    pub part: Value,
    #[serde(default)]
    pub agent_name: Option<String>,
}

/// Agent SDK run-item notification. `item` is echoed to clients untouched, so it stays a raw
/// JSON value; the fields this gateway needs are read out of `item.raw_item`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunItemStreamEvent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub item: Value,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub execution_context: Option<ExecutionContext>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub context_type: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub typed_output: Option<Value>,
}

impl RunItemStreamEvent {
    /// Text of `item.raw_item.<key>`. Non-string values are rendered as JSON.
    pub fn raw_item_text(&self, key: &str) -> Option<String> {
        match self.item.get("raw_item")?.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_turn_status() {
        let event = UpstreamEvent::from_value(json!({"type": "turn_status", "status": "started"}));
        assert_eq!(
            event,
            UpstreamEvent::TurnStatus {
                status: "started".into()
            }
        );
    }

    #[test]
    fn unknown_tags_are_unrecognized() {
        let event = UpstreamEvent::from_value(json!({"type": "response.created", "foo": 1}));
        assert_eq!(event, UpstreamEvent::Unrecognized);
    }

    #[test]
    fn malformed_payloads_are_unrecognized() {
        assert_eq!(
            UpstreamEvent::from_value(json!("not an object")),
            UpstreamEvent::Unrecognized
        );
        assert_eq!(
            UpstreamEvent::from_value(json!({"status": "started"})),
            UpstreamEvent::Unrecognized
        );
        assert_eq!(
            UpstreamEvent::from_value(json!({"type": "turn_status"})),
            UpstreamEvent::Unrecognized
        );
    }

    #[test]
    fn unknown_output_item_types_parse_as_other() {
        let event = UpstreamEvent::from_value(json!({
            "type": "response.output_item.added",
            "item": {"type": "function_call", "id": "fc_1", "name": "execute_query"}
        }));
        assert_eq!(
            event,
            UpstreamEvent::OutputItemAdded {
                item: OutputItem::Other
            }
        );
    }

    #[test]
    fn run_item_raw_fields() {
        let UpstreamEvent::RunItem(event) = UpstreamEvent::from_value(json!({
            "type": "run_item_stream_event",
            "name": "tool_output",
            "item": {"raw_item": {"call_id": "c1", "output": {"rows": 2}, "arguments": null}},
            "execution_context": {"context_type": "tool_execution_end", "tool_name": "execute_query"}
        })) else {
            panic!("expected run item event");
        };

        assert_eq!(event.raw_item_text("call_id").as_deref(), Some("c1"));
        assert_eq!(event.raw_item_text("output").as_deref(), Some(r#"{"rows":2}"#));
        assert_eq!(event.raw_item_text("arguments"), None);
        assert_eq!(
            event
                .execution_context
                .and_then(|context| context.tool_name)
                .as_deref(),
            Some("execute_query")
        );
    }
}
