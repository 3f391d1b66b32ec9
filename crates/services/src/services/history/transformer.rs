use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use db::models::agent_message::AgentMessage;
use events::{
    ClientEvent, StreamContext,
    client::ReasoningSummaryPart,
    tools::{DEFAULT_AGENT_NAME, ToolEventInput, build_tool_event, build_tool_item},
};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// One entry of a branch rendered the way a client would have seen it live.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: HistoryMessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HistoryMessageBody {
    User(UserMessage),
    Assistant(AssistantMessage),
    Event(ClientEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    pub role: &'static str,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

impl HistoryMessage {
    pub fn is_user(&self) -> bool {
        matches!(self.body, HistoryMessageBody::User(_))
    }
}

struct Row<'a> {
    id: &'a str,
    message_type: Option<&'a str>,
    data: Value,
    created_at: DateTime<Utc>,
}

impl Row<'_> {
    fn field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    fn is_kind(&self, kind: &str) -> bool {
        self.message_type == Some(kind) || self.field("type") == Some(kind)
    }

    fn is_user(&self) -> bool {
        self.message_type == Some("user") || self.field("role") == Some("user")
    }

    fn is_assistant(&self) -> bool {
        self.message_type == Some("assistant")
            || (self.field("role") == Some("assistant") && self.field("type") == Some("message"))
    }

    fn is_reasoning(&self) -> bool {
        self.is_kind("reasoning")
    }

    fn is_function_call(&self) -> bool {
        self.is_kind("function_call")
    }

    fn is_function_call_output(&self) -> bool {
        self.is_kind("function_call_output")
    }
}

#[derive(Default)]
struct ToolCallPair<'r, 'a> {
    call: Option<&'r Row<'a>>,
    output: Option<&'r Row<'a>>,
}

/// Flattens one branch's rows, already in sequence order, into client messages.
///
/// Tool calls are paired with their outputs by `call_id` and rendered through the same builder
/// as the live stream. Each tool call and each reasoning item appears at most once, at the
/// position of its first row, so repeated rows never produce duplicate entries. A reasoning
/// item's parts come from its first row with a non-empty summary.
pub async fn transform_history_messages(
    rows: &[AgentMessage],
    session_id: &str,
    stream: &StreamContext,
) -> Vec<HistoryMessage> {
    let rows: Vec<Row<'_>> = rows.iter().map(parse_row).collect();

    let tool_events = transform_tool_calls(&rows, session_id, stream).await;
    let mut reasoning: HashMap<&str, Vec<HistoryMessage>> = HashMap::new();
    for row in rows.iter().filter(|row| row.is_reasoning()) {
        let Some(id) = row.field("id") else { continue };
        let parts = reasoning.entry(id).or_default();
        if parts.is_empty() {
            *parts = reasoning_parts(row, id, session_id);
        }
    }

    let mut emitted_reasoning: HashSet<&str> = HashSet::new();
    let mut emitted_calls: HashSet<&str> = HashSet::new();
    let mut messages = Vec::new();

    for row in &rows {
        if row.is_user() {
            messages.push(HistoryMessage {
                id: row.id.to_string(),
                session_id: session_id.to_string(),
                created_at: row.created_at,
                body: HistoryMessageBody::User(UserMessage {
                    role: "user",
                    content: row.data.get("content").cloned().unwrap_or(Value::Null),
                }),
            });
        } else if row.is_assistant() {
            messages.push(HistoryMessage {
                id: row.field("id").unwrap_or(row.id).to_string(),
                session_id: session_id.to_string(),
                created_at: row.created_at,
                body: HistoryMessageBody::Assistant(AssistantMessage {
                    role: "assistant",
                    message_type: "message",
                    content: row.data.get("content").cloned().unwrap_or(Value::Null),
                    status: row.data.get("status").cloned(),
                }),
            });
        } else if row.is_reasoning() {
            let Some(id) = row.field("id") else { continue };
            if !emitted_reasoning.insert(id) {
                continue;
            }
            if let Some(parts) = reasoning.get(id) {
                messages.extend(parts.iter().cloned());
            }
        } else if row.is_function_call() {
            let Some(call_id) = row.field("call_id") else { continue };
            if !emitted_calls.insert(call_id) {
                continue;
            }
            if let Some(event) = tool_events.get(call_id) {
                messages.push(event.clone());
            }
        }
    }

    messages
}

fn parse_row(row: &AgentMessage) -> Row<'_> {
    let data = serde_json::from_str(&row.message_data).unwrap_or_else(|error| {
        tracing::warn!(message_id = %row.id, %error, "malformed message payload");
        Value::Object(Map::new())
    });
    Row {
        id: &row.id,
        message_type: row.message_type.as_deref(),
        data,
        created_at: row.created_at,
    }
}

fn pair_tool_calls<'r, 'a>(rows: &'r [Row<'a>]) -> Vec<(&'r str, ToolCallPair<'r, 'a>)> {
    let mut order: Vec<&'r str> = Vec::new();
    let mut pairs: HashMap<&'r str, ToolCallPair<'r, 'a>> = HashMap::new();

    for row in rows {
        let Some(call_id) = row.field("call_id") else { continue };
        let pair = pairs.entry(call_id).or_insert_with(|| {
            order.push(call_id);
            ToolCallPair::default()
        });
        if row.is_function_call() {
            pair.call = Some(row);
        } else if row.is_function_call_output() {
            pair.output = Some(row);
        }
    }

    order
        .into_iter()
        .filter_map(|call_id| {
            let pair = pairs.remove(call_id)?;
            if pair.call.is_none() {
                tracing::debug!(call_id, "dropping tool output without a call");
                return None;
            }
            Some((call_id, pair))
        })
        .collect()
}

async fn transform_tool_calls<'r>(
    rows: &'r [Row<'_>],
    session_id: &str,
    stream: &StreamContext,
) -> HashMap<&'r str, HistoryMessage> {
    let mut events = HashMap::new();

    for (call_id, pair) in pair_tool_calls(rows) {
        let Some(call) = pair.call else { continue };
        let tool_name = call.field("name").unwrap_or_default();
        let arguments = call.field("arguments").unwrap_or_default();
        let item = build_tool_item(
            tool_name,
            call_id,
            arguments,
            DEFAULT_AGENT_NAME,
            call.field("id"),
            call.field("status"),
        );

        let raw_output = pair.output.and_then(|output| output.field("output"));
        let typed_output = raw_output
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok());

        let Some(event) = build_tool_event(
            ToolEventInput {
                tool_name,
                call_id,
                agent_name: DEFAULT_AGENT_NAME,
                arguments,
                item,
                raw_output,
                typed_output: typed_output.as_ref(),
            },
            stream,
        )
        .await
        else {
            tracing::debug!(call_id, tool_name, "skipping history for unlisted tool");
            continue;
        };

        events.insert(
            call_id,
            HistoryMessage {
                id: call_id.to_string(),
                session_id: session_id.to_string(),
                created_at: call.created_at,
                body: HistoryMessageBody::Event(event.into()),
            },
        );
    }

    events
}

fn reasoning_parts(row: &Row<'_>, reasoning_id: &str, session_id: &str) -> Vec<HistoryMessage> {
    let Some(summary) = row.data.get("summary").and_then(Value::as_array) else {
        return Vec::new();
    };

    summary
        .iter()
        .enumerate()
        .map(|(index, entry)| HistoryMessage {
            id: format!("{reasoning_id}-{index}"),
            session_id: session_id.to_string(),
            created_at: row.created_at,
            body: HistoryMessageBody::Event(ClientEvent::ReasoningSummaryPartDone {
                item: ReasoningSummaryPart {
                    item_id: reasoning_id.to_string(),
                    summary_index: index as i64,
                    part: json!({
                        "text": entry.get("text").cloned().unwrap_or(Value::Null),
                        "type": "summary_text",
                    }),
                    agent_name: Some(DEFAULT_AGENT_NAME.to_string()),
                },
            }),
        })
        .collect()
}
