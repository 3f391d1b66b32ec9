use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use db::models::{
    agent_message::AgentMessage,
    agent_session::{AgentSession, MAIN_BRANCH},
    message_structure::MessageStructure,
};
use serde::Serialize;
use serde_json::{Map, Value};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    pub session_id: String,
    pub shop_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_branch_id: String,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub turn_number: i64,
    pub branches: Vec<TurnBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TurnBranch {
    pub branch_id: String,
    pub is_thread: bool,
    pub is_current: bool,
    pub from_turn: Option<i64>,
    pub from_branch: Option<String>,
    pub events: Vec<TurnBranchEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TurnBranchEvent {
    pub message_id: String,
    pub message_type: Option<String>,
    pub sequence_number: i64,
    #[ts(type = "Record<string, unknown>")]
    pub message_data: Value,
    pub tool_name: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub model_config: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Provenance of a branch, taken from the first structure row seen for it.
struct BranchInfo {
    is_thread: bool,
    parent_branch_id: Option<String>,
    branched_from_turn: Option<i64>,
}

struct ParsedMessage {
    data: Value,
    created_at: DateTime<Utc>,
}

/// Rebuilds the turn/branch tree of a session from its flat rows.
///
/// Rows are folded per branch in sequence order. A `user` row with a turn number opens that turn
/// for its branch; any row without a number joins the branch's open turn. Rows that cannot be
/// placed, and structure rows whose message is missing, are skipped with a warning.
pub fn assemble_conversation_history(
    session: &AgentSession,
    messages: &[AgentMessage],
    structure: &[MessageStructure],
) -> ConversationHistory {
    let current_branch_id = session.effective_branch_id().to_string();
    let messages = index_messages(messages);

    let mut rows: Vec<&MessageStructure> = structure.iter().collect();
    rows.sort_by(|a, b| {
        a.branch_id
            .cmp(&b.branch_id)
            .then(a.sequence_number.cmp(&b.sequence_number))
    });

    let mut branch_info: HashMap<&str, BranchInfo> = HashMap::new();
    let mut open_turn: HashMap<&str, i64> = HashMap::new();
    let mut turns: BTreeMap<i64, BTreeMap<&str, Vec<TurnBranchEvent>>> = BTreeMap::new();

    for row in rows {
        branch_info
            .entry(row.branch_id.as_str())
            .or_insert_with(|| BranchInfo {
                is_thread: row.is_thread,
                parent_branch_id: row.parent_branch_id.clone(),
                branched_from_turn: row.branched_from_turn,
            });

        let turn = match row.global_turn_number {
            Some(turn) => {
                if row.message_type.as_deref() == Some("user") {
                    open_turn.insert(row.branch_id.as_str(), turn);
                }
                Some(turn)
            }
            None => open_turn.get(row.branch_id.as_str()).copied(),
        };
        let Some(turn) = turn else {
            tracing::warn!(
                message_id = %row.message_id,
                branch_id = %row.branch_id,
                "skipping message without a determinable turn"
            );
            continue;
        };

        let Some(message) = messages.get(row.message_id.as_str()) else {
            tracing::warn!(message_id = %row.message_id, "message not found for structure row");
            continue;
        };

        turns
            .entry(turn)
            .or_default()
            .entry(row.branch_id.as_str())
            .or_default()
            .push(TurnBranchEvent {
                message_id: row.message_id.clone(),
                message_type: row.message_type.clone(),
                sequence_number: row.sequence_number,
                message_data: message.data.clone(),
                tool_name: row.tool_name.clone().filter(|name| !name.is_empty()),
                model_config: row.model_config.as_deref().and_then(parse_model_config),
                created_at: message.created_at,
            });
    }

    let turns = turns
        .into_iter()
        .map(|(turn_number, branches)| {
            let mut branches: Vec<TurnBranch> = branches
                .into_iter()
                .map(|(branch_id, mut events)| {
                    events.sort_by_key(|event| event.sequence_number);
                    let info = branch_info.get(branch_id);
                    TurnBranch {
                        branch_id: branch_id.to_string(),
                        is_thread: info.is_some_and(|info| info.is_thread),
                        is_current: branch_id == current_branch_id,
                        from_turn: info.and_then(|info| info.branched_from_turn),
                        from_branch: info.and_then(|info| info.parent_branch_id.clone()),
                        events,
                    }
                })
                .collect();
            branches.sort_by(|a, b| {
                (a.branch_id != MAIN_BRANCH, &a.branch_id).cmp(&(b.branch_id != MAIN_BRANCH, &b.branch_id))
            });

            ConversationTurn {
                turn_number,
                branches,
            }
        })
        .collect();

    ConversationHistory {
        session_id: session.session_id.clone(),
        shop_id: session.shop_id.clone(),
        created_at: session.created_at,
        updated_at: session.updated_at,
        current_branch_id,
        turns,
    }
}

fn index_messages(messages: &[AgentMessage]) -> HashMap<&str, ParsedMessage> {
    messages
        .iter()
        .map(|message| {
            let data = match serde_json::from_str::<Value>(&message.message_data) {
                Ok(data) => data,
                Err(error) => {
                    tracing::warn!(message_id = %message.id, %error, "malformed message payload");
                    Value::Object(Map::new())
                }
            };
            (
                message.id.as_str(),
                ParsedMessage {
                    data,
                    created_at: message.created_at,
                },
            )
        })
        .collect()
}

fn parse_model_config(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(config) => Some(config),
        Err(error) => {
            tracing::warn!(%error, "malformed model config");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn session(current_branch_id: Option<&str>) -> AgentSession {
        AgentSession {
            session_id: "s-1".into(),
            shop_id: "shop-1".into(),
            user_id: None,
            current_branch_id: current_branch_id.map(str::to_string),
            title: None,
            agent_type: None,
            parent_session_id: None,
            created_at: at(0),
            updated_at: at(100),
        }
    }

    fn message(id: &str, data: &str) -> AgentMessage {
        AgentMessage {
            id: id.into(),
            session_id: "s-1".into(),
            message_data: data.into(),
            message_type: None,
            created_at: at(1),
        }
    }

    fn row(message_id: &str, branch: &str, kind: &str, sequence: i64, turn: Option<i64>) -> MessageStructure {
        MessageStructure {
            id: format!("st-{message_id}"),
            session_id: "s-1".into(),
            message_id: message_id.into(),
            branch_id: branch.into(),
            is_thread: false,
            message_type: Some(kind.into()),
            sequence_number: sequence,
            global_turn_number: turn,
            parent_branch_id: None,
            branched_from_turn: None,
            tool_name: None,
            model_config: None,
        }
    }

    fn messages(ids: &[&str]) -> Vec<AgentMessage> {
        ids.iter()
            .map(|id| message(id, &json!({"id": id}).to_string()))
            .collect()
    }

    /// `(turn, branch, message ids)` in output order.
    fn layout(history: &ConversationHistory) -> Vec<(i64, String, Vec<String>)> {
        history
            .turns
            .iter()
            .flat_map(|turn| {
                turn.branches.iter().map(move |branch| {
                    (
                        turn.turn_number,
                        branch.branch_id.clone(),
                        branch.events.iter().map(|e| e.message_id.clone()).collect(),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn assistant_rows_inherit_the_open_turn() {
        let structure = vec![
            row("u1", "main", "user", 1, Some(1)),
            row("a1", "main", "assistant", 2, None),
            row("u2", "main", "user", 3, Some(2)),
        ];
        let history = assemble_conversation_history(
            &session(Some("main")),
            &messages(&["u1", "a1", "u2"]),
            &structure,
        );

        assert_eq!(
            layout(&history),
            vec![
                (1, "main".into(), vec!["u1".into(), "a1".into()]),
                (2, "main".into(), vec!["u2".into()]),
            ]
        );
        assert!(history.turns[0].branches[0].is_current);
    }

    #[test]
    fn later_user_turn_collects_following_rows() {
        let structure = vec![
            row("u1", "main", "user", 1, Some(1)),
            row("u2", "main", "user", 2, Some(2)),
            row("a2", "main", "assistant", 3, None),
        ];
        let history =
            assemble_conversation_history(&session(None), &messages(&["u1", "u2", "a2"]), &structure);

        assert_eq!(
            layout(&history),
            vec![
                (1, "main".into(), vec!["u1".into()]),
                (2, "main".into(), vec!["u2".into(), "a2".into()]),
            ]
        );
        assert_eq!(history.current_branch_id, "main");
    }

    #[test]
    fn input_order_does_not_matter() {
        let structure = vec![
            row("a2", "main", "assistant", 3, None),
            row("u2", "main", "user", 2, Some(2)),
            row("u1", "main", "user", 1, Some(1)),
        ];
        let history =
            assemble_conversation_history(&session(None), &messages(&["u1", "u2", "a2"]), &structure);

        assert_eq!(
            layout(&history),
            vec![
                (1, "main".into(), vec!["u1".into()]),
                (2, "main".into(), vec!["u2".into(), "a2".into()]),
            ]
        );
    }

    #[test]
    fn unplaceable_and_orphaned_rows_are_skipped() {
        let structure = vec![
            row("early", "thread-1", "assistant", 1, None),
            row("u1", "main", "user", 1, Some(1)),
            row("gone", "main", "assistant", 2, None),
        ];
        let history = assemble_conversation_history(
            &session(None),
            &messages(&["early", "u1"]),
            &structure,
        );

        assert_eq!(layout(&history), vec![(1, "main".into(), vec!["u1".into()])]);
    }

    #[test]
    fn main_sorts_first_then_branches_by_name() {
        let mut beta = row("b1", "beta", "user", 1, Some(1));
        beta.parent_branch_id = Some("main".into());
        beta.branched_from_turn = Some(1);
        let mut thread = row("t1", "alpha", "user", 1, Some(1));
        thread.is_thread = true;

        let structure = vec![beta, row("u1", "main", "user", 1, Some(1)), thread];
        let history = assemble_conversation_history(
            &session(Some("beta")),
            &messages(&["b1", "u1", "t1"]),
            &structure,
        );

        let branches = &history.turns[0].branches;
        let ids: Vec<&str> = branches.iter().map(|b| b.branch_id.as_str()).collect();
        assert_eq!(ids, vec!["main", "alpha", "beta"]);
        assert!(branches[1].is_thread);
        assert!(branches[2].is_current);
        assert_eq!(branches[2].from_branch.as_deref(), Some("main"));
        assert_eq!(branches[2].from_turn, Some(1));
        assert!(!branches[0].is_current);
    }

    #[test]
    fn event_payloads() {
        let mut structure = row("u1", "main", "user", 1, Some(1));
        structure.tool_name = Some(String::new());
        structure.model_config = Some(r#"{"model":"gpt"}"#.into());
        let mut tool = row("f1", "main", "function_call", 2, None);
        tool.tool_name = Some("execute_query".into());
        tool.model_config = Some("{not json".into());

        let history = assemble_conversation_history(
            &session(None),
            &[message("u1", "not json"), message("f1", r#"{"call_id":"c1"}"#)],
            &[structure, tool],
        );

        let value = serde_json::to_value(&history).unwrap();
        let events = &value["turns"][0]["branches"][0]["events"];
        assert_eq!(events[0]["messageData"], json!({}));
        assert_eq!(events[0]["toolName"], Value::Null);
        assert_eq!(events[0]["modelConfig"], json!({"model": "gpt"}));
        assert_eq!(events[1]["messageData"], json!({"call_id": "c1"}));
        assert_eq!(events[1]["toolName"], "execute_query");
        assert_eq!(events[1]["modelConfig"], Value::Null);
        assert_eq!(events[1]["messageType"], "function_call");
        assert_eq!(value["shopId"], "shop-1");
        assert!(value["createdAt"].is_string());
    }
}
