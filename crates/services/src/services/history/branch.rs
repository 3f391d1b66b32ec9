use serde::Serialize;

use super::transformer::HistoryMessage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTurn {
    pub turn_number: u32,
    pub messages: Vec<HistoryMessage>,
}

/// Splits a single branch into turns: every user message opens a new one. Messages before the
/// first user message form a turn of their own.
pub fn group_into_turns(messages: Vec<HistoryMessage>) -> Vec<BranchTurn> {
    let mut turns: Vec<BranchTurn> = Vec::new();

    for message in messages {
        match turns.last_mut() {
            Some(turn) if !message.is_user() => turn.messages.push(message),
            _ => turns.push(BranchTurn {
                turn_number: turns.len() as u32 + 1,
                messages: vec![message],
            }),
        }
    }

    turns
}
