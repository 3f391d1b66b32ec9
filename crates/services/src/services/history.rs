//! Reconstruction of conversations from persisted message rows.

pub mod assembler;
pub mod branch;
pub mod transformer;

pub use assembler::{
    ConversationHistory, ConversationTurn, TurnBranch, TurnBranchEvent,
    assemble_conversation_history,
};
pub use branch::{BranchTurn, group_into_turns};
pub use transformer::{HistoryMessage, transform_history_messages};
