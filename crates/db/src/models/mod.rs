pub mod agent_message;
pub mod agent_session;
pub mod message_structure;
