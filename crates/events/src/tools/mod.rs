pub mod arguments;
pub mod builder;
pub mod outputs;
pub mod registry;

pub use builder::{ToolEventInput, build_tool_event, build_tool_item};
pub use registry::ToolName;

/// Agents whose tool activity may be shown to clients.
pub const ALLOWED_AGENTS: [&str; 4] = [
    "Moby",
    "CodeExecutorAgent",
    "ComputerUseAgent",
    "master_moby_agent",
];

/// Agent credited with tool calls rebuilt from history, where the caller is not recorded.
pub const DEFAULT_AGENT_NAME: &str = "master_moby_agent";

pub fn is_allowed_agent(name: &str) -> bool {
    ALLOWED_AGENTS.contains(&name)
}
