use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::registry::ToolName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFormatter {
    /// Arguments are forwarded as-is with no structured view.
    Passthrough,
    /// Extracts the SQL and target file of a query execution.
    Query,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(untagged)]
pub enum ParsedArguments {
    Query(QueryArguments),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
pub struct QueryArguments {
    pub query: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedArguments {
    pub tool_called: String,
    pub arguments: String,
    pub parsed_arguments: Option<ParsedArguments>,
}

impl ArgumentFormatter {
    pub fn format(self, tool: ToolName, raw_arguments: &str) -> FormattedArguments {
        let parsed_arguments = match self {
            ArgumentFormatter::Passthrough => None,
            ArgumentFormatter::Query => Some(ParsedArguments::Query(parse_query_arguments(
                raw_arguments,
            ))),
        };

        FormattedArguments {
            tool_called: tool.to_string(),
            arguments: raw_arguments.to_string(),
            parsed_arguments,
        }
    }
}

#[derive(Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    input_data: Option<QueryInput>,
}

#[derive(Deserialize)]
struct QueryInput {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
}

fn parse_query_arguments(raw_arguments: &str) -> QueryArguments {
    let Ok(envelope) = serde_json::from_str::<QueryEnvelope>(raw_arguments) else {
        return QueryArguments::default();
    };
    let Some(input) = envelope.input_data else {
        return QueryArguments::default();
    };

    QueryArguments {
        query: input.query.unwrap_or_default(),
        file_path: input.file_path.unwrap_or_default(),
    }
}
