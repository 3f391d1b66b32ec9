//! Writes the TypeScript declarations clients use for streamed events and history responses.
//!
//! `generate_types [OUTPUT]` writes to `OUTPUT` (default `shared/types.ts`);
//! `generate_types --check [OUTPUT]` fails when the file on disk is stale.

use std::{env, fs, path::PathBuf};

use anyhow::{Context, bail};
use db::models::agent_session::AgentSession;
use events::{
    client::{
        AssistantMessageItem, ClientEvent, FunctionCallArguments, ReasoningItem,
        ReasoningSummaryPart, ToolCall, ToolEvent, ToolOutput,
    },
    tools::{
        arguments::{ParsedArguments, QueryArguments},
        outputs::{
            ColumnValues, CreativeOutput, DataColumns, DateRangeOutput, ParsedOutput, QueryOutput,
            SignedFile,
        },
    },
};
use server::routes::{ListSessionsResponse, Pagination};
use services::services::history::{
    ConversationHistory, ConversationTurn, TurnBranch, TurnBranchEvent,
};
use ts_rs::TS;

const DEFAULT_OUTPUT: &str = "shared/types.ts";

fn generate() -> String {
    let decls = [
        ClientEvent::decl(),
        ReasoningItem::decl(),
        AssistantMessageItem::decl(),
        FunctionCallArguments::decl(),
        ReasoningSummaryPart::decl(),
        ToolEvent::decl(),
        ToolCall::decl(),
        ToolOutput::decl(),
        ParsedArguments::decl(),
        QueryArguments::decl(),
        ParsedOutput::decl(),
        DateRangeOutput::decl(),
        QueryOutput::decl(),
        ColumnValues::decl(),
        DataColumns::decl(),
        CreativeOutput::decl(),
        SignedFile::decl(),
        ConversationHistory::decl(),
        ConversationTurn::decl(),
        TurnBranch::decl(),
        TurnBranchEvent::decl(),
        AgentSession::decl(),
        ListSessionsResponse::decl(),
        Pagination::decl(),
    ];

    let mut out = String::from(
        "// This file was generated by `generate_types`. Do not edit it by hand.\n\n",
    );
    for decl in decls {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).peekable();
    let check = args.next_if(|arg| arg == "--check").is_some();
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));
    let generated = generate();

    if check {
        let current = fs::read_to_string(&output)
            .with_context(|| format!("reading {}", output.display()))?;
        if current != generated {
            bail!("{} is out of date, run generate_types", output.display());
        }
        println!("{} is up to date", output.display());
        return Ok(());
    }

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, generated).with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {}", output.display());
    Ok(())
}
