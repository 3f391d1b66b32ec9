//! Upstream → client event mapping.

use crate::{
    client::{
        AssistantMessageItem, ClientEvent, FunctionCallArguments, ReasoningItem,
        ReasoningSummaryPart,
    },
    context::StreamContext,
    tools::{ToolEventInput, build_tool_event, is_allowed_agent},
    upstream::{OutputItem, ReasoningSummaryPartEvent, RunItemStreamEvent, UpstreamEvent},
};

const TOOL_OUTPUT_EVENT: &str = "tool_output";
const TOOL_EXECUTION_END: &str = "tool_execution_end";
const UNKNOWN_AGENT: &str = "unknown";

/// Normalize one upstream event. `None` means the event is not shown to clients.
pub async fn transform_event(event: &UpstreamEvent, stream: &StreamContext) -> Option<ClientEvent> {
    match event {
        UpstreamEvent::TurnStatus { status } => Some(ClientEvent::TurnStatus {
            status: status.clone(),
        }),
        UpstreamEvent::OutputItemAdded { item } => match item {
            OutputItem::Reasoning { .. } => reasoning_item(item).map(|item| ClientEvent::ReasoningItemAdded { item }),
            OutputItem::Message {
                id,
                role,
                content,
                status,
            } => Some(ClientEvent::AssistantMessageAdded {
                item: AssistantMessageItem {
                    id: id.clone(),
                    item_type: "message".to_string(),
                    role: role.clone(),
                    content: content.clone(),
                    status: status.clone(),
                },
            }),
            OutputItem::Other => None,
        },
        // Finished messages were already streamed as text deltas.
        UpstreamEvent::OutputItemDone { item } => {
            reasoning_item(item).map(|item| ClientEvent::ReasoningItemDone { item })
        }
        UpstreamEvent::OutputTextDelta(delta) => Some(ClientEvent::OutputTextDelta {
            item_id: delta.item_id.clone(),
            content_index: delta.content_index,
            delta: delta.delta.clone(),
            sequence_number: delta.sequence_number,
        }),
        UpstreamEvent::RunItem(run_item) => transform_run_item(run_item, stream).await,
        UpstreamEvent::FunctionCallArgumentsDone(done) => {
            Some(ClientEvent::FunctionCallArgumentsDone {
                item: FunctionCallArguments {
                    item_id: done.item_id.clone(),
                    name: done.name.clone(),
                    arguments: done.arguments.clone(),
                    agent_name: done.agent_name.clone(),
                },
            })
        }
        UpstreamEvent::ReasoningSummaryPartAdded(part) => Some(ClientEvent::ReasoningSummaryPartAdded {
            item: summary_part(part),
        }),
        UpstreamEvent::ReasoningSummaryPartDone(part) => Some(ClientEvent::ReasoningSummaryPartDone {
            item: summary_part(part),
        }),
        UpstreamEvent::Unrecognized => None,
    }
}

fn reasoning_item(item: &OutputItem) -> Option<ReasoningItem> {
    match item {
        OutputItem::Reasoning {
            id,
            summary,
            status,
        } => Some(ReasoningItem {
            id: id.clone(),
            item_type: "reasoning".to_string(),
            summary: summary.clone(),
            status: status.clone(),
        }),
        OutputItem::Message { .. } | OutputItem::Other => None,
    }
}

fn summary_part(part: &ReasoningSummaryPartEvent) -> ReasoningSummaryPart {
    ReasoningSummaryPart {
        item_id: part.item_id.clone(),
        summary_index: part.summary_index,
        part: part.part.clone(),
        agent_name: part.agent_name.clone(),
    }
}

async fn transform_run_item(event: &RunItemStreamEvent, stream: &StreamContext) -> Option<ClientEvent> {
    let context = event.execution_context.as_ref();

    let tool_name = context
        .and_then(|context| context.tool_name.as_deref())
        .filter(|name| !name.is_empty())?;
    let call_id = event.raw_item_text("call_id").filter(|id| !id.is_empty())?;

    let agent_name = non_empty(event.agent_name.as_deref())
        .or_else(|| non_empty(context.and_then(|context| context.agent_name.as_deref())))
        .unwrap_or(UNKNOWN_AGENT);
    if !is_allowed_agent(agent_name) {
        tracing::debug!(agent_name, tool_name, "suppressing tool event from hidden agent");
        return None;
    }

    let raw_output = (event.name.as_deref() == Some(TOOL_OUTPUT_EVENT))
        .then(|| event.raw_item_text("output").unwrap_or_default());
    let typed_output = context
        .filter(|context| context.context_type.as_deref() == Some(TOOL_EXECUTION_END))
        .and_then(|context| context.typed_output.as_ref());
    let arguments = event.raw_item_text("arguments").unwrap_or_default();

    let tool_event = build_tool_event(
        ToolEventInput {
            tool_name,
            call_id: &call_id,
            agent_name,
            arguments: &arguments,
            item: event.item.clone(),
            raw_output: raw_output.as_deref(),
            typed_output,
        },
        stream,
    )
    .await?;

    Some(tool_event.into())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
