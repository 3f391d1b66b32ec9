use axum::{
    Json, Router,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    routing::get,
};
use db::models::{
    agent_message::AgentMessage, agent_session::AgentSession,
    message_structure::MessageStructure,
};
use serde::{Deserialize, Serialize};
use services::services::{
    history::{
        BranchTurn, ConversationHistory, assemble_conversation_history, group_into_turns,
        transform_history_messages,
    },
    working_dir::effective_working_dir,
};
use tracing::instrument;
use ts_rs::TS;

use super::error::ErrorResponse;
use crate::AppState;

pub const SHOP_ID_HEADER: &str = "x-shop-id";

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Tenant the caller acts for, from the `x-shop-id` header.
#[derive(Debug, Clone)]
pub struct ShopId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ShopId {
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SHOP_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| ShopId(value.to_string()))
            .ok_or_else(|| ErrorResponse::bad_request("Shop ID is required"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBranchQuery {
    pub session_id: Option<String>,
    pub branch_id: Option<String>,
    pub working_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBranchResponse {
    pub session_id: String,
    pub shop_id: String,
    pub branch_id: String,
    pub turns: Vec<BranchTurn>,
    pub message_count: usize,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsResponse {
    pub sessions: Vec<AgentSession>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = (total + limit - 1) / limit;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }

    /// Pages far past the end saturate to an offset that simply returns no rows.
    fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/get", get(get_session))
        .route("/sessions/branch", get(get_branch))
        .route("/sessions/list", get(list_sessions))
}

#[instrument(
    name = "sessions.get_session",
    skip(state, query),
    fields(shop_id = %shop_id, session_id = ?query.session_id)
)]
async fn get_session(
    State(state): State<AppState>,
    ShopId(shop_id): ShopId,
    Query(query): Query<GetSessionQuery>,
) -> Result<Json<ConversationHistory>, ErrorResponse> {
    const FAILURE: &str = "Failed to retrieve session history";

    let session_id = required_session_id(query.session_id)?;
    let session = load_owned_session(&state, &session_id, &shop_id, FAILURE).await?;

    let family = AgentSession::find_family_ids(state.pool(), &session_id, &shop_id)
        .await
        .map_err(|error| internal(error, &session_id, FAILURE))?;
    let (messages, structure) = tokio::try_join!(
        AgentMessage::find_by_session_ids(state.pool(), &family),
        MessageStructure::find_by_session_ids(state.pool(), &family),
    )
    .map_err(|error| internal(error, &session_id, FAILURE))?;

    tracing::debug!(
        messages = messages.len(),
        structure_rows = structure.len(),
        sessions = family.len(),
        "assembling conversation history"
    );

    Ok(Json(assemble_conversation_history(
        &session, &messages, &structure,
    )))
}

#[instrument(
    name = "sessions.get_branch",
    skip(state, query),
    fields(shop_id = %shop_id, session_id = ?query.session_id, branch_id = ?query.branch_id)
)]
async fn get_branch(
    State(state): State<AppState>,
    ShopId(shop_id): ShopId,
    Query(query): Query<GetBranchQuery>,
) -> Result<Json<SessionBranchResponse>, ErrorResponse> {
    const FAILURE: &str = "Failed to retrieve branch messages";

    let session_id = required_session_id(query.session_id)?;
    let session = load_owned_session(&state, &session_id, &shop_id, FAILURE).await?;
    let branch_id = query
        .branch_id
        .filter(|branch| !branch.is_empty())
        .unwrap_or_else(|| session.effective_branch_id().to_string());

    let family = AgentSession::find_family_ids(state.pool(), &session_id, &shop_id)
        .await
        .map_err(|error| internal(error, &session_id, FAILURE))?;
    let rows = AgentMessage::find_by_branch(state.pool(), &family, &branch_id)
        .await
        .map_err(|error| internal(error, &session_id, FAILURE))?;

    let working_dir = effective_working_dir(
        query.working_dir.as_deref(),
        state.config().session_files_bucket.as_deref(),
        &shop_id,
        &session_id,
    );
    let messages =
        transform_history_messages(&rows, &session_id, &state.stream_context(working_dir)).await;
    let message_count = messages.len();

    tracing::debug!(rows = rows.len(), message_count, "branch messages transformed");

    Ok(Json(SessionBranchResponse {
        session_id,
        shop_id,
        branch_id,
        turns: group_into_turns(messages),
        message_count,
    }))
}

#[instrument(
    name = "sessions.list_sessions",
    skip(state, query),
    fields(shop_id = %shop_id)
)]
async fn list_sessions(
    State(state): State<AppState>,
    ShopId(shop_id): ShopId,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<ListSessionsResponse>, ErrorResponse> {
    const FAILURE: &str = "Failed to list sessions";

    let page = parse_clamped(query.page.as_deref(), DEFAULT_PAGE, 1, i64::MAX);
    let limit = parse_clamped(query.limit.as_deref(), DEFAULT_LIMIT, 1, MAX_LIMIT);

    let total = AgentSession::count_by_shop(state.pool(), &shop_id)
        .await
        .map_err(|error| internal(error, &shop_id, FAILURE))?;
    let pagination = Pagination::new(page, limit, total);
    let sessions =
        AgentSession::list_by_shop(state.pool(), &shop_id, limit, pagination.offset())
            .await
            .map_err(|error| internal(error, &shop_id, FAILURE))?;

    Ok(Json(ListSessionsResponse {
        sessions,
        pagination,
    }))
}

fn required_session_id(session_id: Option<String>) -> Result<String, ErrorResponse> {
    session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ErrorResponse::bad_request("Session ID is required"))
}

/// Loads a session the caller's shop owns. A session of another shop looks exactly like a
/// missing one.
async fn load_owned_session(
    state: &AppState,
    session_id: &str,
    shop_id: &str,
    failure: &'static str,
) -> Result<AgentSession, ErrorResponse> {
    let session = AgentSession::find_by_id(state.pool(), session_id)
        .await
        .map_err(|error| internal(error, session_id, failure))?;

    ensure_owned(session, session_id, shop_id)
}

fn ensure_owned(
    session: Option<AgentSession>,
    session_id: &str,
    shop_id: &str,
) -> Result<AgentSession, ErrorResponse> {
    let Some(session) = session else {
        tracing::warn!(session_id, "session not found");
        return Err(ErrorResponse::session_not_found());
    };
    if session.shop_id != shop_id {
        tracing::warn!(
            session_id,
            requested_shop_id = shop_id,
            owner_shop_id = %session.shop_id,
            "shop mismatch on session access"
        );
        return Err(ErrorResponse::session_not_found());
    }
    Ok(session)
}

fn internal(error: sqlx::Error, key: &str, message: &'static str) -> ErrorResponse {
    tracing::error!(?error, key, "{message}");
    ErrorResponse::internal(message)
}

/// Lenient integer query parameter: unparsable or non-positive values fall back to `default`,
/// the result is clamped to `min..=max`.
fn parse_clamped(raw: Option<&str>, default: i64, min: i64, max: i64) -> i64 {
    let value = raw
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|value| *value != 0)
        .unwrap_or(default);
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use chrono::Utc;

    use super::*;

    fn session(shop_id: &str) -> AgentSession {
        AgentSession {
            session_id: "s-1".into(),
            shop_id: shop_id.into(),
            user_id: None,
            current_branch_id: None,
            title: None,
            agent_type: None,
            parent_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn shop_header(value: Option<&str>) -> Result<ShopId, ErrorResponse> {
        let mut request = Request::builder().uri("/sessions/get");
        if let Some(value) = value {
            request = request.header(SHOP_ID_HEADER, value);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        ShopId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn shop_header_is_required() {
        assert_eq!(shop_header(Some(" shop-1 ")).await.unwrap().0, "shop-1");

        for missing in [None, Some(""), Some("  ")] {
            let error = shop_header(missing).await.unwrap_err();
            assert_eq!(error.status(), StatusCode::BAD_REQUEST);
            assert_eq!(error.message(), "Shop ID is required");
        }
    }

    #[test]
    fn foreign_and_missing_sessions_are_indistinguishable() {
        let missing = ensure_owned(None, "s-1", "shop-1").unwrap_err();
        let foreign = ensure_owned(Some(session("shop-2")), "s-1", "shop-1").unwrap_err();

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            (missing.status(), missing.message()),
            (foreign.status(), foreign.message())
        );
        assert!(ensure_owned(Some(session("shop-1")), "s-1", "shop-1").is_ok());
    }

    #[test]
    fn session_id_is_required() {
        assert_eq!(required_session_id(Some("s-1".into())).unwrap(), "s-1");
        assert_eq!(
            required_session_id(Some(" ".into())).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert!(required_session_id(None).is_err());
    }

    #[test]
    fn pagination_parameters() {
        assert_eq!(parse_clamped(None, DEFAULT_LIMIT, 1, MAX_LIMIT), 20);
        assert_eq!(parse_clamped(Some("500"), DEFAULT_LIMIT, 1, MAX_LIMIT), 100);
        assert_eq!(parse_clamped(Some("-3"), DEFAULT_LIMIT, 1, MAX_LIMIT), 1);
        assert_eq!(parse_clamped(Some("abc"), DEFAULT_PAGE, 1, i64::MAX), 1);
        assert_eq!(parse_clamped(Some("0"), DEFAULT_LIMIT, 1, MAX_LIMIT), 20);

        let pagination = Pagination::new(2, 20, 45);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.offset(), 20);
        assert!(pagination.has_next_page);
        assert!(pagination.has_previous_page);

        let page = parse_clamped(Some("9223372036854775807"), DEFAULT_PAGE, 1, i64::MAX);
        let far = Pagination::new(page, 20, 5);
        assert_eq!(far.offset(), i64::MAX);
        assert!(!far.has_next_page);
        assert!(far.has_previous_page);

        let empty = Pagination::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_previous_page);
    }
}
