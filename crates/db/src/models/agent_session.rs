use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use ts_rs::TS;

/// Branch every conversation starts on.
pub const MAIN_BRANCH: &str = "main";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub session_id: String,
    pub shop_id: String,
    pub user_id: Option<String>,
    pub current_branch_id: Option<String>,
    pub title: Option<String>,
    pub agent_type: Option<String>,
    pub parent_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = r#"
    session_id::text        AS session_id,
    shop_id::text           AS shop_id,
    user_id::text           AS user_id,
    current_branch_id,
    title,
    agent_type,
    parent_session_id::text AS parent_session_id,
    created_at,
    updated_at
"#;

const CHILD_SESSION_IDS: &str = r#"SELECT session_id::text
    FROM agent_sessions
    WHERE parent_session_id::text = $1 AND shop_id::text = $2
    ORDER BY created_at ASC"#;

impl AgentSession {
    /// The branch a client is looking at, falling back to `main` for sessions that never branched.
    pub fn effective_branch_id(&self) -> &str {
        match self.current_branch_id.as_deref() {
            Some(branch) if !branch.is_empty() => branch,
            _ => MAIN_BRANCH,
        }
    }

    pub async fn find_by_id(pool: &PgPool, session_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AgentSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM agent_sessions WHERE session_id::text = $1"
        ))
        .bind(session_id)
        .fetch_optional(pool)
        .await
    }

    /// The session itself followed by every session spawned from it (sub-agent runs persist their
    /// messages under a child session). Children are only taken from the same shop.
    pub async fn find_family_ids(
        pool: &PgPool,
        session_id: &str,
        shop_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let children: Vec<String> = sqlx::query_scalar(CHILD_SESSION_IDS)
            .bind(session_id)
            .bind(shop_id)
            .fetch_all(pool)
            .await?;

        let mut ids = Vec::with_capacity(children.len() + 1);
        ids.push(session_id.to_string());
        ids.extend(children);
        Ok(ids)
    }

    /// Top-level sessions of a tenant, most recently updated first.
    pub async fn list_by_shop(
        pool: &PgPool,
        shop_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AgentSession>(&format!(
            r#"SELECT {SESSION_COLUMNS}
               FROM agent_sessions
               WHERE shop_id::text = $1 AND parent_session_id IS NULL
               ORDER BY updated_at DESC
               LIMIT $2 OFFSET $3"#
        ))
        .bind(shop_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_shop(pool: &PgPool, shop_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*)
               FROM agent_sessions
               WHERE shop_id::text = $1 AND parent_session_id IS NULL"#,
        )
        .bind(shop_id)
        .fetch_one(pool)
        .await
    }
}
