use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// A persisted agent message. `message_data` is the raw JSON payload exactly as the agent
/// wrote it; callers parse it leniently.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub session_id: String,
    pub message_data: String,
    pub message_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AgentMessage {
    pub async fn find_by_session_ids(
        pool: &PgPool,
        session_ids: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AgentMessage>(
            r#"SELECT
                id::text           AS id,
                session_id::text   AS session_id,
                message_data::text AS message_data,
                message_type,
                created_at
            FROM agent_messages
            WHERE session_id::text = ANY($1)
            ORDER BY created_at ASC"#,
        )
        .bind(session_ids)
        .fetch_all(pool)
        .await
    }

    /// Messages placed on one branch, in branch order.
    pub async fn find_by_branch(
        pool: &PgPool,
        session_ids: &[String],
        branch_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AgentMessage>(
            r#"SELECT
                m.id::text           AS id,
                m.session_id::text   AS session_id,
                m.message_data::text AS message_data,
                COALESCE(s.message_type, m.message_type) AS message_type,
                m.created_at
            FROM agent_messages m
            INNER JOIN message_structure s ON s.message_id::text = m.id::text
            WHERE m.session_id::text = ANY($1) AND s.branch_id = $2
            ORDER BY s.sequence_number ASC, m.created_at ASC"#,
        )
        .bind(session_ids)
        .bind(branch_id)
        .fetch_all(pool)
        .await
    }
}
