use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Placement of one message in the branch/turn tree.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageStructure {
    pub id: String,
    pub session_id: String,
    pub message_id: String,
    pub branch_id: String,
    pub is_thread: bool,
    pub message_type: Option<String>,
    pub sequence_number: i64,
    pub global_turn_number: Option<i64>,
    pub parent_branch_id: Option<String>,
    pub branched_from_turn: Option<i64>,
    pub tool_name: Option<String>,
    /// Raw JSON text.
    pub model_config: Option<String>,
}

impl MessageStructure {
    pub async fn find_by_session_ids(
        pool: &PgPool,
        session_ids: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MessageStructure>(
            r#"SELECT
                id::text                   AS id,
                session_id::text           AS session_id,
                message_id::text           AS message_id,
                branch_id,
                COALESCE(is_thread, FALSE) AS is_thread,
                message_type,
                sequence_number::bigint    AS sequence_number,
                global_turn_number::bigint AS global_turn_number,
                parent_branch_id,
                branched_from_turn::bigint AS branched_from_turn,
                tool_name,
                model_config::text         AS model_config
            FROM message_structure
            WHERE session_id::text = ANY($1)
            ORDER BY branch_id ASC, sequence_number ASC"#,
        )
        .bind(session_ids)
        .fetch_all(pool)
        .await
    }
}
