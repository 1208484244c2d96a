//! Write-once audit rows for orchestrator invocations.
//!
//! These rows are the only production signal for measuring agent value
//! versus cost; the enrichment logic itself never reads them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `agent_operations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentOperationRow {
    pub id: i64,
    pub cluster_id: Option<i64>,
    pub capability: String,
    pub path: String,
    pub status: String,
    pub duration_ms: i64,
    pub quality: Option<f32>,
    pub model: Option<String>,
    pub input_snippet: Option<String>,
    pub output_snippet: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for one orchestrator invocation record.
#[derive(Debug, Clone)]
pub struct NewAgentOperation {
    pub cluster_id: Option<i64>,
    pub capability: String,
    /// `agent` or `fallback`.
    pub path: String,
    /// `success`, `failed`, or `timeout`.
    pub status: String,
    pub duration_ms: i64,
    pub quality: Option<f32>,
    pub model: Option<String>,
    pub input_snippet: Option<String>,
    pub output_snippet: Option<String>,
}

/// Insert one audit row. Rows are never updated afterwards.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_agent_operation(
    pool: &PgPool,
    op: &NewAgentOperation,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO agent_operations \
             (cluster_id, capability, path, status, duration_ms, quality, model, \
              input_snippet, output_snippet) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(op.cluster_id)
    .bind(&op.capability)
    .bind(&op.path)
    .bind(&op.status)
    .bind(op.duration_ms)
    .bind(op.quality)
    .bind(&op.model)
    .bind(&op.input_snippet)
    .bind(&op.output_snippet)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// All audit rows for a cluster, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_agent_operations(
    pool: &PgPool,
    cluster_id: i64,
) -> Result<Vec<AgentOperationRow>, DbError> {
    let rows = sqlx::query_as::<_, AgentOperationRow>(
        "SELECT id, cluster_id, capability, path, status, duration_ms, quality, model, \
                input_snippet, output_snippet, created_at \
         FROM agent_operations \
         WHERE cluster_id = $1 \
         ORDER BY created_at, id",
    )
    .bind(cluster_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
