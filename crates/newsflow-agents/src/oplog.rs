//! Audit sink for orchestrator invocations.

use std::sync::Mutex;

use sqlx::PgPool;
use tracing::warn;

use newsflow_db::{insert_agent_operation, NewAgentOperation};

/// Where orchestration records go: Postgres in production, memory in tests
/// or when the pipeline runs without audit storage.
///
/// Recording is fire-and-forget. A failed insert is logged and dropped;
/// audit rows must never take an enrichment result down with them.
pub struct OperationLog {
    sink: Sink,
}

enum Sink {
    Postgres(PgPool),
    Memory(Mutex<Vec<NewAgentOperation>>),
}

impl OperationLog {
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            sink: Sink::Postgres(pool),
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Record one invocation.
    pub async fn record(&self, op: NewAgentOperation) {
        match &self.sink {
            Sink::Postgres(pool) => {
                if let Err(e) = insert_agent_operation(pool, &op).await {
                    warn!(
                        capability = %op.capability,
                        error = %e,
                        "failed to persist agent operation record"
                    );
                }
            }
            Sink::Memory(records) => {
                if let Ok(mut records) = records.lock() {
                    records.push(op);
                }
            }
        }
    }

    /// Snapshot of in-memory records; empty for the Postgres sink.
    #[must_use]
    pub fn recorded(&self) -> Vec<NewAgentOperation> {
        match &self.sink {
            Sink::Postgres(_) => Vec::new(),
            Sink::Memory(records) => records.lock().map(|r| r.clone()).unwrap_or_default(),
        }
    }
}
