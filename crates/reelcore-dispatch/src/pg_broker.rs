//! PostgreSQL-backed `Broker`, mirroring the `SELECT ... FOR UPDATE SKIP
//! LOCKED` claiming pattern used elsewhere in this workspace for
//! distributed job queues.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelcore_core::CoreError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::broker::Broker;
use crate::chain::TaskSignature;

/// A task as it sits in the `task_queue` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedTask {
    pub id: Uuid,
    pub queue_name: String,
    pub task_name: String,
    pub workflow_id: String,
    /// Present only on the first task of a chain (spec §4.5).
    pub initial_context: Option<serde_json::Value>,
    pub status: String,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct PgBroker {
    pool: PgPool,
}

impl PgBroker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claim the next pending task on `queue_name`. Workers poll per-queue;
    /// `FOR UPDATE SKIP LOCKED` lets multiple worker processes claim
    /// distinct rows concurrently without blocking on each other.
    pub async fn claim(&self, queue_name: &str, worker_id: &str) -> Result<Option<QueuedTask>, sqlx::Error> {
        sqlx::query_as::<_, QueuedTask>(
            r#"
            UPDATE task_queue
            SET status = 'claimed', claimed_by = $2, claimed_at = NOW()
            WHERE id = (
                SELECT id FROM task_queue
                WHERE queue_name = $1 AND status = 'pending'
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(queue_name)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn complete(&self, task_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE task_queue SET status = 'completed' WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn fail(&self, task_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE task_queue SET status = 'failed', error = $2 WHERE id = $1")
            .bind(task_id)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Broker for PgBroker {
    async fn enqueue_chain(&self, chain: Vec<TaskSignature>) -> Result<(), CoreError> {
        for task in chain {
            let initial_context_json = task
                .initial_context
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| CoreError::Internal(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO task_queue (id, queue_name, task_name, workflow_id, initial_context, status, created_at)
                VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(&task.queue_name)
            .bind(&task.task_name)
            .bind(&task.workflow_id)
            .bind(initial_context_json)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Transient(e.to_string()))?;
        }
        Ok(())
    }
}
