//! A worker that claims tasks off one queue and runs them through the
//! executor template (spec §2 data-flow sketch: "worker pulls task").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reelcore_core::WorkflowContext;
use reelcore_executor::{run_stage, StageExecutor};
use reelcore_state::StateStore;
use reelcore_storage::ObjectStore;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::pg_broker::{PgBroker, QueuedTask};

/// Polls `queue_name` and dispatches claimed tasks to the registered
/// executor for that stage name.
pub struct Worker {
    id: String,
    queue_name: String,
    broker: Arc<PgBroker>,
    state_store: Arc<dyn StateStore>,
    object_store: Arc<dyn ObjectStore>,
    executors: HashMap<String, Arc<dyn StageExecutor>>,
    context_ttl: Duration,
    auto_upload_to_minio: bool,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        queue_name: impl Into<String>,
        broker: Arc<PgBroker>,
        state_store: Arc<dyn StateStore>,
        object_store: Arc<dyn ObjectStore>,
        executors: HashMap<String, Arc<dyn StageExecutor>>,
        context_ttl: Duration,
        auto_upload_to_minio: bool,
    ) -> Self {
        Self {
            id: id.into(),
            queue_name: queue_name.into(),
            broker,
            state_store,
            object_store,
            executors,
            context_ttl,
            auto_upload_to_minio,
        }
    }

    /// Run the worker loop.
    pub async fn run(&self) {
        info!(worker_id = %self.id, queue = %self.queue_name, "starting worker");

        loop {
            match self.broker.claim(&self.queue_name, &self.id).await {
                Ok(Some(task)) => {
                    info!(task_id = %task.id, stage = %task.task_name, "claimed task");
                    match self.execute(&task).await {
                        Ok(()) => {
                            if let Err(e) = self.broker.complete(task.id).await {
                                warn!(task_id = %task.id, error = %e, "failed to mark task complete");
                            }
                        }
                        Err(e) => {
                            warn!(task_id = %task.id, error = %e, "task execution failed");
                            if let Err(e) = self.broker.fail(task.id, &e).await {
                                warn!(task_id = %task.id, error = %e, "failed to mark task failed");
                            }
                        }
                    }
                }
                Ok(None) => sleep(Duration::from_secs(1)).await,
                Err(e) => {
                    warn!(error = %e, "failed to claim task");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn execute(&self, task: &QueuedTask) -> Result<(), String> {
        let executor = self
            .executors
            .get(&task.task_name)
            .ok_or_else(|| format!("no executor registered for stage '{}'", task.task_name))?;

        let mut ctx: WorkflowContext = match &task.initial_context {
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?,
            None => self
                .state_store
                .get(&task.workflow_id)
                .await
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("workflow '{}' not found", task.workflow_id))?,
        };

        run_stage(
            executor.as_ref(),
            &mut ctx,
            self.state_store.as_ref(),
            self.object_store.as_ref(),
            self.context_ttl,
            self.auto_upload_to_minio,
        )
        .await
        .map_err(|e| e.to_string())
    }
}
