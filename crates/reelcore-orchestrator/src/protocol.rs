//! The orchestration protocol (spec §4.8): execute create/incremental/retry
//! atomically from the client's perspective by holding the workflow mutex
//! from the moment the target workflow is identified until dispatch has
//! been submitted to the broker.
//!
//! Framework-independent: `reelcore-api` is a thin `axum` binding over
//! `handle_request`.

use std::path::Path;
use std::time::Duration;

use reelcore_core::{CoreError, WorkflowContext};
use reelcore_diff::{compute_diff, merge_node_params, ExecutionMode, MergeError, NodeParams, ParamConflict, ParamMergeStrategy};
use reelcore_dispatch::{build_chain, Broker};
use reelcore_state::StateStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A request to create, extend, or retry a workflow. Already normalized out
/// of whatever wire format carried it — `reelcore-api` owns JSON shape and
/// the "any other top-level key forwards into node_params" convention
/// (spec §6).
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub video_path: Option<String>,
    pub workflow_id: Option<String>,
    pub execution_mode: ExecutionMode,
    pub param_merge_strategy: ParamMergeStrategy,
    pub workflow_chain: Vec<String>,
    pub node_params: NodeParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowResponse {
    pub workflow_id: String,
    pub execution_mode: String,
    pub tasks_total: usize,
    pub tasks_skipped: usize,
    pub tasks_to_execute: usize,
    pub message: String,
}

fn mode_label(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Full => "full",
        ExecutionMode::Incremental => "incremental",
        ExecutionMode::Retry => "retry",
    }
}

/// Entry point: validate mode-vs-field consistency, then dispatch to the
/// `full` branch or the locked `incremental`/`retry` branch (spec §4.8
/// steps 1-3).
pub async fn handle_request(
    req: WorkflowRequest,
    store: &dyn StateStore,
    broker: &dyn Broker,
    shared_storage_root: &Path,
    lock_ttl: Duration,
    workflow_ttl: Duration,
) -> Result<WorkflowResponse, CoreError> {
    validate_mode_fields(&req)?;

    match req.execution_mode {
        ExecutionMode::Full => create_new_workflow(req, store, broker, shared_storage_root, workflow_ttl).await,
        ExecutionMode::Incremental | ExecutionMode::Retry => {
            execute_existing_workflow(req, store, broker, lock_ttl, workflow_ttl).await
        }
    }
}

fn validate_mode_fields(req: &WorkflowRequest) -> Result<(), CoreError> {
    match req.execution_mode {
        ExecutionMode::Full => {
            if req.video_path.is_none() {
                return Err(CoreError::InvalidInput(
                    "video_path is required when execution_mode=full".to_string(),
                ));
            }
        }
        ExecutionMode::Incremental | ExecutionMode::Retry => {
            if req.workflow_id.is_none() {
                return Err(CoreError::InvalidInput(format!(
                    "workflow_id is required when execution_mode={}",
                    mode_label(req.execution_mode)
                )));
            }
        }
    }
    Ok(())
}

async fn create_new_workflow(
    req: WorkflowRequest,
    store: &dyn StateStore,
    broker: &dyn Broker,
    shared_storage_root: &Path,
    workflow_ttl: Duration,
) -> Result<WorkflowResponse, CoreError> {
    if req.workflow_chain.is_empty() {
        return Err(CoreError::InvalidInput(
            "workflow_chain must not be empty".to_string(),
        ));
    }

    let workflow_id = reelcore_core::ResourceId::new().to_string();
    let shared_storage_path = shared_storage_root.join(&workflow_id);
    tokio::fs::create_dir_all(&shared_storage_path)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to create shared storage directory: {e}")))?;

    let video_path = req.video_path.expect("validated by validate_mode_fields");
    let ctx = WorkflowContext::new(
        workflow_id.clone(),
        video_path,
        req.workflow_chain.clone(),
        req.node_params,
        shared_storage_path.to_string_lossy().into_owned(),
    );

    store
        .create(&ctx, workflow_ttl)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))?;

    let tasks_total = req.workflow_chain.len();
    let chain = build_chain(&req.workflow_chain, ctx)?;
    broker.enqueue_chain(chain).await?;

    info!(%workflow_id, tasks_total, "created workflow");
    Ok(WorkflowResponse {
        workflow_id,
        execution_mode: mode_label(ExecutionMode::Full).to_string(),
        tasks_total,
        tasks_skipped: 0,
        tasks_to_execute: tasks_total,
        message: "workflow created".to_string(),
    })
}

async fn execute_existing_workflow(
    req: WorkflowRequest,
    store: &dyn StateStore,
    broker: &dyn Broker,
    lock_ttl: Duration,
    workflow_ttl: Duration,
) -> Result<WorkflowResponse, CoreError> {
    let workflow_id = req.workflow_id.clone().expect("validated by validate_mode_fields");

    let lock_value = store
        .acquire_lock(&workflow_id, lock_ttl)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))?
        .ok_or_else(|| CoreError::Conflict(format!("workflow '{workflow_id}' has a request already in flight")))?;

    let result = run_locked(req, store, broker, workflow_ttl, &workflow_id).await;

    if let Err(e) = store.release_lock(&workflow_id, &lock_value).await {
        warn!(%workflow_id, error = %e, "failed to release workflow lock");
    }

    result
}

/// The critical section: read, diff, merge, write, dispatch. Must leave the
/// stored context untouched on any `Err` path.
async fn run_locked(
    req: WorkflowRequest,
    store: &dyn StateStore,
    broker: &dyn Broker,
    workflow_ttl: Duration,
    workflow_id: &str,
) -> Result<WorkflowResponse, CoreError> {
    let mut ctx = store
        .get(workflow_id)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))?
        .ok_or_else(|| CoreError::NotFound(format!("workflow '{workflow_id}' not found")))?;

    if !Path::new(&ctx.shared_storage_path).exists() {
        return Err(CoreError::Gone(format!(
            "shared storage path '{}' no longer exists",
            ctx.shared_storage_path
        )));
    }

    let diff = compute_diff(req.execution_mode, &ctx, &req.workflow_chain)?;

    let merged = merge_node_params(&ctx.input_params.node_params, &req.node_params, req.param_merge_strategy)
        .map_err(conflict_to_invalid_input)?;

    ctx.input_params.workflow_chain = req.workflow_chain.clone();
    ctx.input_params.node_params = merged;

    store
        .update(&ctx, workflow_ttl)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))?;
    store
        .expire(workflow_id, workflow_ttl)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))?;

    let tasks_to_execute = diff.tasks_to_execute.len();
    let tasks_skipped = diff.tasks_to_skip.len();

    if diff.tasks_to_execute.is_empty() {
        info!(%workflow_id, "no tasks to execute");
        return Ok(WorkflowResponse {
            workflow_id: workflow_id.to_string(),
            execution_mode: mode_label(req.execution_mode).to_string(),
            tasks_total: diff.tasks_total(),
            tasks_skipped,
            tasks_to_execute: 0,
            message: "no tasks to execute".to_string(),
        });
    }

    let chain = build_chain(&diff.tasks_to_execute, ctx)?;
    broker.enqueue_chain(chain).await?;

    info!(%workflow_id, tasks_to_execute, tasks_skipped, "dispatched remaining tasks");
    Ok(WorkflowResponse {
        workflow_id: workflow_id.to_string(),
        execution_mode: mode_label(req.execution_mode).to_string(),
        tasks_total: diff.tasks_total(),
        tasks_skipped,
        tasks_to_execute,
        message: "workflow dispatched".to_string(),
    })
}

fn conflict_to_invalid_input(err: MergeError) -> CoreError {
    match err {
        MergeError::Conflict(conflicts) => CoreError::InvalidInput(format!(
            "parameter merge conflict: {}",
            conflict_set_json(&conflicts)
        )),
    }
}

fn conflict_set_json(conflicts: &[ParamConflict]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = conflicts
        .iter()
        .map(|c| {
            (
                format!("{}.{}", c.stage, c.key),
                serde_json::json!({ "old_value": c.old_value, "new_value": c.new_value }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}
