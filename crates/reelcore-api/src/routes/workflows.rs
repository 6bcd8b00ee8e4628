//! `POST /v1/workflows`, `GET /v1/workflows/status/{workflow_id}` (spec §6).

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use reelcore_diff::{ExecutionMode, NodeParams, ParamMergeStrategy};
use reelcore_orchestrator::{handle_request, WorkflowRequest, WorkflowResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workflows", post(create_or_continue))
        .route("/v1/workflows/status/{workflow_id}", get(status))
}

#[derive(Debug, Deserialize)]
struct WorkflowConfig {
    #[serde(default)]
    workflow_chain: Vec<String>,
}

/// The raw request body. `<any_other_key>` forwards into a flat
/// `input_data`-shaped bucket of `node_params` under a synthetic
/// `"request"` stage entry, mirroring how the source collects unrecognized
/// top-level submission fields as caller-declared input (spec §4.2's
/// second-priority fallback source, `input_data`).
#[derive(Debug, Deserialize)]
struct CreateWorkflowBody {
    video_path: Option<String>,
    workflow_id: Option<String>,
    execution_mode: String,
    #[serde(default = "default_merge_strategy")]
    param_merge_strategy: String,
    #[serde(default)]
    workflow_config: WorkflowConfig,
    #[serde(default)]
    node_params: NodeParams,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn default_merge_strategy() -> String {
    "merge".to_string()
}

fn parse_mode(raw: &str) -> Result<ExecutionMode, ApiError> {
    match raw {
        "full" => Ok(ExecutionMode::Full),
        "incremental" => Ok(ExecutionMode::Incremental),
        "retry" => Ok(ExecutionMode::Retry),
        other => Err(ApiError::BadRequest(format!("unknown execution_mode '{other}'"))),
    }
}

fn parse_merge_strategy(raw: &str) -> Result<ParamMergeStrategy, ApiError> {
    match raw {
        "merge" => Ok(ParamMergeStrategy::Merge),
        "override" => Ok(ParamMergeStrategy::Override),
        "strict" => Ok(ParamMergeStrategy::Strict),
        other => Err(ApiError::BadRequest(format!("unknown param_merge_strategy '{other}'"))),
    }
}

async fn create_or_continue(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkflowBody>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let execution_mode = parse_mode(&body.execution_mode)?;
    let param_merge_strategy = parse_merge_strategy(&body.param_merge_strategy)?;

    let mut node_params = body.node_params;
    if !body.extra.is_empty() {
        for (key, value) in body.extra {
            if matches!(key.as_str(), "video_path" | "workflow_id" | "execution_mode" | "param_merge_strategy" | "workflow_config" | "node_params") {
                continue;
            }
            node_params
                .entry("request".to_string())
                .or_default()
                .insert(key, value);
        }
    }

    let req = WorkflowRequest {
        video_path: body.video_path,
        workflow_id: body.workflow_id,
        execution_mode,
        param_merge_strategy,
        workflow_chain: body.workflow_config.workflow_chain,
        node_params,
    };

    let response = handle_request(
        req,
        state.store.as_ref(),
        state.broker.as_ref(),
        &state.storage_root,
        state.lock_ttl,
        state.workflow_ttl,
    )
    .await?;

    Ok(Json(response))
}

async fn status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<reelcore_core::WorkflowContext>, ApiError> {
    let ctx = state
        .store
        .get(&workflow_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("workflow '{workflow_id}' not found")))?;
    Ok(Json(ctx))
}
