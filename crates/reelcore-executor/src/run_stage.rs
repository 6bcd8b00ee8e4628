//! The executor template (spec §4.4): the only place a stage's status
//! transitions are written. Implemented as a free-standing runner over the
//! `StageExecutor` interface — design note §9, option (a).

use std::time::{Duration, Instant};

use reelcore_config::resolve_parameters;
use reelcore_core::{CoreError, StageExecution, WorkflowContext};
use reelcore_state::StateStore;
use reelcore_storage::{normalize_output, ObjectStore};
use serde_json::Value;
use tracing::{error, info};

use crate::contract::StageExecutor;
use crate::redact::redact;

/// Run one stage invocation end to end: validate, resolve, execute,
/// normalize, record, commit. Never returns an `Err` for a stage-body or
/// validation failure — those are recorded on the context as a `FAILED`
/// `StageExecution` instead (spec §7's fail-and-record policy at worker
/// boundaries). Only state-store failures escape as `Err`.
pub async fn run_stage(
    executor: &dyn StageExecutor,
    ctx: &mut WorkflowContext,
    store: &dyn StateStore,
    object_store: &dyn ObjectStore,
    context_ttl: Duration,
    auto_upload_to_minio: bool,
) -> Result<(), CoreError> {
    let stage_name = executor.name().to_string();
    let t0 = Instant::now();

    if let Err(e) = executor.validate_input(ctx).await {
        let duration = t0.elapsed().as_secs_f64();
        ctx.stages.insert(
            stage_name.clone(),
            StageExecution::failed(Default::default(), e.to_string(), duration),
        );
        error!(stage = %stage_name, error = %e, "stage validation failed");
        commit(ctx, store, context_ttl).await?;
        return Ok(());
    }

    if let Some(raw_params) = ctx.input_params.node_params.get(&stage_name).cloned() {
        let as_value = Value::Object(raw_params.into_iter().collect());
        match resolve_parameters(&as_value, ctx) {
            Ok(Value::Object(resolved)) => {
                ctx.input_params
                    .node_params
                    .insert(stage_name.clone(), resolved.into_iter().collect());
            }
            Ok(_) => unreachable!("node_params entries are always objects"),
            Err(e) => {
                let duration = t0.elapsed().as_secs_f64();
                ctx.stages.insert(
                    stage_name.clone(),
                    StageExecution::failed(Default::default(), e.to_string(), duration),
                );
                ctx.error = Some(format!("{stage_name} failed: {e}"));
                error!(stage = %stage_name, error = %e, "parameter resolution failed");
                commit(ctx, store, context_ttl).await?;
                return Ok(());
            }
        }
    }

    let input_snapshot = ctx
        .input_params
        .node_params
        .get(&stage_name)
        .cloned()
        .unwrap_or_default();

    let mut raw_output = match executor.execute_core_logic(ctx).await {
        Ok(output) => output,
        Err(e) => {
            let duration = t0.elapsed().as_secs_f64();
            ctx.stages.insert(
                stage_name.clone(),
                StageExecution::failed(redact(&input_snapshot), e.to_string(), duration),
            );
            ctx.error = Some(format!("{stage_name} failed: {e}"));
            error!(stage = %stage_name, error = %e, "stage execution failed");
            commit(ctx, store, context_ttl).await?;
            return Ok(());
        }
    };

    normalize_output(
        &mut raw_output,
        object_store,
        &ctx.workflow_id,
        &stage_name,
        &executor.custom_path_fields(),
        auto_upload_to_minio,
    )
    .await;

    let duration = t0.elapsed().as_secs_f64();
    ctx.stages.insert(
        stage_name.clone(),
        StageExecution::success(redact(&input_snapshot), raw_output, duration),
    );
    info!(stage = %stage_name, duration, "stage succeeded");
    commit(ctx, store, context_ttl).await?;
    Ok(())
}

async fn commit(ctx: &WorkflowContext, store: &dyn StateStore, ttl: Duration) -> Result<(), CoreError> {
    store
        .update(ctx, ttl)
        .await
        .map_err(|e| CoreError::Transient(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelcore_core::StageStatus;
    use reelcore_state::StateError;
    use reelcore_storage::StorageResult;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct NullStateStore {
        last_committed: AsyncMutex<Option<WorkflowContext>>,
    }

    #[async_trait]
    impl StateStore for NullStateStore {
        async fn create(&self, _ctx: &WorkflowContext, _ttl: Duration) -> Result<(), StateError> {
            Ok(())
        }
        async fn get(&self, _workflow_id: &str) -> Result<Option<WorkflowContext>, StateError> {
            Ok(self.last_committed.lock().await.clone())
        }
        async fn update(&self, ctx: &WorkflowContext, _ttl: Duration) -> Result<(), StateError> {
            *self.last_committed.lock().await = Some(ctx.clone());
            Ok(())
        }
        async fn expire(&self, _workflow_id: &str, _ttl: Duration) -> Result<(), StateError> {
            Ok(())
        }
        async fn acquire_lock(&self, _workflow_id: &str, _ttl: Duration) -> Result<Option<String>, StateError> {
            Ok(Some("lock".to_string()))
        }
        async fn release_lock(&self, _workflow_id: &str, _lock_value: &str) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct NullObjectStore;

    #[async_trait]
    impl ObjectStore for NullObjectStore {
        async fn upload(&self, _local_path: &Path, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn download(&self, _key: &str, _dest_dir: &Path) -> StorageResult<std::path::PathBuf> {
            unimplemented!()
        }
        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    struct ScriptedStage {
        stage_name: String,
        valid: bool,
        outcome: Mutex<Option<Result<BTreeMap<String, Value>, CoreError>>>,
    }

    #[async_trait]
    impl StageExecutor for ScriptedStage {
        fn name(&self) -> &str {
            &self.stage_name
        }
        async fn validate_input(&self, _ctx: &WorkflowContext) -> Result<(), CoreError> {
            if self.valid {
                Ok(())
            } else {
                Err(CoreError::InvalidInput("missing video_path".to_string()))
            }
        }
        async fn execute_core_logic(&self, _ctx: &WorkflowContext) -> Result<BTreeMap<String, Value>, CoreError> {
            self.outcome.lock().unwrap().take().expect("outcome consumed twice")
        }
    }

    fn base_ctx() -> WorkflowContext {
        WorkflowContext::new("wf-1", "/in/v.mp4", vec!["ffmpeg.extract_audio".into()], BTreeMap::new(), "/share/wf-1")
    }

    #[tokio::test]
    async fn successful_stage_is_recorded_success_and_committed() {
        let mut output = BTreeMap::new();
        output.insert("audio_path".to_string(), Value::String("/share/wf-1/out.wav".to_string()));
        let executor = ScriptedStage {
            stage_name: "ffmpeg.extract_audio".to_string(),
            valid: true,
            outcome: Mutex::new(Some(Ok(output))),
        };
        let store = NullStateStore::default();
        let object_store = NullObjectStore;
        let mut ctx = base_ctx();

        run_stage(&executor, &mut ctx, &store, &object_store, Duration::from_secs(30), true)
            .await
            .unwrap();

        let recorded = &ctx.stages["ffmpeg.extract_audio"];
        assert_eq!(recorded.status, StageStatus::Success);
        assert!(recorded.output.contains_key("audio_path_minio_url"));
        assert!(store.last_committed.lock().await.is_some());
    }

    #[tokio::test]
    async fn invalid_input_is_recorded_failed_without_setting_context_error() {
        let executor = ScriptedStage {
            stage_name: "ffmpeg.extract_audio".to_string(),
            valid: false,
            outcome: Mutex::new(Some(Ok(BTreeMap::new()))),
        };
        let store = NullStateStore::default();
        let object_store = NullObjectStore;
        let mut ctx = base_ctx();

        run_stage(&executor, &mut ctx, &store, &object_store, Duration::from_secs(30), true)
            .await
            .unwrap();

        let recorded = &ctx.stages["ffmpeg.extract_audio"];
        assert_eq!(recorded.status, StageStatus::Failed);
        assert!(ctx.error.is_none());
    }

    #[tokio::test]
    async fn execute_core_logic_failure_sets_context_error() {
        let executor = ScriptedStage {
            stage_name: "ffmpeg.extract_audio".to_string(),
            valid: true,
            outcome: Mutex::new(Some(Err(CoreError::StageBodyError("decoder crashed".to_string())))),
        };
        let store = NullStateStore::default();
        let object_store = NullObjectStore;
        let mut ctx = base_ctx();

        run_stage(&executor, &mut ctx, &store, &object_store, Duration::from_secs(30), true)
            .await
            .unwrap();

        let recorded = &ctx.stages["ffmpeg.extract_audio"];
        assert_eq!(recorded.status, StageStatus::Failed);
        assert!(ctx.error.as_ref().unwrap().contains("ffmpeg.extract_audio failed"));
    }
}
