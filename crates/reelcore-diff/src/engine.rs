//! Diff engine: compare the recorded chain against a newly submitted one
//! and compute the skip-set and execute-set for the three execution modes
//! (spec §4.6).

use reelcore_core::{CoreError, StageStatus, WorkflowContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Full,
    Incremental,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub tasks_to_skip: Vec<String>,
    pub tasks_to_execute: Vec<String>,
}

impl Diff {
    pub fn tasks_total(&self) -> usize {
        self.tasks_to_skip.len() + self.tasks_to_execute.len()
    }
}

fn is_strict_prefix(old_chain: &[String], new_chain: &[String]) -> bool {
    old_chain.len() < new_chain.len() && new_chain[..old_chain.len()] == *old_chain
}

/// Compute the diff for `new_chain` against `ctx`'s recorded chain and
/// stage statuses, under `mode`.
///
/// `full` is included for table-completeness (spec §4.6); in practice the
/// orchestration core never reaches the diff engine on a fresh run (§4.8
/// step 2 bypasses it entirely), since there is no old chain to compare
/// against.
pub fn compute_diff(
    mode: ExecutionMode,
    ctx: &WorkflowContext,
    new_chain: &[String],
) -> Result<Diff, CoreError> {
    if new_chain.is_empty() {
        return Err(CoreError::InvalidInput(
            "workflow_chain must not be empty".to_string(),
        ));
    }

    let old_chain = &ctx.input_params.workflow_chain;

    match mode {
        ExecutionMode::Full => Ok(Diff {
            tasks_to_skip: Vec::new(),
            tasks_to_execute: new_chain.to_vec(),
        }),
        ExecutionMode::Incremental => {
            if old_chain.is_empty() {
                return Err(CoreError::InvalidInput(
                    "workflow has no recorded chain to extend".to_string(),
                ));
            }
            if !is_strict_prefix(old_chain, new_chain) {
                return Err(CoreError::InvalidInput(format!(
                    "incremental submission {new_chain:?} is not a strict extension of the recorded chain {old_chain:?}"
                )));
            }
            if let Some(not_success) = old_chain.iter().find(|s| ctx.stage_status(s) != StageStatus::Success) {
                return Err(CoreError::InvalidInput(format!(
                    "stage '{not_success}' in the recorded chain is not SUCCESS; use execution_mode=retry instead"
                )));
            }
            Ok(Diff {
                tasks_to_skip: old_chain.clone(),
                tasks_to_execute: new_chain[old_chain.len()..].to_vec(),
            })
        }
        ExecutionMode::Retry => {
            let mut skip = Vec::new();
            let mut execute = Vec::new();
            let mut in_prefix = true;
            for stage in new_chain {
                if in_prefix && ctx.stage_status(stage) == StageStatus::Success {
                    skip.push(stage.clone());
                } else {
                    in_prefix = false;
                    execute.push(stage.clone());
                }
            }
            Ok(Diff {
                tasks_to_skip: skip,
                tasks_to_execute: execute,
            })
        }
    }
}
