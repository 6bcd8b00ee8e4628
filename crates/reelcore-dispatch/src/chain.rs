//! Chain Builder (spec §4.5): turn a list of stage names plus an initial
//! context into a sequence of queued task signatures, routed to the
//! correct per-stage queue.

use reelcore_core::{CoreError, WorkflowContext};

/// One task in a dispatched chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSignature {
    pub queue_name: String,
    pub task_name: String,
    pub workflow_id: String,
    /// `true` for the first task in the chain: it carries the initial
    /// context explicitly and does not receive a prior task's return
    /// value, because there is none.
    pub immutable: bool,
    /// Only set on the first (immutable) task.
    pub initial_context: Option<WorkflowContext>,
}

/// `ffmpeg.extract_audio` → `ffmpeg_queue`. Unexpected forms (no `.`) fail
/// with `InvalidStageName`.
pub fn derive_queue_name(stage_name: &str) -> Result<String, CoreError> {
    match stage_name.split_once('.') {
        Some((prefix, _)) if !prefix.is_empty() => Ok(format!("{prefix}_queue")),
        _ => Err(CoreError::InvalidStageName(stage_name.to_string())),
    }
}

/// Build the signature list for `stage_names`. The builder performs no I/O
/// beyond constructing these signature objects; it must produce a
/// non-empty list or fail.
pub fn build_chain(
    stage_names: &[String],
    initial_context: WorkflowContext,
) -> Result<Vec<TaskSignature>, CoreError> {
    if stage_names.is_empty() {
        return Err(CoreError::InvalidInput(
            "cannot build a dispatch chain from an empty stage list".to_string(),
        ));
    }

    let mut signatures = Vec::with_capacity(stage_names.len());
    for (i, stage_name) in stage_names.iter().enumerate() {
        let queue_name = derive_queue_name(stage_name)?;
        signatures.push(TaskSignature {
            queue_name,
            task_name: stage_name.clone(),
            workflow_id: initial_context.workflow_id.clone(),
            immutable: i == 0,
            initial_context: if i == 0 { Some(initial_context.clone()) } else { None },
        });
    }
    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx() -> WorkflowContext {
        WorkflowContext::new("wf-1", "/in/v.mp4", vec!["ffmpeg.extract_audio".into()], BTreeMap::new(), "/share/wf-1")
    }

    #[test]
    fn derives_queue_name_from_prefix() {
        assert_eq!(derive_queue_name("ffmpeg.extract_audio").unwrap(), "ffmpeg_queue");
    }

    #[test]
    fn stage_name_without_dot_is_invalid() {
        let err = derive_queue_name("extract_audio").unwrap_err();
        assert!(matches!(err, CoreError::InvalidStageName(_)));
    }

    #[test]
    fn first_task_is_immutable_with_initial_context() {
        let chain = build_chain(&["ffmpeg.extract_audio".to_string(), "asr.transcribe".to_string()], ctx()).unwrap();
        assert!(chain[0].immutable);
        assert!(chain[0].initial_context.is_some());
        assert!(!chain[1].immutable);
        assert!(chain[1].initial_context.is_none());
    }

    #[test]
    fn empty_stage_list_fails() {
        let err = build_chain(&[], ctx()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn stage_name_without_dot_fails_chain_building() {
        let err = build_chain(&["extract_audio".to_string()], ctx()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStageName(_)));
    }
}
