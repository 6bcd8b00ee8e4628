//! The workflow context: the single root record carried across the state
//! store and the queue broker (spec §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of one attempted stage.
///
/// `SUCCESS` and the legacy `COMPLETED` spelling are equivalent; `COMPLETED`
/// is accepted on deserialization and normalized to `Success` (see
/// `Deserialize` impl below). `Success` is the only form this crate ever
/// serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    /// `true` once a stage will never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl<'de> Deserialize<'de> for StageStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCESS" | "COMPLETED" => Self::Success,
            "FAILED" => Self::Failed,
            "SKIPPED" => Self::Skipped,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown stage status: {other}"
                )));
            }
        })
    }
}

/// One attempted stage's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageExecution {
    pub status: StageStatus,
    /// Snapshot of resolved inputs at stage entry, with secret-shaped keys
    /// redacted to `"***"`.
    #[serde(default)]
    pub input_params: BTreeMap<String, Value>,
    /// Producer-defined output. Path fields may carry a companion
    /// `<field>_minio_url` or `<field>_upload_error` once normalized.
    #[serde(default)]
    pub output: BTreeMap<String, Value>,
    /// Populated only when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time of this attempt, in seconds.
    #[serde(default)]
    pub duration: f64,
}

impl StageExecution {
    pub fn pending() -> Self {
        Self {
            status: StageStatus::Pending,
            input_params: BTreeMap::new(),
            output: BTreeMap::new(),
            error: None,
            duration: 0.0,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: StageStatus::Skipped,
            ..Self::pending()
        }
    }

    pub fn failed(input_params: BTreeMap<String, Value>, error: String, duration: f64) -> Self {
        Self {
            status: StageStatus::Failed,
            input_params,
            output: BTreeMap::new(),
            error: Some(error),
            duration,
        }
    }

    pub fn success(
        input_params: BTreeMap<String, Value>,
        output: BTreeMap<String, Value>,
        duration: f64,
    ) -> Self {
        Self {
            status: StageStatus::Success,
            input_params,
            output,
            error: None,
            duration,
        }
    }
}

/// The input parameters a workflow was submitted with, including the
/// per-stage parameter overrides and the currently-recorded chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputParams {
    pub video_path: String,
    #[serde(default)]
    pub workflow_chain: Vec<String>,
    #[serde(default)]
    pub node_params: BTreeMap<String, BTreeMap<String, Value>>,
    /// Caller-declared input data, consulted by the parameter fallback
    /// chain (spec §4.2) as the second-priority source.
    #[serde(default)]
    pub input_data: BTreeMap<String, Value>,
}

/// The single root record, created at workflow start, mutated after every
/// stage, destroyed by TTL expiry or explicit delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub workflow_id: String,
    pub create_at: DateTime<Utc>,
    pub input_params: InputParams,
    pub shared_storage_path: String,
    /// Keyed by stage name; iteration order is not semantic, callers
    /// should follow `input_params.workflow_chain` to order stages.
    #[serde(default)]
    pub stages: BTreeMap<String, StageExecution>,
    /// Last fatal workflow-level error. A non-null value does not, by
    /// itself, mark the workflow terminal for retry purposes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowContext {
    pub fn new(
        workflow_id: impl Into<String>,
        video_path: impl Into<String>,
        workflow_chain: Vec<String>,
        node_params: BTreeMap<String, BTreeMap<String, Value>>,
        shared_storage_path: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            create_at: Utc::now(),
            input_params: InputParams {
                video_path: video_path.into(),
                workflow_chain,
                node_params,
                input_data: BTreeMap::new(),
            },
            shared_storage_path: shared_storage_path.into(),
            stages: BTreeMap::new(),
            error: None,
        }
    }

    /// Status of a stage, or `Pending` if it has never been attempted.
    pub fn stage_status(&self, stage: &str) -> StageStatus {
        self.stages
            .get(stage)
            .map(|s| s.status)
            .unwrap_or(StageStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_aliases_to_success() {
        let v: StageStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(v, StageStatus::Success);
        let v: StageStatus = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(v, StageStatus::Success);
    }

    #[test]
    fn success_serializes_as_success_not_completed() {
        let s = serde_json::to_string(&StageStatus::Success).unwrap();
        assert_eq!(s, "\"SUCCESS\"");
    }

    #[test]
    fn stage_status_defaults_to_pending() {
        let ctx = WorkflowContext::new("wf-1", "/in/v.mp4", vec!["A".into()], BTreeMap::new(), "/share/wf-1");
        assert_eq!(ctx.stage_status("A"), StageStatus::Pending);
    }
}
