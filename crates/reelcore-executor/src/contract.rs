//! The executor contract every stage implements (spec §4.4): the
//! operations the template calls into. The template itself — `run_stage`
//! — is the only place stage status transitions are written.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reelcore_core::{CoreError, WorkflowContext};
use serde_json::Value;

#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Stage name, e.g. `ffmpeg.extract_audio`.
    fn name(&self) -> &str;

    /// Fails with `InvalidInput` on a violation; never mutates `ctx`.
    async fn validate_input(&self, ctx: &WorkflowContext) -> Result<(), CoreError>;

    /// The stage's own work. Whatever this returns becomes the raw output
    /// that the template normalizes in step 5.
    async fn execute_core_logic(&self, ctx: &WorkflowContext) -> Result<BTreeMap<String, Value>, CoreError>;

    /// Parameter names used by higher-level deduplication. Not enforced by
    /// the template itself.
    fn cache_key_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Field names consumers are expected to validate are present in
    /// output. Not enforced by the template itself.
    fn required_output_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Output field names that should be uploaded under §4.3's custom-path
    /// rule even though they don't end in `_path`.
    fn custom_path_fields(&self) -> Vec<String> {
        Vec::new()
    }
}
