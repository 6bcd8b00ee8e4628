//! Multi-level parameter fallback, invoked by executors rather than the
//! resolver itself (spec §4.2).
//!
//! When a stage needs parameter `P` it consults, in order:
//! 1. resolved `node_params[P]` for this stage,
//! 2. `input_params.input_data[P]`, with opportunistic placeholder
//!    resolution if that value is a string,
//! 3. the declared upstream stage's output field `P` (or an alias),
//! 4. a static default.
//!
//! The first non-null source wins.

use reelcore_core::{CoreError, WorkflowContext};
use serde_json::Value;

use crate::resolver::resolve_parameters;

/// The declared upstream source consulted at priority 3.
pub struct UpstreamSource<'a> {
    pub stage: &'a str,
    /// Field name in the upstream stage's output. Defaults to `param_name`
    /// when the caller has no alias.
    pub field: &'a str,
}

/// Resolve parameter `param_name` for `stage_name` using the fallback chain.
///
/// `node_params` is this stage's already-merged parameter map (the union of
/// stored and newly-submitted `node_params[stage_name]`, see §4.7).
pub fn resolve_param_with_fallback(
    ctx: &WorkflowContext,
    node_params: &std::collections::BTreeMap<String, Value>,
    param_name: &str,
    upstream: Option<UpstreamSource<'_>>,
    default: Option<Value>,
) -> Result<Option<Value>, CoreError> {
    if let Some(v) = node_params.get(param_name) {
        return Ok(Some(v.clone()));
    }

    if let Some(v) = ctx.input_params.input_data.get(param_name) {
        let resolved = resolve_parameters(v, ctx)?;
        return Ok(Some(resolved));
    }

    if let Some(src) = upstream {
        if let Some(execution) = ctx.stages.get(src.stage) {
            if let Some(v) = execution.output.get(src.field) {
                return Ok(Some(v.clone()));
            }
        }
    }

    Ok(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcore_core::StageExecution;
    use std::collections::BTreeMap;

    fn base_ctx() -> WorkflowContext {
        WorkflowContext::new("wf-1", "/in/v.mp4", vec!["A".into(), "B".into()], BTreeMap::new(), "/share/wf-1")
    }

    #[test]
    fn node_params_take_priority() {
        let ctx = base_ctx();
        let mut node_params = BTreeMap::new();
        node_params.insert("p".to_string(), serde_json::json!("from_node_params"));
        let resolved = resolve_param_with_fallback(&ctx, &node_params, "p", None, None).unwrap();
        assert_eq!(resolved, Some(serde_json::json!("from_node_params")));
    }

    #[test]
    fn falls_back_to_input_data_with_resolution() {
        let mut ctx = base_ctx();
        ctx.stages.insert(
            "A".to_string(),
            StageExecution::success(BTreeMap::new(), {
                let mut out = BTreeMap::new();
                out.insert("f".to_string(), serde_json::json!("resolved-value"));
                out
            }, 1.0),
        );
        ctx.input_params
            .input_data
            .insert("p".to_string(), serde_json::json!("${{ stages.A.output.f }}"));
        let node_params = BTreeMap::new();
        let resolved = resolve_param_with_fallback(&ctx, &node_params, "p", None, None).unwrap();
        assert_eq!(resolved, Some(serde_json::json!("resolved-value")));
    }

    #[test]
    fn falls_back_to_upstream_stage_output() {
        let mut ctx = base_ctx();
        ctx.stages.insert(
            "A".to_string(),
            StageExecution::success(BTreeMap::new(), {
                let mut out = BTreeMap::new();
                out.insert("f".to_string(), serde_json::json!(42));
                out
            }, 1.0),
        );
        let node_params = BTreeMap::new();
        let upstream = UpstreamSource { stage: "A", field: "f" };
        let resolved =
            resolve_param_with_fallback(&ctx, &node_params, "p", Some(upstream), None).unwrap();
        assert_eq!(resolved, Some(serde_json::json!(42)));
    }

    #[test]
    fn falls_back_to_static_default() {
        let ctx = base_ctx();
        let node_params = BTreeMap::new();
        let resolved =
            resolve_param_with_fallback(&ctx, &node_params, "p", None, Some(serde_json::json!("fallback"))).unwrap();
        assert_eq!(resolved, Some(serde_json::json!("fallback")));
    }

    #[test]
    fn no_source_yields_none() {
        let ctx = base_ctx();
        let node_params = BTreeMap::new();
        let resolved = resolve_param_with_fallback(&ctx, &node_params, "p", None, None).unwrap();
        assert_eq!(resolved, None);
    }
}
