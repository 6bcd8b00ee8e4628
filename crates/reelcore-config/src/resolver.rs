//! Late-bound placeholder resolution: `${{ stages.<stage>.output.<field> }}`.
//!
//! Grammar (spec §4.2): recognized only on a fully-trimmed exact string
//! match. A string that merely *contains* the pattern, or contains it
//! alongside other characters, is left unchanged — there is no substring
//! interpolation, unlike `${var}` style templating elsewhere in this
//! workspace.

use reelcore_core::{CoreError, WorkflowContext};
use serde_json::Value;

/// A parameter value as written by the client: either a concrete literal or
/// a reference into a prior stage's output. Representing the grammar as a
/// tagged union (rather than re-parsing strings on every lookup) is the
/// static encoding suggested for this resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Literal(Value),
    Reference { stage: String, field: String },
}

impl ParamValue {
    /// Parse a raw JSON value into its resolved-or-reference form. Only
    /// string values are ever references; everything else is a literal.
    pub fn parse(raw: Value) -> Self {
        if let Value::String(s) = &raw {
            if let Some((stage, field)) = parse_reference(s) {
                return Self::Reference { stage, field };
            }
        }
        Self::Literal(raw)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Parse `${{ stages.<stage_name>.output.<field_name> }}` out of a fully
/// trimmed string. Returns `None` if the string is not an exact match for
/// the grammar.
fn parse_reference(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix("${{")?.strip_suffix("}}")?;
    let inner = inner.trim();
    let rest = inner.strip_prefix("stages.")?;
    let dot_output = ".output.";
    let idx = rest.find(dot_output)?;
    let (stage, field) = (&rest[..idx], &rest[idx + dot_output.len()..]);
    if stage.is_empty() || field.is_empty() {
        return None;
    }
    if !stage.chars().all(is_name_char) || !field.chars().all(is_name_char) {
        return None;
    }
    Some((stage.to_string(), field.to_string()))
}

/// Look up `context.stages[stage].output[field]`, returning the keys
/// actually present in the stage's output on failure (spec §4.2).
fn lookup(ctx: &WorkflowContext, stage: &str, field: &str) -> Result<Value, CoreError> {
    let execution = ctx.stages.get(stage).ok_or_else(|| CoreError::ResolutionError {
        stage: stage.to_string(),
        field: field.to_string(),
        available: Vec::new(),
    })?;
    execution
        .output
        .get(field)
        .cloned()
        .ok_or_else(|| CoreError::ResolutionError {
            stage: stage.to_string(),
            field: field.to_string(),
            available: execution.output.keys().cloned().collect(),
        })
}

/// Recursively rewrite every placeholder in `params` against `ctx`.
///
/// Single-pass: once a reference has been substituted, the substituted
/// value is never re-examined, even if it happens to look like another
/// placeholder. This both prevents infinite loops and reflects that
/// placeholders are only ever valid against *past* stages' output.
pub fn resolve_parameters(params: &Value, ctx: &WorkflowContext) -> Result<Value, CoreError> {
    match params {
        Value::String(s) => match parse_reference(s) {
            Some((stage, field)) => lookup(ctx, &stage, &field),
            None => Ok(params.clone()),
        },
        Value::Array(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_parameters(item, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_parameters(v, ctx)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcore_core::StageExecution;
    use std::collections::BTreeMap;

    fn ctx_with_stage_output(stage: &str, field: &str, value: Value) -> WorkflowContext {
        let mut ctx = WorkflowContext::new("wf-1", "/in/v.mp4", vec![stage.into()], BTreeMap::new(), "/share/wf-1");
        let mut output = BTreeMap::new();
        output.insert(field.to_string(), value);
        ctx.stages
            .insert(stage.to_string(), StageExecution::success(BTreeMap::new(), output, 1.0));
        ctx
    }

    #[test]
    fn resolves_exact_placeholder() {
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!(7));
        let params = serde_json::json!({"x": "${{ stages.A.output.f }}"});
        let resolved = resolve_parameters(&params, &ctx).unwrap();
        assert_eq!(resolved, serde_json::json!({"x": 7}));
    }

    #[test]
    fn leaves_non_exact_match_untouched() {
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!(7));
        let params = serde_json::json!({"x": "prefix ${{ stages.A.output.f }}"});
        let resolved = resolve_parameters(&params, &ctx).unwrap();
        assert_eq!(resolved, params);
    }

    #[test]
    fn missing_field_reports_available_keys() {
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!(7));
        let params = serde_json::json!("${{ stages.A.output.missing }}");
        let err = resolve_parameters(&params, &ctx).unwrap_err();
        match err {
            CoreError::ResolutionError { stage, field, available } => {
                assert_eq!(stage, "A");
                assert_eq!(field, "missing");
                assert_eq!(available, vec!["f".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_stage_reports_no_available_keys() {
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!(7));
        let params = serde_json::json!("${{ stages.B.output.f }}");
        let err = resolve_parameters(&params, &ctx).unwrap_err();
        assert!(matches!(err, CoreError::ResolutionError { stage, available, .. } if stage == "B" && available.is_empty()));
    }

    #[test]
    fn single_pass_does_not_chase_substituted_placeholders() {
        // stage A's own output happens to look like a placeholder pointing at
        // stage B; one resolve() pass over a reference to A.f must return
        // that string verbatim, not recurse into resolving it again.
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!("${{ stages.B.output.g }}"));
        let params = serde_json::json!("${{ stages.A.output.f }}");
        let resolved = resolve_parameters(&params, &ctx).unwrap();
        assert_eq!(resolved, serde_json::json!("${{ stages.B.output.g }}"));
    }

    #[test]
    fn recurses_into_nested_mappings_and_sequences() {
        let ctx = ctx_with_stage_output("A", "f", serde_json::json!("value"));
        let params = serde_json::json!({
            "list": ["${{ stages.A.output.f }}", "literal"],
            "nested": {"inner": "${{ stages.A.output.f }}"}
        });
        let resolved = resolve_parameters(&params, &ctx).unwrap();
        assert_eq!(
            resolved,
            serde_json::json!({
                "list": ["value", "literal"],
                "nested": {"inner": "value"}
            })
        );
    }

    #[test]
    fn param_value_parse_distinguishes_reference_from_literal() {
        assert!(matches!(
            ParamValue::parse(serde_json::json!("${{ stages.A.output.f }}")),
            ParamValue::Reference { .. }
        ));
        assert!(matches!(
            ParamValue::parse(serde_json::json!("plain string")),
            ParamValue::Literal(_)
        ));
        assert!(matches!(ParamValue::parse(serde_json::json!(42)), ParamValue::Literal(_)));
    }
}
