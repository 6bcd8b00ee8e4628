//! Parameter merge: how a new submission's `node_params` combine with the
//! stored ones (spec §4.7).

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

pub type NodeParams = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMergeStrategy {
    /// Union of maps; new value wins on a colliding key.
    Merge,
    /// Discard stored `node_params` entirely.
    Override,
    /// Union of maps, but fail if any colliding key differs in value.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamConflict {
    pub stage: String,
    pub key: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("parameter conflict on {} key(s)", .0.len())]
    Conflict(Vec<ParamConflict>),
}

/// Merge `new` into `old` under `strategy`, logging (via `tracing`) each
/// collision encountered under `Merge`.
pub fn merge_node_params(
    old: &NodeParams,
    new: &NodeParams,
    strategy: ParamMergeStrategy,
) -> Result<NodeParams, MergeError> {
    match strategy {
        ParamMergeStrategy::Override => Ok(new.clone()),
        ParamMergeStrategy::Merge => Ok(union(old, new, &mut |conflict| {
            tracing::warn!(
                stage = %conflict.stage,
                key = %conflict.key,
                old_value = %conflict.old_value,
                new_value = %conflict.new_value,
                "node_params collision, new value wins"
            );
        })),
        ParamMergeStrategy::Strict => {
            let mut conflicts = Vec::new();
            let merged = union(old, new, &mut |conflict| conflicts.push(conflict));
            if conflicts.is_empty() {
                Ok(merged)
            } else {
                Err(MergeError::Conflict(conflicts))
            }
        }
    }
}

fn union(old: &NodeParams, new: &NodeParams, on_conflict: &mut impl FnMut(ParamConflict)) -> NodeParams {
    let mut result = old.clone();
    for (stage, new_params) in new {
        let entry = result.entry(stage.clone()).or_default();
        for (key, new_value) in new_params {
            match entry.get(key) {
                Some(old_value) if old_value != new_value => {
                    on_conflict(ParamConflict {
                        stage: stage.clone(),
                        key: key.clone(),
                        old_value: old_value.clone(),
                        new_value: new_value.clone(),
                    });
                    entry.insert(key.clone(), new_value.clone());
                }
                _ => {
                    entry.insert(key.clone(), new_value.clone());
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(stage: &str, key: &str, value: Value) -> NodeParams {
        let mut inner = BTreeMap::new();
        inner.insert(key.to_string(), value);
        let mut outer = BTreeMap::new();
        outer.insert(stage.to_string(), inner);
        outer
    }

    #[test]
    fn merge_new_value_wins_on_collision() {
        let old = params("stageX", "q", serde_json::json!(1));
        let new = params("stageX", "q", serde_json::json!(2));
        let merged = merge_node_params(&old, &new, ParamMergeStrategy::Merge).unwrap();
        assert_eq!(merged["stageX"]["q"], serde_json::json!(2));
    }

    #[test]
    fn merge_keeps_non_colliding_keys_from_both_sides() {
        let old = params("stageX", "a", serde_json::json!(1));
        let new = params("stageX", "b", serde_json::json!(2));
        let merged = merge_node_params(&old, &new, ParamMergeStrategy::Merge).unwrap();
        assert_eq!(merged["stageX"]["a"], serde_json::json!(1));
        assert_eq!(merged["stageX"]["b"], serde_json::json!(2));
    }

    #[test]
    fn override_discards_stored_entirely() {
        let old = params("stageX", "a", serde_json::json!(1));
        let new = params("stageY", "b", serde_json::json!(2));
        let merged = merge_node_params(&old, &new, ParamMergeStrategy::Override).unwrap();
        assert!(!merged.contains_key("stageX"));
        assert_eq!(merged["stageY"]["b"], serde_json::json!(2));
    }

    #[test]
    fn strict_fails_on_conflict_scenario_e() {
        let old = params("stageX", "q", serde_json::json!(1));
        let new = params("stageX", "q", serde_json::json!(2));
        let err = merge_node_params(&old, &new, ParamMergeStrategy::Strict).unwrap_err();
        match err {
            MergeError::Conflict(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].key, "q");
                assert_eq!(conflicts[0].old_value, serde_json::json!(1));
                assert_eq!(conflicts[0].new_value, serde_json::json!(2));
            }
        }
    }

    #[test]
    fn strict_succeeds_when_no_key_differs() {
        let old = params("stageX", "q", serde_json::json!(1));
        let new = params("stageX", "q", serde_json::json!(1));
        let merged = merge_node_params(&old, &new, ParamMergeStrategy::Strict).unwrap();
        assert_eq!(merged["stageX"]["q"], serde_json::json!(1));
    }
}
