//! Diff engine and parameter merge for incremental/retry workflow
//! submissions (spec §4.6, §4.7). Pure, no I/O.

pub mod engine;
pub mod merge;

pub use engine::{compute_diff, Diff, ExecutionMode};
pub use merge::{merge_node_params, MergeError, NodeParams, ParamConflict, ParamMergeStrategy};
