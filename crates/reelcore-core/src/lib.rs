//! Core domain types and error taxonomy for the workflow orchestration core.
//!
//! This crate contains the types shared by every other crate in the
//! workspace: the workflow/stage data model (§3), resource identifiers, and
//! the error taxonomy (§7). It has no I/O of its own.

pub mod context;
pub mod error;
pub mod id;

pub use context::{InputParams, StageExecution, StageStatus, WorkflowContext};
pub use error::{CoreError, Result};
pub use id::ResourceId;
