//! Error taxonomy for the orchestration core (spec §7).

use thiserror::Error;

/// Errors surfaced by the orchestration core and its collaborators.
///
/// Propagation policy: fail-fast at API boundaries (`InvalidInput`,
/// `NotFound`, `Conflict`, `Gone`); fail-and-record at worker boundaries
/// (`StageBodyError`, `ResolutionError` become a `FAILED` `StageExecution`,
/// never an `Err` that escapes the executor template).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Schema violation, missing required field, bad mode/field combination,
    /// empty chain, non-prefix incremental submission, parameter conflict.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target workflow does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Workflow exists but its shared storage directory is gone.
    #[error("gone: {0}")]
    Gone(String),

    /// Workflow lock is held by another request.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A `${{ stages.S.output.F }}` placeholder pointed at an absent stage
    /// or field. Carries the keys actually present so the caller can report
    /// a useful message.
    #[error("failed to resolve stages.{stage}.output.{field}: available fields are [{}]", .available.join(", "))]
    ResolutionError {
        stage: String,
        field: String,
        available: Vec<String>,
    },

    /// Backing store (state store or broker) unreachable after the retry
    /// budget was exhausted.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Anything raised by a stage's `execute_core_logic`. Recorded verbatim
    /// in `StageExecution::error`; never propagated past the executor
    /// template.
    #[error("stage body error: {0}")]
    StageBodyError(String),

    /// Stage name does not contain a `.` separator, so no queue can be
    /// derived for it.
    #[error("invalid stage name: {0}")]
    InvalidStageName(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
