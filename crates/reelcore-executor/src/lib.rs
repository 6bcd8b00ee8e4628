//! The stage executor contract and template (spec §4.4): validate →
//! resolve → execute → normalize → record → commit, identical for every
//! stage.

pub mod contract;
pub mod redact;
pub mod run_stage;

pub use contract::StageExecutor;
pub use run_stage::run_stage;
