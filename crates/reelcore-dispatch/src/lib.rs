//! Chain Builder and queue broker (spec §4.5): turns a workflow's ordered
//! stage list into per-stage-type queued tasks, dispatched with
//! at-least-once semantics, and a worker loop that drains those queues
//! through the executor template.

pub mod broker;
pub mod chain;
pub mod pg_broker;
pub mod worker;

pub use broker::Broker;
pub use chain::{build_chain, derive_queue_name, TaskSignature};
pub use pg_broker::{PgBroker, QueuedTask};
pub use worker::Worker;
