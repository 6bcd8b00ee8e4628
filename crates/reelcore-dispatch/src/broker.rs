//! The queue broker interface the core depends on (spec §1): accepts
//! `(queue_name, task_name, args)` and invokes workers with at-least-once
//! semantics.

use async_trait::async_trait;
use reelcore_core::CoreError;

use crate::chain::TaskSignature;

#[async_trait]
pub trait Broker: Send + Sync {
    /// Dispatch a built chain. The first signature carries the initial
    /// context; every later one is chained by the broker.
    async fn enqueue_chain(&self, chain: Vec<TaskSignature>) -> Result<(), CoreError>;
}
