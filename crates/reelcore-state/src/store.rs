//! The `StateStore` contract (spec §4.1): atomic, concurrent-safe
//! persistence for `WorkflowContext`, plus a distributed mutex primitive.

use std::time::Duration;

use async_trait::async_trait;
use reelcore_core::WorkflowContext;

use crate::error::StateResult;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Write if absent. Fails with `AlreadyExists` if the key exists.
    /// Sets TTL.
    async fn create(&self, ctx: &WorkflowContext, ttl: Duration) -> StateResult<()>;

    /// Single-shot read.
    async fn get(&self, workflow_id: &str) -> StateResult<Option<WorkflowContext>>;

    /// Unconditional replace. Sets TTL.
    async fn update(&self, ctx: &WorkflowContext, ttl: Duration) -> StateResult<()>;

    /// Reset TTL without rewriting the payload.
    async fn expire(&self, workflow_id: &str, ttl: Duration) -> StateResult<()>;

    /// Atomic set-if-absent of `lock:<workflow_id>` with a fresh UUIDv4
    /// value and the given expiry. Returns `None` on contention.
    async fn acquire_lock(&self, workflow_id: &str, ttl: Duration) -> StateResult<Option<String>>;

    /// Atomic compare-and-delete: removes the lock only if its stored
    /// value equals `lock_value`. A mismatch (lock expired, or held by
    /// someone else) is a valid, expected outcome — it must be logged, but
    /// this must never return an `Err` for that reason.
    async fn release_lock(&self, workflow_id: &str, lock_value: &str) -> StateResult<()>;
}
