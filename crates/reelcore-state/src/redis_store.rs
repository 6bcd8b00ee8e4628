//! Redis-backed `StateStore` implementation.
//!
//! Uses `redis`'s `ConnectionManager` so a dropped connection is transparently
//! reconnected rather than poisoning the whole store; a connection failure
//! that survives reconnection surfaces as `StateError::Unavailable`, which
//! the orchestration core treats as fail-fast per §4.1.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use reelcore_core::WorkflowContext;
use tracing::warn;
use uuid::Uuid;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

/// Compare-and-delete, executed server-side so the check and the delete are
/// one atomic step. Mirrors `LUA_RELEASE_SCRIPT` in the source this
/// component is adapted from.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

fn state_key(workflow_id: &str) -> String {
    format!("workflow_state:{workflow_id}")
}

fn lock_key(workflow_id: &str) -> String {
    format!("workflow_lock:{workflow_id}")
}

pub struct RedisStateStore {
    conn: ConnectionManager,
}

impl RedisStateStore {
    pub async fn connect(redis_url: &str) -> StateResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn create(&self, ctx: &WorkflowContext, ttl: Duration) -> StateResult<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(ctx)?;
        let set: bool = redis::cmd("SET")
            .arg(state_key(&ctx.workflow_id))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map(|v: Option<String>| v.is_some())
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        if set {
            Ok(())
        } else {
            Err(StateError::AlreadyExists(ctx.workflow_id.clone()))
        }
    }

    async fn get(&self, workflow_id: &str) -> StateResult<Option<WorkflowContext>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(state_key(workflow_id))
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, ctx: &WorkflowContext, ttl: Duration) -> StateResult<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(ctx)?;
        let _: () = conn
            .set_ex(state_key(&ctx.workflow_id), payload, ttl.as_secs())
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn expire(&self, workflow_id: &str, ttl: Duration) -> StateResult<()> {
        let mut conn = self.conn.clone();
        let _: bool = conn
            .expire(state_key(workflow_id), ttl.as_secs() as i64)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn acquire_lock(&self, workflow_id: &str, ttl: Duration) -> StateResult<Option<String>> {
        let mut conn = self.conn.clone();
        let lock_value = Uuid::new_v4().to_string();
        let set: Option<String> = redis::cmd("SET")
            .arg(lock_key(workflow_id))
            .arg(&lock_value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        Ok(set.map(|_| lock_value))
    }

    async fn release_lock(&self, workflow_id: &str, lock_value: &str) -> StateResult<()> {
        let mut conn = self.conn.clone();
        let deleted: i64 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(lock_key(workflow_id))
            .arg(lock_value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StateError::Unavailable(e.to_string()))?;
        if deleted == 0 {
            warn!(workflow_id, "lock release was a no-op: value mismatch or already expired");
        }
        Ok(())
    }
}
