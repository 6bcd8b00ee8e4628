//! The workflow context state store and distributed lock (spec §4.1).

pub mod error;
pub mod redis_store;
pub mod store;

pub use error::{StateError, StateResult};
pub use redis_store::RedisStateStore;
pub use store::StateStore;
