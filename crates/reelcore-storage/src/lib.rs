//! Artifact naming and upload (spec §4.3): a deterministic path scheme for
//! stage outputs, plus best-effort upload to S3/MinIO-compatible storage.

pub mod error;
pub mod object_store;
pub mod path;
pub mod upload;

pub use error::{StorageError, StorageResult};
pub use object_store::{ObjectStore, S3ObjectStore};
pub use upload::normalize_output;
