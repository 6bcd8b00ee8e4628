//! Upload-as-sidecar output normalization (spec §4.3, §4.4 step 5).
//!
//! After a stage produces output, every path-shaped field is uploaded to
//! object storage best-effort: failures are recorded as
//! `<field>_upload_error` and never fail the stage — the local path remains
//! authoritative.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde_json::Value;
use tracing::warn;

use crate::object_store::ObjectStore;
use crate::path::{build_object_store_key, type_dir_for_filename};

/// Upload attempts before giving up (spec §4.3: `N=3`).
const MAX_UPLOAD_ATTEMPTS: u32 = 3;
/// Bounds the whole retry loop regardless of how many attempts remain.
const UPLOAD_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

async fn upload_with_retry(store: &dyn ObjectStore, local_path: &Path, key: &str) -> Result<(), String> {
    let mut attempts = 0u32;
    let backoff = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(UPLOAD_TOTAL_TIMEOUT))
        .build();

    retry(backoff, || {
        let store = store;
        let local_path = local_path;
        let key = key;
        attempts += 1;
        async move {
            if attempts > MAX_UPLOAD_ATTEMPTS {
                return Err(backoff::Error::permanent(format!(
                    "exhausted {MAX_UPLOAD_ATTEMPTS} upload attempts"
                )));
            }
            store
                .upload(local_path, key)
                .await
                .map_err(|e| backoff::Error::transient(e.to_string()))
        }
    })
    .await
    .map_err(|e| e.to_string())
}

/// A field name that should be treated as a local-path output, either by
/// the standard `*_path` naming convention or by a stage's declared custom
/// path fields (spec §4.3 rules 1-2).
fn is_path_field(field_name: &str, custom_path_fields: &[String]) -> bool {
    field_name.ends_with("_path") || custom_path_fields.iter().any(|f| f == field_name)
}

/// Normalize a stage's raw output in place: every path field gets a
/// companion `<field>_minio_url` on successful upload, or
/// `<field>_upload_error` on failure. When `auto_upload_to_minio` is
/// disabled, uploads are skipped entirely and no companion field is added.
pub async fn normalize_output(
    output: &mut BTreeMap<String, Value>,
    store: &dyn ObjectStore,
    workflow_id: &str,
    stage_name: &str,
    custom_path_fields: &[String],
    auto_upload_to_minio: bool,
) {
    if !auto_upload_to_minio {
        return;
    }

    let path_fields: Vec<(String, String)> = output
        .iter()
        .filter_map(|(field, value)| {
            let path_str = value.as_str()?;
            if is_path_field(field, custom_path_fields) {
                Some((field.clone(), path_str.to_string()))
            } else {
                None
            }
        })
        .collect();

    for (field, local_path) in path_fields {
        let filename = Path::new(&local_path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(&local_path);
        let _ = type_dir_for_filename(filename); // derived again inside build_object_store_key
        let key = build_object_store_key(workflow_id, stage_name, filename);

        match upload_with_retry(store, Path::new(&local_path), &key).await {
            Ok(()) => {
                output.insert(format!("{field}_minio_url"), Value::String(format!("minio://{key}")));
            }
            Err(e) => {
                warn!(field, error = %e, "artifact upload failed, local path remains authoritative");
                output.insert(format!("{field}_upload_error"), Value::String(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyStore {
        fail_times: usize,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn upload(&self, _local_path: &Path, _key: &str) -> crate::error::StorageResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(crate::error::StorageError::Upload("transient".into()))
            } else {
                Ok(())
            }
        }
        async fn download(&self, _key: &str, _dest_dir: &Path) -> crate::error::StorageResult<std::path::PathBuf> {
            unimplemented!()
        }
        async fn delete(&self, _key: &str) -> crate::error::StorageResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn successful_upload_adds_minio_url() {
        let store = FlakyStore { fail_times: 0, calls: Arc::new(AtomicUsize::new(0)) };
        let mut output = BTreeMap::new();
        output.insert("audio_path".to_string(), Value::String("/share/wf-1/out.wav".to_string()));
        normalize_output(&mut output, &store, "wf-1", "ffmpeg.extract_audio", &[], true).await;
        assert!(output.contains_key("audio_path_minio_url"));
        assert!(!output.contains_key("audio_path_upload_error"));
    }

    #[tokio::test]
    async fn upload_retries_transient_failures() {
        let store = FlakyStore { fail_times: 2, calls: Arc::new(AtomicUsize::new(0)) };
        let calls = store.calls.clone();
        let mut output = BTreeMap::new();
        output.insert("audio_path".to_string(), Value::String("/share/wf-1/out.wav".to_string()));
        normalize_output(&mut output, &store, "wf-1", "ffmpeg.extract_audio", &[], true).await;
        assert!(output.contains_key("audio_path_minio_url"));
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn upload_failure_does_not_fail_the_stage() {
        let store = FlakyStore { fail_times: 100, calls: Arc::new(AtomicUsize::new(0)) };
        let mut output = BTreeMap::new();
        output.insert("audio_path".to_string(), Value::String("/share/wf-1/out.wav".to_string()));
        normalize_output(&mut output, &store, "wf-1", "ffmpeg.extract_audio", &[], true).await;
        assert!(output.contains_key("audio_path_upload_error"));
        assert!(!output.contains_key("audio_path_minio_url"));
    }

    #[tokio::test]
    async fn disabled_toggle_skips_uploads_entirely() {
        let store = FlakyStore { fail_times: 0, calls: Arc::new(AtomicUsize::new(0)) };
        let mut output = BTreeMap::new();
        output.insert("audio_path".to_string(), Value::String("/share/wf-1/out.wav".to_string()));
        normalize_output(&mut output, &store, "wf-1", "ffmpeg.extract_audio", &[], false).await;
        assert!(!output.contains_key("audio_path_minio_url"));
        assert!(!output.contains_key("audio_path_upload_error"));
    }

    #[tokio::test]
    async fn custom_path_field_without_path_suffix_is_uploaded() {
        let store = FlakyStore { fail_times: 0, calls: Arc::new(AtomicUsize::new(0)) };
        let mut output = BTreeMap::new();
        output.insert("thumbnail".to_string(), Value::String("/share/wf-1/thumb.png".to_string()));
        normalize_output(&mut output, &store, "wf-1", "ffmpeg.extract_audio", &["thumbnail".to_string()], true).await;
        assert!(output.contains_key("thumbnail_minio_url"));
    }
}
