//! Secret redaction for input-parameter snapshots (spec §4.4 step 6).

use std::collections::BTreeMap;

use serde_json::Value;

const SECRET_MARKERS: &[&str] = &["api_key", "token", "password", "secret"];

fn looks_like_secret(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    SECRET_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Mask fields whose names contain `api_key`, `token`, `password`, or
/// `secret` (case-insensitive substring match) before the snapshot is
/// recorded on a `StageExecution`.
pub fn redact(params: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    params
        .iter()
        .map(|(k, v)| {
            if looks_like_secret(k) {
                (k.clone(), Value::String("***".to_string()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_known_secret_shaped_keys() {
        let mut params = BTreeMap::new();
        params.insert("api_key".to_string(), Value::String("sk-live-abc".to_string()));
        params.insert("auth_token".to_string(), Value::String("xyz".to_string()));
        params.insert("db_password".to_string(), Value::String("hunter2".to_string()));
        params.insert("client_secret".to_string(), Value::String("shh".to_string()));
        params.insert("video_path".to_string(), Value::String("/in/v.mp4".to_string()));

        let redacted = redact(&params);
        assert_eq!(redacted["api_key"], Value::String("***".to_string()));
        assert_eq!(redacted["auth_token"], Value::String("***".to_string()));
        assert_eq!(redacted["db_password"], Value::String("***".to_string()));
        assert_eq!(redacted["client_secret"], Value::String("***".to_string()));
        assert_eq!(redacted["video_path"], Value::String("/in/v.mp4".to_string()));
    }

    #[test]
    fn case_insensitive_match() {
        let mut params = BTreeMap::new();
        params.insert("API_KEY".to_string(), Value::String("sk-live-abc".to_string()));
        let redacted = redact(&params);
        assert_eq!(redacted["API_KEY"], Value::String("***".to_string()));
    }
}
