//! CLI command implementations: thin `reqwest` calls against the
//! orchestration API's HTTP surface (spec §6).

use anyhow::{Context, Result};
use serde_json::{json, Value};

/// `POST /v1/workflows` with `execution_mode=full`.
pub async fn create(api_url: &str, video_path: &str, workflow_chain: Vec<String>) -> Result<()> {
    let body = json!({
        "execution_mode": "full",
        "video_path": video_path,
        "workflow_config": { "workflow_chain": workflow_chain },
    });
    let response = submit(api_url, body).await?;
    print_response(&response);
    Ok(())
}

/// `GET /v1/workflows/status/{workflow_id}`.
pub async fn status(api_url: &str, workflow_id: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/v1/workflows/status/{}", api_url.trim_end_matches('/'), workflow_id);
    let response = client.get(url).send().await.context("failed to reach the orchestration API")?;
    let status = response.status();
    let body: Value = response.json().await.context("failed to parse response body")?;
    if status.is_success() {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        anyhow::bail!("workflow status request failed ({status}): {body}");
    }
    Ok(())
}

/// `POST /v1/workflows` with `execution_mode=retry`.
pub async fn retry(
    api_url: &str,
    workflow_id: &str,
    workflow_chain: Vec<String>,
    param_merge_strategy: &str,
) -> Result<()> {
    let body = json!({
        "execution_mode": "retry",
        "workflow_id": workflow_id,
        "param_merge_strategy": param_merge_strategy,
        "workflow_config": { "workflow_chain": workflow_chain },
    });
    let response = submit(api_url, body).await?;
    print_response(&response);
    Ok(())
}

async fn submit(api_url: &str, body: Value) -> Result<Value> {
    let client = reqwest::Client::new();
    let url = format!("{}/v1/workflows", api_url.trim_end_matches('/'));
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .context("failed to reach the orchestration API")?;
    let status = response.status();
    let body: Value = response.json().await.context("failed to parse response body")?;
    if status.is_success() {
        Ok(body)
    } else {
        anyhow::bail!("workflow request failed ({status}): {body}")
    }
}

fn print_response(response: &Value) {
    println!("{}", serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string()));
}
