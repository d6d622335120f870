use anyhow::Context;
use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_fields, output_success};
use crate::cli::OutputFormat;

/// GET {url}/api/health and report the store status
pub async fn ping(url: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let endpoint = format!("{}/api/health", url.trim_end_matches('/'));
    let client = reqwest::Client::new();

    let response = client
        .get(&endpoint)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", endpoint))?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        output_error(&output_format, &format!("{} returned {}", endpoint, status))?;
        anyhow::bail!("server unhealthy");
    }

    let store = body["data"]["store"].as_str().unwrap_or("unknown").to_string();
    if let OutputFormat::Text = output_format {
        output_fields(&[("url", endpoint.clone()), ("store", store.clone())]);
    }
    output_success(&output_format, "Server is healthy", Some(json!({ "url": endpoint, "store": store })))
}
