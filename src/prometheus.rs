//! Prometheus instant-query client.
//!
//! One operation: run a PromQL instant query and reduce the result set to
//! (instance, value) samples. Values stay strings exactly as the store
//! returned them.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One sample from an instant query.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub instance: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    metric: HashMap<String, String>,
    /// Instant vector value: `[timestamp, "value"]`.
    value: (f64, String),
}

pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build prometheus http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run one instant query. Errors are non-fatal to the metric batch; the
    /// caller decides how to render them.
    pub async fn instant_query(&self, query: &str) -> Result<Vec<MetricSample>> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .context("prometheus query request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("prometheus response body read failed")?;
        if !status.is_success() {
            anyhow::bail!("prometheus returned status {}", status.as_u16());
        }
        parse_samples(&body)
    }
}

/// Reduce a query response body to (instance, value) samples. Missing
/// instance labels fall back to "unknown".
fn parse_samples(body: &str) -> Result<Vec<MetricSample>> {
    let payload: QueryResponse =
        serde_json::from_str(body).context("prometheus response was not valid JSON")?;
    if payload.status != "success" {
        anyhow::bail!("prometheus query status: {}", payload.status);
    }
    let data = payload.data.context("prometheus response missing data")?;
    Ok(data
        .result
        .into_iter()
        .map(|r| MetricSample {
            instance: r
                .metric
                .get("instance")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            value: r.value.1,
        })
        .collect())
}
