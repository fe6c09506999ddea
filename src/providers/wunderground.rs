use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

use super::AlertSource;
use crate::types::AlertRecord;

pub const DEFAULT_BASE_URL: &str = "http://api.wunderground.com";

pub struct WundergroundProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl WundergroundProvider {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Stormwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| anyhow!("Invalid Wunderground base URL '{}': {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid Wunderground base URL '{}'", base_url);
        }

        Ok(Self { base_url, client })
    }

    /// `{base}/api/{key}/alerts/q/{location}.json`. The key and every location
    /// segment are percent-encoded, so they can never leave the alerts path.
    fn alerts_url(&self, api_key: &str, location: &str) -> Result<Url> {
        let location = location.trim().replace(' ', "_");
        let mut segments: Vec<&str> = location
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .collect();
        let Some(last) = segments.pop() else {
            bail!("Location '{}' has no usable path segment", location);
        };
        let last = format!("{}.json", last);

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid Wunderground base URL '{}'", self.base_url))?
            .pop_if_empty()
            .extend(["api", api_key, "alerts", "q"])
            .extend(segments)
            .push(&last);
        Ok(url)
    }
}

#[async_trait]
impl AlertSource for WundergroundProvider {
    async fn fetch_alerts(&self, api_key: &str, location: &str) -> Result<Vec<AlertRecord>> {
        let response = self
            .client
            .get(self.alerts_url(api_key, location)?)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            bail!("Wunderground API error {}: {}", status, body);
        }

        let body: Value = response.json().await?;
        parse_alerts_response(body)
    }
}

/// Extracts alert records from an alerts response body. The upstream `type`
/// key is renamed to `alert_type` on every record.
pub fn parse_alerts_response(body: Value) -> Result<Vec<AlertRecord>> {
    if let Some(error) = body["response"].get("error") {
        let kind = error["type"].as_str().unwrap_or("unknown");
        let description = error["description"].as_str().unwrap_or("no description");
        bail!("Wunderground error {}: {}", kind, description);
    }

    let alerts = match body.get("alerts") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(alerts)) => alerts,
        Some(other) => bail!("Unexpected alerts field: {}", other),
    };

    alerts
        .iter()
        .map(|alert| {
            let mut fields = alert
                .as_object()
                .cloned()
                .ok_or_else(|| anyhow!("Alert is not an object: {}", alert))?;

            if let Some(kind) = fields.remove("type") {
                fields.insert("alert_type".to_string(), kind);
            }

            serde_json::from_value(Value::Object(fields))
                .map_err(|e| anyhow!("Malformed alert record: {}", e))
        })
        .collect()
}
