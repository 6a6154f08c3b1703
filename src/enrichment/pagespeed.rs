//! Third-party performance audit
//!
//! Talks to a PageSpeed Insights style endpoint. Audit failures never abort
//! enrichment; they degrade to an empty report.

use crate::config::ProfilingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Metrics returned by a performance audit; absent fields are unknown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    /// Performance score scaled to 0..=100
    pub performance_score: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub time_to_first_byte_ms: Option<f64>,
}

#[async_trait]
pub trait PerformanceAudit: Send + Sync {
    async fn audit(&self, url: &str) -> AuditReport;
}

/// HTTP client for the PageSpeed Insights API
pub struct PageSpeedClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    strategy: String,
}

impl PageSpeedClient {
    pub fn new(config: &ProfilingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.pagespeed_url.clone(),
            api_key: config.api_key.clone(),
            strategy: config.strategy.clone(),
        })
    }

    async fn request(&self, url: &str) -> Result<Value, String> {
        let mut query = vec![
            ("url", url.to_string()),
            ("strategy", self.strategy.clone()),
            ("category", "performance".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PerformanceAudit for PageSpeedClient {
    async fn audit(&self, url: &str) -> AuditReport {
        match self.request(url).await {
            Ok(body) => parse_report(&body),
            Err(e) => {
                warn!(url = %url, error = %e, "Performance audit failed");
                AuditReport::default()
            }
        }
    }
}

/// Extracts the report fields from a Lighthouse result
fn parse_report(body: &Value) -> AuditReport {
    let lighthouse = &body["lighthouseResult"];
    let audit_value = |name: &str| lighthouse["audits"][name]["numericValue"].as_f64();

    AuditReport {
        performance_score: lighthouse["categories"]["performance"]["score"]
            .as_f64()
            .map(|score| (score * 100.0).round()),
        largest_contentful_paint_ms: audit_value("largest-contentful-paint"),
        time_to_first_byte_ms: audit_value("server-response-time"),
    }
}
