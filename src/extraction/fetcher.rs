//! Fast-tier HTTP fetcher
//!
//! A single GET with browser-like headers and a short timeout. Transport
//! errors are classified here so the escalation and retry logic can work
//! with explicit failure kinds instead of error strings.

use crate::config::ExtractionConfig;
use crate::extraction::{ExtractionError, FetchFailure};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::Client;
use std::error::Error as StdError;
use std::time::{Duration, Instant};

/// Response received by the fast tier
#[derive(Debug, Clone)]
pub struct FastResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
    pub elapsed_ms: u64,
}

/// Lightweight HTTP fetcher for tier 1
pub struct FastFetcher {
    client: Client,
}

impl FastFetcher {
    /// Builds the fetcher's HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - Extraction configuration (user agent and fast timeout)
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fast_timeout_secs))
            .connect_timeout(Duration::from_secs(config.fast_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches `url` once
    ///
    /// Any status code is returned as a response; only transport failures
    /// become a `FetchFailure`.
    pub async fn fetch(&self, url: &str) -> Result<FastResponse, FetchFailure> {
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        Ok(FastResponse {
            status,
            final_url,
            body,
            elapsed_ms,
        })
    }
}

/// Maps a reqwest error onto a fetch failure kind
///
/// DNS resolution failures and refused connections are `Unreachable`; the
/// cause is found by walking the error's source chain.
pub(crate) fn classify_transport_error(error: &reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        return FetchFailure::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return FetchFailure::Unreachable("connection refused".to_string());
            }
            if io.kind() == std::io::ErrorKind::TimedOut {
                return FetchFailure::Timeout;
            }
        }

        let text = cause.to_string().to_lowercase();
        if is_unreachable_message(&text) {
            return FetchFailure::Unreachable(cause.to_string());
        }

        source = cause.source();
    }

    FetchFailure::Network(error.to_string())
}

pub(crate) fn is_unreachable_message(text: &str) -> bool {
    const PATTERNS: &[&str] = &[
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
        "connection refused",
    ];
    PATTERNS.iter().any(|p| text.contains(p))
}
