//! Directory search API client
//!
//! The engine only talks to `DirectoryApi`; `HttpDirectoryApi` is the
//! production implementation for a Places-style text search service.

use crate::config::DiscoveryConfig;
use crate::discovery::DiscoveryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Parameters of one text search request
///
/// Follow-up pages repeat every field of the first request and add `page_token`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<(f64, f64)>,
    pub radius_m: Option<u32>,
    pub region: Option<String>,
    pub page_token: Option<String>,
}

/// Status reported by the directory API for a search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Ok,
    ZeroResults,
    /// Returned while a continuation token is not yet usable
    InvalidRequest,
    /// Any other status (quota, denied, unknown); ends the run
    Other(String),
}

impl SearchStatus {
    pub fn from_api_string(s: &str) -> Self {
        match s {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "INVALID_REQUEST" => Self::InvalidRequest,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Other(s) => s,
        }
    }
}

/// A single hit from a text search page
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    /// Listing is a paid placement
    #[serde(default)]
    pub sponsored: bool,
}

/// One page of text search results
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub results: Vec<PlaceResult>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

/// Contact details for a single place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Abstraction over the external directory search service
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Fetches one page of text search results
    async fn text_search(&self, request: &SearchRequest) -> Result<SearchResponse, DiscoveryError>;

    /// Looks up website and contact details for a place
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, DiscoveryError>;
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<RawDetails>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    international_phone_number: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
}

/// HTTP implementation of `DirectoryApi`
pub struct HttpDirectoryApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpDirectoryApi {
    /// Creates a client for the endpoint described by `config`
    pub fn new(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, DiscoveryError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| DiscoveryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn text_search(&self, request: &SearchRequest) -> Result<SearchResponse, DiscoveryError> {
        let mut query: Vec<(&str, String)> = vec![("query", request.query.clone())];

        if let Some((lat, lng)) = request.location {
            query.push(("location", format!("{},{}", lat, lng)));
            if let Some(radius) = request.radius_m {
                query.push(("radius", radius.to_string()));
            }
        }
        if let Some(region) = &request.region {
            query.push(("region", region.clone()));
        }
        if let Some(token) = &request.page_token {
            query.push(("pagetoken", token.clone()));
        }
        query.push(("key", self.api_key.clone()));

        debug!(
            "Text search '{}' (page token: {})",
            request.query,
            request.page_token.is_some()
        );

        let raw: RawSearchResponse = self.get_json("textsearch/json", &query).await?;

        Ok(SearchResponse {
            status: SearchStatus::from_api_string(&raw.status),
            results: raw.results,
            next_page_token: raw.next_page_token,
            error_message: raw.error_message,
        })
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, DiscoveryError> {
        let query = vec![
            ("place_id", place_id.to_string()),
            (
                "fields",
                "website,formatted_phone_number,international_phone_number,formatted_address"
                    .to_string(),
            ),
            ("key", self.api_key.clone()),
        ];

        let raw: RawDetailsResponse = self.get_json("details/json", &query).await?;

        match SearchStatus::from_api_string(&raw.status) {
            SearchStatus::Ok => {}
            SearchStatus::ZeroResults => return Ok(PlaceDetails::default()),
            status => {
                return Err(DiscoveryError::TerminalStatus {
                    status: status.as_str().to_string(),
                    message: raw.error_message.unwrap_or_default(),
                })
            }
        }

        let details = raw.result.map(|r| PlaceDetails {
            website: r.website.filter(|w| !w.trim().is_empty()),
            phone: r.formatted_phone_number.or(r.international_phone_number),
            address: r.formatted_address,
        });

        Ok(details.unwrap_or_default())
    }
}
