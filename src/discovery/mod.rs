//! Discovery module for Lead Prospector
//!
//! This module harvests business candidates from a paginated directory
//! search API:
//! - `client`: the `DirectoryApi` abstraction and its HTTP implementation
//! - `relevance`: cross-domain contamination filter
//! - `engine`: the paginated discovery run and its continuation-token ladder

mod client;
mod engine;
mod relevance;

pub use client::{
    DirectoryApi, HttpDirectoryApi, PlaceDetails, PlaceResult, SearchRequest, SearchResponse,
    SearchStatus,
};
pub use engine::{DiscoveryEngine, DiscoveryOutput, DiscoveryReport, DiscoveryRun, StopReason};
pub use relevance::RelevanceFilter;

use thiserror::Error;

/// Errors that can occur while talking to the directory API
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Directory API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Directory API returned HTTP {0}")]
    Http(u16),

    #[error("Failed to decode directory API response: {0}")]
    Decode(String),

    #[error("Directory API rejected the request: {0}")]
    InvalidRequest(String),

    #[error("Directory API returned {status}: {message}")]
    TerminalStatus { status: String, message: String },

    #[error("Invalid discovery request: {0}")]
    InvalidInput(String),
}

/// A business listing harvested from one search page
///
/// Immutable once created; consumed once by the pipeline controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// External place identifier, unique per directory
    pub place_id: String,
    pub name: String,
    pub types: Vec<String>,
    /// Paid placement in the directory results
    pub sponsored: bool,
    pub address: Option<String>,
}

impl From<PlaceResult> for Candidate {
    fn from(place: PlaceResult) -> Self {
        Self {
            place_id: place.place_id,
            name: place.name,
            types: place.types,
            sponsored: place.sponsored,
            address: place.formatted_address,
        }
    }
}

/// Parameters of one discovery campaign
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub keyword: String,
    /// Free-text place name, or raw "lat,lng" coordinates
    pub location: String,
    pub radius_m: Option<u32>,
    /// Below this many candidates the run is reported as short; it never forces more pages
    pub min_results: usize,
    pub max_results: usize,
    /// Region bias hint (ccTLD), e.g. "us"
    pub region: Option<String>,
}

impl DiscoveryRequest {
    pub fn new(keyword: &str, location: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            location: location.to_string(),
            radius_m: None,
            min_results: 0,
            max_results: 60,
            region: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_min_results(mut self, min_results: usize) -> Self {
        self.min_results = min_results;
        self
    }

    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = Some(radius_m);
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Parses the location as "lat,lng" when it is raw coordinates
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let (lat, lng) = self.location.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;

        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            Some((lat, lng))
        } else {
            None
        }
    }

    /// Builds the first-page search request
    ///
    /// The keyword is searched "in" a named location; with raw coordinates the
    /// keyword is sent alone and the coordinates travel as location bias.
    pub fn to_search_request(&self) -> SearchRequest {
        let keyword = self.keyword.trim();
        let location = self.location.trim();
        let coordinates = self.coordinates();

        let query = match coordinates {
            Some(_) => keyword.to_string(),
            None if location.is_empty() => keyword.to_string(),
            None => format!("{} in {}", keyword, location),
        };

        SearchRequest {
            query,
            location: coordinates,
            radius_m: coordinates.and(self.radius_m),
            region: self.region.clone().filter(|r| !r.trim().is_empty()),
            page_token: None,
        }
    }
}
