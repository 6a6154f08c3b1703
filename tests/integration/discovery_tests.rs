//! Integration tests for discovery
//!
//! These tests run the discovery engine against a wiremock directory API and
//! check pagination, the continuation-token ladder, and the stop conditions.

use lead_prospector::config::{default_relevance_rules, DiscoveryConfig};
use lead_prospector::discovery::{
    DiscoveryEngine, DiscoveryError, DiscoveryRequest, HttpDirectoryApi, StopReason,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates an engine pointed at the mock server with a short retry ladder
fn create_engine(server: &MockServer) -> DiscoveryEngine {
    let mut config = DiscoveryConfig::new(&server.uri(), "test-key");
    config.page_retry_delay_ms = 10;
    config.max_page_attempts = 3;

    let api = HttpDirectoryApi::new(&config).expect("Failed to create directory client");
    DiscoveryEngine::new(Arc::new(api), &config, default_relevance_rules())
}

/// Builds `count` dentist listings with ids `{prefix}-0..`
fn dentists(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "place_id": format!("{}-{}", prefix, i),
                "name": format!("Springfield Dental {} {}", prefix, i),
                "types": ["dentist", "health"],
                "formatted_address": format!("{} Main St, Springfield", i + 1)
            })
        })
        .collect()
}

fn page(results: Vec<Value>, next_page_token: Option<&str>) -> ResponseTemplate {
    let mut body = json!({ "status": "OK", "results": results });
    if let Some(token) = next_page_token {
        body["next_page_token"] = json!(token);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

fn status(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": status, "results": [] }))
}

/// Mounts the first page (no page token) for "dentist in Springfield"
async fn mount_first_page(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "dentist in Springfield"))
        .and(query_param_is_missing("pagetoken"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stops_at_max_results_across_pages() {
    let server = MockServer::start().await;

    mount_first_page(&server, page(dentists("a", 20), Some("tok-1"))).await;

    // Follow-up pages repeat the original query alongside the token
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "dentist in Springfield"))
        .and(query_param("pagetoken", "tok-1"))
        .and(query_param("key", "test-key"))
        .respond_with(page(dentists("b", 20), Some("tok-2")))
        .expect(1)
        .mount(&server)
        .await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield").with_max_results(25))
        .await
        .expect("Discovery should succeed");

    assert_eq!(output.candidates.len(), 25);
    assert_eq!(output.report.pages_fetched, 2);
    assert_eq!(output.report.stop_reason, StopReason::MaxResults);
    assert!(!output.report.below_minimum);

    // Page order is preserved: all of page one, then the head of page two
    assert_eq!(output.candidates[0].place_id, "a-0");
    assert_eq!(output.candidates[19].place_id, "a-19");
    assert_eq!(output.candidates[24].place_id, "b-4");

    // The third page is never requested
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_immature_token_is_retried_until_valid() {
    let server = MockServer::start().await;

    mount_first_page(&server, page(dentists("a", 20), Some("tok-1"))).await;

    // Mounted first so it wins while it still has uses left
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("pagetoken", "tok-1"))
        .respond_with(status("INVALID_REQUEST"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("pagetoken", "tok-1"))
        .respond_with(page(dentists("b", 10), None))
        .expect(1)
        .mount(&server)
        .await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield"))
        .await
        .expect("Discovery should succeed");

    assert_eq!(output.candidates.len(), 30);
    assert_eq!(output.report.pages_fetched, 2);
    assert_eq!(output.report.stop_reason, StopReason::NoMorePages);
    assert_eq!(output.candidates[29].place_id, "b-9");
}

#[tokio::test]
async fn test_exhausted_ladder_keeps_prior_candidates() {
    let server = MockServer::start().await;

    mount_first_page(&server, page(dentists("a", 20), Some("tok-1"))).await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("pagetoken", "tok-1"))
        .respond_with(status("INVALID_REQUEST"))
        .expect(3)
        .mount(&server)
        .await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield").with_min_results(25))
        .await
        .expect("An exhausted ladder is not an error");

    assert_eq!(output.candidates.len(), 20);
    assert_eq!(output.report.pages_fetched, 1);
    assert_eq!(output.report.stop_reason, StopReason::LadderExhausted);
    assert!(output.report.below_minimum);
}

#[tokio::test]
async fn test_zero_results_is_empty_not_error() {
    let server = MockServer::start().await;

    mount_first_page(&server, status("ZERO_RESULTS")).await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield"))
        .await
        .expect("Zero results should not be an error");

    assert!(output.candidates.is_empty());
    assert_eq!(output.report.pages_fetched, 0);
    assert_eq!(output.report.stop_reason, StopReason::ZeroResults);
}

#[tokio::test]
async fn test_first_page_http_error_propagates() {
    let server = MockServer::start().await;

    mount_first_page(&server, ResponseTemplate::new(500)).await;

    let engine = create_engine(&server);
    let result = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield"))
        .await;

    assert!(matches!(result, Err(DiscoveryError::Http(500))));
}

#[tokio::test]
async fn test_terminal_status_after_first_page_keeps_results() {
    let server = MockServer::start().await;

    mount_first_page(&server, page(dentists("a", 20), Some("tok-1"))).await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("pagetoken", "tok-1"))
        .respond_with(status("OVER_QUERY_LIMIT"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield"))
        .await
        .expect("Partial results should be returned");

    assert_eq!(output.candidates.len(), 20);
    assert_eq!(
        output.report.stop_reason,
        StopReason::TerminalStatus("OVER_QUERY_LIMIT".to_string())
    );
}

#[tokio::test]
async fn test_contaminated_and_repeated_results_are_dropped() {
    let server = MockServer::start().await;

    let mut results = dentists("a", 3);
    results.push(json!({
        "place_id": "law-1",
        "name": "Springfield Injury Lawyers",
        "types": ["lawyer"]
    }));
    results.push(json!({
        "place_id": "a-1",
        "name": "Springfield Dental a 1",
        "types": ["dentist"]
    }));
    mount_first_page(&server, page(results, None)).await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "Springfield"))
        .await
        .expect("Discovery should succeed");

    let ids: Vec<&str> = output.candidates.iter().map(|c| c.place_id.as_str()).collect();
    assert_eq!(ids, vec!["a-0", "a-1", "a-2"]);
    assert_eq!(output.report.filtered, 1);
    assert_eq!(output.report.duplicates, 1);
}

#[tokio::test]
async fn test_coordinates_travel_as_location_bias() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "dentist"))
        .and(query_param("location", "39.78,-89.65"))
        .and(query_param("radius", "5000"))
        .respond_with(page(dentists("a", 2), None))
        .expect(1)
        .mount(&server)
        .await;

    let engine = create_engine(&server);
    let output = engine
        .discover(DiscoveryRequest::new("dentist", "39.78,-89.65").with_radius(5000))
        .await
        .expect("Discovery should succeed");

    assert_eq!(output.candidates.len(), 2);
}
