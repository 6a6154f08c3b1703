//! Integration tests for the enrichment pipeline
//!
//! These tests use wiremock to stand in for the directory API and for lead
//! websites, and a stub render tier in place of Chromium.

use async_trait::async_trait;
use lead_prospector::config::{
    default_relevance_rules, default_technologies, DiscoveryConfig, ExtractionConfig, QueueConfig,
};
use lead_prospector::discovery::{DiscoveryEngine, DiscoveryRequest, HttpDirectoryApi};
use lead_prospector::enrichment::{
    AuditReport, EnrichmentError, IndexDocument, Indexer, IndexingError, IndexingRunner,
    PerformanceAudit, PhaseOrchestrator, TechnologyProfiler,
};
use lead_prospector::extraction::{
    ExtractionError, ExtractionTier, RenderTier, RenderedPage, TieredExtractor,
};
use lead_prospector::queue::{EnrichmentJob, EnrichmentQueue, JobHandler};
use lead_prospector::state::{EnrichmentStatus, JobStatus};
use lead_prospector::storage::{JobStore, LeadStore, NewLead, SharedStorage, SqliteStorage};
use lead_prospector::PipelineController;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHALLENGE_PAGE: &str = r#"<html><head><title>Just a moment...</title></head>
<body><div id="cf-challenge-running">Checking your browser</div></body></html>"#;

const RENDERED_PAGE: &str = r#"<html><head><title>Springfield Family Dentistry</title>
<meta name="viewport" content="width=device-width"></head>
<body><main><h1>Family Dentistry</h1><p>Gentle care for the whole family.</p></main>
<script src="https://code.jquery.com/jquery.min.js"></script></body></html>"#;

const SERVER_ERROR_PAGE: &str = r#"<html><head><title>500 Internal Server Error</title></head>
<body><h1>Internal Server Error</h1><p>Powered by nginx</p></body></html>"#;

const WORDPRESS_PAGE: &str = r#"<html><head><title>Smile Dental Studio</title>
<link rel="stylesheet" href="/wp-content/themes/smile/style.css"></head>
<body><nav>Home | Contact</nav><main><h1>Smile Dental Studio</h1>
<h2>Services</h2><p>Cleanings, whitening and implants in Springfield.</p></main></body></html>"#;

enum RenderOutcome {
    Html(&'static str),
    /// The browser loaded the page but the server answered with an error status
    Status(u16, &'static str),
    Fail(&'static str),
    Timeout,
}

/// Render tier with a fixed outcome that records when it was called
struct StubRenderer {
    outcome: RenderOutcome,
    calls: Mutex<Vec<Instant>>,
}

impl StubRenderer {
    fn new(outcome: RenderOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderTier for StubRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage, ExtractionError> {
        self.calls.lock().unwrap().push(Instant::now());
        match &self.outcome {
            RenderOutcome::Html(html) => Ok(RenderedPage::new(Some(200), *html)),
            RenderOutcome::Status(status, html) => Ok(RenderedPage::new(Some(*status), *html)),
            RenderOutcome::Fail(message) => Err(ExtractionError::Browser(message.to_string())),
            RenderOutcome::Timeout => Err(ExtractionError::BrowserTimeout(Duration::from_secs(30))),
        }
    }
}

struct NoAudit;

#[async_trait]
impl PerformanceAudit for NoAudit {
    async fn audit(&self, _url: &str) -> AuditReport {
        AuditReport::default()
    }
}

#[derive(Default)]
struct CollectingIndexer {
    lead_ids: Mutex<Vec<i64>>,
}

#[async_trait]
impl Indexer for CollectingIndexer {
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexingError> {
        self.lead_ids.lock().unwrap().push(document.lead_id);
        Ok(())
    }
}

fn extraction_config() -> ExtractionConfig {
    ExtractionConfig {
        fast_timeout_secs: 2,
        ..ExtractionConfig::default()
    }
}

/// Small delays so retries happen within the test
fn queue_config() -> QueueConfig {
    QueueConfig {
        workers: 2,
        max_attempts: 3,
        backoff_base_ms: 50,
        poll_interval_ms: 5,
    }
}

fn create_storage() -> SharedStorage {
    SharedStorage::new(SqliteStorage::new_in_memory().expect("Failed to open in-memory storage"))
}

fn create_queue(
    storage: &SharedStorage,
    renderer: Arc<StubRenderer>,
    indexer: Arc<CollectingIndexer>,
) -> (EnrichmentQueue, Arc<IndexingRunner>) {
    let extractor =
        TieredExtractor::new(&extraction_config(), renderer).expect("Failed to build extractor");
    let indexing = Arc::new(IndexingRunner::spawn(indexer));
    let orchestrator = PhaseOrchestrator::new(
        extractor,
        TechnologyProfiler::new(&default_technologies()),
        Arc::new(NoAudit),
        storage.clone(),
        Arc::clone(&indexing),
    );

    let queue = EnrichmentQueue::new(storage.clone(), Arc::new(orchestrator), queue_config());
    (queue, indexing)
}

fn insert_lead(storage: &SharedStorage, place_id: &str, website: &str) -> i64 {
    storage
        .with(|s| {
            s.insert_lead(&NewLead {
                place_id: place_id.to_string(),
                name: format!("Lead {}", place_id),
                types: vec!["dentist".to_string()],
                sponsored: false,
                address: None,
                phone: None,
                website: Some(website.to_string()),
                domain: None,
                status: EnrichmentStatus::Unprocessed,
            })
        })
        .expect("Failed to insert lead")
}

#[tokio::test]
async fn test_challenge_page_escalates_to_fallback() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string(CHALLENGE_PAGE))
        .expect(1)
        .mount(&site)
        .await;

    let renderer = StubRenderer::new(RenderOutcome::Html(RENDERED_PAGE));
    let extractor = TieredExtractor::new(&extraction_config(), renderer.clone())
        .expect("Failed to build extractor");

    let result = extractor
        .fetch(&format!("{}/", site.uri()))
        .await
        .expect("Fallback tier should succeed");

    assert_eq!(result.tier, ExtractionTier::Fallback);
    assert!(result.body.contains("Family Dentistry"));
    assert!(!result.signature.is_challenge());
    assert!(result.response_time_ms.is_some());
    assert_eq!(renderer.calls().len(), 1);
}

#[tokio::test]
async fn test_unreachable_host_fails_terminally_after_one_attempt() {
    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Fail("net::ERR_NAME_NOT_RESOLVED"));
    let (queue, indexing) = create_queue(&storage, renderer.clone(), Arc::default());

    let website = "http://no-such-dentist.invalid/";
    let lead_id = insert_lead(&storage, "p-dns", website);
    let job_id = queue.enqueue(lead_id, website).expect("Failed to enqueue");

    let report = queue.drain().await.expect("Drain should succeed");
    indexing.shutdown().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.retried, 0);
    assert_eq!(report.succeeded, 0);
    assert_eq!(renderer.calls().len(), 1);

    let job = storage.get_job(job_id).unwrap().expect("Job should be kept");
    assert_eq!(job.status, JobStatus::FailedTerminal);
    assert_eq!(job.attempt, 1);

    let lead = storage.find_by_key(lead_id).unwrap().unwrap();
    assert_eq!(lead.status, EnrichmentStatus::Failed);
    assert!(lead.error.unwrap().contains("ERR_NAME_NOT_RESOLVED"));
}

#[tokio::test]
async fn test_timeouts_retry_with_growing_backoff() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&site)
        .await;

    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Timeout);
    let (queue, indexing) = create_queue(&storage, renderer.clone(), Arc::default());

    let website = format!("{}/", site.uri());
    let lead_id = insert_lead(&storage, "p-slow", &website);
    let job_id = queue.enqueue(lead_id, &website).expect("Failed to enqueue");

    let report = queue.drain().await.expect("Drain should succeed");
    indexing.shutdown().await;

    assert_eq!(report.retried, 2);
    assert_eq!(report.failed, 1);

    let calls = renderer.calls();
    assert_eq!(calls.len(), 3);
    let first_gap = calls[1] - calls[0];
    let second_gap = calls[2] - calls[1];
    assert!(first_gap >= Duration::from_millis(50), "first gap {:?}", first_gap);
    assert!(second_gap >= Duration::from_millis(100), "second gap {:?}", second_gap);
    assert!(second_gap > first_gap);

    let job = storage.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::FailedTerminal);
    assert_eq!(job.attempt, 3);

    let lead = storage.find_by_key(lead_id).unwrap().unwrap();
    assert_eq!(lead.status, EnrichmentStatus::Failed);
    assert!(lead.error.is_some());
}

#[tokio::test]
async fn test_rendered_server_error_is_retried_not_completed() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string(SERVER_ERROR_PAGE))
        .expect(3)
        .mount(&site)
        .await;

    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Status(500, SERVER_ERROR_PAGE));
    let indexer = Arc::new(CollectingIndexer::default());
    let (queue, indexing) = create_queue(&storage, renderer.clone(), indexer.clone());

    let website = format!("{}/", site.uri());
    let lead_id = insert_lead(&storage, "p-500", &website);
    let job_id = queue.enqueue(lead_id, &website).expect("Failed to enqueue");

    let report = queue.drain().await.expect("Drain should succeed");
    indexing.shutdown().await;

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.retried, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(renderer.calls().len(), 3);

    let job = storage.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::FailedTerminal);
    assert_eq!(job.attempt, 3);

    let lead = storage.find_by_key(lead_id).unwrap().unwrap();
    assert_eq!(lead.status, EnrichmentStatus::Failed);
    assert!(lead.error.unwrap().contains("HTTP 500"));
    assert!(lead.content_markdown.is_none());
    assert!(indexer.lead_ids.lock().unwrap().is_empty());
}

/// Handler that tracks how many jobs per lead run at once
#[derive(Default)]
struct OverlapProbe {
    running: Mutex<HashMap<i64, usize>>,
    max_per_lead: Mutex<usize>,
}

#[async_trait]
impl JobHandler for OverlapProbe {
    async fn handle(&self, job: &EnrichmentJob) -> Result<(), EnrichmentError> {
        {
            let mut running = self.running.lock().unwrap();
            let count = running.entry(job.lead_id).or_insert(0);
            *count += 1;
            let mut max = self.max_per_lead.lock().unwrap();
            *max = (*max).max(*count);
        }

        tokio::time::sleep(Duration::from_millis(40)).await;

        let mut running = self.running.lock().unwrap();
        if let Some(count) = running.get_mut(&job.lead_id) {
            *count -= 1;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_jobs_for_one_lead_never_run_concurrently() {
    let storage = create_storage();
    let probe = Arc::new(OverlapProbe::default());
    let config = QueueConfig {
        workers: 4,
        ..queue_config()
    };
    let queue = EnrichmentQueue::new(storage.clone(), probe.clone(), config);

    let shared_lead = insert_lead(&storage, "p-shared", "https://shared.example/");
    let other_lead = insert_lead(&storage, "p-other", "https://other.example/");
    queue.enqueue(shared_lead, "https://shared.example/").unwrap();
    queue.enqueue(shared_lead, "https://shared.example/").unwrap();
    queue.enqueue(shared_lead, "https://shared.example/").unwrap();
    queue.enqueue(other_lead, "https://other.example/").unwrap();

    let report = queue.drain().await.expect("Drain should succeed");

    assert_eq!(report.succeeded, 4);
    assert_eq!(*probe.max_per_lead.lock().unwrap(), 1);
    assert_eq!(storage.count_active().unwrap(), 0);
}

/// Handler that records the peak number of jobs running at once
#[derive(Default)]
struct ConcurrencyGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl JobHandler for ConcurrencyGauge {
    async fn handle(&self, _job: &EnrichmentJob) -> Result<(), EnrichmentError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_worker_count_is_a_hard_ceiling() {
    let storage = create_storage();
    let gauge = Arc::new(ConcurrencyGauge::default());
    let config = QueueConfig {
        workers: 3,
        ..queue_config()
    };
    let queue = EnrichmentQueue::new(storage.clone(), gauge.clone(), config);

    for i in 0..20 {
        let website = format!("https://office-{}.example/", i);
        let lead_id = insert_lead(&storage, &format!("p-{}", i), &website);
        queue.enqueue(lead_id, &website).unwrap();
    }

    let report = queue.drain().await.expect("Drain should succeed");

    assert_eq!(report.succeeded, 20);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {}", peak);
    assert!(peak >= 2, "workers never overlapped");
    assert_eq!(storage.count_active().unwrap(), 0);
}

/// Mounts a directory with four dentists:
/// - p1 and p2 share site A's domain
/// - p3 has no website
/// - p4 is site B, behind a challenge page
async fn mount_directory(directory: &MockServer, site_a: &MockServer, site_b: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "dentist in Springfield"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [
                {"place_id": "p1", "name": "Smile Dental Studio", "types": ["dentist"]},
                {"place_id": "p2", "name": "Smile Dental Annex", "types": ["dentist"]},
                {"place_id": "p3", "name": "Dr. Walk-In Dental", "types": ["dentist"]},
                {"place_id": "p4", "name": "Springfield Family Dentistry", "types": ["dentist"], "sponsored": true}
            ]
        })))
        .mount(directory)
        .await;

    let websites = [
        ("p1", Some(site_a.uri())),
        ("p2", Some(format!("{}/annex?utm_source=maps", site_a.uri()))),
        ("p3", None),
        ("p4", Some(site_b.uri())),
    ];

    for (place_id, website) in websites {
        let mut result = json!({ "formatted_phone_number": "(217) 555-0100" });
        if let Some(website) = website {
            result["website"] = json!(website);
        }

        Mock::given(method("GET"))
            .and(path("/details/json"))
            .and(query_param("place_id", place_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": result
            })))
            .mount(directory)
            .await;
    }
}

#[tokio::test]
async fn test_campaign_end_to_end() {
    let directory = MockServer::start().await;
    let site_a = MockServer::start().await;
    let site_b = MockServer::start().await;
    mount_directory(&directory, &site_a, &site_b).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(WORDPRESS_PAGE))
        .mount(&site_a)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string(CHALLENGE_PAGE))
        .mount(&site_b)
        .await;

    let mut discovery_config = DiscoveryConfig::new(&directory.uri(), "test-key");
    discovery_config.page_retry_delay_ms = 10;
    let api = HttpDirectoryApi::new(&discovery_config).expect("Failed to create directory client");
    let discovery = DiscoveryEngine::new(Arc::new(api), &discovery_config, default_relevance_rules());

    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Html(RENDERED_PAGE));
    let indexer = Arc::new(CollectingIndexer::default());
    let (queue, indexing) = create_queue(&storage, renderer.clone(), indexer.clone());

    let controller =
        PipelineController::new(discovery, queue, storage.clone(), true).with_indexing(indexing);

    let report = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), true)
        .await
        .expect("Campaign should succeed");
    controller.shutdown().await;

    assert_eq!(report.discovered, 4);
    assert_eq!(report.ingest.enqueued, 2);
    assert_eq!(report.ingest.duplicate_domains, 1);
    assert_eq!(report.ingest.without_website, 1);
    let queue_report = report.queue.expect("Queue should have been drained");
    assert_eq!(queue_report.succeeded, 2);
    assert_eq!(queue_report.failed, 0);

    let studio = storage.find_by_place_id("p1").unwrap().expect("p1 stored");
    assert_eq!(studio.status, EnrichmentStatus::Completed);
    assert_eq!(studio.extraction_tier.as_deref(), Some("fast"));
    assert!(studio.technologies.contains(&"WordPress".to_string()));
    assert_eq!(studio.phone.as_deref(), Some("(217) 555-0100"));
    let audit = studio.audit.as_ref().expect("audit stored");
    assert_eq!(audit.title.as_deref(), Some("Smile Dental Studio"));
    assert_eq!(audit.h1_count, 1);
    let markdown = studio.content_markdown.as_deref().unwrap_or_default();
    assert!(markdown.contains("Smile Dental Studio"));
    assert!(!markdown.contains("Home | Contact"));

    // Same domain as p1, so never stored
    assert!(storage.find_by_place_id("p2").unwrap().is_none());

    let walk_in = storage.find_by_place_id("p3").unwrap().expect("p3 stored");
    assert_eq!(walk_in.status, EnrichmentStatus::NotFound);
    assert!(walk_in.website.is_none());

    let family = storage.find_by_place_id("p4").unwrap().expect("p4 stored");
    assert_eq!(family.status, EnrichmentStatus::Completed);
    assert_eq!(family.extraction_tier.as_deref(), Some("fallback"));
    assert!(family.sponsored);
    assert!(family.technologies.contains(&"jQuery".to_string()));
    assert_eq!(renderer.calls().len(), 1);

    let mut indexed = indexer.lead_ids.lock().unwrap().clone();
    indexed.sort_unstable();
    let mut expected = vec![studio.id, family.id];
    expected.sort_unstable();
    assert_eq!(indexed, expected);

    // A second run of the same campaign queues nothing new
    let rerun = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), false)
        .await
        .expect("Second campaign should succeed");

    assert_eq!(rerun.ingest.enqueued, 0);
    assert_eq!(rerun.ingest.requeued, 0);
    assert_eq!(rerun.ingest.skipped_existing, 3);
    assert_eq!(rerun.ingest.duplicate_domains, 1);
    assert!(rerun.queue.is_none());
    assert_eq!(storage.count_active().unwrap(), 0);
}

#[tokio::test]
async fn test_failed_lead_is_requeued_by_next_campaign() {
    let directory = MockServer::start().await;
    let site_a = MockServer::start().await;
    let site_b = MockServer::start().await;
    mount_directory(&directory, &site_a, &site_b).await;

    // Site A is down for the first campaign
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string(SERVER_ERROR_PAGE))
        .up_to_n_times(3)
        .mount(&site_a)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(WORDPRESS_PAGE))
        .mount(&site_a)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RENDERED_PAGE))
        .mount(&site_b)
        .await;

    let mut discovery_config = DiscoveryConfig::new(&directory.uri(), "test-key");
    discovery_config.page_retry_delay_ms = 10;
    let api = HttpDirectoryApi::new(&discovery_config).expect("Failed to create directory client");
    let discovery = DiscoveryEngine::new(Arc::new(api), &discovery_config, default_relevance_rules());

    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Status(500, SERVER_ERROR_PAGE));
    let (queue, indexing) = create_queue(&storage, renderer, Arc::default());
    let controller =
        PipelineController::new(discovery, queue, storage.clone(), true).with_indexing(indexing);

    let first = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), true)
        .await
        .expect("Campaign should succeed");
    let first_queue = first.queue.expect("drained");
    assert_eq!(first_queue.failed, 1);
    assert_eq!(first_queue.succeeded, 1);

    let studio = storage.find_by_place_id("p1").unwrap().unwrap();
    assert_eq!(studio.status, EnrichmentStatus::Failed);

    let second = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), true)
        .await
        .expect("Second campaign should succeed");
    controller.shutdown().await;

    assert_eq!(second.ingest.requeued, 1);
    assert_eq!(second.queue.expect("drained").succeeded, 1);

    let studio = storage.find_by_place_id("p1").unwrap().unwrap();
    assert_eq!(studio.status, EnrichmentStatus::Completed);
    assert!(studio.error.is_none());
}

#[tokio::test]
async fn test_details_outage_leaves_candidate_for_next_campaign() {
    let directory = MockServer::start().await;
    let site = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{"place_id": "p1", "name": "Smile Dental Studio", "types": ["dentist"]}]
        })))
        .mount(&directory)
        .await;

    // Mounted first so the outage answers the first lookup only
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "p1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&directory)
        .await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": { "website": site.uri() }
        })))
        .mount(&directory)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(WORDPRESS_PAGE))
        .mount(&site)
        .await;

    let discovery_config = DiscoveryConfig::new(&directory.uri(), "test-key");
    let api = HttpDirectoryApi::new(&discovery_config).expect("Failed to create directory client");
    let discovery = DiscoveryEngine::new(Arc::new(api), &discovery_config, default_relevance_rules());

    let storage = create_storage();
    let renderer = StubRenderer::new(RenderOutcome::Html(RENDERED_PAGE));
    let (queue, indexing) = create_queue(&storage, renderer, Arc::default());
    let controller =
        PipelineController::new(discovery, queue, storage.clone(), true).with_indexing(indexing);

    let first = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), true)
        .await
        .expect("Campaign should succeed");

    assert_eq!(first.ingest.details_failed, 1);
    assert_eq!(first.ingest.without_website, 0);
    assert_eq!(first.ingest.enqueued, 0);
    assert!(storage.find_by_place_id("p1").unwrap().is_none());

    let second = controller
        .run(DiscoveryRequest::new("dentist", "Springfield"), true)
        .await
        .expect("Second campaign should succeed");
    controller.shutdown().await;

    assert_eq!(second.ingest.enqueued, 1);
    assert_eq!(second.ingest.details_failed, 0);
    assert_eq!(second.queue.expect("drained").succeeded, 1);

    let lead = storage.find_by_place_id("p1").unwrap().expect("p1 stored");
    assert_eq!(lead.status, EnrichmentStatus::Completed);
    assert!(lead.website.is_some());
}
