use crate::config::Config;
use crate::discovery::{
    Candidate, DirectoryApi, DiscoveryEngine, DiscoveryError, DiscoveryOutput, DiscoveryReport,
    DiscoveryRequest, HttpDirectoryApi, PlaceDetails,
};
use crate::enrichment::{
    indexer_from_config, IndexingRunner, PageSpeedClient, PhaseOrchestrator, TechnologyProfiler,
};
use crate::extraction::{ChromiumRenderer, TieredExtractor};
use crate::queue::{EnrichmentQueue, QueueReport};
use crate::state::EnrichmentStatus;
use crate::storage::{open_storage, JobStore, LeadStore, NewLead, SharedStorage};
use crate::url::{extract_domain, normalize_website};
use crate::ProspectError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to the candidates of one discovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// New leads stored and queued for enrichment
    pub enqueued: usize,
    /// Known leads that had never been enriched, or had failed, queued again
    pub requeued: usize,
    /// Known leads that are pending, completed, or without a website
    pub skipped_existing: usize,
    /// New candidates whose website domain is already taken
    pub duplicate_domains: usize,
    /// New candidates stored as `not_found`
    pub without_website: usize,
    /// New candidates left unstored because their details lookup failed
    pub details_failed: usize,
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub discovery: DiscoveryReport,
    pub discovered: usize,
    pub ingest: IngestReport,
    /// Present when the queue was drained as part of the run
    pub queue: Option<QueueReport>,
}

/// Top-level coordinator: discover → dedup → enqueue → drain
pub struct PipelineController {
    discovery: DiscoveryEngine,
    queue: EnrichmentQueue,
    storage: SharedStorage,
    fetch_details: bool,
    indexing: Option<Arc<IndexingRunner>>,
}

impl PipelineController {
    pub fn new(
        discovery: DiscoveryEngine,
        queue: EnrichmentQueue,
        storage: SharedStorage,
        fetch_details: bool,
    ) -> Self {
        Self {
            discovery,
            queue,
            storage,
            fetch_details,
            indexing: None,
        }
    }

    /// Attaches the indexing runner stopped by `shutdown`
    pub fn with_indexing(mut self, indexing: Arc<IndexingRunner>) -> Self {
        self.indexing = Some(indexing);
        self
    }

    /// Wires the production collaborators described by `config`
    ///
    /// Must be called from within a Tokio runtime; the indexing runner task is
    /// spawned here.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineController)` - Ready to run
    /// * `Err(ProspectError)` - The database or an HTTP client could not be set up
    pub fn from_config(config: &Config) -> Result<Self, ProspectError> {
        let storage = SharedStorage::new(open_storage(Path::new(&config.storage.database_path))?);

        let api: Arc<dyn DirectoryApi> = Arc::new(HttpDirectoryApi::new(&config.discovery)?);
        let discovery = DiscoveryEngine::new(api, &config.discovery, config.relevance.clone());

        let renderer = Arc::new(ChromiumRenderer::new(&config.extraction));
        let extractor = TieredExtractor::new(&config.extraction, renderer)?;
        let profiler = TechnologyProfiler::new(&config.profiling.technologies);
        let performance = Arc::new(PageSpeedClient::new(&config.profiling)?);
        let indexing = Arc::new(IndexingRunner::spawn(indexer_from_config(&config.indexing)?));

        let orchestrator = PhaseOrchestrator::new(
            extractor,
            profiler,
            performance,
            storage.clone(),
            Arc::clone(&indexing),
        );
        let queue = EnrichmentQueue::new(
            storage.clone(),
            Arc::new(orchestrator),
            config.queue.clone(),
        );

        Ok(Self::new(discovery, queue, storage, config.discovery.fetch_details).with_indexing(indexing))
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Runs discovery only; nothing is stored or queued
    pub async fn discover(&self, request: DiscoveryRequest) -> Result<DiscoveryOutput, ProspectError> {
        Ok(self.discovery.discover(request).await?)
    }

    /// Runs a campaign: discovery, ingestion, and optionally a full drain
    pub async fn run(
        &self,
        request: DiscoveryRequest,
        drain: bool,
    ) -> Result<PipelineReport, ProspectError> {
        info!(
            "Starting campaign '{}' in '{}' (max {} results)",
            request.keyword, request.location, request.max_results
        );

        let output = self.discovery.discover(request).await?;
        info!(
            "Discovered {} candidates ({})",
            output.candidates.len(),
            output.report.stop_reason
        );

        let ingest = self.ingest(&output.candidates).await?;
        info!(
            "Ingested: {} enqueued, {} requeued, {} existing, {} duplicate domains, {} without website, {} details failed",
            ingest.enqueued,
            ingest.requeued,
            ingest.skipped_existing,
            ingest.duplicate_domains,
            ingest.without_website,
            ingest.details_failed
        );

        let queue = if drain {
            Some(self.drain().await?)
        } else {
            None
        };

        Ok(PipelineReport {
            discovered: output.candidates.len(),
            discovery: output.report,
            ingest,
            queue,
        })
    }

    /// Stores and enqueues candidates
    ///
    /// A candidate is queued at most once per place id and at most once per
    /// normalized website domain, across this batch and the store.
    pub async fn ingest(&self, candidates: &[Candidate]) -> Result<IngestReport, ProspectError> {
        let mut report = IngestReport::default();
        let mut seen_domains: HashSet<String> = HashSet::new();

        for candidate in candidates {
            if let Some(lead) = self.storage.find_by_place_id(&candidate.place_id)? {
                let requeue = match lead.website.as_deref() {
                    Some(website) if lead.status.is_enqueueable() => {
                        if self.storage.has_active_job(lead.id)? {
                            None
                        } else {
                            Some(website.to_string())
                        }
                    }
                    _ => None,
                };

                match requeue {
                    Some(website) => {
                        self.queue.enqueue(lead.id, &website)?;
                        if let Some(domain) = lead.domain {
                            seen_domains.insert(domain);
                        }
                        report.requeued += 1;
                    }
                    None => {
                        debug!("Skipping known lead {} ({})", lead.id, lead.status);
                        report.skipped_existing += 1;
                    }
                }
                continue;
            }

            // Not stored, so the next campaign treats it as new and asks again
            let details = match self.details(&candidate.place_id).await {
                Ok(details) => details,
                Err(e) => {
                    warn!("Details lookup failed for {}: {}", candidate.place_id, e);
                    report.details_failed += 1;
                    continue;
                }
            };
            let website = details.website.as_deref().and_then(|raw| match normalize_website(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Ignoring website '{}' of '{}': {}", raw, candidate.name, e);
                    None
                }
            });
            let domain = website.as_ref().and_then(extract_domain);

            let (website, domain) = match (website, domain) {
                (Some(website), Some(domain)) => (website, domain),
                _ => {
                    self.storage.with(|s| {
                        s.insert_lead(&new_lead(candidate, &details, None, None, EnrichmentStatus::NotFound))
                    })?;
                    report.without_website += 1;
                    continue;
                }
            };

            if seen_domains.contains(&domain) || self.storage.find_by_domain(&domain)?.is_some() {
                debug!("Skipping '{}': domain {} already known", candidate.name, domain);
                report.duplicate_domains += 1;
                continue;
            }

            let lead_id = self.storage.with(|s| {
                s.insert_lead(&new_lead(
                    candidate,
                    &details,
                    Some(website.to_string()),
                    Some(domain.clone()),
                    EnrichmentStatus::Unprocessed,
                ))
            })?;
            self.queue.enqueue(lead_id, website.as_str())?;
            seen_domains.insert(domain);
            report.enqueued += 1;
        }

        Ok(report)
    }

    /// Processes the queue until it is empty
    pub async fn drain(&self) -> Result<QueueReport, ProspectError> {
        self.queue.drain().await
    }

    /// Flushes pending indexing work
    pub async fn shutdown(&self) {
        if let Some(indexing) = &self.indexing {
            indexing.shutdown().await;
        }
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails, DiscoveryError> {
        if !self.fetch_details {
            return Ok(PlaceDetails::default());
        }
        self.discovery.api().place_details(place_id).await
    }
}

fn new_lead(
    candidate: &Candidate,
    details: &PlaceDetails,
    website: Option<String>,
    domain: Option<String>,
    status: EnrichmentStatus,
) -> NewLead {
    NewLead {
        place_id: candidate.place_id.clone(),
        name: candidate.name.clone(),
        types: candidate.types.clone(),
        sponsored: candidate.sponsored,
        address: details.address.clone().or_else(|| candidate.address.clone()),
        phone: details.phone.clone(),
        website,
        domain,
        status,
    }
}
