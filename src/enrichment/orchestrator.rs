use crate::enrichment::{
    audit_document, synthesize_markdown, EnrichmentError, IndexDocument, IndexingRunner,
    PerformanceAudit, TechnologyProfiler,
};
use crate::extraction::TieredExtractor;
use crate::state::EnrichmentStatus;
use crate::storage::{EnrichmentJob, Lead, LeadStore, PerformanceMetrics, SharedStorage};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the enrichment phases for one job
///
/// Phases run strictly in order: extract, audit and synthesize, profile,
/// consolidate. An error in any phase before consolidation aborts the attempt
/// and leaves the lead untouched; the queue decides what happens next.
pub struct PhaseOrchestrator {
    extractor: TieredExtractor,
    profiler: TechnologyProfiler,
    performance: Arc<dyn PerformanceAudit>,
    storage: SharedStorage,
    indexing: Arc<IndexingRunner>,
}

impl PhaseOrchestrator {
    pub fn new(
        extractor: TieredExtractor,
        profiler: TechnologyProfiler,
        performance: Arc<dyn PerformanceAudit>,
        storage: SharedStorage,
        indexing: Arc<IndexingRunner>,
    ) -> Self {
        Self {
            extractor,
            profiler,
            performance,
            storage,
            indexing,
        }
    }

    /// Enriches the lead targeted by `job`
    ///
    /// # Returns
    ///
    /// * `Ok(Lead)` - The consolidated lead, already saved as completed
    /// * `Err(EnrichmentError)` - The phase error, for classification
    pub async fn enrich(&self, job: &EnrichmentJob) -> Result<Lead, EnrichmentError> {
        let mut lead = self
            .storage
            .find_by_key(job.lead_id)?
            .ok_or(EnrichmentError::LeadNotFound(job.lead_id))?;

        // Phase 1: extract
        let extraction = self.extractor.fetch(&job.url).await?;
        debug!(
            lead_id = lead.id,
            tier = %extraction.tier,
            bytes = extraction.body.len(),
            "Document extracted"
        );

        // Phase 2: structural audit and content synthesis
        let audit = audit_document(&extraction.body);
        let markdown = synthesize_markdown(&extraction.body)?;

        // Phase 3: profiling
        let technologies = self.profiler.detect(&extraction.body);
        let report = self.performance.audit(&job.url).await;

        // Phase 4: consolidation
        lead.technologies = technologies;
        lead.performance = Some(PerformanceMetrics {
            response_time_ms: extraction.response_time_ms,
            performance_score: report.performance_score,
            largest_contentful_paint_ms: report.largest_contentful_paint_ms,
            time_to_first_byte_ms: report.time_to_first_byte_ms,
        });
        lead.audit = Some(audit);
        lead.content_markdown = Some(markdown);
        lead.extraction_tier = Some(extraction.tier.as_str().to_string());
        lead.status = EnrichmentStatus::Completed;
        lead.error = None;
        lead.enriched_at = Some(Utc::now().to_rfc3339());

        self.storage.with(|s| s.save(&lead))?;

        info!(
            lead_id = lead.id,
            name = %lead.name,
            tier = %extraction.tier,
            technologies = lead.technologies.len(),
            "Lead enriched"
        );

        self.indexing.submit(IndexDocument {
            lead_id: lead.id,
            place_id: lead.place_id.clone(),
            name: lead.name.clone(),
            website: lead.website.clone(),
            domain: lead.domain.clone(),
            title: lead.audit.as_ref().and_then(|a| a.title.clone()),
            technologies: lead.technologies.clone(),
            content: lead.content_markdown.clone().unwrap_or_default(),
        });

        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_technologies, ExtractionConfig};
    use crate::enrichment::{AuditReport, IndexingError, Indexer};
    use crate::extraction::{ExtractionError, RenderTier, RenderedPage};
    use crate::storage::{JobStore, NewLead, SqliteStorage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NoRenderer;

    #[async_trait]
    impl RenderTier for NoRenderer {
        async fn render(&self, _url: &str) -> Result<RenderedPage, ExtractionError> {
            Err(ExtractionError::Browser("net::ERR_CONNECTION_REFUSED".to_string()))
        }
    }

    struct FixedAudit;

    #[async_trait]
    impl PerformanceAudit for FixedAudit {
        async fn audit(&self, _url: &str) -> AuditReport {
            AuditReport {
                performance_score: Some(72.0),
                largest_contentful_paint_ms: Some(3100.0),
                time_to_first_byte_ms: None,
            }
        }
    }

    #[derive(Default)]
    struct CollectingIndexer {
        documents: Mutex<Vec<IndexDocument>>,
    }

    #[async_trait]
    impl Indexer for CollectingIndexer {
        async fn index(&self, document: &IndexDocument) -> Result<(), IndexingError> {
            self.documents.lock().unwrap().push(document.clone());
            Ok(())
        }
    }

    fn setup(url: &str) -> (PhaseOrchestrator, SharedStorage, Arc<CollectingIndexer>, EnrichmentJob) {
        let storage = SharedStorage::new(SqliteStorage::new_in_memory().unwrap());
        let lead_id = storage
            .with(|s| {
                s.insert_lead(&NewLead {
                    place_id: "p1".to_string(),
                    name: "Smile Co".to_string(),
                    types: vec!["dentist".to_string()],
                    sponsored: false,
                    address: None,
                    phone: None,
                    website: Some(url.to_string()),
                    domain: Some("smile.example".to_string()),
                    status: EnrichmentStatus::Pending,
                })
            })
            .unwrap();
        let job_id = storage.with(|s| s.enqueue(lead_id, url, 3)).unwrap();
        let job = storage
            .with(|s| s.claim_next())
            .unwrap()
            .filter(|j| j.id == job_id)
            .unwrap();

        let config = ExtractionConfig {
            fast_timeout_secs: 2,
            ..ExtractionConfig::default()
        };
        let extractor = TieredExtractor::new(&config, Arc::new(NoRenderer)).unwrap();
        let indexer = Arc::new(CollectingIndexer::default());
        let runner = Arc::new(IndexingRunner::spawn(indexer.clone()));

        let orchestrator = PhaseOrchestrator::new(
            extractor,
            TechnologyProfiler::new(&default_technologies()),
            Arc::new(FixedAudit),
            storage.clone(),
            runner,
        );

        (orchestrator, storage, indexer, job)
    }

    #[tokio::test]
    async fn test_enrich_consolidates_lead() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><title>Smile Co</title>
                <meta name="description" content="Dentist in Springfield">
                <script src="https://cdn.shopify.com/s/app.js"></script></head>
                <body><main><h1>Smile Co</h1><p>Family dentistry.</p></main></body></html>"#,
            ))
            .mount(&server)
            .await;

        let (orchestrator, storage, indexer, job) = setup(&server.uri());
        let lead = orchestrator.enrich(&job).await.unwrap();

        assert_eq!(lead.status, EnrichmentStatus::Completed);
        assert_eq!(lead.error, None);
        assert!(lead.enriched_at.is_some());
        assert_eq!(lead.extraction_tier.as_deref(), Some("fast"));
        assert_eq!(lead.technologies, vec!["Shopify".to_string()]);

        let stored = storage.find_by_key(lead.id).unwrap().unwrap();
        let performance = stored.performance.unwrap();
        assert!(performance.response_time_ms.is_some());
        assert_eq!(performance.performance_score, Some(72.0));
        assert_eq!(performance.time_to_first_byte_ms, None);

        let audit = stored.audit.unwrap();
        assert_eq!(audit.title.as_deref(), Some("Smile Co"));
        assert_eq!(audit.meta_description.as_deref(), Some("Dentist in Springfield"));
        assert!(stored.content_markdown.unwrap().contains("Family dentistry."));

        orchestrator.indexing.shutdown().await;
        let documents = indexer.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].lead_id, lead.id);
    }

    #[tokio::test]
    async fn test_extraction_failure_leaves_lead_untouched() {
        let (orchestrator, storage, indexer, job) = setup("http://127.0.0.1:1/");

        let err = orchestrator.enrich(&job).await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Extraction(_)));

        let stored = storage.find_by_key(job.lead_id).unwrap().unwrap();
        assert_eq!(stored.status, EnrichmentStatus::Pending);
        assert!(stored.audit.is_none());

        orchestrator.indexing.shutdown().await;
        assert!(indexer.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_lead() {
        let (orchestrator, _storage, _indexer, mut job) = setup("http://127.0.0.1:1/");
        job.lead_id = 999;

        let err = orchestrator.enrich(&job).await.unwrap_err();
        assert!(matches!(err, EnrichmentError::LeadNotFound(999)));
    }
}
