//! Semantic indexing hand-off
//!
//! Consolidated leads are submitted to an `IndexingRunner`, a background task
//! that feeds them to the configured `Indexer`. Submission never blocks or
//! fails the enrichment job; indexing failures are logged and reported on the
//! runner's bounded error channel.

use crate::config::IndexingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Synthesized content and metadata for one lead
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexDocument {
    pub lead_id: i64,
    pub place_id: String,
    pub name: String,
    pub website: Option<String>,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub technologies: Vec<String>,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("Indexing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Indexing endpoint returned HTTP {0}")]
    Status(u16),
}

/// Receives consolidated lead documents
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexingError>;
}

/// Posts documents as JSON to an HTTP endpoint
pub struct HttpIndexer {
    client: Client,
    endpoint: String,
}

impl HttpIndexer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexingError> {
        let response = self.client.post(&self.endpoint).json(document).send().await?;

        if !response.status().is_success() {
            return Err(IndexingError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Indexer used when no endpoint is configured
pub struct LogIndexer;

#[async_trait]
impl Indexer for LogIndexer {
    async fn index(&self, document: &IndexDocument) -> Result<(), IndexingError> {
        info!(
            lead_id = document.lead_id,
            name = %document.name,
            content_len = document.content.len(),
            "Lead ready for indexing"
        );
        Ok(())
    }
}

/// Builds the indexer selected by configuration
pub fn indexer_from_config(config: &IndexingConfig) -> Result<Arc<dyn Indexer>, reqwest::Error> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpIndexer::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogIndexer)),
    }
}

/// Failures kept for a reader of `take_errors`; later ones are only logged
pub const ERROR_BACKLOG: usize = 64;

/// A failed indexing attempt, reported on the runner's error channel
#[derive(Debug)]
pub struct IndexingFailure {
    pub lead_id: i64,
    pub error: IndexingError,
}

/// Background task that delivers documents to an indexer
///
/// Shared between the orchestrator, which submits, and the controller, which
/// shuts it down once the queue has drained.
pub struct IndexingRunner {
    sender: Mutex<Option<mpsc::UnboundedSender<IndexDocument>>>,
    errors: Mutex<Option<mpsc::Receiver<IndexingFailure>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IndexingRunner {
    /// Spawns the runner task on the current runtime
    pub fn spawn(indexer: Arc<dyn Indexer>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<IndexDocument>();
        let (error_tx, error_rx) = mpsc::channel(ERROR_BACKLOG);

        let task = tokio::spawn(async move {
            while let Some(document) = receiver.recv().await {
                match indexer.index(&document).await {
                    Ok(()) => debug!(lead_id = document.lead_id, "Lead indexed"),
                    Err(error) => {
                        warn!(lead_id = document.lead_id, error = %error, "Indexing failed");
                        let failure = IndexingFailure {
                            lead_id: document.lead_id,
                            error,
                        };
                        if let Err(mpsc::error::TrySendError::Full(failure)) =
                            error_tx.try_send(failure)
                        {
                            debug!(lead_id = failure.lead_id, "Indexing error backlog full");
                        }
                    }
                }
            }
        });

        Self {
            sender: Mutex::new(Some(sender)),
            errors: Mutex::new(Some(error_rx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Queues a document for indexing without waiting for delivery
    pub fn submit(&self, document: IndexDocument) {
        let lead_id = document.lead_id;
        let delivered = match self.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(document).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        };

        if !delivered {
            warn!(lead_id, "Indexing runner stopped; document dropped");
        }
    }

    /// Takes the error channel
    ///
    /// Holds at most `ERROR_BACKLOG` unread failures; once it is full, or
    /// after the receiver is dropped, failures are only logged.
    pub fn take_errors(&self) -> Option<mpsc::Receiver<IndexingFailure>> {
        self.errors.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Delivers every queued document, then stops the task
    ///
    /// Later submissions are dropped with a warning.
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }

        let task = self.task.lock().ok().and_then(|mut guard| guard.take());
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "Indexing runner join error");
            }
        }
    }
}
