use crate::config::ExtractionConfig;
use crate::extraction::{
    ChallengeDetector, ExtractionError, ExtractionResult, ExtractionTier, FastFetcher,
    FetchFailure, RenderTier, RenderedPage,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Fetches a URL with the fast tier and escalates to the render tier
///
/// Escalation happens on a blocking status, any other error status, a
/// challenge page, or a transport failure. The rendered document is inspected
/// again; a challenge or error status that survives rendering fails the
/// extraction.
pub struct TieredExtractor {
    fast: FastFetcher,
    renderer: Arc<dyn RenderTier>,
    detector: ChallengeDetector,
}

impl TieredExtractor {
    /// Creates an extractor
    ///
    /// # Arguments
    ///
    /// * `config` - Extraction configuration
    /// * `renderer` - The fallback tier
    pub fn new(
        config: &ExtractionConfig,
        renderer: Arc<dyn RenderTier>,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            fast: FastFetcher::new(config)?,
            renderer,
            detector: ChallengeDetector::new(config),
        })
    }

    /// Extracts the document at `url`
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionResult)` - A non-challenge document from either tier
    /// * `Err(ExtractionError::Exhausted)` - Both tiers failed
    pub async fn fetch(&self, url: &str) -> Result<ExtractionResult, ExtractionError> {
        let mut response_time_ms = None;

        let fast_failure = match self.fast.fetch(url).await {
            Ok(response) => {
                response_time_ms = Some(response.elapsed_ms);
                let signature = self.detector.inspect(Some(response.status), &response.body);

                match &signature.challenge {
                    Some(verdict) => FetchFailure::Challenged(verdict.clone()),
                    None if response.status >= 400 => FetchFailure::Status(response.status),
                    None => {
                        debug!(url = %url, status = response.status, "Fast tier succeeded");
                        return Ok(ExtractionResult {
                            body: response.body,
                            tier: ExtractionTier::Fast,
                            signature,
                            response_time_ms,
                        });
                    }
                }
            }
            Err(failure) => failure,
        };

        info!(url = %url, reason = %fast_failure, "Escalating to fallback tier");

        let RenderedPage { status, html } = match self.renderer.render(url).await {
            Ok(page) => page,
            Err(err) => {
                return Err(ExtractionError::Exhausted {
                    fast: fast_failure,
                    cause: err.to_string(),
                })
            }
        };

        let signature = self.detector.inspect(status, &html);
        if let Some(verdict) = signature.challenge.clone() {
            return Err(ExtractionError::Exhausted {
                fast: fast_failure,
                cause: ExtractionError::ChallengeNotCleared(verdict).to_string(),
            });
        }
        if let Some(code) = status.filter(|code| *code >= 400) {
            return Err(ExtractionError::Exhausted {
                fast: fast_failure,
                cause: FetchFailure::Status(code).to_string(),
            });
        }

        debug!(url = %url, status = ?status, "Fallback tier succeeded");
        Ok(ExtractionResult {
            body: html,
            tier: ExtractionTier::Fallback,
            signature,
            response_time_ms,
        })
    }
}
