//! Paginated discovery engine
//!
//! A discovery run fetches the first page with the composed query, then
//! follows continuation tokens. Tokens are not usable the moment they are
//! issued: the directory answers INVALID_REQUEST until the token matures.
//! Each follow-up page therefore walks a linear backoff ladder, re-sending the
//! original query together with the token.

use crate::config::{DiscoveryConfig, RelevanceRule};
use crate::discovery::client::{DirectoryApi, SearchRequest, SearchResponse, SearchStatus};
use crate::discovery::relevance::RelevanceFilter;
use crate::discovery::{Candidate, DiscoveryError, DiscoveryRequest};
use crate::state::{AcquisitionToken, TokenState};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a discovery run stopped fetching pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `max_results` candidates were collected
    MaxResults,
    /// The last page carried no continuation token
    NoMorePages,
    /// The directory reported no (more) results
    ZeroResults,
    /// A continuation token never became valid
    LadderExhausted,
    /// The directory returned a non-retryable status after partial results
    TerminalStatus(String),
    /// A request failed after partial results
    NetworkFailure(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxResults => write!(f, "max results reached"),
            Self::NoMorePages => write!(f, "no more pages"),
            Self::ZeroResults => write!(f, "zero results"),
            Self::LadderExhausted => write!(f, "continuation token never matured"),
            Self::TerminalStatus(status) => write!(f, "directory returned {}", status),
            Self::NetworkFailure(cause) => write!(f, "request failed: {}", cause),
        }
    }
}

/// Counters describing a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryReport {
    pub pages_fetched: usize,
    /// Results dropped by the relevance filter
    pub filtered: usize,
    /// Results whose place id was already seen in this run
    pub duplicates: usize,
    pub stop_reason: StopReason,
    /// Fewer candidates than the requested minimum were found
    pub below_minimum: bool,
}

/// Candidates and report of a finished run
#[derive(Debug, Clone)]
pub struct DiscoveryOutput {
    pub candidates: Vec<Candidate>,
    pub report: DiscoveryReport,
}

/// Runs paginated searches against a directory API
pub struct DiscoveryEngine {
    api: Arc<dyn DirectoryApi>,
    filter: RelevanceFilter,
    page_retry_delay: Duration,
    max_page_attempts: u32,
}

impl DiscoveryEngine {
    /// Creates an engine over `api` with the ladder tunables from `config`
    pub fn new(api: Arc<dyn DirectoryApi>, config: &DiscoveryConfig, rules: Vec<RelevanceRule>) -> Self {
        Self {
            api,
            filter: RelevanceFilter::new(rules),
            page_retry_delay: Duration::from_millis(config.page_retry_delay_ms),
            max_page_attempts: config.max_page_attempts.max(1),
        }
    }

    /// The directory client this engine searches with
    pub fn api(&self) -> Arc<dyn DirectoryApi> {
        Arc::clone(&self.api)
    }

    /// Starts a run; nothing is fetched until the first `next_page` call
    pub fn start(&self, request: DiscoveryRequest) -> Result<DiscoveryRun<'_>, DiscoveryError> {
        if request.keyword.trim().is_empty() {
            return Err(DiscoveryError::InvalidInput(
                "keyword cannot be empty".to_string(),
            ));
        }

        Ok(DiscoveryRun::new(self, request))
    }

    /// Runs a discovery campaign to completion
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveryOutput)` - At most `max_results` candidates, unique by place id
    /// * `Err(DiscoveryError)` - The run failed before any candidate was collected
    pub async fn discover(&self, request: DiscoveryRequest) -> Result<DiscoveryOutput, DiscoveryError> {
        let mut run = self.start(request)?;
        while run.next_page().await?.is_some() {}
        Ok(run.finish())
    }
}

/// A single, non-restartable discovery run
///
/// Owns the continuation token for its lifetime. Pages are fetched lazily,
/// one per `next_page` call.
pub struct DiscoveryRun<'a> {
    engine: &'a DiscoveryEngine,
    request: DiscoveryRequest,
    base: SearchRequest,
    token: AcquisitionToken,
    seen: HashSet<String>,
    candidates: Vec<Candidate>,
    pages_fetched: usize,
    filtered: usize,
    duplicates: usize,
    stop: Option<StopReason>,
}

impl<'a> DiscoveryRun<'a> {
    fn new(engine: &'a DiscoveryEngine, request: DiscoveryRequest) -> Self {
        let base = request.to_search_request();
        Self {
            engine,
            request,
            base,
            token: AcquisitionToken::new(),
            seen: HashSet::new(),
            candidates: Vec::new(),
            pages_fetched: 0,
            filtered: 0,
            duplicates: 0,
            stop: None,
        }
    }

    /// Candidates collected so far
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn token_state(&self) -> TokenState {
        self.token.state()
    }

    /// Fetches the next page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(n))` - A page was fetched and `n` new candidates accepted
    /// * `Ok(None)` - The run has stopped; see `finish` for the reason
    /// * `Err(DiscoveryError)` - A failure with no partial results to return
    pub async fn next_page(&mut self) -> Result<Option<usize>, DiscoveryError> {
        if self.stop.is_some() {
            return Ok(None);
        }

        if self.request.max_results == 0 {
            self.halt(StopReason::MaxResults);
            return Ok(None);
        }

        match self.token.state() {
            TokenState::Absent => self.first_page().await,
            TokenState::Issued | TokenState::Maturing | TokenState::Valid => {
                self.follow_up_page().await
            }
            TokenState::Exhausted => {
                self.halt(StopReason::NoMorePages);
                Ok(None)
            }
        }
    }

    /// Ends the run and returns what it collected
    pub fn finish(mut self) -> DiscoveryOutput {
        self.candidates.truncate(self.request.max_results);
        let stop_reason = self.stop.take().unwrap_or(StopReason::NoMorePages);
        let below_minimum = self.candidates.len() < self.request.min_results;

        if below_minimum {
            warn!(
                "Discovery for '{}' found {} candidates, below the minimum of {}",
                self.request.keyword,
                self.candidates.len(),
                self.request.min_results
            );
        }

        info!(
            "Discovery finished: {} candidates over {} pages ({})",
            self.candidates.len(),
            self.pages_fetched,
            stop_reason
        );

        DiscoveryOutput {
            candidates: self.candidates,
            report: DiscoveryReport {
                pages_fetched: self.pages_fetched,
                filtered: self.filtered,
                duplicates: self.duplicates,
                stop_reason,
                below_minimum,
            },
        }
    }

    async fn first_page(&mut self) -> Result<Option<usize>, DiscoveryError> {
        info!("Searching for '{}'", self.base.query);

        let response = match self.engine.api.text_search(&self.base).await {
            Ok(response) => response,
            Err(e) => {
                self.token.exhaust();
                return Err(e);
            }
        };

        match response.status {
            SearchStatus::Ok => Ok(Some(self.accept(response))),
            SearchStatus::ZeroResults => {
                self.token.exhaust();
                self.halt(StopReason::ZeroResults);
                Ok(None)
            }
            SearchStatus::InvalidRequest => {
                self.token.exhaust();
                Err(DiscoveryError::InvalidRequest(
                    response.error_message.unwrap_or_default(),
                ))
            }
            SearchStatus::Other(status) => {
                self.token.exhaust();
                Err(DiscoveryError::TerminalStatus {
                    status,
                    message: response.error_message.unwrap_or_default(),
                })
            }
        }
    }

    async fn follow_up_page(&mut self) -> Result<Option<usize>, DiscoveryError> {
        let mut request = self.base.clone();
        request.page_token = self.token.cursor().map(str::to_string);

        for attempt in 1..=self.engine.max_page_attempts {
            let delay = self.engine.page_retry_delay * attempt;
            debug!(
                "Waiting {:?} before page {} attempt {}",
                delay,
                self.pages_fetched + 1,
                attempt
            );
            tokio::time::sleep(delay).await;

            let response = match self.engine.api.text_search(&request).await {
                Ok(response) => response,
                Err(e) => return self.fail_follow_up(e),
            };

            match response.status {
                SearchStatus::Ok => {
                    self.token.mark_valid();
                    return Ok(Some(self.accept(response)));
                }
                SearchStatus::ZeroResults => {
                    self.token.exhaust();
                    self.halt(StopReason::ZeroResults);
                    return Ok(None);
                }
                SearchStatus::InvalidRequest => {
                    self.token.begin_maturing();
                    debug!(
                        "Continuation token not ready (attempt {}/{})",
                        attempt, self.engine.max_page_attempts
                    );
                }
                SearchStatus::Other(status) => {
                    let error = DiscoveryError::TerminalStatus {
                        status,
                        message: response.error_message.unwrap_or_default(),
                    };
                    return self.fail_follow_up(error);
                }
            }
        }

        warn!(
            "Continuation token still invalid after {} attempts; keeping {} candidates",
            self.engine.max_page_attempts,
            self.candidates.len()
        );
        self.token.exhaust();
        self.halt(StopReason::LadderExhausted);
        Ok(None)
    }

    /// Stops the run after a follow-up failure, keeping partial results when there are any
    fn fail_follow_up(&mut self, error: DiscoveryError) -> Result<Option<usize>, DiscoveryError> {
        self.token.exhaust();

        if self.candidates.is_empty() {
            return Err(error);
        }

        warn!(
            "Stopping discovery with {} candidates: {}",
            self.candidates.len(),
            error
        );
        let reason = match error {
            DiscoveryError::TerminalStatus { status, .. } => StopReason::TerminalStatus(status),
            other => StopReason::NetworkFailure(other.to_string()),
        };
        self.halt(reason);
        Ok(None)
    }

    fn accept(&mut self, response: SearchResponse) -> usize {
        self.pages_fetched += 1;
        let max = self.request.max_results;
        let mut accepted = 0;

        for place in response.results {
            if self.candidates.len() >= max {
                break;
            }

            if !self.seen.insert(place.place_id.clone()) {
                self.duplicates += 1;
                continue;
            }

            if !self.engine.filter.is_relevant(&self.request.keyword, &place) {
                debug!("Dropping irrelevant result '{}'", place.name);
                self.filtered += 1;
                continue;
            }

            self.candidates.push(Candidate::from(place));
            accepted += 1;
        }

        debug!(
            "Page {} accepted {} candidates ({} total)",
            self.pages_fetched,
            accepted,
            self.candidates.len()
        );

        if self.candidates.len() >= max {
            self.token.exhaust();
            self.halt(StopReason::MaxResults);
        } else {
            self.token.issue(response.next_page_token);
            if self.token.state() == TokenState::Exhausted {
                self.halt(StopReason::NoMorePages);
            }
        }

        accepted
    }

    fn halt(&mut self, reason: StopReason) {
        if self.stop.is_none() {
            self.stop = Some(reason);
        }
    }
}
