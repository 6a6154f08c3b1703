use serde::Deserialize;

/// Main configuration structure for Lead Prospector
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default = "default_relevance_rules")]
    pub relevance: Vec<RelevanceRule>,
}

/// Directory search API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Base URL of the places API (text search and details endpoints live under it)
    #[serde(rename = "base-url", default = "default_places_url")]
    pub base_url: String,

    /// API key sent with every request
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    /// Linear backoff unit for continuation-token retries (milliseconds)
    #[serde(rename = "page-retry-delay-ms", default = "default_page_retry_delay_ms")]
    pub page_retry_delay_ms: u64,

    /// Attempts per follow-up page before pagination gives up
    #[serde(rename = "max-page-attempts", default = "default_max_page_attempts")]
    pub max_page_attempts: u32,

    /// Per-request timeout for the directory API
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to look up place details (website, phone) for new candidates
    #[serde(rename = "fetch-details", default = "default_true")]
    pub fetch_details: bool,
}

/// Two-tier content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Browser-like user agent for the fast tier
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for the fast HTTP fetch
    #[serde(rename = "fast-timeout-secs", default = "default_fast_timeout_secs")]
    pub fast_timeout_secs: u64,

    /// Timeout for the whole browser navigation
    #[serde(rename = "browser-timeout-secs", default = "default_browser_timeout_secs")]
    pub browser_timeout_secs: u64,

    /// Quiet period after navigation before the document is read (milliseconds)
    #[serde(rename = "network-settle-ms", default = "default_network_settle_ms")]
    pub network_settle_ms: u64,

    /// Chromium executable; autodetected when unset
    #[serde(rename = "chromium-path", default)]
    pub chromium_path: Option<String>,

    /// Status codes that indicate the fast tier was blocked
    #[serde(rename = "blocking-statuses", default = "default_blocking_statuses")]
    pub blocking_statuses: Vec<u16>,

    /// Lowercase substrings of page titles served by anti-bot challenges
    #[serde(rename = "challenge-titles", default = "default_challenge_titles")]
    pub challenge_titles: Vec<String>,

    /// Lowercase substrings of page bodies served by anti-bot challenges
    #[serde(rename = "challenge-markers", default = "default_challenge_markers")]
    pub challenge_markers: Vec<String>,
}

/// Technology and performance profiling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilingConfig {
    /// Performance audit endpoint
    #[serde(rename = "pagespeed-url", default = "default_pagespeed_url")]
    pub pagespeed_url: String,

    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Audit strategy ("mobile" or "desktop")
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(rename = "timeout-secs", default = "default_audit_timeout_secs")]
    pub timeout_secs: u64,

    /// Technology signature table
    #[serde(default = "default_technologies")]
    pub technologies: Vec<TechnologySignature>,
}

/// One entry in the technology signature table
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TechnologySignature {
    pub name: String,

    #[serde(default)]
    pub category: String,

    /// Case-insensitive substrings of the raw document
    #[serde(default)]
    pub contains: Vec<String>,

    /// CSS selectors that must match at least one element
    #[serde(default)]
    pub selectors: Vec<String>,
}

/// Enrichment queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent enrichment workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Total attempts per job, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential retry backoff (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on how long an idle worker sleeps before polling again (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Semantic indexing collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Endpoint that receives consolidated leads; indexing is logged only when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(rename = "timeout-secs", default = "default_indexing_timeout_secs")]
    pub timeout_secs: u64,
}

/// Cross-domain contamination rule for discovery results
///
/// When the search keyword contains any trigger, results whose type tags
/// include an excluded type, or whose name contains an excluded term, are dropped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelevanceRule {
    pub triggers: Vec<String>,

    #[serde(rename = "excluded-types", default)]
    pub excluded_types: Vec<String>,

    #[serde(rename = "excluded-terms", default)]
    pub excluded_terms: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            fast_timeout_secs: default_fast_timeout_secs(),
            browser_timeout_secs: default_browser_timeout_secs(),
            network_settle_ms: default_network_settle_ms(),
            chromium_path: None,
            blocking_statuses: default_blocking_statuses(),
            challenge_titles: default_challenge_titles(),
            challenge_markers: default_challenge_markers(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_indexing_timeout_secs(),
        }
    }
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            pagespeed_url: default_pagespeed_url(),
            api_key: None,
            strategy: default_strategy(),
            timeout_secs: default_audit_timeout_secs(),
            technologies: default_technologies(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DiscoveryConfig {
    /// Creates a discovery config with default tunables for the given endpoint
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            page_retry_delay_ms: default_page_retry_delay_ms(),
            max_page_attempts: default_max_page_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_details: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_places_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_page_retry_delay_ms() -> u64 {
    2000
}

fn default_max_page_attempts() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_fast_timeout_secs() -> u64 {
    8
}

fn default_browser_timeout_secs() -> u64 {
    30
}

fn default_network_settle_ms() -> u64 {
    750
}

fn default_blocking_statuses() -> Vec<u16> {
    vec![403, 429, 503]
}

fn default_challenge_titles() -> Vec<String> {
    [
        "just a moment",
        "attention required",
        "access denied",
        "checking your browser",
        "please wait",
        "verify you are human",
        "security check",
        "ddos-guard",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_challenge_markers() -> Vec<String> {
    [
        "cf_chl_opt",
        "cf-browser-verification",
        "cf-challenge-running",
        "_incapsula_resource",
        "ddos-guard.net/js",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_pagespeed_url() -> String {
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".to_string()
}

fn default_strategy() -> String {
    "mobile".to_string()
}

fn default_audit_timeout_secs() -> u64 {
    20
}

fn default_indexing_timeout_secs() -> u64 {
    10
}

fn default_workers() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn signature(name: &str, category: &str, contains: &[&str], selectors: &[&str]) -> TechnologySignature {
    TechnologySignature {
        name: name.to_string(),
        category: category.to_string(),
        contains: contains.iter().map(|s| s.to_string()).collect(),
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
    }
}

/// Built-in technology signature table
pub fn default_technologies() -> Vec<TechnologySignature> {
    vec![
        signature(
            "WordPress",
            "cms",
            &["wp-content/", "wp-includes/"],
            &["meta[name='generator'][content^='WordPress']"],
        ),
        signature("Wix", "website-builder", &["static.wixstatic.com", "_wixcssimports"], &[]),
        signature("Squarespace", "website-builder", &["static1.squarespace.com", "squarespace-cdn"], &[]),
        signature("Shopify", "ecommerce", &["cdn.shopify.com", "shopify.theme"], &[]),
        signature("Webflow", "website-builder", &["assets.website-files.com"], &["html[data-wf-site]"]),
        signature("Joomla", "cms", &["/media/jui/"], &["meta[name='generator'][content^='Joomla']"]),
        signature("Drupal", "cms", &["drupal-settings-json", "/sites/default/files/"], &[]),
        signature("GoDaddy Website Builder", "website-builder", &["img1.wsimg.com"], &[]),
        signature("Next.js", "framework", &["__next_data__", "/_next/static/"], &[]),
        signature("React", "framework", &["data-reactroot", "react-dom"], &[]),
        signature("Vue.js", "framework", &["data-v-app", "vue.runtime"], &[]),
        signature("jQuery", "library", &["jquery.min.js", "jquery.js"], &[]),
        signature("Bootstrap", "library", &["bootstrap.min.css", "bootstrap.min.js"], &[]),
        signature("Google Analytics", "analytics", &["google-analytics.com/analytics.js", "gtag('config'", "gtag(\"config\""], &[]),
        signature("Google Tag Manager", "analytics", &["googletagmanager.com/gtm.js"], &[]),
        signature("Meta Pixel", "advertising", &["connect.facebook.net", "fbq('init'"], &[]),
        signature("Hotjar", "analytics", &["static.hotjar.com"], &[]),
        signature("HubSpot", "marketing", &["js.hs-scripts.com", "js.hsforms.net"], &[]),
        signature("Cloudflare", "cdn", &["cdnjs.cloudflare.com", "/cdn-cgi/"], &[]),
        signature("reCAPTCHA", "security", &["google.com/recaptcha"], &[]),
        signature("Calendly", "scheduling", &["assets.calendly.com"], &[]),
        signature("Google Maps", "widget", &["maps.googleapis.com/maps/api/js", "google.com/maps/embed"], &[]),
    ]
}

fn rule(triggers: &[&str], excluded_types: &[&str], excluded_terms: &[&str]) -> RelevanceRule {
    RelevanceRule {
        triggers: triggers.iter().map(|s| s.to_string()).collect(),
        excluded_types: excluded_types.iter().map(|s| s.to_string()).collect(),
        excluded_terms: excluded_terms.iter().map(|s| s.to_string()).collect(),
    }
}

/// Built-in cross-domain contamination rules
pub fn default_relevance_rules() -> Vec<RelevanceRule> {
    vec![
        rule(
            &["dentist", "dental", "doctor", "clinic", "medical", "physician", "orthodont", "chiropract"],
            &["lawyer", "attorney", "courthouse", "real_estate_agency", "car_dealer"],
            &["law firm", "attorney", "lawyer", "injury", "legal"],
        ),
        rule(
            &["lawyer", "attorney", "law firm", "legal"],
            &["dentist", "doctor", "hospital", "pharmacy"],
            &["dental", "dentist", "clinic", "orthodont"],
        ),
        rule(
            &["restaurant", "cafe", "bakery", "pizza"],
            &["lawyer", "dentist", "doctor", "car_repair"],
            &["attorney", "dental"],
        ),
        rule(
            &["plumber", "plumbing", "electrician", "roofing", "hvac"],
            &["lawyer", "dentist", "doctor", "restaurant"],
            &["attorney", "dental"],
        ),
    ]
}
