use crate::config::ExtractionConfig;
use scraper::{Html, Selector};
use std::fmt;

/// Which challenge pattern matched a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeVerdict {
    BlockingStatus(u16),
    Title(String),
    Marker(String),
}

impl fmt::Display for ChallengeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockingStatus(code) => write!(f, "blocking status {}", code),
            Self::Title(pattern) => write!(f, "challenge title '{}'", pattern),
            Self::Marker(pattern) => write!(f, "challenge marker '{}'", pattern),
        }
    }
}

/// Observable features of a fetched document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSignature {
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub challenge: Option<ChallengeVerdict>,
}

impl ContentSignature {
    pub fn is_challenge(&self) -> bool {
        self.challenge.is_some()
    }
}

/// Matches responses against the configured anti-bot pattern tables
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    blocking_statuses: Vec<u16>,
    titles: Vec<String>,
    markers: Vec<String>,
}

impl ChallengeDetector {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            blocking_statuses: config.blocking_statuses.clone(),
            titles: config.challenge_titles.iter().map(|t| t.to_lowercase()).collect(),
            markers: config
                .challenge_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
        }
    }

    /// Computes the signature of a response
    ///
    /// `status` is `None` for rendered documents, which only carry a body.
    pub fn inspect(&self, status: Option<u16>, body: &str) -> ContentSignature {
        let title = extract_title(body);

        let challenge = status
            .filter(|s| self.blocking_statuses.contains(s))
            .map(ChallengeVerdict::BlockingStatus)
            .or_else(|| self.match_title(title.as_deref()))
            .or_else(|| self.match_marker(body));

        ContentSignature {
            status_code: status,
            title,
            challenge,
        }
    }

    fn match_title(&self, title: Option<&str>) -> Option<ChallengeVerdict> {
        let title = title?.to_lowercase();
        self.titles
            .iter()
            .find(|pattern| title.contains(pattern.as_str()))
            .map(|pattern| ChallengeVerdict::Title(pattern.clone()))
    }

    fn match_marker(&self, body: &str) -> Option<ChallengeVerdict> {
        if self.markers.is_empty() {
            return None;
        }
        let body = body.to_lowercase();
        self.markers
            .iter()
            .find(|marker| body.contains(marker.as_str()))
            .map(|marker| ChallengeVerdict::Marker(marker.clone()))
    }
}

/// Extracts the trimmed `<title>` text of a document
pub(crate) fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ChallengeDetector {
        ChallengeDetector::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_cloudflare_interstitial() {
        let body = "<html><head><title>Just a moment...</title></head><body></body></html>";
        let signature = detector().inspect(Some(200), body);

        assert_eq!(signature.title.as_deref(), Some("Just a moment..."));
        assert_eq!(
            signature.challenge,
            Some(ChallengeVerdict::Title("just a moment".to_string()))
        );
    }

    #[test]
    fn test_blocking_status_wins() {
        let body = "<title>Just a moment...</title>";
        let signature = detector().inspect(Some(403), body);
        assert_eq!(signature.challenge, Some(ChallengeVerdict::BlockingStatus(403)));
    }

    #[test]
    fn test_marker_in_body() {
        let body = "<html><head><title>Example</title></head>\
                    <body><script>window._cf_chl_opt = {};</script></body></html>";
        let signature = detector().inspect(Some(200), body);
        assert_eq!(
            signature.challenge,
            Some(ChallengeVerdict::Marker("cf_chl_opt".to_string()))
        );
    }

    #[test]
    fn test_ordinary_page() {
        let body = "<html><head><title>Springfield Family Dentistry</title></head>\
                    <body><h1>Welcome</h1><div class=\"g-recaptcha\"></div></body></html>";
        let signature = detector().inspect(Some(200), body);
        assert!(!signature.is_challenge());
        assert_eq!(signature.status_code, Some(200));
    }

    #[test]
    fn test_rendered_body_without_status() {
        let signature = detector().inspect(None, "<title>Attention Required! | Cloudflare</title>");
        assert!(signature.is_challenge());
        assert_eq!(signature.status_code, None);
    }

    #[test]
    fn test_non_blocking_error_status_is_not_challenge() {
        let signature = detector().inspect(Some(404), "<title>Not Found</title>");
        assert!(!signature.is_challenge());
    }

    #[test]
    fn test_missing_title() {
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
    }
}
