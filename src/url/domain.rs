use crate::url::normalize::normalize_website;
use crate::UrlError;
use url::Url;

/// Extracts the deduplication domain from a parsed URL
///
/// The host is lowercased and a leading `www.` removed. A non-default port is
/// kept, so two sites on one host but different ports stay distinct.
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }

    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Normalizes a raw website string into its deduplication domain
///
/// # Examples
///
/// ```
/// use lead_prospector::url::normalize_domain;
///
/// assert_eq!(normalize_domain("http://WWW.Example.com/about").unwrap(), "example.com");
/// assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
/// ```
pub fn normalize_domain(raw: &str) -> Result<String, UrlError> {
    let url = normalize_website(raw)?;
    extract_domain(&url).ok_or(UrlError::MissingDomain)
}
