use crate::UrlError;
use url::Url;

/// Query parameters that listings append for attribution
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "msclkid",
    "mc_eid",
    "ref",
    "source",
    "y_source",
];

/// Normalizes a website URL taken from a directory listing
///
/// Listings hand back websites in many shapes: bare hosts, uppercase hosts,
/// tracking parameters, fragments. The result is the URL the extractor fetches,
/// so the scheme and the `www.` label are left alone.
///
/// # Normalization Steps
///
/// 1. Trim whitespace; reject empty input
/// 2. Assume `https://` when no scheme is given
/// 3. Reject schemes other than HTTP and HTTPS
/// 4. Lowercase the host
/// 5. Remove the fragment
/// 6. Remove tracking query parameters; drop an empty query
///
/// # Examples
///
/// ```
/// use lead_prospector::url::normalize_website;
///
/// let url = normalize_website("Example.COM/contact?utm_source=gmb").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/contact");
/// ```
pub fn normalize_website(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Malformed("empty website".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS websites are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
