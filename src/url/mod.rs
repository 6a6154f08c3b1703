//! URL handling module for Lead Prospector
//!
//! Listing websites are normalized once when a candidate is accepted. The
//! normalized URL is what extraction fetches; the domain is the key for
//! per-website deduplication.

mod domain;
mod normalize;

pub use domain::{extract_domain, normalize_domain};
pub use normalize::normalize_website;
