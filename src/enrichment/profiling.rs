use crate::config::TechnologySignature;
use scraper::{Html, Selector};
use tracing::warn;

/// A technology signature with its selectors parsed once
struct CompiledSignature {
    name: String,
    contains: Vec<String>,
    selectors: Vec<Selector>,
}

/// Detects technologies in a document from a literal signature table
///
/// A technology matches when any of its substrings occurs in the lowercased
/// document or any of its selectors matches an element.
pub struct TechnologyProfiler {
    signatures: Vec<CompiledSignature>,
}

impl TechnologyProfiler {
    pub fn new(table: &[TechnologySignature]) -> Self {
        let signatures = table
            .iter()
            .map(|sig| CompiledSignature {
                name: sig.name.clone(),
                contains: sig.contains.iter().map(|c| c.to_lowercase()).collect(),
                selectors: sig
                    .selectors
                    .iter()
                    .filter_map(|s| match Selector::parse(s) {
                        Ok(selector) => Some(selector),
                        Err(e) => {
                            warn!(technology = %sig.name, selector = %s, error = ?e, "Skipping invalid selector");
                            None
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { signatures }
    }

    /// Returns the names of matched technologies in table order, without duplicates
    pub fn detect(&self, html: &str) -> Vec<String> {
        let lowered = html.to_lowercase();
        let document = Html::parse_document(html);
        let mut found: Vec<String> = Vec::new();

        for sig in &self.signatures {
            if found.contains(&sig.name) {
                continue;
            }

            let by_text = sig.contains.iter().any(|c| lowered.contains(c.as_str()));
            let by_selector = || sig.selectors.iter().any(|s| document.select(s).next().is_some());

            if by_text || by_selector() {
                found.push(sig.name.clone());
            }
        }

        found
    }
}
