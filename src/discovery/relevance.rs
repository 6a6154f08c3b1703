use crate::config::RelevanceRule;
use crate::discovery::client::PlaceResult;

/// Drops cross-domain contamination from search results
///
/// Directory searches for "dentist" routinely return injury lawyers that
/// advertise against medical keywords. Each rule whose trigger appears in the
/// keyword contributes excluded type tags and name terms.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    rules: Vec<RelevanceRule>,
}

impl RelevanceFilter {
    pub fn new(rules: Vec<RelevanceRule>) -> Self {
        Self { rules }
    }

    /// Returns true if `place` belongs to the domain the keyword asks for
    pub fn is_relevant(&self, keyword: &str, place: &PlaceResult) -> bool {
        let keyword = keyword.to_lowercase();
        let name = place.name.to_lowercase();

        for rule in self.active_rules(&keyword) {
            let excluded_type = place.types.iter().any(|t| {
                rule.excluded_types
                    .iter()
                    .any(|excluded| t.eq_ignore_ascii_case(excluded))
            });
            if excluded_type {
                return false;
            }

            let excluded_term = rule
                .excluded_terms
                .iter()
                .any(|term| name.contains(&term.to_lowercase()));
            if excluded_term {
                return false;
            }
        }

        true
    }

    fn active_rules<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a RelevanceRule> {
        self.rules.iter().filter(move |rule| {
            rule.triggers
                .iter()
                .filter(|t| !t.trim().is_empty())
                .any(|t| keyword.contains(&t.to_lowercase()))
        })
    }
}
