//! Free-text filtering over the catalog.
//!
//! Purely functional: the store is never mutated and the result is recomputed
//! on every query change rather than cached in a separately mutated variable.

use serde::Serialize;

use crate::listing::Listing;

/// Why a search produced the hits it did. An empty hit list has two distinct
/// causes the UI renders differently: an empty catalog and a query that
/// matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    CatalogEmpty,
    NoMatches,
    Matches,
}

/// Result of [`search`]: the matching listings in catalog order, plus the
/// outcome classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hits: Vec<Listing>,
    pub outcome: SearchOutcome,
}

/// Keep exactly the listings whose title or description contains `query`
/// case-insensitively, preserving input order. An empty query is the
/// identity.
pub fn filter<'a>(listings: &'a [Listing], query: &str) -> Vec<&'a Listing> {
    if query.is_empty() {
        return listings.iter().collect();
    }
    let needle = query.to_lowercase();
    listings
        .iter()
        .filter(|l| {
            l.title.to_lowercase().contains(&needle)
                || l.description.to_lowercase().contains(&needle)
        })
        .collect()
}

/// [`filter`] plus the empty-catalog vs. no-match classification.
pub fn search(listings: &[Listing], query: &str) -> SearchResult {
    let hits: Vec<Listing> = filter(listings, query).into_iter().cloned().collect();
    let outcome = if listings.is_empty() {
        SearchOutcome::CatalogEmpty
    } else if hits.is_empty() {
        SearchOutcome::NoMatches
    } else {
        SearchOutcome::Matches
    };
    SearchResult { hits, outcome }
}
