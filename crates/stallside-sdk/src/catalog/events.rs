use serde::Serialize;

use crate::listing::Listing;

/// Events pushed by [`CatalogStore`](super::CatalogStore) on every observable
/// mutation. Subscribed views re-render from these instead of polling.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CatalogEvent {
    /// The catalog was replaced wholesale by a completed load.
    Loaded { count: usize },
    /// A new listing was created and prepended.
    Created { listing: Listing },
    /// The selection moved to a different listing.
    SelectionChanged { id: String },
    /// The selection was cleared.
    SelectionCleared,
}
