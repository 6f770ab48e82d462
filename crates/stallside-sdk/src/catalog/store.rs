use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::listing::{Listing, ListingDraft, PLACEHOLDER_IMAGE_URL};

use super::detail::{ListingDetail, project};
use super::events::CatalogEvent;

/// Capacity of the catalog event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle for an in-flight catalog load. Only the most recently issued
/// ticket may apply its result; earlier loads that settle late are discarded
/// so a slow response can never overwrite a newer one.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
}

/// What became of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The catalog was replaced with this load's listings.
    Applied { count: usize },
    /// A newer load was issued in the meantime; this result was dropped.
    Discarded,
}

/// Owner of the listing sequence and the selection pointer.
///
/// Insertion order is display order, newest first. Every mutation pushes a
/// [`CatalogEvent`] to subscribers; presentation layers re-render from those
/// rather than polling.
pub struct CatalogStore {
    listings: Vec<Listing>,
    selected_id: Option<String>,
    next_local_id: u64,
    load_generation: u64,
    tx: broadcast::Sender<CatalogEvent>,
}

impl CatalogStore {
    /// Create an empty store and a receiver for its events.
    pub fn new() -> (Self, broadcast::Receiver<CatalogEvent>) {
        let (tx, rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                listings: Vec::new(),
                selected_id: None,
                next_local_id: 1,
                load_generation: 0,
                tx,
            },
            rx,
        )
    }

    /// Get an additional receiver for catalog events.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    // --- loading ---

    /// Register a load about to start. Supersedes any ticket issued earlier.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_generation += 1;
        LoadTicket {
            generation: self.load_generation,
        }
    }

    /// Apply a finished load, replacing the catalog wholesale — unless a
    /// newer load was issued since `ticket`, in which case the result is
    /// discarded and the current state stays untouched.
    ///
    /// A selection pointing at a listing the new catalog no longer contains
    /// is cleared.
    pub fn complete_load(&mut self, ticket: LoadTicket, listings: Vec<Listing>) -> LoadOutcome {
        if ticket.generation != self.load_generation {
            log::debug!(
                "discarding stale catalog load (generation {} < {})",
                ticket.generation,
                self.load_generation
            );
            return LoadOutcome::Discarded;
        }

        let count = listings.len();
        self.listings = listings;

        if let Some(id) = self.selected_id.clone() {
            if self.get(&id).is_none() {
                self.selected_id = None;
                let _ = self.tx.send(CatalogEvent::SelectionCleared);
            }
        }

        let _ = self.tx.send(CatalogEvent::Loaded { count });
        LoadOutcome::Applied { count }
    }

    // --- creation ---

    /// Validate a draft, assign a local id, prepend the listing, and select
    /// it. Returns the created listing.
    pub fn create(&mut self, draft: &ListingDraft, seller: &str) -> Result<Listing> {
        draft.validate()?;

        let id = format!("local-{}", self.next_local_id);
        self.next_local_id += 1;

        let listing = Listing {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            price: draft.price.trim().to_string(),
            image: draft
                .image
                .as_ref()
                .map(|img| img.file_name.clone())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            seller: seller.to_string(),
            contact: draft.contact.trim().to_string(),
        };

        self.insert_and_select(listing.clone());
        Ok(listing)
    }

    /// Prepend and select a listing the server already confirmed (and
    /// assigned an id to). The id must not collide with a stored one.
    pub fn insert_confirmed(&mut self, listing: Listing) -> Result<Listing> {
        if self.get(&listing.id).is_some() {
            return Err(Error::DuplicateId(listing.id));
        }
        self.insert_and_select(listing.clone());
        Ok(listing)
    }

    fn insert_and_select(&mut self, listing: Listing) {
        let id = listing.id.clone();
        self.listings.insert(0, listing.clone());
        self.selected_id = Some(id.clone());
        let _ = self.tx.send(CatalogEvent::Created { listing });
        let _ = self.tx.send(CatalogEvent::SelectionChanged { id });
    }

    // --- selection ---

    /// Point the selection at `id`. Unknown ids leave the state unchanged.
    /// Re-selecting the current id is a no-op (no duplicate event).
    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.selected_id.as_deref() == Some(id) {
            return Ok(());
        }
        if self.get(id).is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.selected_id = Some(id.to_string());
        let _ = self.tx.send(CatalogEvent::SelectionChanged { id: id.to_string() });
        Ok(())
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        if self.selected_id.take().is_some() {
            let _ = self.tx.send(CatalogEvent::SelectionCleared);
        }
    }

    // --- accessors ---

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Listing> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    /// Detail view model for the current selection. `None` is the ordinary
    /// empty-selection state, not an error.
    pub fn selected_detail(&self) -> Option<ListingDetail> {
        self.selected().map(project)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingDraft;

    fn listing(id: &str, title: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            price: "10".to_string(),
            image: String::new(),
            seller: "seller".to_string(),
            contact: "contact".to_string(),
        }
    }

    fn draft(title: &str) -> ListingDraft {
        ListingDraft {
            title: title.to_string(),
            price: "25".to_string(),
            description: String::new(),
            contact: "me@example.com".to_string(),
            image: None,
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<CatalogEvent>) -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn load_replaces_and_notifies() {
        let (mut store, mut rx) = CatalogStore::new();
        let ticket = store.begin_load();
        let outcome = store.complete_load(ticket, vec![listing("1", "Bike"), listing("2", "Book")]);
        assert_eq!(outcome, LoadOutcome::Applied { count: 2 });
        assert_eq!(store.len(), 2);
        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [CatalogEvent::Loaded { count: 2 }]));
    }

    #[test]
    fn stale_load_is_discarded_last_issued_wins() {
        let (mut store, _rx) = CatalogStore::new();
        let first = store.begin_load();
        let second = store.begin_load();

        // The newer load settles first.
        assert_eq!(
            store.complete_load(second, vec![listing("2", "Book")]),
            LoadOutcome::Applied { count: 1 }
        );
        // The older one arrives late and must not overwrite.
        assert_eq!(
            store.complete_load(first, vec![listing("1", "Bike")]),
            LoadOutcome::Discarded
        );
        assert_eq!(store.listings()[0].id, "2");
    }

    #[test]
    fn failed_load_leaves_prior_state_untouched() {
        let (mut store, _rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);

        // A load that fails never reaches complete_load; dropping the ticket
        // is all that happens.
        let _abandoned = store.begin_load();
        assert_eq!(store.len(), 1);
        assert_eq!(store.listings()[0].id, "1");
    }

    #[test]
    fn reload_clears_dangling_selection() {
        let (mut store, mut rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);
        store.select("1").unwrap();
        drain(&mut rx);

        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("2", "Book")]);
        assert_eq!(store.selected_id(), None);
        let events = drain(&mut rx);
        assert!(matches!(events[0], CatalogEvent::SelectionCleared));
    }

    #[test]
    fn reload_keeps_selection_when_listing_survives() {
        let (mut store, _rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);
        store.select("1").unwrap();

        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("2", "Book"), listing("1", "Bike")]);
        assert_eq!(store.selected_id(), Some("1"));
    }

    #[test]
    fn create_prepends_and_selects() {
        let (mut store, _rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("server-9", "Old lamp")]);

        let created = store.create(&draft("New chair"), "ana").unwrap();
        assert_eq!(created.id, "local-1");
        assert_eq!(store.listings()[0].id, "local-1");
        assert_eq!(store.listings()[1].id, "server-9");
        assert_eq!(store.selected_id(), Some("local-1"));
        assert_eq!(created.seller, "ana");
    }

    #[test]
    fn local_ids_are_unique_and_monotonic() {
        let (mut store, _rx) = CatalogStore::new();
        let a = store.create(&draft("A"), "ana").unwrap();
        let b = store.create(&draft("B"), "ana").unwrap();
        assert_eq!(a.id, "local-1");
        assert_eq!(b.id, "local-2");
    }

    #[test]
    fn invalid_draft_leaves_catalog_unchanged() {
        let (mut store, mut rx) = CatalogStore::new();
        let bad = ListingDraft {
            title: String::new(),
            ..draft("ignored")
        };
        let err = store.create(&bad, "ana").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.len(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn insert_confirmed_rejects_duplicate_id() {
        let (mut store, _rx) = CatalogStore::new();
        store.insert_confirmed(listing("7", "Kettle")).unwrap();
        let err = store.insert_confirmed(listing("7", "Other kettle")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.listings()[0].title, "Kettle");
    }

    #[test]
    fn select_unknown_id_reports_not_found_and_keeps_state() {
        let (mut store, _rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);
        store.select("1").unwrap();

        let err = store.select("999").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.selected_id(), Some("1"));
    }

    #[test]
    fn select_is_idempotent_no_duplicate_events() {
        let (mut store, mut rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);
        drain(&mut rx);

        store.select("1").unwrap();
        store.select("1").unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], CatalogEvent::SelectionChanged { id } if id == "1"));
    }

    #[test]
    fn deselect_clears_and_is_quiet_when_nothing_selected() {
        let (mut store, mut rx) = CatalogStore::new();
        let ticket = store.begin_load();
        store.complete_load(ticket, vec![listing("1", "Bike")]);
        store.select("1").unwrap();
        drain(&mut rx);

        store.deselect();
        assert_eq!(store.selected_id(), None);
        assert_eq!(drain(&mut rx).len(), 1);

        store.deselect();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn selected_detail_projects_selection() {
        let (mut store, _rx) = CatalogStore::new();
        assert!(store.selected_detail().is_none());

        store.insert_confirmed(listing("1", "Bike")).unwrap();
        let detail = store.selected_detail().unwrap();
        assert_eq!(detail.listing_id, "1");
        assert_eq!(detail.title, "Bike");
    }
}
