pub mod catalog;
pub mod checkout;
pub mod error;
pub mod listing;

// Core types
pub use error::{Error, Result};
pub use listing::{
    ImageAttachment, Listing, ListingDraft, MAX_IMAGE_BYTES, PLACEHOLDER_IMAGE_URL,
    SUPPORTED_IMAGE_TYPES,
};

// Catalog: store, events, derived search, detail projection
pub use catalog::{
    CatalogEvent, CatalogStore, ListingDetail, LoadOutcome, LoadTicket, SearchOutcome,
    SearchResult, filter, project, search,
};

// Checkout flow
pub use checkout::{
    CheckoutConfig, CheckoutFlow, CheckoutSnapshot, CheckoutState, PaymentMethod, Transaction,
};
