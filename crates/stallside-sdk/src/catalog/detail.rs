use serde::Serialize;

use crate::listing::Listing;

/// Detail view model for a single listing. Everything the detail pane shows,
/// plus the id the single allowed action (proceed to checkout) needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetail {
    pub listing_id: String,
    pub title: String,
    pub price: String,
    pub image: String,
    pub description: String,
    pub seller: String,
    pub contact: String,
}

/// Build the detail view model for a listing.
pub fn project(listing: &Listing) -> ListingDetail {
    ListingDetail {
        listing_id: listing.id.clone(),
        title: listing.title.clone(),
        price: listing.price.clone(),
        image: listing.image.clone(),
        description: listing.description.clone(),
        seller: listing.seller.clone(),
        contact: listing.contact.clone(),
    }
}
