use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Image MIME types accepted for a listing attachment.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Upper bound for an attached image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Placeholder shown for listings created without an image.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x200";

/// A single marketplace item as the frontend sees it.
///
/// Immutable once created; edits are not supported. `price` stays a formatted
/// string — it is compared and displayed, never used for arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Opaque unique id. Server-assigned for fetched listings,
    /// `local-<n>` for listings created in this session.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub seller: String,
    #[serde(default)]
    pub contact: String,
}

/// An image staged for upload alongside a new listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// User-entered candidate listing, not yet validated or submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub title: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
}

impl ListingDraft {
    /// Validate the draft in a fixed order: required fields, then price,
    /// then the image attachment.
    ///
    /// All missing required fields are collected and reported together so
    /// the form can mark every offending input at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title".to_string());
        }
        if self.price.trim().is_empty() {
            missing.push("price".to_string());
        }
        if self.contact.trim().is_empty() {
            missing.push("contact".to_string());
        }
        if !missing.is_empty() {
            return Err(Error::Validation(missing));
        }

        let parsed: f64 = self
            .price
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPrice(self.price.clone()))?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(Error::InvalidPrice(self.price.clone()));
        }

        if let Some(image) = &self.image {
            image.validate()?;
        }

        Ok(())
    }
}

impl ImageAttachment {
    /// Reject attachments the backend will not accept: unknown MIME types
    /// and anything over [`MAX_IMAGE_BYTES`].
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_IMAGE_TYPES.contains(&self.mime_type.as_str()) {
            return Err(Error::UnsupportedImage(format!(
                "unsupported type: {}",
                self.mime_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(Error::UnsupportedImage("empty file".to_string()));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::UnsupportedImage(format!(
                "file too large: {} bytes (max {})",
                self.bytes.len(),
                MAX_IMAGE_BYTES
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> ListingDraft {
        ListingDraft {
            title: "Mountain bike".to_string(),
            price: "120".to_string(),
            description: "Hardly used".to_string(),
            contact: "bert@example.com".to_string(),
            image: None,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(valid_draft().validate().is_ok());
    }

    #[test]
    fn missing_title_is_named() {
        let draft = ListingDraft {
            title: "".to_string(),
            ..valid_draft()
        };
        match draft.validate() {
            Err(Error::Validation(fields)) => assert_eq!(fields, vec!["title".to_string()]),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn all_missing_fields_are_collected_in_order() {
        let draft = ListingDraft::default();
        match draft.validate() {
            Err(Error::Validation(fields)) => {
                assert_eq!(fields, vec!["title", "price", "contact"]);
            }
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let draft = ListingDraft {
            contact: "   ".to_string(),
            ..valid_draft()
        };
        assert!(matches!(draft.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn negative_price_rejected() {
        let draft = ListingDraft {
            price: "-5".to_string(),
            ..valid_draft()
        };
        assert!(matches!(draft.validate(), Err(Error::InvalidPrice(_))));
    }

    #[test]
    fn non_numeric_price_rejected() {
        let draft = ListingDraft {
            price: "ten dollars".to_string(),
            ..valid_draft()
        };
        assert!(matches!(draft.validate(), Err(Error::InvalidPrice(_))));
    }

    #[test]
    fn zero_price_is_allowed() {
        let draft = ListingDraft {
            price: "0".to_string(),
            ..valid_draft()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn unknown_image_type_rejected() {
        let draft = ListingDraft {
            image: Some(ImageAttachment {
                file_name: "listing.tiff".to_string(),
                mime_type: "image/tiff".to_string(),
                bytes: vec![0u8; 16],
            }),
            ..valid_draft()
        };
        assert!(matches!(draft.validate(), Err(Error::UnsupportedImage(_))));
    }

    #[test]
    fn oversized_image_rejected() {
        let image = ImageAttachment {
            file_name: "big.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0u8; MAX_IMAGE_BYTES + 1],
        };
        assert!(matches!(image.validate(), Err(Error::UnsupportedImage(_))));
    }

    #[test]
    fn listing_serde_uses_camel_case() {
        let listing = Listing {
            id: "7".to_string(),
            title: "Desk lamp".to_string(),
            description: "".to_string(),
            price: "15".to_string(),
            image: PLACEHOLDER_IMAGE_URL.to_string(),
            seller: "ana".to_string(),
            contact: "ana@example.com".to_string(),
        };
        let json = serde_json::to_string(&listing).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], "7");
        assert_eq!(value["price"], "15");
        assert!(value.get("image").is_some());
    }
}
