use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stallside_sdk::{Listing, ListingDraft, PLACEHOLDER_IMAGE_URL, Transaction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `{token, ...}` from the auth endpoints; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// A listing as the backend serializes it. The API grew up around
/// `product_type`/`contact_info` field names; newer responses use the
/// frontend names, so both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiListing {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default, alias = "product_type")]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: serde_json::Value,
    #[serde(default, alias = "image_url")]
    image: String,
    #[serde(default, alias = "username")]
    seller: String,
    #[serde(default, alias = "contact_info")]
    contact: String,
}

impl ApiListing {
    pub fn into_listing(self) -> Listing {
        let image = if self.image.is_empty() {
            PLACEHOLDER_IMAGE_URL.to_string()
        } else {
            self.image
        };
        Listing {
            id: scalar_to_string(&self.id),
            title: self.title,
            description: self.description,
            price: scalar_to_string(&self.price),
            image,
            seller: self.seller,
            contact: self.contact,
        }
    }
}

/// Render a JSON scalar (string or number) as its display string.
fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    #[serde(default)]
    posts: Vec<ApiListing>,
}

#[derive(Debug, Deserialize)]
struct CreateListingResponse {
    #[serde(default)]
    post: Option<ApiListing>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

/// Confirmation for a submitted transaction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmation {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Thin client over the marketplace backend.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- auth ---

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(format!("{}/api/users/login", self.base_url))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(format!("{}/api/users/register", self.base_url))
            .json(request)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    // --- listings ---

    pub async fn fetch_listings(&self) -> Result<Vec<Listing>, ApiError> {
        let resp = self
            .client
            .get(format!("{}/api/posts/", self.base_url))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: ListingsResponse = resp.json().await?;
        Ok(body.posts.into_iter().map(ApiListing::into_listing).collect())
    }

    pub async fn fetch_my_listings(&self, token: &str) -> Result<Vec<Listing>, ApiError> {
        let resp = self
            .client
            .get(format!("{}/api/posts/user", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: ListingsResponse = resp.json().await?;
        Ok(body.posts.into_iter().map(ApiListing::into_listing).collect())
    }

    /// Server-side search. Read-only; never touches the local catalog.
    pub async fn search_listings(&self, query: &str) -> Result<Vec<Listing>, ApiError> {
        let resp = self
            .client
            .post(format!("{}/api/posts/search", self.base_url))
            .json(&SearchRequest { query })
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: ListingsResponse = resp.json().await?;
        Ok(body.posts.into_iter().map(ApiListing::into_listing).collect())
    }

    /// Submit a new listing as a multipart form, attaching the image bytes
    /// when the draft has any. Returns the server's echo of the created
    /// listing when it sends a usable one.
    pub async fn create_listing(
        &self,
        draft: &ListingDraft,
        token: &str,
    ) -> Result<Option<Listing>, ApiError> {
        let mut form = reqwest::multipart::Form::new()
            .text("product_type", draft.title.clone())
            .text("quantity", "1".to_string())
            .text("price", draft.price.clone())
            .text("description", draft.description.clone())
            .text("contact_info", draft.contact.clone());

        if let Some(image) = &draft.image {
            let part = reqwest::multipart::Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime_type)
                .map_err(|e| ApiError::InvalidRequest(format!("image part: {e}")))?;
            form = form.part("image", part);
        }

        let resp = self
            .client
            .post(format!("{}/api/posts/", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: CreateListingResponse = resp.json().await?;
        Ok(body.post.map(ApiListing::into_listing))
    }

    // --- transactions ---

    /// Submit a single transaction record (a JSON object, not an array).
    pub async fn submit_transaction(
        &self,
        transaction: &Transaction,
        token: &str,
    ) -> Result<TransactionConfirmation, ApiError> {
        let resp = self
            .client
            .post(format!("{}/api/transactions", self.base_url))
            .bearer_auth(token)
            .json(transaction)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Map a non-2xx response to `ApiError::Status`, lifting the backend's
/// `{"error": "..."}` message when the body carries one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or(body);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_listing_accepts_backend_field_names() {
        let json = r#"{
            "id": 3,
            "product_type": "Bike",
            "quantity": 1,
            "price": 120.5,
            "description": "red frame",
            "contact_info": "bert@example.com",
            "username": "bert"
        }"#;
        let api: ApiListing = serde_json::from_str(json).unwrap();
        let listing = api.into_listing();
        assert_eq!(listing.id, "3");
        assert_eq!(listing.title, "Bike");
        assert_eq!(listing.price, "120.5");
        assert_eq!(listing.contact, "bert@example.com");
        assert_eq!(listing.seller, "bert");
        assert_eq!(listing.image, PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn api_listing_accepts_frontend_field_names() {
        let json = r#"{
            "id": "a1b2",
            "title": "Lamp",
            "price": "15",
            "description": "",
            "contact": "mai@example.com",
            "seller": "mai",
            "image": "http://img/lamp.jpg"
        }"#;
        let api: ApiListing = serde_json::from_str(json).unwrap();
        let listing = api.into_listing();
        assert_eq!(listing.id, "a1b2");
        assert_eq!(listing.title, "Lamp");
        assert_eq!(listing.image, "http://img/lamp.jpg");
    }

    #[test]
    fn listings_response_tolerates_missing_posts_key() {
        let body: ListingsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.posts.is_empty());
    }

    #[test]
    fn error_message_lifted_from_json_body() {
        assert_eq!(
            extract_error_message(r#"{"error": "Missing required fields"}"#).as_deref(),
            Some("Missing required fields")
        );
        assert!(extract_error_message("<html>502</html>").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
    }

    #[test]
    fn auth_response_ignores_extra_fields() {
        let auth: AuthResponse =
            serde_json::from_str(r#"{"token": "jwt-abc", "user": {"id": 1}}"#).unwrap();
        assert_eq!(auth.token, "jwt-abc");
    }
}
