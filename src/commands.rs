use std::sync::Mutex;

use tauri::{AppHandle, Manager};

use stallside_sdk::{
    CheckoutSnapshot, CheckoutState, Error as SdkError, Listing, ListingDetail, ListingDraft,
    LoadOutcome, PaymentMethod, SearchResult, search,
};

use crate::api::ApiClient;
use crate::session::StoredSession;
use crate::state::AppStateManager;
use crate::{SdkState, emit_state};

// ============================================================================
// Helpers
// ============================================================================

fn server_url(app: &AppHandle) -> Result<String, String> {
    let manager = app.state::<Mutex<AppStateManager>>();
    let mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
    Ok(mgr.server_url().to_string())
}

/// Posting and paying require an active session; reject up front when the
/// token is absent.
fn require_session(app: &AppHandle) -> Result<StoredSession, String> {
    let manager = app.state::<Mutex<AppStateManager>>();
    let mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
    mgr.session().ok_or_else(|| SdkError::AuthRequired.to_string())
}

fn api_client(app: &AppHandle) -> Result<ApiClient, String> {
    ApiClient::new(server_url(app)?).map_err(|e| e.to_string())
}

/// Persist the listing staged for payment (or clear it) and push the new
/// app-state snapshot to the frontend.
async fn save_staged_item(
    app: &AppHandle,
    item: Option<Listing>,
    task_label: &str,
) -> Result<(), String> {
    let app_ref = app.clone();
    tokio::task::spawn_blocking(move || {
        let manager = app_ref.state::<Mutex<AppStateManager>>();
        let mut mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        mgr.set_selected_item(item);
        let state = mgr.snapshot();
        emit_state(&app_ref, &state);
        Ok::<_, String>(())
    })
    .await
    .map_err(|e| format!("{task_label} save task failed: {e}"))?
}

// ============================================================================
// Catalog commands
// ============================================================================

#[tauri::command]
pub async fn load_catalog(app: AppHandle) -> Result<Vec<Listing>, String> {
    let api = api_client(&app)?;

    let ticket = {
        let sdk = app.state::<SdkState>();
        let mut catalog = sdk
            .catalog
            .lock()
            .map_err(|_| "catalog lock failed".to_string())?;
        catalog.begin_load()
    };

    // On a fetch failure the ticket is simply dropped and the catalog keeps
    // its previous contents.
    let listings = api.fetch_listings().await.map_err(|e| e.to_string())?;

    let sdk = app.state::<SdkState>();
    let mut catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    if catalog.complete_load(ticket, listings) == LoadOutcome::Discarded {
        log::debug!("load_catalog: superseded by a newer load");
    }
    Ok(catalog.listings().to_vec())
}

#[tauri::command]
pub async fn list_listings(app: AppHandle) -> Result<Vec<Listing>, String> {
    let sdk = app.state::<SdkState>();
    let catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    Ok(catalog.listings().to_vec())
}

/// Derived free-text filter over the in-memory catalog. Recomputed on every
/// call; never mutates the store.
#[tauri::command]
pub async fn search_catalog(query: String, app: AppHandle) -> Result<SearchResult, String> {
    let sdk = app.state::<SdkState>();
    let catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    Ok(search(catalog.listings(), &query))
}

/// Ask the backend to search instead. Read-only: results go straight to the
/// caller and the local catalog stays as it is.
#[tauri::command]
pub async fn search_remote(query: String, app: AppHandle) -> Result<Vec<Listing>, String> {
    let api = api_client(&app)?;
    api.search_listings(&query).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn load_my_listings(app: AppHandle) -> Result<Vec<Listing>, String> {
    let session = require_session(&app)?;
    let api = api_client(&app)?;
    api.fetch_my_listings(&session.token)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn select_listing(id: String, app: AppHandle) -> Result<ListingDetail, String> {
    let sdk = app.state::<SdkState>();
    let mut catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    catalog.select(&id).map_err(|e| e.to_string())?;
    catalog
        .selected_detail()
        .ok_or_else(|| "No listing selected".to_string())
}

#[tauri::command]
pub async fn deselect_listing(app: AppHandle) -> Result<(), String> {
    let sdk = app.state::<SdkState>();
    let mut catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    catalog.deselect();
    Ok(())
}

#[tauri::command]
pub async fn get_listing_detail(app: AppHandle) -> Result<ListingDetail, String> {
    let sdk = app.state::<SdkState>();
    let catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    catalog
        .selected_detail()
        .ok_or_else(|| "No listing selected".to_string())
}

/// Validate and submit a new listing, then mirror the accepted listing into
/// the catalog. All-or-nothing: a failed upload adds nothing and the caller
/// keeps the draft for resubmission.
#[tauri::command]
pub async fn create_listing(draft: ListingDraft, app: AppHandle) -> Result<Listing, String> {
    let session = require_session(&app)?;
    draft.validate().map_err(|e| e.to_string())?;

    let api = api_client(&app)?;
    let confirmed = api
        .create_listing(&draft, &session.token)
        .await
        .map_err(|e| e.to_string())?;

    let sdk = app.state::<SdkState>();
    let mut catalog = sdk
        .catalog
        .lock()
        .map_err(|_| "catalog lock failed".to_string())?;
    let listing = match confirmed {
        Some(listing) => catalog.insert_confirmed(listing).map_err(|e| e.to_string())?,
        // The server acknowledged but echoed nothing usable; fall back to
        // the validated local draft.
        None => catalog
            .create(&draft, &session.username)
            .map_err(|e| e.to_string())?,
    };
    Ok(listing)
}

// ============================================================================
// Checkout commands
// ============================================================================

#[tauri::command]
pub async fn checkout_state(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    let sdk = app.state::<SdkState>();
    let flow = sdk
        .checkout
        .lock()
        .map_err(|_| "checkout lock failed".to_string())?;
    Ok(flow.snapshot())
}

#[tauri::command]
pub async fn payment_methods(app: AppHandle) -> Result<Vec<PaymentMethod>, String> {
    let sdk = app.state::<SdkState>();
    let flow = sdk
        .checkout
        .lock()
        .map_err(|_| "checkout lock failed".to_string())?;
    Ok(flow.allowed_methods().to_vec())
}

#[tauri::command]
pub async fn checkout_choose_item(
    listing_id: String,
    app: AppHandle,
) -> Result<CheckoutSnapshot, String> {
    require_session(&app)?;

    let sdk = app.state::<SdkState>();
    let listing = {
        let catalog = sdk
            .catalog
            .lock()
            .map_err(|_| "catalog lock failed".to_string())?;
        catalog
            .get(&listing_id)
            .cloned()
            .ok_or_else(|| SdkError::NotFound(listing_id.clone()).to_string())?
    };

    let snapshot = {
        let mut flow = sdk
            .checkout
            .lock()
            .map_err(|_| "checkout lock failed".to_string())?;
        flow.choose_item(listing.clone()).map_err(|e| e.to_string())?;
        flow.snapshot()
    };

    save_staged_item(&app, Some(listing), "choose_item").await?;
    Ok(snapshot)
}

#[tauri::command]
pub async fn checkout_choose_method(
    method: String,
    app: AppHandle,
) -> Result<CheckoutSnapshot, String> {
    require_session(&app)?;
    let method: PaymentMethod = method.parse().map_err(|e: SdkError| e.to_string())?;

    let sdk = app.state::<SdkState>();
    let mut flow = sdk
        .checkout
        .lock()
        .map_err(|_| "checkout lock failed".to_string())?;
    flow.choose_method(method).map_err(|e| e.to_string())?;
    Ok(flow.snapshot())
}

/// Explicit confirmation: build the transaction record and immediately
/// attempt submission. Failure leaves the flow in Failed with the draft
/// intact; nothing is ever retried automatically.
#[tauri::command]
pub async fn checkout_confirm(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    confirm_and_submit(app).await
}

/// Manual retry after a failed submission: back to MethodChosen, then the
/// same confirm-and-submit path.
#[tauri::command]
pub async fn checkout_retry(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    {
        let sdk = app.state::<SdkState>();
        let mut flow = sdk
            .checkout
            .lock()
            .map_err(|_| "checkout lock failed".to_string())?;
        flow.retry().map_err(|e| e.to_string())?;
    }
    confirm_and_submit(app).await
}

#[tauri::command]
pub async fn checkout_cancel(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    let snapshot = {
        let sdk = app.state::<SdkState>();
        let mut flow = sdk
            .checkout
            .lock()
            .map_err(|_| "checkout lock failed".to_string())?;
        flow.cancel().map_err(|e| e.to_string())?;
        flow.snapshot()
    };
    save_staged_item(&app, None, "checkout_cancel").await?;
    Ok(snapshot)
}

/// Dismiss the success screen and return the flow to Idle.
#[tauri::command]
pub async fn checkout_acknowledge(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    let sdk = app.state::<SdkState>();
    let mut flow = sdk
        .checkout
        .lock()
        .map_err(|_| "checkout lock failed".to_string())?;
    flow.acknowledge_success().map_err(|e| e.to_string())?;
    Ok(flow.snapshot())
}

async fn confirm_and_submit(app: AppHandle) -> Result<CheckoutSnapshot, String> {
    let session = require_session(&app)?;
    let api = api_client(&app)?;

    let transaction = {
        let sdk = app.state::<SdkState>();
        let mut flow = sdk
            .checkout
            .lock()
            .map_err(|_| "checkout lock failed".to_string())?;
        flow.confirm(&session.username).map_err(|e| e.to_string())?;
        flow.begin_submission().map_err(|e| e.to_string())?
    };

    // The submission runs to completion; the flow cannot be cancelled from
    // here on.
    let result = api.submit_transaction(&transaction, &session.token).await;

    let snapshot = {
        let sdk = app.state::<SdkState>();
        let mut flow = sdk
            .checkout
            .lock()
            .map_err(|_| "checkout lock failed".to_string())?;
        match result {
            Ok(confirmation) => {
                log::info!("transaction accepted: {}", confirmation.message);
                flow.submission_succeeded().map_err(|e| e.to_string())?;
            }
            Err(e) => {
                flow.submission_failed(e.to_string()).map_err(|e| e.to_string())?;
            }
        }
        flow.snapshot()
    };

    if snapshot.state == CheckoutState::Submitted {
        save_staged_item(&app, None, "checkout_submit").await?;
    }
    Ok(snapshot)
}
