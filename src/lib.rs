mod api;
pub mod commands;
mod session;
mod state;

use std::sync::Mutex;

use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::broadcast;

use stallside_sdk::{CatalogEvent, CatalogStore, CheckoutFlow};

use api::{ApiClient, RegisterRequest};
use state::{AppState, AppStateManager};

const APP_STATE_UPDATED_EVENT: &str = "app_state_updated";
const CATALOG_UPDATED_EVENT: &str = "catalog_updated";

// SDK state (managed alongside AppStateManager)
pub struct SdkState {
    pub catalog: Mutex<CatalogStore>,
    pub checkout: Mutex<CheckoutFlow>,
}

// ============================================================================
// App State Commands
// ============================================================================

#[tauri::command]
async fn get_app_state(app: AppHandle) -> Result<AppState, String> {
    tokio::task::spawn_blocking(move || {
        let manager = app.state::<Mutex<AppStateManager>>();
        let mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        Ok(mgr.snapshot())
    })
    .await
    .map_err(|e| format!("state task failed: {e}"))?
}

#[tauri::command]
async fn set_server_url(url: String, app: AppHandle) -> Result<AppState, String> {
    let app_handle = app.clone();
    tokio::task::spawn_blocking(move || {
        let manager = app_handle.state::<Mutex<AppStateManager>>();
        let mut mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        let state = mgr.set_server_url(url);
        emit_state(&app_handle, &state);
        Ok(state)
    })
    .await
    .map_err(|e| format!("set_server_url task failed: {e}"))?
}

// ============================================================================
// Session Commands
// ============================================================================

#[tauri::command]
async fn is_authenticated(app: AppHandle) -> Result<bool, String> {
    tokio::task::spawn_blocking(move || {
        let manager = app.state::<Mutex<AppStateManager>>();
        let mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        Ok(mgr.is_authenticated())
    })
    .await
    .map_err(|e| format!("session task failed: {e}"))?
}

#[tauri::command]
async fn login(username: String, password: String, app: AppHandle) -> Result<AppState, String> {
    let api = client_for(&app)?;
    let auth = api
        .login(&username, &password)
        .await
        .map_err(|e| e.to_string())?;

    // Only a successful response touches stored session state.
    let app_handle = app.clone();
    tokio::task::spawn_blocking(move || {
        let manager = app_handle.state::<Mutex<AppStateManager>>();
        let mut mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        mgr.set_session(auth.token, username)?;
        let state = mgr.snapshot();
        emit_state(&app_handle, &state);
        Ok(state)
    })
    .await
    .map_err(|e| format!("login task failed: {e}"))?
}

#[tauri::command]
async fn register(
    username: String,
    email: String,
    password: String,
    app: AppHandle,
) -> Result<AppState, String> {
    let api = client_for(&app)?;
    let request = RegisterRequest {
        username: username.clone(),
        email,
        password,
    };
    let auth = api.register(&request).await.map_err(|e| e.to_string())?;

    let app_handle = app.clone();
    tokio::task::spawn_blocking(move || {
        let manager = app_handle.state::<Mutex<AppStateManager>>();
        let mut mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        mgr.set_session(auth.token, username)?;
        let state = mgr.snapshot();
        emit_state(&app_handle, &state);
        Ok(state)
    })
    .await
    .map_err(|e| format!("register task failed: {e}"))?
}

#[tauri::command]
async fn logout(app: AppHandle) -> Result<AppState, String> {
    // Abandon any checkout draft; a flow that is Idle (or mid-submission)
    // is left alone.
    {
        let sdk = app.state::<SdkState>();
        if let Ok(mut flow) = sdk.checkout.lock() {
            let _ = flow.cancel();
        }
    }

    let app_handle = app.clone();
    tokio::task::spawn_blocking(move || {
        let manager = app_handle.state::<Mutex<AppStateManager>>();
        let mut mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
        mgr.clear_session()?;
        let state = mgr.snapshot();
        emit_state(&app_handle, &state);
        Ok(state)
    })
    .await
    .map_err(|e| format!("logout task failed: {e}"))?
}

// ============================================================================
// Helpers
// ============================================================================

fn client_for(app: &AppHandle) -> Result<ApiClient, String> {
    let manager = app.state::<Mutex<AppStateManager>>();
    let mgr = manager.lock().map_err(|_| "state lock failed".to_string())?;
    ApiClient::new(mgr.server_url()).map_err(|e| e.to_string())
}

pub(crate) fn emit_state(app: &AppHandle, state: &AppState) {
    let _ = app.emit(APP_STATE_UPDATED_EVENT, state);
}

/// Forward catalog store events to the webview so subscribed views
/// re-render without polling.
async fn forward_catalog_events(app: AppHandle, mut rx: broadcast::Receiver<CatalogEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let _ = app.emit(CATALOG_UPDATED_EVENT, &event);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("catalog event stream lagged, skipped {skipped}");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ============================================================================
// App Entry Point
// ============================================================================

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(
            tauri_plugin_log::Builder::default()
                .level(log::LevelFilter::Info)
                .level_for("reqwest", log::LevelFilter::Warn)
                .level_for("hyper", log::LevelFilter::Warn)
                .level_for("tao", log::LevelFilter::Warn)
                .build(),
        )
        .setup(|app| {
            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("failed to get app data directory");

            let manager = AppStateManager::new(app_data_dir);

            let (catalog, catalog_rx) = CatalogStore::new();
            let mut checkout = CheckoutFlow::default();

            // A listing staged for payment in a previous session resumes the
            // flow where the user left it.
            if manager.is_authenticated() {
                if let Some(item) = manager.selected_item().cloned() {
                    if let Err(e) = checkout.choose_item(item) {
                        log::warn!("could not restore staged payment item: {e}");
                    }
                }
            }

            app.manage(Mutex::new(manager));
            app.manage(SdkState {
                catalog: Mutex::new(catalog),
                checkout: Mutex::new(checkout),
            });

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(forward_catalog_events(handle, catalog_rx));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App state
            get_app_state,
            set_server_url,
            // Session
            is_authenticated,
            login,
            register,
            logout,
            // Catalog
            commands::load_catalog,
            commands::list_listings,
            commands::search_catalog,
            commands::search_remote,
            commands::load_my_listings,
            commands::select_listing,
            commands::deselect_listing,
            commands::get_listing_detail,
            commands::create_listing,
            // Checkout
            commands::checkout_state,
            commands::payment_methods,
            commands::checkout_choose_item,
            commands::checkout_choose_method,
            commands::checkout_confirm,
            commands::checkout_retry,
            commands::checkout_cancel,
            commands::checkout_acknowledge,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
