use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use stallside_sdk::Listing;

use crate::session::{SessionStore, StoredSession};

const LOCAL_STATE_FILE: &str = "stallside_state.json";
const CONFIG_FILE: &str = "server_config.json";

/// Default backend address when no server has been configured yet.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

// ============================================================================
// Persisted local state (checkout selection)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalState {
    /// Listing staged for payment. Written only through the checkout
    /// commands; cleared on successful submission or explicit cancel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_item: Option<Listing>,
}

// ============================================================================
// App state (sent to frontend)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub revision: u64,
    pub server_url: String,
    pub session: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_item: Option<Listing>,
}

// ============================================================================
// App state manager
// ============================================================================

pub struct AppStateManager {
    app_data_dir: PathBuf,
    server_url: String,
    session: SessionStore,
    local_state: LocalState,
    revision: u64,
}

impl AppStateManager {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let session = SessionStore::new(&app_data_dir);
        let local_state = Self::load_local_state(&app_data_dir).unwrap_or_default();
        let server_url = Self::load_server_config(&app_data_dir)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Self {
            app_data_dir,
            server_url,
            session,
            local_state,
            revision: 0,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn set_server_url(&mut self, url: String) -> AppState {
        self.server_url = url;
        self.save_server_config();
        self.bump_revision();
        self.snapshot()
    }

    // --- session gate ---

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.session.load()
    }

    pub fn username(&self) -> Option<String> {
        self.session.username()
    }

    pub fn set_session(&mut self, token: String, username: String) -> Result<(), String> {
        self.session
            .save(&StoredSession { token, username })
            .map_err(|e| e.to_string())?;
        self.bump_revision();
        Ok(())
    }

    /// Clear the persisted session and any listing staged for payment.
    pub fn clear_session(&mut self) -> Result<(), String> {
        self.session.clear().map_err(|e| e.to_string())?;
        if self.local_state.selected_item.take().is_some() {
            self.save_local_state();
        }
        self.bump_revision();
        Ok(())
    }

    // --- checkout selection ---

    pub fn selected_item(&self) -> Option<&Listing> {
        self.local_state.selected_item.as_ref()
    }

    pub fn set_selected_item(&mut self, item: Option<Listing>) {
        self.local_state.selected_item = item;
        self.save_local_state();
        self.bump_revision();
    }

    // --- snapshot ---

    pub fn snapshot(&self) -> AppState {
        let session = self.session.load();
        AppState {
            revision: self.revision,
            server_url: self.server_url.clone(),
            session: SessionStatus {
                authenticated: session.is_some(),
                username: session.map(|s| s.username),
            },
            selected_item: self.local_state.selected_item.clone(),
        }
    }

    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    // --- Persistence helpers ---

    fn load_server_config(dir: &std::path::Path) -> Option<String> {
        let contents = fs::read_to_string(dir.join(CONFIG_FILE)).ok()?;
        let config: serde_json::Value = serde_json::from_str(&contents).ok()?;
        config
            .get("serverUrl")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn save_server_config(&self) {
        let path = self.app_data_dir.join(CONFIG_FILE);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let config = serde_json::json!({ "serverUrl": self.server_url });
        if let Ok(json) = serde_json::to_string_pretty(&config) {
            let _ = fs::write(path, json);
        }
    }

    fn load_local_state(dir: &std::path::Path) -> Option<LocalState> {
        let contents = fs::read_to_string(dir.join(LOCAL_STATE_FILE)).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save_local_state(&self) {
        let path = self.app_data_dir.join(LOCAL_STATE_FILE);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.local_state) {
            let _ = fs::write(path, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: "Bike".to_string(),
            description: String::new(),
            price: "120".to_string(),
            image: String::new(),
            seller: "bert".to_string(),
            contact: "bert@example.com".to_string(),
        }
    }

    #[test]
    fn defaults_on_fresh_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = AppStateManager::new(dir.path().to_path_buf());
        assert_eq!(mgr.server_url(), DEFAULT_SERVER_URL);
        assert!(!mgr.is_authenticated());
        assert!(mgr.selected_item().is_none());

        let state = mgr.snapshot();
        assert_eq!(state.revision, 0);
        assert!(!state.session.authenticated);
    }

    #[test]
    fn server_url_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut mgr = AppStateManager::new(dir.path().to_path_buf());
            mgr.set_server_url("http://market.example:8080".to_string());
        }
        let mgr = AppStateManager::new(dir.path().to_path_buf());
        assert_eq!(mgr.server_url(), "http://market.example:8080");
    }

    #[test]
    fn selected_item_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut mgr = AppStateManager::new(dir.path().to_path_buf());
            mgr.set_selected_item(Some(listing("7")));
        }
        let mut mgr = AppStateManager::new(dir.path().to_path_buf());
        assert_eq!(mgr.selected_item().unwrap().id, "7");

        mgr.set_selected_item(None);
        let mgr = AppStateManager::new(dir.path().to_path_buf());
        assert!(mgr.selected_item().is_none());
    }

    #[test]
    fn clear_session_also_drops_staged_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = AppStateManager::new(dir.path().to_path_buf());
        mgr.set_session("jwt-abc".to_string(), "ana".to_string())
            .unwrap();
        mgr.set_selected_item(Some(listing("7")));

        mgr.clear_session().unwrap();
        assert!(!mgr.is_authenticated());
        assert!(mgr.selected_item().is_none());
    }

    #[test]
    fn snapshot_reports_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = AppStateManager::new(dir.path().to_path_buf());
        mgr.set_session("jwt-abc".to_string(), "ana".to_string())
            .unwrap();
        let state = mgr.snapshot();
        assert!(state.session.authenticated);
        assert_eq!(state.session.username.as_deref(), Some("ana"));
    }
}
