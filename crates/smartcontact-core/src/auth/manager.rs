//! Application-level session state.
//!
//! `SessionManager` is built once at startup and handed to whatever needs to
//! know who is signed in. State moves `Loading -> Anonymous | Authenticated`
//! on `initialize()`, then only changes through `login`, `logout` and
//! `expire`.

use tracing::{debug, info, warn};

use crate::api::ApiClient;

use super::session::{Session, User};
use super::storage::StorageError;
use super::store::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Anonymous,
    Authenticated(User),
}

pub struct SessionManager {
    store: SessionStore,
    api: ApiClient,
    state: AuthState,
}

impl SessionManager {
    pub fn new(store: SessionStore, api: ApiClient) -> Self {
        Self {
            store,
            api,
            state: AuthState::Loading,
        }
    }

    /// Load the persisted session. Only the first call has any effect.
    pub fn initialize(&mut self) {
        if self.state != AuthState::Loading {
            return;
        }
        self.state = match self.store.load() {
            Some(session) => {
                info!(user_id = %session.user.id, "Restored session");
                AuthState::Authenticated(session.user)
            }
            None => AuthState::Anonymous,
        };
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Loading
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Persist the session and switch to it immediately.
    pub fn login(&mut self, token: String, user: User) -> Result<(), StorageError> {
        self.store.save(&Session::new(token, user.clone()))?;
        info!(user_id = %user.id, "Logged in");
        self.state = AuthState::Authenticated(user);
        Ok(())
    }

    /// Tell the backend, then drop the local session whatever it said.
    pub async fn logout(&mut self) {
        match self.api.logout().await {
            Ok(response) => debug!(message = %response.message, "Remote logout acknowledged"),
            Err(e) => warn!(error = %e, "Remote logout failed, clearing local session anyway"),
        }
        self.clear_local();
        info!("Logged out");
    }

    /// Drop the local session without contacting the backend.
    pub fn expire(&mut self) {
        self.clear_local();
        info!("Session expired");
    }

    fn clear_local(&mut self) {
        self.store.clear();
        self.state = AuthState::Anonymous;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::storage::{MemoryStorage, SessionStorage};
    use crate::auth::store::{TOKEN_KEY, USER_KEY};
    use crate::config::ApiSettings;

    // Nothing listens on the discard port, so every request fails fast
    const DEAD_BACKEND: &str = "http://127.0.0.1:9/api/v1";

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
        }
    }

    fn manager(storage: Arc<MemoryStorage>) -> SessionManager {
        let store = SessionStore::new(storage);
        let api = ApiClient::new(&ApiSettings::new(DEAD_BACKEND), store.clone()).unwrap();
        SessionManager::new(store, api)
    }

    #[test]
    fn test_starts_loading_then_anonymous() {
        let mut manager = manager(Arc::new(MemoryStorage::new()));
        assert!(manager.is_loading());
        assert!(!manager.is_authenticated());

        manager.initialize();
        assert!(!manager.is_loading());
        assert_eq!(manager.state(), &AuthState::Anonymous);
    }

    #[test]
    fn test_initialize_restores_persisted_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();

        let mut manager = manager(storage);
        manager.initialize();
        assert!(manager.is_authenticated());
        assert_eq!(manager.user(), Some(&user()));
    }

    #[test]
    fn test_initialize_with_corrupt_user_data() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, "undefined").unwrap();

        let mut manager = manager(storage.clone());
        manager.initialize();
        assert!(!manager.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_initialize_runs_once() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = manager(storage.clone());
        manager.initialize();

        // Data written behind the manager's back is not picked up again
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        manager.initialize();
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_login_persists_and_authenticates() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = manager(storage.clone());
        manager.initialize();

        manager.login("tok-1".to_string(), user()).unwrap();

        assert!(manager.is_authenticated());
        assert_eq!(manager.user(), Some(&user()));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
        let stored: User =
            serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, user());
    }

    #[tokio::test]
    async fn test_logout_clears_when_backend_unreachable() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = manager(storage.clone());
        manager.initialize();
        manager.login("tok-1".to_string(), user()).unwrap();

        manager.logout().await;

        assert!(!manager.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_expire_clears_without_network() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = manager(storage.clone());
        manager.initialize();
        manager.login("tok-1".to_string(), user()).unwrap();

        manager.expire();

        assert_eq!(manager.state(), &AuthState::Anonymous);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }
}
