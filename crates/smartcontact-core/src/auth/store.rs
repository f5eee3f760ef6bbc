//! Persisted session pair.
//!
//! Layout: `auth_token` holds the bearer token, `user_data` holds the user
//! record as JSON. Either both keys are present or neither is; anything else
//! found on load is purged.

use std::sync::Arc;

use tracing::{debug, warn};

use super::session::{Session, User};
use super::storage::{SessionStorage, StorageError};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user_data";

/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Read the persisted session.
    ///
    /// Missing halves, the literal strings `undefined`/`null`, unparseable
    /// user data and storage failures all yield `None` and purge both keys.
    pub fn load(&self) -> Option<Session> {
        match self.read_pair() {
            Ok(Some(session)) => {
                debug!(user_id = %session.user.id, "Loaded persisted session");
                Some(session)
            }
            Ok(None) => {
                debug!("No valid persisted session, clearing storage");
                self.clear();
                None
            }
            Err(e) => {
                warn!(error = %e, "Discarding corrupted session data");
                self.clear();
                None
            }
        }
    }

    fn read_pair(&self) -> Result<Option<Session>, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user_data = self.storage.get(USER_KEY)?;

        let (Some(token), Some(user_data)) = (token, user_data) else {
            return Ok(None);
        };
        if token.is_empty() || matches!(user_data.as_str(), "" | "undefined" | "null") {
            return Ok(None);
        }

        let user: User = serde_json::from_str(&user_data)?;
        Ok(Some(Session { token, user }))
    }

    /// Persist token and user together.
    ///
    /// When the second write fails both keys are removed again.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user_data = serde_json::to_string(&session.user)?;

        self.storage.set(TOKEN_KEY, &session.token)?;
        if let Err(e) = self.storage.set(USER_KEY, &user_data) {
            warn!(error = %e, "Failed to store user data, rolling back token");
            self.clear();
            return Err(e);
        }

        debug!(user_id = %session.user.id, "Session saved");
        Ok(())
    }

    /// Remove both keys. Each removal is attempted even if the other fails.
    pub fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove session key");
            }
        }
    }

    /// The persisted bearer token, if any.
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;

    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn user() -> User {
        User {
            id: "64f0c2".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn store_with(storage: Arc<MemoryStorage>) -> SessionStore {
        SessionStore::new(storage)
    }

    #[test]
    fn test_save_then_load() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());

        store.save(&Session::new("tok-1", user())).unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.user, user());
        assert_eq!(store.token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());
        store.save(&Session::new("tok-1", user())).unwrap();

        store.clear();

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert!(store.load().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_load_purges_literal_undefined() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, "undefined").unwrap();

        let store = store_with(storage.clone());
        assert!(store.load().is_none());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_purges_literal_null() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, "null").unwrap();

        assert!(store_with(storage.clone()).load().is_none());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_purges_invalid_json() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, "{\"id\": \"1\", \"name\":").unwrap();

        assert!(store_with(storage.clone()).load().is_none());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_purges_wrong_user_shape() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, r#"{"_id":"1","fullName":"Ada"}"#).unwrap();

        assert!(store_with(storage.clone()).load().is_none());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_purges_token_without_user() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();

        assert!(store_with(storage.clone()).load().is_none());
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_purges_user_without_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();

        assert!(store_with(storage.clone()).load().is_none());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    /// Memory storage whose `set` calls fail on a scripted schedule.
    struct FlakyStorage {
        inner: MemoryStorage,
        failures: Mutex<Vec<bool>>,
        writes: AtomicUsize,
    }

    impl FlakyStorage {
        fn new(failures: Vec<bool>) -> Self {
            Self {
                inner: MemoryStorage::new(),
                failures: Mutex::new(failures),
                writes: AtomicUsize::new(0),
            }
        }
    }

    impl SessionStorage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .failures
                .lock()
                .unwrap()
                .get(n)
                .copied()
                .unwrap_or(false);
            if fail {
                return Err(StorageError::Io(std::io::Error::other("injected write failure")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Save(String),
        Clear,
        Load,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[a-z0-9]{1,12}".prop_map(Op::Save),
            Just(Op::Clear),
            Just(Op::Load),
        ]
    }

    proptest! {
        #[test]
        fn prop_token_and_user_stay_paired(
            ops in proptest::collection::vec(op_strategy(), 1..24),
            failures in proptest::collection::vec(any::<bool>(), 0..48),
        ) {
            let storage = Arc::new(FlakyStorage::new(failures));
            let store = SessionStore::new(storage.clone());

            for op in ops {
                match op {
                    Op::Save(token) => {
                        let _ = store.save(&Session::new(token, user()));
                    }
                    Op::Clear => store.clear(),
                    Op::Load => {
                        if let Some(session) = store.load() {
                            prop_assert_eq!(session.user, user());
                        }
                    }
                }

                let has_token = storage.get(TOKEN_KEY).unwrap().is_some();
                let has_user = storage.get(USER_KEY).unwrap().is_some();
                prop_assert_eq!(has_token, has_user);
            }
        }
    }
}
