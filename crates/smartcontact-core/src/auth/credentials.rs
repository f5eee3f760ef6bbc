use std::collections::{hash_map, HashMap};
use std::sync::Mutex;

use keyring::Entry;

use super::storage::{SessionStorage, StorageError};

const SERVICE_NAME: &str = "smartcontact";

/// Session storage in the OS keychain, one entry per key.
///
/// Entries are opened once and reused, so a value written through this
/// instance is read back through the same credential.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn with_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Entry) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        let entry = match entries.entry(key.to_string()) {
            hash_map::Entry::Occupied(slot) => slot.into_mut(),
            hash_map::Entry::Vacant(slot) => slot.insert(Entry::new(&self.service, key)?),
        };
        f(entry)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| Ok(entry.set_password(value)?))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::session::{Session, User};
    use crate::auth::store::{SessionStore, TOKEN_KEY, USER_KEY};

    // Keep tests off the real keychain
    fn mock_storage() -> KeyringStorage {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringStorage::with_service("smartcontact-test")
    }

    #[test]
    fn test_set_then_get_reads_back_value() {
        let storage = mock_storage();
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));

        storage.set(TOKEN_KEY, "tok-2").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_missing_entry_is_none_and_removable() {
        let storage = mock_storage();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        storage.remove(USER_KEY).unwrap();

        storage.set(USER_KEY, "{}").unwrap();
        storage.remove(USER_KEY).unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_session_store_persists_through_keyring() {
        let store = SessionStore::new(Arc::new(mock_storage()));
        let user = User {
            id: "u-1".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };

        store.save(&Session::new("tok-1", user.clone())).unwrap();

        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(store.load().map(|s| s.user), Some(user));
    }
}
