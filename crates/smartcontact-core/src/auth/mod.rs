//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `SessionStorage`: key/value persistence (memory, JSON file, OS keyring)
//! - `SessionStore`: reads and writes the `auth_token`/`user_data` pair
//! - `SessionManager`: application-level session state with login/logout
//!
//! The token and the user record are always stored and cleared as a pair.

pub mod credentials;
pub mod manager;
pub mod session;
pub mod storage;
pub mod store;

pub use credentials::KeyringStorage;
pub use manager::{AuthState, SessionManager};
pub use session::{Session, User};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::SessionStore;
