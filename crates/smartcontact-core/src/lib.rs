//! Core library for the SmartContact client.
//!
//! - `config`: persisted preferences and API base URL resolution
//! - `auth`: session storage, the session store and the session manager
//! - `api`: HTTP client for the SmartContact auth endpoints
//! - `forms`: validated request payloads

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionManager, SessionStore, User};
pub use config::{ApiSettings, BuildMode, Config};
