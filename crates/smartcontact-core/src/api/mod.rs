//! REST API client module for the SmartContact backend.
//!
//! This module provides the `ApiClient` for the authentication endpoints
//! (login, signup, logout and the password reset flow).
//!
//! Authenticated requests carry `Authorization: Bearer <token>` using the
//! token from the persisted session.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{ApiResponse, AuthResponse};
