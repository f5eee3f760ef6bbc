//! API client for the SmartContact auth endpoints.
//!
//! Every request goes through the same two steps:
//! - before sending, the persisted bearer token (if any) is attached
//! - after sending, failures are normalized into `ApiError`; a 401 also
//!   purges the persisted session

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};
use validator::Validate;

use crate::auth::SessionStore;
use crate::config::ApiSettings;
use crate::forms::{
    ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm, VerifyResetCodeForm,
};

use super::types::{ApiResponse, AuthResponse, BackendAuthResponse};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";
const LOGOUT_PATH: &str = "/auth/logout";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const VERIFY_RESET_CODE_PATH: &str = "/auth/verify-reset-code";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
const HEALTH_PATH: &str = "/health";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the SmartContact backend.
/// Clone is cheap - reqwest::Client and SessionStore both share state via Arc.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: SessionStore,
}

impl ApiClient {
    /// Create a client for `settings`, reading and purging the session
    /// through `store`.
    pub fn new(settings: &ApiSettings, store: SessionStore) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        let base_url = settings.effective_base_url();
        debug!(%base_url, "API client configured");

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    /// Absolute base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Interception =====

    /// Attach the persisted bearer token, if there is one.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let result = self.authorize(request).send().await;
        self.check_response(result, path).await
    }

    /// Pass successes through; normalize everything else.
    async fn check_response(
        &self,
        result: Result<Response, reqwest::Error>,
        path: &str,
    ) -> Result<Response, ApiError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(
                    path,
                    base_url = %self.base_url,
                    error = %e,
                    "Network error: make sure the backend is running at the configured URL"
                );
                return Err(ApiError::Unreachable(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(path, %status, body = %ApiError::truncate_body(&body), "Request failed");

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "Unauthorized response, clearing persisted session");
            self.store.clear();
        }

        Err(ApiError::from_status(status, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Self::decode(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.send(request, path).await?;
        Self::decode(response, path).await
    }

    /// Token from the `Authorization` response header, without the scheme.
    /// Header lookup is case-insensitive, so this covers every casing.
    /// A bare value is taken as the token; any scheme other than Bearer is
    /// rejected.
    fn header_token(headers: &header::HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
        let token = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            Some(_) => return None,
            None if value.eq_ignore_ascii_case("bearer") => "",
            None => value,
        };
        (!token.is_empty()).then(|| token.to_string())
    }

    async fn authenticate<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        message: &str,
    ) -> Result<AuthResponse, ApiError> {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.send(request, path).await?;

        let header_token = Self::header_token(response.headers());
        let backend: BackendAuthResponse = Self::decode(response, path).await?;

        let auth = backend.into_auth_response(header_token, message).inspect_err(|e| {
            error!(path, error = %e, "Backend auth response violates contract");
        })?;
        debug!(path, user_id = %auth.user.id, "Authenticated");
        Ok(auth)
    }

    // ===== Auth Endpoints =====

    pub async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ApiError> {
        form.validate()?;
        self.authenticate(LOGIN_PATH, form, "Login successful").await
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ApiError> {
        form.validate()?;
        self.authenticate(SIGNUP_PATH, form, "Registration successful")
            .await
    }

    pub async fn logout(&self) -> Result<ApiResponse, ApiError> {
        self.get(LOGOUT_PATH).await
    }

    pub async fn forgot_password(
        &self,
        form: &ForgotPasswordForm,
    ) -> Result<ApiResponse, ApiError> {
        form.validate()?;
        self.post(FORGOT_PASSWORD_PATH, form).await
    }

    pub async fn verify_reset_code(
        &self,
        form: &VerifyResetCodeForm,
    ) -> Result<ApiResponse, ApiError> {
        form.validate()?;
        self.post(VERIFY_RESET_CODE_PATH, form).await
    }

    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<ApiResponse, ApiError> {
        form.validate()?;
        self.post(RESET_PASSWORD_PATH, form).await
    }

    /// Check that the backend answers at all.
    pub async fn health_check(&self) -> Result<(), ApiError> {
        self.send(self.client.get(self.url(HEALTH_PATH)), HEALTH_PATH)
            .await?;
        Ok(())
    }
}
