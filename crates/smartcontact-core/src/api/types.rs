//! Request/response shapes for the auth endpoints.
//!
//! `BackendAuthResponse` is the backend's own shape; it is normalized into
//! `AuthResponse` at the client boundary.

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::User;

use super::ApiError;

/// Normalized login/registration result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub message: String,
}

/// Generic envelope returned by the non-session endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> ApiResponse<T> {
    /// The backend message, or `fallback` when it is blank.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.message.trim().is_empty() {
            fallback
        } else {
            &self.message
        }
    }
}

// Internal API response types for parsing

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BackendAuthResponse {
    pub data: Option<BackendUser>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BackendUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl BackendAuthResponse {
    /// Normalize into `AuthResponse`.
    ///
    /// The body token wins over `header_token`. With neither present the
    /// response is rejected.
    pub fn into_auth_response(
        self,
        header_token: Option<String>,
        message: &str,
    ) -> Result<AuthResponse, ApiError> {
        let user = self
            .data
            .ok_or_else(|| ApiError::InvalidResponse("response has no user record".to_string()))?;

        let token = self
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or(header_token)
            .ok_or_else(|| {
                ApiError::InvalidResponse("backend returned no session token".to_string())
            })?;

        Ok(AuthResponse {
            user: User {
                id: user.id,
                name: user.name,
                email: user.email,
            },
            token,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_BODY: &str = r#"{
        "status": "success",
        "data": {
            "_id": "66a1f0c2e4b0a1b2c3d4e5f6",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "isResetCodeValide": false,
            "createdAt": "2024-07-25T10:00:00.000Z",
            "updatedAt": "2024-07-25T10:00:00.000Z",
            "__v": 0
        },
        "token": "jwt-from-body"
    }"#;

    #[test]
    fn test_normalizes_backend_user() {
        let backend: BackendAuthResponse = serde_json::from_str(LOGIN_BODY).unwrap();
        let auth = backend.into_auth_response(None, "Login successful").unwrap();

        assert_eq!(auth.user.id, "66a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(auth.user.name, "Ada Lovelace");
        assert_eq!(auth.token, "jwt-from-body");
        assert_eq!(auth.message, "Login successful");
    }

    #[test]
    fn test_body_token_wins_over_header() {
        let backend: BackendAuthResponse = serde_json::from_str(LOGIN_BODY).unwrap();
        let auth = backend
            .into_auth_response(Some("jwt-from-header".to_string()), "Login successful")
            .unwrap();
        assert_eq!(auth.token, "jwt-from-body");
    }

    #[test]
    fn test_header_token_used_when_body_has_none() {
        let backend: BackendAuthResponse = serde_json::from_str(
            r#"{"status":"success","data":{"_id":"1","name":"Ada","email":"ada@example.com"},"token":""}"#,
        )
        .unwrap();
        let auth = backend
            .into_auth_response(Some("jwt-from-header".to_string()), "Registration successful")
            .unwrap();
        assert_eq!(auth.token, "jwt-from-header");
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let backend: BackendAuthResponse = serde_json::from_str(
            r#"{"status":"success","data":{"_id":"1","name":"Ada","email":"ada@example.com"}}"#,
        )
        .unwrap();
        let err = backend.into_auth_response(None, "Login successful").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_missing_user_is_rejected() {
        let backend: BackendAuthResponse =
            serde_json::from_str(r#"{"status":"success","token":"abc"}"#).unwrap();
        let err = backend.into_auth_response(None, "Login successful").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_api_response_defaults() {
        let resp: ApiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.message_or("Reset code sent"), "Reset code sent");

        let resp: ApiResponse =
            serde_json::from_str(r#"{"success":true,"message":"Code sent to your inbox"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message_or("Reset code sent"), "Code sent to your inbox");
    }

    #[test]
    fn test_api_response_null_fields() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"success":true,"message":null,"data":null}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message_or("Reset code sent"), "Reset code sent");

        let resp: ApiResponse = serde_json::from_str(r#"{"success":null,"message":"Done"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message_or("Reset code sent"), "Done");
    }
}
