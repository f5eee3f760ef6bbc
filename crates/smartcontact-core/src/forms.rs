//! Validated request payloads for the auth endpoints.
//!
//! Forms are checked with `Validate::validate()` before anything is sent;
//! the API client refuses to send a form that fails. Field names go over the
//! wire in camelCase (`confirmPassword`, `newPassword`).

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Length of an emailed reset code
pub const RESET_CODE_LENGTH: usize = 6;

/// Display order for picking the first error of a form
const FIELD_ORDER: &[&str] = &[
    "name",
    "email",
    "code",
    "password",
    "new_password",
    "confirm_password",
];

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResetCodeForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Reset code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password_strength")
    )]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

/// Lowercase, uppercase and digit each required at least once.
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let rule = if !password.chars().any(|c| c.is_ascii_lowercase()) {
        ("password_lowercase", "Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        ("password_uppercase", "Password must contain at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        ("password_digit", "Password must contain at least one number")
    } else {
        return Ok(());
    };

    let (code, message) = rule;
    Err(ValidationError::new(code).with_message(Cow::Borrowed(message)))
}

fn error_text(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

/// First message per field, keyed by field name.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| errs.first().map(|e| (field.to_string(), error_text(e))))
        .collect()
}

/// The message a user should see first, in on-screen field order.
pub fn first_error(errors: &ValidationErrors) -> Option<String> {
    let mut by_field = field_errors(errors);
    FIELD_ORDER
        .iter()
        .find_map(|field| by_field.remove(*field))
        .or_else(|| by_field.into_values().next())
}
