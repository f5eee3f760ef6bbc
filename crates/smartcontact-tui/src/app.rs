//! Application state management for the SmartContact terminal client.
//!
//! This module contains the `App` struct: current route, the form on screen,
//! notifications, and the session manager. Routes are guarded against the
//! session state on every navigation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use validator::ValidationErrors;

use smartcontact_core::api::ApiError;
use smartcontact_core::auth::{AuthState, SessionManager};
use smartcontact_core::config::Config;
use smartcontact_core::forms::{
    field_errors, ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm,
    VerifyResetCodeForm, RESET_CODE_LENGTH,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email and name input.
const MAX_TEXT_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// How long a notification stays in the status bar.
const TOAST_DURATION: Duration = Duration::from_secs(5);

// ============================================================================
// Routes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    ForgotPassword,
    VerifyResetCode,
    ResetPassword,
    Dashboard,
}

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone
    Open,
    /// Only signed-out users; signed-in users go to the dashboard
    Public,
    /// Only signed-in users; everyone else goes to login
    Protected,
}

impl Route {
    pub fn access(&self) -> Access {
        match self {
            Route::Home => Access::Open,
            Route::Login
            | Route::Register
            | Route::ForgotPassword
            | Route::VerifyResetCode
            | Route::ResetPassword => Access::Public,
            Route::Dashboard => Access::Protected,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Sign in",
            Route::Register => "Create an account",
            Route::ForgotPassword => "Forgot password",
            Route::VerifyResetCode => "Enter verification code",
            Route::ResetPassword => "Reset password",
            Route::Dashboard => "Dashboard",
        }
    }
}

/// What actually gets drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Page(Route),
}

/// Apply the route guards for `state`.
pub fn guard(route: Route, state: &AuthState) -> Screen {
    match (route.access(), state) {
        (Access::Open, _) => Screen::Page(route),
        (_, AuthState::Loading) => Screen::Loading,
        (Access::Public, AuthState::Authenticated(_)) => Screen::Page(Route::Dashboard),
        (Access::Protected, AuthState::Anonymous) => Screen::Page(Route::Login),
        _ => Screen::Page(route),
    }
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Clone)]
pub struct FormField {
    /// Field name as used by validation errors
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
    pub read_only: bool,
    pub max_len: usize,
}

impl FormField {
    fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            secret: false,
            read_only: false,
            max_len: MAX_TEXT_LENGTH,
        }
    }

    fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            secret: true,
            max_len: MAX_PASSWORD_LENGTH,
            ..Self::text(name, label)
        }
    }

    fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

/// What has keyboard focus inside a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Field(usize),
    Button,
    Link(usize),
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub submit_label: &'static str,
    pub links: Vec<(&'static str, Route)>,
    pub errors: BTreeMap<String, String>,
    focus: usize,
}

impl FormState {
    fn new(fields: Vec<FormField>, submit_label: &'static str) -> Self {
        Self {
            fields,
            submit_label,
            links: Vec::new(),
            errors: BTreeMap::new(),
            focus: 0,
        }
    }

    fn with_links(mut self, links: Vec<(&'static str, Route)>) -> Self {
        self.links = links;
        self
    }

    /// The form shown on `route`, if it has one.
    pub fn for_route(route: Route, email: Option<&str>) -> Option<Self> {
        let form = match route {
            Route::Login => Self::new(
                vec![
                    FormField::text("email", "Email"),
                    FormField::secret("password", "Password"),
                ],
                "Sign in",
            )
            .with_links(vec![
                ("Forgot password?", Route::ForgotPassword),
                ("Create an account", Route::Register),
            ]),
            Route::Register => Self::new(
                vec![
                    FormField::text("name", "Full name"),
                    FormField::text("email", "Email"),
                    FormField::secret("password", "Password"),
                    FormField::secret("confirm_password", "Confirm password"),
                ],
                "Create account",
            )
            .with_links(vec![("Already have an account? Sign in", Route::Login)]),
            Route::ForgotPassword => Self::new(
                vec![FormField::text("email", "Email")],
                "Send reset code",
            )
            .with_links(vec![("Back to sign in", Route::Login)]),
            Route::VerifyResetCode => Self::new(
                vec![
                    FormField::text("email", "Email"),
                    FormField::text("code", "Code").with_max_len(RESET_CODE_LENGTH),
                ],
                "Verify code",
            )
            .with_links(vec![
                ("Resend code", Route::ForgotPassword),
                ("Back to sign in", Route::Login),
            ]),
            Route::ResetPassword => Self::new(
                vec![
                    FormField::text("email", "Email"),
                    FormField::secret("new_password", "New password"),
                    FormField::secret("confirm_password", "Confirm password"),
                ],
                "Reset password",
            )
            .with_links(vec![("Back to sign in", Route::Login)]),
            Route::Home | Route::Dashboard => return None,
        };

        Some(form.prefill_email(email))
    }

    /// Prefill the email field; a prefilled email is read-only on the
    /// verify/reset steps, as it was carried over from the previous step.
    fn prefill_email(mut self, email: Option<&str>) -> Self {
        let Some(email) = email.filter(|e| !e.is_empty()) else {
            return self;
        };
        let lock = self.fields.iter().any(|f| f.name == "code" || f.name == "new_password");
        if let Some(pos) = self.fields.iter().position(|f| f.name == "email") {
            self.fields[pos].value = email.to_string();
            self.fields[pos].read_only = lock;
            if pos == self.focus && self.fields.len() > pos + 1 {
                self.focus = pos + 1;
            }
        }
        self
    }

    fn focus_count(&self) -> usize {
        self.fields.len() + 1 + self.links.len()
    }

    pub fn focus(&self) -> FormFocus {
        let fields = self.fields.len();
        if self.focus < fields {
            FormFocus::Field(self.focus)
        } else if self.focus == fields {
            FormFocus::Button
        } else {
            FormFocus::Link(self.focus - fields - 1)
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.focus_count();
    }

    pub fn focus_prev(&mut self) {
        let count = self.focus_count();
        self.focus = (self.focus + count - 1) % count;
    }

    pub fn focus_button(&mut self) {
        self.focus = self.fields.len();
    }

    fn focused_field_mut(&mut self) -> Option<&mut FormField> {
        match self.focus() {
            FormFocus::Field(i) => self.fields.get_mut(i).filter(|f| !f.read_only),
            _ => None,
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.focused_field_mut() {
            if can_add_char(field.value.chars().count(), field.max_len, c) {
                field.value.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.value.pop();
        }
    }

    pub fn value(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    fn trimmed(&self, name: &str) -> String {
        self.value(name).trim().to_string()
    }

    pub fn set_errors(&mut self, errors: &ValidationErrors) {
        self.errors = field_errors(errors);
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn login_form(&self) -> LoginForm {
        LoginForm {
            email: self.trimmed("email"),
            password: self.value("password").to_string(),
        }
    }

    pub fn register_form(&self) -> RegisterForm {
        RegisterForm {
            name: self.trimmed("name"),
            email: self.trimmed("email"),
            password: self.value("password").to_string(),
            confirm_password: self.value("confirm_password").to_string(),
        }
    }

    pub fn forgot_password_form(&self) -> ForgotPasswordForm {
        ForgotPasswordForm {
            email: self.trimmed("email"),
        }
    }

    pub fn verify_reset_code_form(&self) -> VerifyResetCodeForm {
        VerifyResetCodeForm {
            email: self.trimmed("email"),
            code: self.trimmed("code"),
        }
    }

    pub fn reset_password_form(&self) -> ResetPasswordForm {
        ResetPasswordForm {
            email: self.trimmed("email"),
            new_password: self.value("new_password").to_string(),
            confirm_password: self.value("confirm_password").to_string(),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    created: Instant,
}

impl Toast {
    pub fn new(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: ToastVariant::Default,
            created: Instant::now(),
        }
    }

    pub fn destructive(title: &str, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::new(title, description)
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= TOAST_DURATION
    }
}

/// Result of the dashboard's connection test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Untested,
    Connected,
    Failed(String),
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingQuit,
    Quitting,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    /// Where `config` is saved; `None` keeps preferences in memory only
    config_path: Option<PathBuf>,
    pub session: SessionManager,
    /// Base URL as resolved from the environment (may be the proxy path)
    pub api_url: String,

    pub state: AppState,
    pub route: Route,
    pub form: Option<FormState>,
    pub toast: Option<Toast>,
    pub health: HealthStatus,
}

impl App {
    /// Create the app; the session manager must already be initialized.
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        session: SessionManager,
        api_url: String,
    ) -> Self {
        let mut app = Self {
            config,
            config_path,
            session,
            api_url,
            state: AppState::Normal,
            route: Route::Home,
            form: None,
            toast: None,
            health: HealthStatus::Untested,
        };
        let start = if app.session.is_authenticated() {
            Route::Dashboard
        } else {
            Route::Home
        };
        app.navigate(start);
        app
    }

    pub fn screen(&self) -> Screen {
        guard(self.route, self.session.state())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate; sign-in and recovery forms start from the last used email.
    pub fn navigate(&mut self, route: Route) {
        let email = match route {
            Route::Login | Route::ForgotPassword => self.config.last_email.clone(),
            _ => None,
        };
        self.navigate_with_email(route, email.as_deref());
    }

    /// Navigate, carrying `email` into the target form.
    pub fn navigate_with_email(&mut self, route: Route, email: Option<&str>) {
        let resolved = match guard(route, self.session.state()) {
            Screen::Page(resolved) => resolved,
            Screen::Loading => route,
        };
        if resolved != route {
            info!(requested = ?route, redirected = ?resolved, "Route guard redirect");
        }
        self.route = resolved;
        self.form = FormState::for_route(resolved, email);
        if resolved != Route::Dashboard {
            self.health = HealthStatus::Untested;
        }
    }

    /// Re-run the guards after the session changed.
    fn enforce_guards(&mut self) {
        if let Screen::Page(resolved) = self.screen() {
            if resolved != self.route {
                self.navigate(resolved);
            }
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn notify(&mut self, toast: Toast) {
        self.toast = Some(toast);
    }

    /// Drop the notification once it has been shown long enough.
    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired_at(now)) {
            self.toast = None;
        }
    }

    /// Show a failed mutation. Validation errors go inline on the form,
    /// everything else becomes a notification.
    fn report_failure(&mut self, title: &str, err: &ApiError, fallback: &str) {
        if let ApiError::Validation(errors) = err {
            if let Some(form) = self.form.as_mut() {
                form.set_errors(errors);
            }
            return;
        }

        error!(error = %err, "{}", title);
        if err.is_unauthorized() && self.session.is_authenticated() {
            self.session.expire();
        }
        self.notify(Toast::destructive(title, err.user_message(fallback)));
        self.enforce_guards();
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Some(path) = self.config_path.as_deref() {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Submit whatever form is on screen.
    pub async fn submit(&mut self) {
        match self.route {
            Route::Login => self.submit_login().await,
            Route::Register => self.submit_register().await,
            Route::ForgotPassword => self.submit_forgot_password().await,
            Route::VerifyResetCode => self.submit_verify_reset_code().await,
            Route::ResetPassword => self.submit_reset_password().await,
            Route::Home | Route::Dashboard => {}
        }
    }

    fn clear_form_errors(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.errors.clear();
        }
    }

    async fn submit_login(&mut self) {
        let Some(form) = self.form.as_ref().map(FormState::login_form) else {
            return;
        };
        self.clear_form_errors();

        let result = self.session.api().login(&form).await;
        match result {
            Ok(auth) => {
                let message = auth.message.clone();
                if let Err(e) = self.session.login(auth.token, auth.user) {
                    error!(error = %e, "Failed to persist session");
                    self.notify(Toast::destructive("Login failed", "Could not save your session."));
                    return;
                }
                self.remember_email(&form.email);
                self.notify(Toast::new("Welcome back!", message));
                self.navigate(Route::Dashboard);
            }
            Err(e) => self.report_failure("Login failed", &e, "Please check your credentials."),
        }
    }

    async fn submit_register(&mut self) {
        let Some(form) = self.form.as_ref().map(FormState::register_form) else {
            return;
        };
        self.clear_form_errors();

        let result = self.session.api().register(&form).await;
        match result {
            Ok(auth) => {
                let message = auth.message.clone();
                if let Err(e) = self.session.login(auth.token, auth.user) {
                    error!(error = %e, "Failed to persist session");
                    self.notify(Toast::destructive(
                        "Registration failed",
                        "Could not save your session.",
                    ));
                    return;
                }
                self.remember_email(&form.email);
                self.notify(Toast::new("Welcome!", message));
                self.navigate(Route::Dashboard);
            }
            Err(e) => self.report_failure("Registration failed", &e, "Please try again."),
        }
    }

    async fn submit_forgot_password(&mut self) {
        let Some(form) = self.form.as_ref().map(FormState::forgot_password_form) else {
            return;
        };
        self.clear_form_errors();

        let result = self.session.api().forgot_password(&form).await;
        match result {
            Ok(resp) => {
                let text = resp.message_or("Please check your email for the reset code.");
                self.notify(Toast::new("Reset code sent", text));
                self.navigate_with_email(Route::VerifyResetCode, Some(&form.email));
            }
            Err(e) => self.report_failure("Failed to send reset code", &e, "Please try again."),
        }
    }

    async fn submit_verify_reset_code(&mut self) {
        let Some(form) = self.form.as_ref().map(FormState::verify_reset_code_form) else {
            return;
        };
        self.clear_form_errors();

        let result = self.session.api().verify_reset_code(&form).await;
        match result {
            Ok(resp) => {
                let text = resp.message_or("Reset code verified successfully.");
                self.notify(Toast::new("Code verified", text));
                self.navigate_with_email(Route::ResetPassword, Some(&form.email));
            }
            Err(e) => self.report_failure("Invalid code", &e, "Please check your reset code."),
        }
    }

    async fn submit_reset_password(&mut self) {
        let Some(form) = self.form.as_ref().map(FormState::reset_password_form) else {
            return;
        };
        self.clear_form_errors();

        let result = self.session.api().reset_password(&form).await;
        match result {
            Ok(resp) => {
                let text = resp.message_or("Your password has been reset successfully.");
                self.notify(Toast::new("Password reset successful", text));
                self.navigate_with_email(Route::Login, Some(&form.email));
            }
            Err(e) => self.report_failure("Password reset failed", &e, "Please try again."),
        }
    }

    /// Logout never fails locally; the remote call is best-effort.
    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.notify(Toast::new(
            "Logged out",
            "You have been successfully logged out.",
        ));
        self.navigate(Route::Home);
    }

    /// Dashboard connection test.
    pub async fn test_connection(&mut self) {
        let result = self.session.api().health_check().await;
        self.health = match result {
            Ok(()) => HealthStatus::Connected,
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                if e.is_unauthorized() {
                    self.session.expire();
                    self.enforce_guards();
                }
                HealthStatus::Failed(e.user_message("The backend rejected the request."))
            }
        };
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character should be accepted into a field of `max_len`
pub fn can_add_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
