//! Session context: the single writer of the session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The embedding shell builds one [`SessionContext`], calls
//! [`SessionContext::hydrate`] once at startup, and passes the context to
//! everything that needs backend access or session state. Readers observe
//! through [`SessionHandle::subscribe`] and [`SessionHandle::events`];
//! only this type and the gateway mutate the session.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::net::auth::AuthApi;
use crate::net::driver::DriverApi;
use crate::net::gateway::Gateway;
use crate::net::rider::RiderApi;
use crate::net::transport::{HttpTransport, ReqwestTransport};
use crate::net::types::{Role, SignupRequest, UserProfile};
use crate::state::auth::{NoticeLevel, SessionHandle};
use crate::state::store::{FileStore, SessionStore};

const LOGIN_OK: &str = "Login successful!";
const LOGIN_DEGRADED: &str = "Login successful but could not fetch user data";
const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_OK: &str = "Signup successful! Please login.";
const SIGNUP_FAILED: &str = "Signup failed";
const LOGOUT_OK: &str = "Logged out successfully";

/// Result of a login that reached the backend successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Token and profile are both held; the session is authenticated.
    Authenticated(UserProfile),
    /// Token is held but the follow-up profile fetch failed. Carries the
    /// [`ApiError::ProfileFetch`] that explains why.
    Degraded(ApiError),
}

#[derive(Clone)]
pub struct SessionContext {
    gateway: Arc<Gateway>,
}

impl SessionContext {
    /// Build an unhydrated context over `store` and `transport`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, transport: Arc<dyn HttpTransport>) -> Self {
        let session = SessionHandle::new(store);
        Self { gateway: Arc::new(Gateway::new(transport, session)) }
    }

    /// Build a context persisting to `config.session_file` and talking to
    /// `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let store = FileStore::open(config.session_file.clone());
        let transport = ReqwestTransport::new(config.base_url.as_str(), config.timeouts)?;
        Ok(Self::new(Arc::new(store), Arc::new(transport)))
    }

    /// Read the persisted session. Until this runs the session reports
    /// `is_loading`. Later calls are no-ops.
    pub fn hydrate(&self) {
        self.gateway.session().hydrate();
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        self.gateway.session()
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.gateway)
    }

    #[must_use]
    pub fn rider(&self) -> RiderApi<'_> {
        RiderApi::new(&self.gateway)
    }

    #[must_use]
    pub fn driver(&self) -> DriverApi<'_> {
        DriverApi::new(&self.gateway)
    }

    /// Log in and replace the session.
    ///
    /// When the backend does not bundle the profile, it is fetched by email.
    /// A failed fetch still leaves the token in place and is reported as
    /// [`LoginOutcome::Degraded`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Authentication`] for rejected credentials and
    /// [`ApiError::Network`] when the backend is unreachable.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let email = email.trim();
        let session = self.session();

        let response = match self.auth().login(email, password).await {
            Ok(response) => response,
            Err(error) => {
                let error = rejected_login(error);
                if matches!(error, ApiError::Authentication { .. }) && session.clear() {
                    tracing::debug!("discarded stale session after rejected login");
                }
                tracing::warn!(code = error.error_code(), "login failed");
                session.notify(NoticeLevel::Error, notice_text(&error, LOGIN_FAILED));
                return Err(error);
            }
        };

        session.establish(response.access_token, response.refresh_token, response.user.clone());
        if let Some(user) = response.user {
            tracing::info!(user_id = user.id, "logged in");
            session.notify(NoticeLevel::Success, LOGIN_OK);
            return Ok(LoginOutcome::Authenticated(user));
        }

        match self.auth().user_by_email(email).await {
            Ok(user) => {
                session.set_user(Some(user.clone()));
                tracing::info!(user_id = user.id, "logged in");
                session.notify(NoticeLevel::Success, LOGIN_OK);
                Ok(LoginOutcome::Authenticated(user))
            }
            Err(error) if session.access_token().is_none() => {
                // The fetch ran into an invalidation; there is no session left to degrade to.
                session.notify(NoticeLevel::Error, notice_text(&error, LOGIN_FAILED));
                Err(error)
            }
            Err(error) => {
                tracing::warn!(code = error.error_code(), "profile fetch after login failed");
                session.notify(NoticeLevel::Warning, LOGIN_DEGRADED);
                Ok(LoginOutcome::Degraded(ApiError::ProfileFetch(error.user_message())))
            }
        }
    }

    /// Register a new account. Does not establish a session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for missing fields or a backend
    /// rejection, or [`ApiError::Network`].
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        phone_number: &str,
        password: &str,
        roles: BTreeSet<Role>,
    ) -> Result<Option<UserProfile>, ApiError> {
        let request = SignupRequest {
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            phone_number: phone_number.trim().to_owned(),
            password: password.to_owned(),
            roles,
        };

        let result = match missing_signup_field(&request) {
            Some(field) => Err(ApiError::invalid_input(format!("{field} is required"))),
            None => self.auth().signup(&request).await,
        };

        match &result {
            Ok(_) => {
                tracing::info!("signup accepted");
                self.session().notify(NoticeLevel::Success, SIGNUP_OK);
            }
            Err(error) => {
                tracing::warn!(code = error.error_code(), "signup failed");
                self.session().notify(NoticeLevel::Error, notice_text(error, SIGNUP_FAILED));
            }
        }
        result
    }

    /// Clear the session. Idempotent.
    pub fn logout(&self) {
        if self.session().sign_out() {
            self.session().notify(NoticeLevel::Success, LOGOUT_OK);
        }
    }

    /// Replace the cached profile after an out-of-band fetch.
    pub fn set_user(&self, user: Option<UserProfile>) {
        self.session().set_user(user);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").field("session", self.session()).finish()
    }
}

/// Credentials rejected with any 4xx are an authentication failure, not a
/// validation error.
fn rejected_login(error: ApiError) -> ApiError {
    match error {
        ApiError::Validation { message, .. } => ApiError::Authentication { message },
        other => other,
    }
}

fn missing_signup_field(request: &SignupRequest) -> Option<&'static str> {
    if request.name.is_empty() {
        Some("name")
    } else if request.email.is_empty() {
        Some("email")
    } else if request.password.is_empty() {
        Some("password")
    } else {
        None
    }
}

fn notice_text(error: &ApiError, fallback: &str) -> String {
    let message = error.user_message();
    if message.trim().is_empty() { fallback.to_owned() } else { message }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
