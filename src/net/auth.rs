//! Auth endpoints under `/api/auth`.
//!
//! Login, signup, and refresh are anonymous: they never carry a bearer token
//! and never trigger the refresh protocol. Profile and role lookups go
//! through the gateway like any other authenticated call.

use super::gateway::Gateway;
use super::transport::HttpRequest;
use super::types::{
    Driver, LoginRequest, LoginResponse, OnboardDriverRequest, RefreshRequest, Role, SignupRequest, UserProfile,
};
use crate::error::ApiError;

pub const LOGIN_ENDPOINT: &str = "/api/auth/login";
pub const SIGNUP_ENDPOINT: &str = "/api/auth/signup";
pub const REFRESH_ENDPOINT: &str = "/api/auth/refresh";
pub const USER_ENDPOINT: &str = "/api/auth/user";
pub const ROLES_ENDPOINT: &str = "/api/auth/roles";

fn onboard_driver_endpoint(user_id: i64) -> String {
    format!("/api/auth/onBoardNewDriver/{user_id}")
}

/// Build the refresh call. Carries only the refresh token.
pub(crate) fn refresh_request(refresh_token: &str) -> Result<HttpRequest, ApiError> {
    HttpRequest::post(REFRESH_ENDPOINT).with_json(&RefreshRequest { refresh_token })
}

pub struct AuthApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> AuthApi<'a> {
    #[must_use]
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Authentication`] for rejected credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest { email: email.to_owned(), password: password.to_owned() };
        let request = HttpRequest::post(LOGIN_ENDPOINT).with_json(&body)?;
        self.gateway.send_anonymous(&request).await?.json()
    }

    /// `POST /api/auth/signup`. Returns the created profile when the backend echoes it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the backend rejects the registration.
    pub async fn signup(&self, signup: &SignupRequest) -> Result<Option<UserProfile>, ApiError> {
        let request = HttpRequest::post(SIGNUP_ENDPOINT).with_json(signup)?;
        let response = self.gateway.send_anonymous(&request).await?;
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        response.json().map(Some)
    }

    /// `GET /api/auth/user?email=...`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or the profile cannot be decoded.
    pub async fn user_by_email(&self, email: &str) -> Result<UserProfile, ApiError> {
        let request = HttpRequest::get(USER_ENDPOINT).with_query("email", email);
        self.gateway.send_json(&request).await
    }

    /// `GET /api/auth/roles?email=...`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn roles(&self, email: &str) -> Result<Vec<Role>, ApiError> {
        let request = HttpRequest::get(ROLES_ENDPOINT).with_query("email", email);
        self.gateway.send_json(&request).await
    }

    /// `POST /api/auth/onBoardNewDriver/{userId}`. Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the onboarding.
    pub async fn onboard_driver(&self, user_id: i64, vehicle_id: &str) -> Result<Driver, ApiError> {
        let body = OnboardDriverRequest { vehicle_id: vehicle_id.to_owned() };
        let request = HttpRequest::post(onboard_driver_endpoint(user_id)).with_json(&body)?;
        self.gateway.send_json(&request).await
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
