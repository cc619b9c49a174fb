//! Authenticated request gateway.
//!
//! ARCHITECTURE
//! ============
//! Every backend call that needs credentials goes through [`Gateway::send`]:
//!
//! 1. attach `Authorization: Bearer <access token>` when one is held;
//! 2. return 2xx responses unchanged;
//! 3. on the first 401, renew the access token with the refresh token and
//!    dispatch the same request once more;
//! 4. anything else (including a 401 on the retry) is returned as an error.
//!
//! When renewal is impossible (no refresh token) or the refresh call fails,
//! the session is invalidated, which clears the store and emits
//! [`SessionEvent::Invalidated`](crate::state::auth::SessionEvent) for the
//! shell to navigate to login. The gateway itself never navigates.
//!
//! CONCURRENCY
//! ===========
//! Renewals are serialized behind an async mutex. A request that waited for
//! the lock compares the current token with the one it was rejected with:
//! if another request already renewed, it reuses that token instead of
//! refreshing again.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::auth;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::ApiError;
use crate::state::auth::SessionHandle;

/// Which dispatch of a request this is. A request is retried at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Retry,
}

pub struct Gateway {
    transport: Arc<dyn HttpTransport>,
    session: SessionHandle,
    renewal: Mutex<()>,
}

impl Gateway {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, session: SessionHandle) -> Self {
        Self { transport, session, renewal: Mutex::new(()) }
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Dispatch `request` with the current credentials, renewing them once on 401.
    ///
    /// # Errors
    ///
    /// Returns the classified error for non-2xx responses, a network error if
    /// the backend is unreachable, or the refresh error if renewal failed.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        // Credentials are unknown until the store has been read.
        self.session.hydrate();
        let mut attempt = Attempt::Initial;
        loop {
            let token = self.session.access_token();
            let outbound = request.authorized(token.as_deref())?;
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                ?attempt,
                authenticated = token.is_some(),
                "dispatching request"
            );

            let response = self.transport.execute(outbound).await?;
            if response.is_success() {
                return Ok(response);
            }
            if response.status != 401 {
                return Err(response.error());
            }

            match attempt {
                Attempt::Initial => {
                    self.renew(token.as_deref(), &response).await?;
                    attempt = Attempt::Retry;
                }
                Attempt::Retry => {
                    tracing::warn!(path = %request.path, "request rejected again after renewal");
                    return Err(response.error());
                }
            }
        }
    }

    /// [`Gateway::send`] and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::send`], plus [`ApiError::Decode`] for bodies that do not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    /// Dispatch without credentials and without the refresh protocol.
    /// Used for login, signup, and refresh itself.
    ///
    /// # Errors
    ///
    /// Returns the classified error for non-2xx responses or a network error.
    pub async fn send_anonymous(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, path = %request.path, "dispatching anonymous request");
        let response = self.transport.execute(request.authorized(None)?).await?;
        if response.is_success() { Ok(response) } else { Err(response.error()) }
    }

    async fn renew(&self, rejected_token: Option<&str>, rejected: &HttpResponse) -> Result<(), ApiError> {
        let _renewal = self.renewal.lock().await;

        let current = self.session.access_token();
        if current.as_deref() != rejected_token {
            return match current {
                Some(_) => {
                    tracing::debug!("reusing access token renewed by a concurrent request");
                    Ok(())
                }
                None => Err(rejected.error()),
            };
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.invalidate("no refresh token available");
            return Err(rejected.error());
        };

        match self.refresh(&refresh_token).await {
            Ok(renewed) => {
                self.session.renew(&refresh_token, renewed.access_token, renewed.refresh_token);
                Ok(())
            }
            Err(error) => {
                self.session.invalidate("token refresh failed");
                Err(error)
            }
        }
    }

    /// Transport failures are reported as authentication failures; the
    /// session is invalidated either way.
    async fn refresh(&self, refresh_token: &str) -> Result<super::types::RefreshResponse, ApiError> {
        let response = self
            .transport
            .execute(auth::refresh_request(refresh_token)?)
            .await
            .map_err(|error| ApiError::Authentication { message: format!("token refresh failed: {}", error.user_message()) })?;
        if !response.is_success() {
            return Err(ApiError::Authentication { message: response.error().user_message() });
        }
        response.json()
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
