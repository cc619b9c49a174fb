//! Role gate for protected views.
//!
//! A guard never decides while the session is still hydrating: it reports
//! [`GuardDecision::Pending`] from [`RouteGuard::check`], and
//! [`RouteGuard::resolve`] waits for hydration before deciding.

use tokio::sync::watch;

use crate::net::types::Role;
use crate::state::auth::Session;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Hydration has not finished; render nothing yet.
    Pending,
    Render,
    RedirectLogin,
    RedirectUnauthorized,
}

impl GuardDecision {
    /// Where the shell should navigate, if anywhere.
    #[must_use]
    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Self::RedirectLogin => Some(LOGIN_PATH),
            Self::RedirectUnauthorized => Some(UNAUTHORIZED_PATH),
            Self::Pending | Self::Render => None,
        }
    }
}

/// Decide whether `session` may see a view that requires `required`.
#[must_use]
pub fn evaluate(session: &Session, required: Role) -> GuardDecision {
    if session.is_loading {
        GuardDecision::Pending
    } else if !session.is_authenticated() {
        GuardDecision::RedirectLogin
    } else if session.has_role(required) {
        GuardDecision::Render
    } else {
        GuardDecision::RedirectUnauthorized
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    required: Role,
}

impl RouteGuard {
    #[must_use]
    pub fn new(required: Role) -> Self {
        Self { required }
    }

    #[must_use]
    pub fn required(&self) -> Role {
        self.required
    }

    #[must_use]
    pub fn check(&self, session: &Session) -> GuardDecision {
        evaluate(session, self.required)
    }

    /// Wait until the session is hydrated, then decide.
    ///
    /// If the session handle is dropped before hydration completes, the
    /// last published value is treated as unauthenticated.
    pub async fn resolve(&self, mut session: watch::Receiver<Session>) -> GuardDecision {
        match session.wait_for(|s| !s.is_loading).await {
            Ok(current) => self.check(&current),
            Err(_) => {
                tracing::debug!("session closed before hydration; redirecting to login");
                GuardDecision::RedirectLogin
            }
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
