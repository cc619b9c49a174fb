//! Auth-session state for the current client.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`SessionHandle`] is the only writer of the session. It mirrors every
//! mutation into the [`SessionStore`] and publishes the new value on a
//! watch channel; discrete transitions (login, refresh, invalidation,
//! notices) go out on a broadcast channel. Mutators are crate-private so
//! consumers can only observe.
//!
//! INVARIANTS
//! ==========
//! - `is_authenticated()` holds iff both an access token and a user are
//!   present and hydration has finished.
//! - The three store keys are always cleared together.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::net::types::{Role, UserProfile};
use crate::state::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, SessionStore, USER_KEY};

const EVENT_CAPACITY: usize = 32;

/// Authenticated identity of this client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    /// True only until the store has been read once.
    pub is_loading: bool,
}

impl Session {
    /// State before hydration: nothing known yet.
    #[must_use]
    pub fn loading() -> Self {
        Self { is_loading: true, ..Self::default() }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_loading && self.access_token.is_some() && self.user.is_some()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.user.as_ref().is_some_and(|u| u.has_role(role))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Transient user-facing notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Discrete session transitions, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Hydrated,
    LoggedIn,
    Refreshed,
    ProfileUpdated,
    LoggedOut,
    /// Unrecoverable auth failure; the shell should navigate to login.
    Invalidated,
    Notice(Notice),
}

/// Shared handle to the session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Shared>,
}

struct Shared {
    store: Arc<dyn SessionStore>,
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Create an unhydrated handle over `store`. The session reports
    /// `is_loading` until [`SessionHandle::hydrate`] runs.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(Session::loading());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { inner: Arc::new(Shared { store, state, events }) }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every published session value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Load the session from the store. Runs once; later calls return `false`.
    pub(crate) fn hydrate(&self) -> bool {
        let store = &self.inner.store;
        let hydrated = self.inner.state.send_if_modified(|session| {
            if !session.is_loading {
                return false;
            }
            *session = Session {
                access_token: store.get(ACCESS_TOKEN_KEY),
                refresh_token: store.get(REFRESH_TOKEN_KEY),
                user: load_user(store.as_ref()),
                is_loading: false,
            };
            true
        });
        if hydrated {
            let session = self.snapshot();
            tracing::debug!(
                has_token = session.access_token.is_some(),
                has_user = session.user.is_some(),
                "session hydrated"
            );
            self.emit(SessionEvent::Hydrated);
        }
        hydrated
    }

    /// Replace the session wholesale after a successful login.
    pub(crate) fn establish(&self, access_token: String, refresh_token: Option<String>, user: Option<UserProfile>) {
        let store = &self.inner.store;
        self.inner.state.send_modify(|session| {
            store.set(ACCESS_TOKEN_KEY, &access_token);
            match &refresh_token {
                Some(token) => store.set(REFRESH_TOKEN_KEY, token),
                None => store.remove(REFRESH_TOKEN_KEY),
            }
            save_user(store.as_ref(), user.as_ref());
            *session = Session { access_token: Some(access_token), refresh_token, user, is_loading: false };
        });
        self.emit(SessionEvent::LoggedIn);
    }

    /// Install a renewed access token in place.
    ///
    /// Discarded (returns `false`) when the session no longer holds
    /// `used_refresh`, i.e. it was logged out or replaced during the refresh.
    pub(crate) fn renew(&self, used_refresh: &str, access_token: String, refresh_token: Option<String>) -> bool {
        let store = &self.inner.store;
        let applied = self.inner.state.send_if_modified(|session| {
            if session.refresh_token.as_deref() != Some(used_refresh) {
                return false;
            }
            store.set(ACCESS_TOKEN_KEY, &access_token);
            if let Some(token) = &refresh_token {
                store.set(REFRESH_TOKEN_KEY, token);
                session.refresh_token = Some(token.clone());
            }
            session.access_token = Some(access_token);
            true
        });
        if applied {
            tracing::info!("access token renewed");
            self.emit(SessionEvent::Refreshed);
        } else {
            tracing::debug!("discarding renewed token; session changed during refresh");
        }
        applied
    }

    /// Replace the cached profile.
    pub(crate) fn set_user(&self, user: Option<UserProfile>) {
        let store = &self.inner.store;
        self.inner.state.send_modify(|session| {
            save_user(store.as_ref(), user.as_ref());
            session.user = user;
        });
        self.emit(SessionEvent::ProfileUpdated);
    }

    /// Remove every session key from memory and store. Returns whether
    /// anything was present.
    ///
    /// Hydrates first, so clearing never compares against an unread store.
    pub(crate) fn clear(&self) -> bool {
        self.hydrate();
        let store = &self.inner.store;
        self.inner.state.send_if_modified(|session| {
            for key in SESSION_KEYS {
                store.remove(key);
            }
            let cleared = Session::default();
            if *session == cleared {
                return false;
            }
            *session = cleared;
            true
        })
    }

    /// User-initiated logout. Returns whether a session existed.
    pub(crate) fn sign_out(&self) -> bool {
        let cleared = self.clear();
        if cleared {
            tracing::info!("logged out");
            self.emit(SessionEvent::LoggedOut);
        }
        cleared
    }

    /// Clear the session after an unrecoverable auth failure and tell the
    /// shell to navigate to login.
    pub(crate) fn invalidate(&self, reason: &str) {
        self.clear();
        tracing::warn!(reason, "session invalidated");
        self.emit(SessionEvent::Invalidated);
    }

    pub(crate) fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Notice(Notice { level, message: message.into() }));
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            tracing::trace!("no session event subscribers");
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.snapshot();
        f.debug_struct("SessionHandle")
            .field("authenticated", &session.is_authenticated())
            .field("loading", &session.is_loading)
            .finish_non_exhaustive()
    }
}

fn load_user(store: &dyn SessionStore) -> Option<UserProfile> {
    let raw = store.get(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(error) => {
            tracing::warn!(%error, "stored user profile is malformed; discarding");
            store.remove(USER_KEY);
            None
        }
    }
}

fn save_user(store: &dyn SessionStore, user: Option<&UserProfile>) {
    let Some(user) = user else {
        store.remove(USER_KEY);
        return;
    };
    match serde_json::to_string(user) {
        Ok(raw) => store.set(USER_KEY, &raw),
        Err(error) => {
            tracing::warn!(%error, "user profile could not be serialized; not persisted");
            store.remove(USER_KEY);
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
