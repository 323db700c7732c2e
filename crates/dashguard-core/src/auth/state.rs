//! Process-wide authentication state.
//!
//! `AuthState` only changes through `AuthAction`s applied by `AuthStore::dispatch`.
//! Readers take snapshots or subscribe to changes; nobody mutates fields directly.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::models::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    /// True until the startup check settles. Routing must wait while this is set.
    pub is_checking_auth: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            token: None,
            is_checking_auth: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthAction {
    SetCredentials { user: UserProfile, token: String },
    Logout,
    /// The startup check has settled, one way or the other
    FinishCheck,
}

impl AuthAction {
    fn name(&self) -> &'static str {
        match self {
            AuthAction::SetCredentials { .. } => "set_credentials",
            AuthAction::Logout => "logout",
            AuthAction::FinishCheck => "finish_check",
        }
    }
}

impl AuthState {
    pub fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::SetCredentials { user, token } => {
                self.is_authenticated = true;
                self.user = Some(user);
                self.token = Some(token);
            }
            AuthAction::Logout => {
                self.is_authenticated = false;
                self.user = None;
                self.token = None;
            }
            AuthAction::FinishCheck => {
                self.is_checking_auth = false;
            }
        }
    }
}

/// Shared handle to the auth state. Clones observe and update the same state.
#[derive(Clone)]
pub struct AuthStore {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: AuthAction) {
        self.dispatch_all([action]);
    }

    /// Apply several actions as one transition. Subscribers see only the end state.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = AuthAction>) {
        self.tx.send_modify(|state| {
            for action in actions {
                debug!(action = action.name(), "Auth state transition");
                state.reduce(action);
            }
        });
    }

    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn is_checking(&self) -> bool {
        self.tx.borrow().is_checking_auth
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    /// Wait until the startup check has settled and return the resulting state.
    pub async fn settled(&self) -> AuthState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_checking_auth).await {
            Ok(state) => state.clone(),
            // Sender lives in self, so this cannot close while we hold it
            Err(_) => self.snapshot(),
        };
        settled
    }
}
