use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::state::{AuthAction, AuthStore};
use crate::token::TokenStore;

/// Where redirects go. A browser host changes location; a CLI just reports it.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only records the redirect in the log
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "Redirect");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    Inactivity,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutReason::UserRequested => write!(f, "user requested"),
            LogoutReason::Inactivity => write!(f, "inactivity timeout"),
        }
    }
}

/// Clears the token, resets auth state, and sends the user to the login route.
/// Every caller gets the same end state regardless of reason.
#[derive(Clone)]
pub struct Logout {
    store: Arc<TokenStore>,
    auth: AuthStore,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl Logout {
    pub fn new(
        store: Arc<TokenStore>,
        auth: AuthStore,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            auth,
            navigator,
            login_route: login_route.into(),
        }
    }

    pub fn logout(&self, reason: LogoutReason) {
        self.store.clear();
        // A logout also settles a startup check that is still in flight
        self.auth.dispatch_all([AuthAction::Logout, AuthAction::FinishCheck]);
        info!(%reason, "Logged out");
        self.navigator.navigate(&self.login_route);
    }
}
