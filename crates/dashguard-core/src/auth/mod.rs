//! Authentication state and session lifecycle.
//!
//! This module provides:
//! - `AuthStore`: the shared `AuthState`, changed only through `AuthAction`s
//! - `SessionInitializer`: one-shot startup hydration from the stored token
//! - `Login` / `Logout`: the two operations that change the session afterwards
//! - `InactivityMonitor`: forced logout after a period without user activity
//! - `guard`: routing decision over the current state

pub mod guard;
pub mod initializer;
pub mod login;
pub mod logout;
pub mod monitor;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use guard::{guard, GuardDecision};
pub use initializer::{SessionInitializer, Verifier};
pub use login::Login;
pub use logout::{Logout, LogoutReason, Navigator, TracingNavigator};
pub use monitor::{
    ActivitySender, ActivitySignal, InactivityMonitor, InactivityTimer, MonitorHandle,
    MonitorState, MonitorStatus,
};
pub use state::{AuthAction, AuthState, AuthStore};
