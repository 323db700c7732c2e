//! Session authentication core for the dashboard.
//!
//! This crate owns everything about the bearer credential:
//! - `token`: dual-medium persistence (durable store + cookie mirror) and claims decoding
//! - `auth`: the shared `AuthState`, startup hydration, login/logout, and inactivity logout
//! - `api`: the HTTP client for the remote authentication service
//! - `config`: externally configured routes, timeouts, and storage names

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod token;

pub use api::{ApiClient, ApiError};
pub use auth::{
    guard, ActivitySender, ActivitySignal, AuthAction, AuthState, AuthStore, GuardDecision,
    InactivityMonitor, Login, Logout, LogoutReason, MonitorHandle, MonitorState, Navigator,
    SessionInitializer, TracingNavigator, Verifier,
};
pub use config::{Config, DurableBackend};
pub use models::{Role, UserProfile};
pub use token::{Claims, DecodeError, StoreError, TokenStore};
