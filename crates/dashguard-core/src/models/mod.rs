//! Data models shared between the API client and the auth state.
//!
//! - `UserProfile`: body of the profile verification endpoint
//! - `Role`: typed view of the role claim, used for routing hints only

pub mod profile;

pub use profile::{Role, UserProfile};
