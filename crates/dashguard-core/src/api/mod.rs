//! REST client for the remote authentication service.
//!
//! Two endpoints are used: `POST /auth/login` to exchange credentials for a
//! bearer token, and `GET /auth/profile` to confirm a token is still live.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
