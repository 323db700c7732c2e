//! Bearer token handling.
//!
//! This module provides:
//! - `TokenStore`: dual-medium persistence (durable store + cookie mirror)
//! - `codec`: fail-closed decoding of the token's claims (expiry, role)
//! - Storage mediums: `SessionFile`, `KeyringStore`, `FileCookieJar`, and in-memory variants
//!
//! The durable copy always wins on read; the cookie mirror is the fallback
//! and the copy request-time code can see.

pub mod codec;
pub mod cookie;
pub mod credentials;
pub mod memory;
pub mod session;
pub mod store;

pub use codec::{decode, extract_role, is_expired, Claims, DecodeError};
pub use cookie::{token_from_cookie_header, Cookie, FileCookieJar, SameSite};
pub use credentials::KeyringStore;
pub use memory::{MemoryCookieJar, MemoryStore};
pub use session::SessionFile;
pub use store::{CookieJar, DurableStore, StoreError, StorePolicy, TokenStore};
