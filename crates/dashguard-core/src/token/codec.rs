//! Claims decoding for bearer tokens.
//!
//! Tokens are `header.payload.signature` with base64url segments. Only the
//! payload is read, and only for expiry and routing hints. The signature is
//! never checked here; the server is the authority on whether a token is good.
//!
//! Every failure path resolves to "expired / no role" so a damaged token can
//! never look like a live session.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::Role;

/// Claims we care about from the payload segment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry in epoch seconds
    pub exp: Option<i64>,
    pub role: Option<String>,
    pub sub: Option<String>,
}

impl Claims {
    pub fn role_kind(&self) -> Option<Role> {
        self.role.as_deref().map(Role::from)
    }

    /// Expired iff `exp * 1000 < now_ms`. A token expiring exactly now is still live.
    /// Missing `exp` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
            None => true,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Token must have 3 segments, found {0}")]
    Segments(usize),

    #[error("Payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Payload is not valid claims JSON: {0}")]
    Json(String),
}

/// Decode the payload segment of a token.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }

    // Some issuers pad their segments even though the JWT format says not to
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json(e.to_string()))
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(_) => true,
    }
}

pub fn extract_role(token: &str) -> Option<String> {
    decode(token).ok().and_then(|claims| claims.role)
}
