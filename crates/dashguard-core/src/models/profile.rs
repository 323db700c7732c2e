//! User profile and role models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile returned by the verification endpoint.
/// Fields the dashboard does not model are kept in `extra` so nothing is lost
/// when the profile is handed back to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    /// Whatever the service uses as a user id: number, string, or nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(type = "string | number | null"))]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: serde_json::Map<String, Value>,
}

impl UserProfile {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::from)
    }

    /// The id as text, for logs and display
    pub fn user_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Name to show in the header, falling back to email then id
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.user_id().map(|id| format!("user #{}", id)))
            .unwrap_or_else(|| "unknown user".to_string())
    }
}

/// Role carried by the token and the profile.
/// Never used for authorization, only to pick where to send the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Other(String),
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "user" => Role::User,
            _ => Role::Other(s.to_string()),
        }
    }
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Other(s) => s.as_str(),
        }
    }
}
