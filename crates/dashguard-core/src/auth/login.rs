use std::sync::Arc;

use tracing::{info, warn};

use super::logout::Navigator;
use super::state::{AuthAction, AuthStore};
use crate::api::{ApiClient, ApiError};
use crate::models::UserProfile;
use crate::token::{codec, TokenStore};

/// Credential login: gets a token, confirms it against the profile endpoint,
/// then persists it and signs the user in.
pub struct Login {
    api: ApiClient,
    store: Arc<TokenStore>,
    auth: AuthStore,
    navigator: Arc<dyn Navigator>,
    dashboard_route: String,
}

impl Login {
    pub fn new(
        api: ApiClient,
        store: Arc<TokenStore>,
        auth: AuthStore,
        navigator: Arc<dyn Navigator>,
        dashboard_route: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            auth,
            navigator,
            dashboard_route: dashboard_route.into(),
        }
    }

    /// Nothing is persisted unless the profile check succeeds.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let token = self.api.login(email, password).await?;

        if codec::is_expired(&token) {
            warn!("Server issued an expired or unreadable token");
            return Err(ApiError::InvalidResponse(
                "Server issued an expired or unreadable token".to_string(),
            ));
        }

        let user = self.api.fetch_profile(&token).await?;

        self.store.store(&token);
        self.auth.dispatch_all([
            AuthAction::SetCredentials {
                user: user.clone(),
                token,
            },
            AuthAction::FinishCheck,
        ]);
        let user_id = user.user_id();
        info!(user_id = user_id.as_deref().unwrap_or("-"), "Login successful");
        self.navigator.navigate(&self.dashboard_route);

        Ok(user)
    }
}
