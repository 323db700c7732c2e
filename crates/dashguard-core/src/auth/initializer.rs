//! Startup session hydration.
//!
//! Runs once: reads the stored token, drops it if it is missing or expired,
//! otherwise asks the server whether it is still good. The answer is final for
//! this process; a rejected token is cleared and never retried.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::state::{AuthAction, AuthStore};
use crate::api::ApiError;
use crate::models::UserProfile;
use crate::token::{codec, TokenStore};

/// Confirms a token with the remote service and returns the profile it belongs to.
pub trait Verifier: Send + Sync {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserProfile, ApiError>>;
}

pub struct SessionInitializer<V> {
    store: Arc<TokenStore>,
    auth: AuthStore,
    verifier: V,
    outcome: OnceCell<bool>,
}

impl<V: Verifier> SessionInitializer<V> {
    pub fn new(store: Arc<TokenStore>, auth: AuthStore, verifier: V) -> Self {
        Self {
            store,
            auth,
            verifier,
            outcome: OnceCell::new(),
        }
    }

    /// Hydrate the auth state. Later calls return the first result without
    /// touching storage or the network again.
    pub async fn initialize(&self) -> bool {
        *self.outcome.get_or_init(|| self.run()).await
    }

    async fn run(&self) -> bool {
        let token = match self.store.retrieve() {
            Some(token) => token,
            None => {
                debug!("No stored token");
                self.reject();
                return false;
            }
        };

        if codec::is_expired(&token) {
            info!("Stored token is expired or unreadable");
            self.reject();
            return false;
        }

        match self.verifier.verify(&token).await {
            Ok(user) => {
                let user_id = user.user_id();
                info!(user_id = user_id.as_deref().unwrap_or("-"), "Session verified");
                self.auth.dispatch_all([
                    AuthAction::SetCredentials { user, token },
                    AuthAction::FinishCheck,
                ]);
                true
            }
            Err(e) => {
                if e.is_auth_rejection() {
                    info!(error = %e, "Stored token rejected by server");
                } else {
                    warn!(error = %e, "Session verification failed");
                }
                self.reject();
                false
            }
        }
    }

    fn reject(&self) {
        self.store.clear();
        self.auth.dispatch_all([AuthAction::Logout, AuthAction::FinishCheck]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::auth::testutil::{fixture, user, StubVerifier};
    use crate::token::codec::tests::{make_token, token_expiring_in};
    use crate::token::{CookieJar, DurableStore};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_no_token_reports_false_without_network() {
        let fx = fixture();
        let verifier = StubVerifier::ok(user());
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), verifier);

        assert!(!init.initialize().await);

        let state = fx.auth.snapshot();
        assert!(!state.is_authenticated);
        assert!(!state.is_checking_auth);
        assert_eq!(state.user, None);
        assert_eq!(fx.store.retrieve(), None);
        assert_eq!(init.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_cleared_without_network() {
        let fx = fixture();
        fx.store.store(&token_expiring_in(-10));
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), StubVerifier::ok(user()));

        assert!(!init.initialize().await);
        assert_eq!(fx.store.retrieve(), None);
        assert_eq!(init.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_token_is_cleared() {
        let fx = fixture();
        fx.store.store("garbage");
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), StubVerifier::ok(user()));

        assert!(!init.initialize().await);
        assert_eq!(fx.store.retrieve(), None);
        assert!(!fx.auth.is_checking());
    }

    #[tokio::test]
    async fn test_rejected_token_is_cleared() {
        let fx = fixture();
        fx.store.store(&token_expiring_in(3600));
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), StubVerifier::status(401));

        assert!(!init.initialize().await);
        assert_eq!(fx.store.retrieve(), None);
        assert_eq!(fx.durable.get("auth_token").unwrap(), None);
        assert!(!fx.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_runs_once() {
        let fx = fixture();
        let token = token_expiring_in(3600);
        fx.store.store(&token);
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), StubVerifier::ok(user()));

        assert!(init.initialize().await);
        assert!(init.initialize().await);
        assert_eq!(init.verifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_valid_token_from_cookie_only() {
        let fx = fixture();
        let token = token_expiring_in(3600);
        fx.store.store(&token);
        fx.durable.remove("auth_token").unwrap();
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), StubVerifier::ok(user()));

        assert!(init.initialize().await);
        assert_eq!(fx.auth.snapshot().token, Some(token));
    }

    // End-to-end against an HTTP verification endpoint

    async fn profile_server(status: u16) -> MockServer {
        profile_server_with(status, serde_json::json!({"id": 1, "role": "admin"})).await
    }

    async fn profile_server_with(status: u16, body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/profile"))
            .and(header("authorization", format!("Bearer {}", token_for_server()).as_str()))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(body),
            )
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn token_for_server() -> String {
        make_token(&serde_json::json!({ "exp": 4_000_000_000i64, "role": "admin", "sub": "1" }))
    }

    #[tokio::test]
    async fn test_verified_session_hydrates_state() {
        let server = profile_server(200).await;
        let fx = fixture();
        fx.store.store(&token_for_server());
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), api);

        assert!(init.initialize().await);

        let state = fx.auth.snapshot();
        assert!(state.is_authenticated);
        assert!(!state.is_checking_auth);
        assert_eq!(state.user, Some(user()));
        assert_eq!(state.token, Some(token_for_server()));
        assert_eq!(fx.store.retrieve(), Some(token_for_server()));
    }

    #[tokio::test]
    async fn test_profile_with_string_id_hydrates_state() {
        let server = profile_server_with(200, serde_json::json!({"id": "u-42", "role": "admin"})).await;
        let fx = fixture();
        fx.store.store(&token_for_server());
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), api);

        assert!(init.initialize().await);

        let state = fx.auth.snapshot();
        assert!(state.is_authenticated);
        let user = state.user.expect("profile kept in state");
        assert_eq!(user.user_id().as_deref(), Some("u-42"));
        assert_eq!(fx.store.retrieve(), Some(token_for_server()));
    }

    #[tokio::test]
    async fn test_unauthorized_session_is_cleared() {
        let server = profile_server(401).await;
        let fx = fixture();
        fx.store.store(&token_for_server());
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), api);

        assert!(!init.initialize().await);

        let state = fx.auth.snapshot();
        assert!(!state.is_authenticated);
        assert_eq!(state.user, None);
        assert_eq!(fx.store.retrieve(), None);
        assert_eq!(fx.cookies.get("auth_token").unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_cleared() {
        let fx = fixture();
        fx.store.store(&token_for_server());
        // Nothing listens on port 9 on the loopback interface
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let init = SessionInitializer::new(fx.store.clone(), fx.auth.clone(), api);

        assert!(!init.initialize().await);
        assert_eq!(fx.store.retrieve(), None);
    }
}
