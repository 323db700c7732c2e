//! Shared fixtures for auth tests.

use std::sync::{Arc, Mutex};

use chrono::Duration;
use futures::future::BoxFuture;

use super::initializer::Verifier;
use super::logout::{Logout, Navigator};
use super::state::AuthStore;
use crate::api::ApiError;
use crate::models::UserProfile;
use crate::token::{MemoryCookieJar, MemoryStore, StorePolicy, TokenStore};

pub(crate) fn user() -> UserProfile {
    serde_json::from_value(serde_json::json!({"id": 1, "role": "admin"})).unwrap()
}

/// Navigator that remembers every redirect
#[derive(Clone, Default)]
pub(crate) struct RecordingNavigator {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

/// Verifier with a canned answer that counts calls
pub(crate) struct StubVerifier {
    pub(crate) result: Result<UserProfile, u16>,
    pub(crate) calls: Arc<Mutex<u32>>,
}

impl StubVerifier {
    pub(crate) fn ok(profile: UserProfile) -> Self {
        Self { result: Ok(profile), calls: Arc::default() }
    }

    pub(crate) fn status(code: u16) -> Self {
        Self { result: Err(code), calls: Arc::default() }
    }

    pub(crate) fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl Verifier for StubVerifier {
    fn verify<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, Result<UserProfile, ApiError>> {
        *self.calls.lock().unwrap() += 1;
        let result = match &self.result {
            Ok(profile) => Ok(profile.clone()),
            Err(code) => Err(ApiError::from_status(
                reqwest::StatusCode::from_u16(*code).unwrap(),
                "",
            )),
        };
        Box::pin(async move { result })
    }
}

pub(crate) struct Fixture {
    pub(crate) store: Arc<TokenStore>,
    pub(crate) durable: MemoryStore,
    pub(crate) cookies: MemoryCookieJar,
    pub(crate) auth: AuthStore,
    pub(crate) navigator: RecordingNavigator,
    pub(crate) logout: Logout,
}

pub(crate) fn fixture() -> Fixture {
    let durable = MemoryStore::new();
    let cookies = MemoryCookieJar::new();
    let policy = StorePolicy {
        storage_key: "auth_token".to_string(),
        cookie_name: "auth_token".to_string(),
        ttl: Duration::hours(24),
        secure: false,
    };
    let store = Arc::new(TokenStore::new(
        Box::new(durable.clone()),
        Box::new(cookies.clone()),
        policy,
    ));
    let auth = AuthStore::new();
    let navigator = RecordingNavigator::default();
    let logout = Logout::new(store.clone(), auth.clone(), Arc::new(navigator.clone()), "/login");

    Fixture {
        store,
        durable,
        cookies,
        auth,
        navigator,
        logout,
    }
}
