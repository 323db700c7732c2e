use super::state::AuthState;
use crate::config::Config;

/// What a router should do with a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session check still running; render nothing route-dependent yet
    Wait,
    Allow,
    Redirect(String),
}

/// Route guard over the auth state.
///
/// The login route is the only public route. Signed-in users asking for it are
/// sent to the dashboard; everyone else asking for anything else must be signed in.
pub fn guard(state: &AuthState, route: &str, config: &Config) -> GuardDecision {
    if state.is_checking_auth {
        return GuardDecision::Wait;
    }

    let is_login = is_same_route(route, &config.login_route);
    match (state.is_authenticated, is_login) {
        (true, true) => GuardDecision::Redirect(config.dashboard_route.clone()),
        (false, false) => GuardDecision::Redirect(config.login_route.clone()),
        _ => GuardDecision::Allow,
    }
}

fn is_same_route(route: &str, target: &str) -> bool {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/') == target.trim_end_matches('/')
}
