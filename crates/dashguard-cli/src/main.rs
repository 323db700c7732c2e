//! dashguard - command-line host for the dashboard session core.
//!
//! Commands:
//! - `status`: hydrate the session from storage and print the auth state
//! - `login [email]`: sign in and persist the token
//! - `logout`: clear the stored token
//! - `claims`: show the unverified claims of the stored token
//! - `watch`: keep the session open, logging out after inactivity.
//!   Every line typed on stdin counts as a key press.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dashguard_core::token;
use dashguard_core::{
    ActivitySignal, ApiClient, AuthStore, Config, InactivityMonitor, Login, Logout, LogoutReason,
    SessionInitializer, TokenStore, TracingNavigator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory for an optional rolling log file
const ENV_LOG_DIR: &str = "DASHGUARD_LOG_DIR";

const USAGE: &str = "usage: dashguard <status|login [email]|logout|claims|watch>";

/// Initialize the tracing subscriber for logging.
/// The returned guard must be held for the file writer to flush.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr));

    match std::env::var(ENV_LOG_DIR) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dashguard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(_) => {
            registry.init();
            None
        }
    }
}

/// Everything a command needs, wired from config
struct Session {
    config: Config,
    store: Arc<TokenStore>,
    auth: AuthStore,
    api: ApiClient,
}

impl Session {
    fn open() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

        let store = config.open_token_store(cache_dir);
        let api = ApiClient::from_config(&config).context("Failed to build API client")?;

        Ok(Self {
            config,
            store: Arc::new(store),
            auth: AuthStore::new(),
            api,
        })
    }

    fn logout(&self) -> Logout {
        Logout::new(
            self.store.clone(),
            self.auth.clone(),
            Arc::new(TracingNavigator),
            self.config.login_route.clone(),
        )
    }

    async fn initialize(&self) -> bool {
        SessionInitializer::new(self.store.clone(), self.auth.clone(), self.api.clone())
            .initialize()
            .await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let session = Session::open()?;

    match args.get(1).map(String::as_str) {
        Some("status") | None => status(&session).await,
        Some("login") => login(&session, args.get(2).cloned()).await,
        Some("logout") => {
            session.logout().logout(LogoutReason::UserRequested);
            println!("Logged out.");
            Ok(())
        }
        Some("claims") => claims(&session),
        Some("watch") => watch(&session).await,
        Some(other) => Err(anyhow::anyhow!("unknown command '{}'\n{}", other, USAGE)),
    }
}

async fn status(session: &Session) -> Result<()> {
    session.initialize().await;
    let state = session.auth.snapshot();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn login(session: &Session, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };
    let password = rpassword::prompt_password("Password: ")?;

    let login = Login::new(
        session.api.clone(),
        session.store.clone(),
        session.auth.clone(),
        Arc::new(TracingNavigator),
        session.config.dashboard_route.clone(),
    );
    let user = login.login(&email, &password).await.context("Login failed")?;

    println!("Signed in as {}", user.display_name());
    Ok(())
}

fn claims(session: &Session) -> Result<()> {
    let Some(stored) = session.store.retrieve() else {
        println!("No stored token.");
        return Ok(());
    };

    match token::decode(&stored) {
        Ok(claims) => {
            let expires = claims
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never set".to_string());
            println!("subject: {}", claims.sub.as_deref().unwrap_or("-"));
            println!("role:    {}", claims.role.as_deref().unwrap_or("-"));
            println!("admin:   {}", claims.role_kind().is_some_and(|role| role.is_admin()));
            println!("expires: {}", expires);
            println!("expired: {}", token::is_expired(&stored));
        }
        Err(e) => println!("Stored token is unreadable: {}", e),
    }
    Ok(())
}

async fn watch(session: &Session) -> Result<()> {
    if !session.initialize().await {
        println!("Not signed in. Run `dashguard login` first.");
        return Ok(());
    }

    let monitor = InactivityMonitor::new(
        session.auth.clone(),
        session.logout(),
        &session.config,
    )
    .spawn();
    info!(timeout_ms = session.config.session_timeout_ms, "Watching for inactivity");
    println!(
        "Session active. Press Enter to stay signed in (timeout {}s).",
        session.config.session_timeout().as_secs()
    );

    let activity = monitor.activity();
    let mut auth_rx = session.auth.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(_) => activity.record(ActivitySignal::KeyDown),
                None => break,
            },
            state = auth_rx.wait_for(|s| !s.is_authenticated) => {
                state?;
                println!("Signed out after inactivity.");
                break;
            }
        }
    }

    monitor.shutdown();
    Ok(())
}
