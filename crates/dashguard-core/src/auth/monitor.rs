//! Inactivity logout.
//!
//! One spawned task owns the only timer. It arms when the auth state becomes
//! authenticated, pushes the deadline out on every monitored activity signal,
//! and forces a logout when the deadline passes. Logging out from anywhere else
//! disarms it.
//!
//! Activity is polled before the timer, so a reset that is already queued when
//! the deadline arrives wins and the stale expiry is discarded.

use std::collections::HashSet;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, trace};

use super::logout::{Logout, LogoutReason};
use super::state::AuthStore;
use crate::config::Config;

/// Deadline used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Buffer for activity signals. Dropping signals when full is harmless: any
/// queued signal already resets the timer.
const ACTIVITY_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivitySignal {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    pub const DEFAULT_SET: [ActivitySignal; 5] = [
        ActivitySignal::PointerDown,
        ActivitySignal::PointerMove,
        ActivitySignal::KeyDown,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Armed,
    Disarmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Deadline of the pending timer while armed
    pub deadline: Option<Instant>,
}

impl MonitorStatus {
    fn armed(deadline: Instant) -> Self {
        Self {
            state: MonitorState::Armed,
            deadline: Some(deadline),
        }
    }

    fn disarmed() -> Self {
        Self {
            state: MonitorState::Disarmed,
            deadline: None,
        }
    }
}

/// The single pending inactivity timeout.
/// Resetting moves the one deadline; it never creates a second timer.
pub struct InactivityTimer {
    sleep: Pin<Box<Sleep>>,
    timeout: Duration,
}

impl InactivityTimer {
    pub fn start(timeout: Duration) -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep_until(deadline_after(timeout))),
            timeout,
        }
    }

    pub fn reset(&mut self) {
        self.sleep.as_mut().reset(deadline_after(self.timeout));
    }

    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    pub async fn expired(&mut self) {
        self.sleep.as_mut().await
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Cheap, cloneable sender for activity signals.
#[derive(Clone)]
pub struct ActivitySender {
    tx: mpsc::Sender<ActivitySignal>,
}

impl ActivitySender {
    /// Report user activity. Never blocks; safe to call on every input event.
    pub fn record(&self, signal: ActivitySignal) {
        if let Err(e) = self.tx.try_send(signal) {
            trace!(error = %e, "Activity signal dropped");
        }
    }
}

pub struct InactivityMonitor {
    auth: AuthStore,
    logout: Logout,
    timeout: Duration,
    signals: HashSet<ActivitySignal>,
}

impl InactivityMonitor {
    pub fn new(auth: AuthStore, logout: Logout, config: &Config) -> Self {
        Self::with_settings(
            auth,
            logout,
            config.session_timeout(),
            config.activity_signals.iter().copied(),
        )
    }

    pub fn with_settings(
        auth: AuthStore,
        logout: Logout,
        timeout: Duration,
        signals: impl IntoIterator<Item = ActivitySignal>,
    ) -> Self {
        Self {
            auth,
            logout,
            timeout,
            signals: signals.into_iter().collect(),
        }
    }

    /// Start watching. The monitor runs until the returned handle is dropped.
    pub fn spawn(self) -> MonitorHandle {
        let (tx, rx) = mpsc::channel(ACTIVITY_BUFFER_SIZE);
        let (status_tx, status_rx) = watch::channel(MonitorStatus::disarmed());
        let task = tokio::spawn(self.run(rx, status_tx));

        MonitorHandle {
            activity: ActivitySender { tx },
            status: status_rx,
            task,
        }
    }

    async fn run(
        self,
        mut activity: mpsc::Receiver<ActivitySignal>,
        status: watch::Sender<MonitorStatus>,
    ) {
        let mut auth_rx = self.auth.subscribe();

        loop {
            // Disarmed: wait for a session, discarding activity meanwhile
            while !auth_rx.borrow_and_update().is_authenticated {
                tokio::select! {
                    changed = auth_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    signal = activity.recv() => {
                        if signal.is_none() {
                            return;
                        }
                    }
                }
            }

            // The token identifies the session the timer belongs to
            let mut session = auth_rx.borrow().token.clone();
            let mut timer = InactivityTimer::start(self.timeout);
            status.send_replace(MonitorStatus::armed(timer.deadline()));
            info!(timeout_ms = self.timeout.as_millis() as u64, "Inactivity monitor armed");

            let timed_out = loop {
                tokio::select! {
                    biased;

                    signal = activity.recv() => match signal {
                        Some(signal) if self.signals.contains(&signal) => {
                            timer.reset();
                            status.send_replace(MonitorStatus::armed(timer.deadline()));
                        }
                        Some(signal) => trace!(?signal, "Ignoring unmonitored signal"),
                        None => return,
                    },
                    changed = auth_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let (authenticated, token) = {
                            let state = auth_rx.borrow_and_update();
                            (state.is_authenticated, state.token.clone())
                        };
                        if !authenticated {
                            break false;
                        }
                        // Logout and a new login can land in one update
                        if token != session {
                            debug!("New session, restarting inactivity timer");
                            session = token;
                            timer.reset();
                            status.send_replace(MonitorStatus::armed(timer.deadline()));
                        }
                    }
                    () = timer.expired() => break true,
                }
            };

            drop(timer);
            status.send_replace(MonitorStatus::disarmed());

            if timed_out {
                info!("Session idle past timeout, logging out");
                self.logout.logout(LogoutReason::Inactivity);
            } else {
                debug!("Inactivity monitor disarmed by logout");
            }
        }
    }
}

/// Owner of a running monitor. Dropping it tears the monitor down.
pub struct MonitorHandle {
    activity: ActivitySender,
    status: watch::Receiver<MonitorStatus>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// A sender that input handlers can own independently of the handle
    pub fn activity(&self) -> ActivitySender {
        self.activity.clone()
    }

    pub fn status(&self) -> MonitorStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> MonitorState {
        self.status().state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.status().deadline
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.clone()
    }

    /// Stop the monitor now. A pending timeout never fires.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
