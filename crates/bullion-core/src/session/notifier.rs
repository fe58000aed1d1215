use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::config::Config;

pub const SESSION_EXPIRED_WARNING: &str = "Your session has expired. Please log in again.";

/// The user-facing side of session expiry, implemented by the front end.
pub trait SessionPresenter: Send + Sync {
    /// Show a warning that disappears after `duration`.
    fn show_warning(&self, message: &str, duration: Duration);

    /// Throw away all in-memory state and start over at `entry_route`.
    /// This is a full restart, not an in-app navigation.
    fn restart(&self, entry_route: &str);
}

/// Presenter that only logs. Useful for headless callers.
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl SessionPresenter for TracingPresenter {
    fn show_warning(&self, message: &str, duration: Duration) {
        warn!(duration_ms = duration.as_millis() as u64, "{}", message);
    }

    fn restart(&self, entry_route: &str) {
        info!(route = entry_route, "Restarting at entry route");
    }
}

pub struct SessionExpiryNotifier {
    store: Arc<dyn TokenStore>,
    presenter: Arc<dyn SessionPresenter>,
    warning_duration: Duration,
    entry_route: String,
    /// Set while a warning is showing and a restart is scheduled.
    pending: Arc<AtomicBool>,
    /// Bumped after every restart.
    restarts: Arc<watch::Sender<u64>>,
}

impl SessionExpiryNotifier {
    pub fn new(
        store: Arc<dyn TokenStore>,
        presenter: Arc<dyn SessionPresenter>,
        config: &Config,
    ) -> Self {
        Self::with_timing(
            store,
            presenter,
            config.warning_duration(),
            config.entry_route.clone(),
        )
    }

    pub fn with_timing(
        store: Arc<dyn TokenStore>,
        presenter: Arc<dyn SessionPresenter>,
        warning_duration: Duration,
        entry_route: impl Into<String>,
    ) -> Self {
        let (restarts, _) = watch::channel(0);
        Self {
            store,
            presenter,
            warning_duration,
            entry_route: entry_route.into(),
            pending: Arc::new(AtomicBool::new(false)),
            restarts: Arc::new(restarts),
        }
    }

    /// Tear the session down.
    ///
    /// The token is cleared on every call. The warning and the delayed
    /// restart happen only once per expiry window; returns `true` for the
    /// call that scheduled them.
    pub fn notify_expired(&self) -> bool {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }

        if self.pending.swap(true, Ordering::AcqRel) {
            debug!("Session expiry already being handled");
            return false;
        }

        warn!("Session expired");
        self.presenter
            .show_warning(SESSION_EXPIRED_WARNING, self.warning_duration);

        let presenter = Arc::clone(&self.presenter);
        let pending = Arc::clone(&self.pending);
        let restarts = Arc::clone(&self.restarts);
        let route = self.entry_route.clone();
        let delay = self.warning_duration;

        let finish = move || {
            presenter.restart(&route);
            pending.store(false, Ordering::Release);
            restarts.send_modify(|count| *count += 1);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    finish();
                });
            }
            Err(_) => {
                // No runtime to schedule on; block for the warning instead.
                std::thread::sleep(delay);
                finish();
            }
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Receiver that changes each time a restart has been performed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.restarts.subscribe()
    }

    pub fn restart_count(&self) -> u64 {
        *self.restarts.borrow()
    }
}
