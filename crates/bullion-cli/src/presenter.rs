use std::time::Duration;

use bullion_core::SessionPresenter;
use tracing::info;

/// Shows session expiry on the terminal.
///
/// A CLI invocation has no in-memory session to reset beyond the process
/// itself, so a restart ends the command; `main` waits for it before
/// exiting.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl SessionPresenter for ConsolePresenter {
    fn show_warning(&self, message: &str, _duration: Duration) {
        eprintln!("warning: {}", message);
    }

    fn restart(&self, entry_route: &str) {
        info!(route = entry_route, "Session reset");
        eprintln!("Session reset. Run `bullion login` to sign in again.");
    }
}
