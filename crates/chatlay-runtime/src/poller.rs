//! Periodic hotkey sampling.

use std::time::Duration;

use chatlay_core::AppState;
use tauri::{AppHandle, Manager};
use tracing::{debug, warn};

/// Sampling period of the hotkey. Bounds mode-switch latency.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sample the hotkey every [`POLL_INTERVAL`] for the life of the process.
///
/// The timer runs on the async runtime; each tick is marshalled onto the
/// main thread, where every session call happens.
pub fn start(app: AppHandle) {
    tauri::async_runtime::spawn(async move {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        debug!(interval_ms = POLL_INTERVAL.as_millis() as u64, "hotkey poller started");

        loop {
            interval.tick().await;

            let handle = app.clone();
            let queued = app.run_on_main_thread(move || {
                handle
                    .state::<AppState>()
                    .with_session(|session| session.on_tick());
            });
            if let Err(e) = queued {
                warn!(error = %e, "hotkey poller stopped");
                break;
            }
        }
    });
}
