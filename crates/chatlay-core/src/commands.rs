use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tauri::{AppHandle, Manager, State, command};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tracing::{error, info, warn};

use crate::Error;
use crate::config::{ConfigStore, Configuration};
use crate::overlay::keys::{self, HotkeyPreset, KeyState};
use crate::overlay::manager::{self, Session};
use crate::overlay::window::Point;

/// Application-wide state managed by Tauri.
///
/// The session is only ever driven from the main thread; the mutex makes the
/// state shareable, not concurrent.
pub struct AppState {
    store: ConfigStore,
    keys: Arc<dyn KeyState>,
    session: Mutex<Option<Session>>,
    first_run: AtomicBool,
}

impl AppState {
    pub fn new(store: ConfigStore, keys: Arc<dyn KeyState>) -> Self {
        let first_run = !store.exists();
        Self {
            store,
            keys,
            session: Mutex::new(None),
            first_run: AtomicBool::new(first_run),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn keys(&self) -> Arc<dyn KeyState> {
        Arc::clone(&self.keys)
    }

    /// No configuration was persisted yet and the first settings dialog has
    /// not been accepted.
    pub fn is_first_run(&self) -> bool {
        self.first_run.load(Ordering::SeqCst)
    }

    fn finish_first_run(&self) {
        self.first_run.store(false, Ordering::SeqCst);
    }

    /// Run `f` against the running session. `None` before the overlay exists.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().map(f)
    }

    pub fn install_session(&self, session: Session) {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(session);
    }

    /// Build the overlay window for `config` and start its session.
    /// Must run on the main thread.
    pub fn launch_overlay(&self, app: &AppHandle, config: Configuration) -> Result<(), Error> {
        let window = manager::build_overlay_window(app, &config)?;
        let session = manager::start_session(window, self.store.clone(), config, self.keys());
        self.install_session(session);
        info!("overlay launched");
        Ok(())
    }
}

fn report_save_failure(app: &AppHandle, err: &Error) {
    error!(error = %err, "failed to save settings");
    app.dialog()
        .message(format!("Settings are applied but could not be saved.\n\n{err}"))
        .title("Chatlay")
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

#[command]
pub fn config_get(state: State<'_, AppState>) -> Configuration {
    state
        .with_session(|session| session.config().clone())
        .unwrap_or_else(|| state.store().load())
}

#[command]
pub fn hotkey_presets() -> Vec<HotkeyPreset> {
    keys::hotkey_presets()
}

/// Accept the settings dialog.
///
/// On first run this persists the record and creates the overlay; otherwise
/// the running overlay is reconfigured in place.
#[command]
pub async fn settings_accept(app: AppHandle, config: Configuration) -> Result<(), String> {
    config.validate().map_err(|e| e.to_string())?;

    let state = app.state::<AppState>();
    if state.is_first_run() {
        if let Err(e) = state.store().save(&config) {
            report_save_failure(&app, &e);
        }

        // Window creation from an async command; the session is started on
        // the main thread like every other session call.
        let window = manager::build_overlay_window(&app, &config).map_err(|e| e.to_string())?;
        state.finish_first_run();

        let handle = app.clone();
        app.run_on_main_thread(move || {
            let state = handle.state::<AppState>();
            let session = manager::start_session(window, state.store().clone(), config, state.keys());
            state.install_session(session);
            manager::close_settings(&handle);
            info!("first-run settings accepted");
        })
        .map_err(|e| e.to_string())?;
        return Ok(());
    }

    let handle = app.clone();
    app.run_on_main_thread(move || {
        let state = handle.state::<AppState>();
        match state.with_session(|session| session.apply_settings(config)) {
            Some(Ok(())) => info!("settings applied"),
            Some(Err(e)) => report_save_failure(&handle, &e),
            None => warn!("settings accepted with no overlay running"),
        }
        manager::close_settings(&handle);
    })
    .map_err(|e| e.to_string())
}

/// Dismiss the settings dialog. Declining the first-run dialog ends the
/// process with a failure status.
#[command]
pub fn settings_cancel(app: AppHandle, state: State<'_, AppState>) {
    if state.is_first_run() {
        warn!("first-run settings declined, exiting");
        app.exit(1);
        return;
    }
    manager::close_settings(&app);
}

#[command]
pub fn overlay_pointer_press(state: State<'_, AppState>, x: i32, y: i32) {
    state.with_session(|session| session.pointer_press(Point::new(x, y)));
}

#[command]
pub fn overlay_pointer_move(
    state: State<'_, AppState>,
    x: i32,
    y: i32,
    primary_held: bool,
) -> Option<Point> {
    state
        .with_session(|session| session.pointer_move(Point::new(x, y), primary_held))
        .flatten()
}

#[command]
pub fn overlay_pointer_release(state: State<'_, AppState>) -> Option<Point> {
    state
        .with_session(|session| session.pointer_release())
        .flatten()
}
