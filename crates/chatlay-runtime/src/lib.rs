#[cfg(not(target_os = "windows"))]
mod global_keys;
mod logging;
mod poller;
mod tray;

use std::sync::Arc;

use chatlay_core::overlay::manager;
use chatlay_core::{AppState, ConfigStore, KeyState, OVERLAY_LABEL, SETTINGS_LABEL, commands};
use tauri::{App, Manager, WindowEvent};
use tracing::{error, info, warn};

#[cfg(target_os = "windows")]
fn key_state() -> Arc<dyn KeyState> {
    Arc::new(chatlay_core::AsyncKeyState)
}

#[cfg(not(target_os = "windows"))]
fn key_state() -> Arc<dyn KeyState> {
    Arc::new(global_keys::ListenerKeyState::spawn())
}

fn setup(app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    let store = ConfigStore::in_working_dir();
    let state = AppState::new(store, key_state());
    let first_run = state.is_first_run();
    app.manage(state);

    tray::setup_tray(app)?;
    poller::start(app.handle().clone());

    let state = app.state::<AppState>();
    if first_run {
        // No overlay until the first settings dialog is accepted.
        info!(path = ?state.store().path(), "no configuration found, showing settings");
        manager::open_settings(app.handle())?;
    } else {
        let config = state.store().load();
        state.launch_overlay(app.handle(), config)?;
    }

    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::init();

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            commands::config_get,
            commands::hotkey_presets,
            commands::settings_accept,
            commands::settings_cancel,
            commands::overlay_pointer_press,
            commands::overlay_pointer_move,
            commands::overlay_pointer_release,
        ])
        .setup(setup)
        .on_window_event(|window, event| {
            let WindowEvent::CloseRequested { api, .. } = event else {
                return;
            };
            let state = window.state::<AppState>();
            match window.label() {
                // Closing the overlay hides it to the tray; only Quit exits.
                OVERLAY_LABEL => {
                    api.prevent_close();
                    state.with_session(|session| session.set_visible(false));
                }
                SETTINGS_LABEL if state.is_first_run() => {
                    warn!("first-run settings closed, exiting");
                    window.app_handle().exit(1);
                }
                _ => {}
            }
        })
        .run(tauri::generate_context!());

    if let Err(e) = result {
        error!(error = %e, "error running chatlay");
        std::process::exit(1);
    }
}
