use chatlay_core::AppState;
use chatlay_core::overlay::manager;
use tauri::{
    App, AppHandle, Manager,
    image::Image,
    menu::{MenuBuilder, MenuItemBuilder, PredefinedMenuItem},
    tray::{TrayIconBuilder, TrayIconEvent},
};
use tracing::{error, info, warn};

const TRAY_ICON: &[u8] = include_bytes!("../icons/32x32.png");

const SHOW_HIDE: &str = "show_hide";
const RELOAD: &str = "reload";
const SETTINGS: &str = "settings";
const QUIT: &str = "quit";

pub fn setup_tray(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let show_hide = MenuItemBuilder::with_id(SHOW_HIDE, "Show/Hide").build(app)?;
    let reload = MenuItemBuilder::with_id(RELOAD, "Reload").build(app)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let settings = MenuItemBuilder::with_id(SETTINGS, "Settings...").build(app)?;
    let quit = MenuItemBuilder::with_id(QUIT, "Quit").build(app)?;

    let menu = MenuBuilder::new(app)
        .item(&show_hide)
        .item(&reload)
        .item(&separator)
        .item(&settings)
        .item(&quit)
        .build()?;

    let icon = Image::from_bytes(TRAY_ICON)?;

    TrayIconBuilder::new()
        .icon(icon)
        .menu(&menu)
        .tooltip("Chatlay")
        .on_menu_event(|app, event| handle_menu_event(app, event.id.as_ref()))
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::DoubleClick { .. } = event {
                open_settings(tray.app_handle());
            }
        })
        .build(app)?;

    Ok(())
}

fn handle_menu_event(app: &AppHandle, id: &str) {
    let state = app.state::<AppState>();
    match id {
        SHOW_HIDE => {
            if let Some(visible) = state.with_session(|session| session.toggle_visibility()) {
                info!(visible, "overlay visibility toggled");
            }
        }
        RELOAD => {
            state.with_session(|session| session.reload());
        }
        SETTINGS => open_settings(app),
        QUIT => quit(app),
        _ => {}
    }
}

fn open_settings(app: &AppHandle) {
    if let Err(e) = manager::open_settings(app) {
        error!(error = %e, "failed to open settings window");
    }
}

/// Persist the window position and the full record, then exit.
fn quit(app: &AppHandle) {
    let state = app.state::<AppState>();
    if let Some(Err(e)) = state.with_session(|session| session.persist_for_quit()) {
        warn!(error = %e, "failed to save configuration on quit");
    }
    info!("quitting");
    app.exit(0);
}
