//! Window factory for the overlay and settings windows, and the webview
//! side of the content surface.

use std::sync::Arc;

use tauri::webview::PageLoadEvent;
use tauri::{
    AppHandle, Emitter, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder, window::Color,
};
use tracing::{debug, info, warn};

use crate::Error;
use crate::commands::AppState;
use crate::config::{ConfigStore, Configuration};
use crate::content::{
    ContentHost, LoadRequest, MODE_CHANGED_EVENT, ModePayload, WRAPPER_PAGE, generation_of,
};
use crate::overlay::keys::KeyState;
use crate::overlay::platform::NativeWindow;
use crate::overlay::window::Mode;
use crate::session::OverlaySession;

pub const OVERLAY_LABEL: &str = "overlay";
pub const SETTINGS_LABEL: &str = "settings";

const SETTINGS_PAGE: &str = "settings.html";

/// The session type the application runs.
pub type Session = OverlaySession<NativeWindow, WebviewContent>;

/// [`ContentHost`] over the overlay webview.
pub struct WebviewContent {
    window: WebviewWindow,
}

impl WebviewContent {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl ContentHost for WebviewContent {
    fn render(&mut self, request: &LoadRequest) -> Result<(), Error> {
        let target = self
            .window
            .url()?
            .join(&request.wrapper_path())
            .map_err(|e| Error::ContentLoad(format!("invalid wrapper URL: {e}")))?;
        debug!(generation = request.generation, %target, "navigating overlay");
        self.window.navigate(target)?;
        Ok(())
    }

    fn inject_script(&mut self, source: &str) -> Result<(), Error> {
        self.window
            .eval(source)
            .map_err(|e| Error::ContentLoad(e.to_string()))
    }

    fn notify_mode(&mut self, mode: Mode) -> Result<(), Error> {
        self.window
            .emit_to(OVERLAY_LABEL, MODE_CHANGED_EVENT, ModePayload { mode })?;
        Ok(())
    }
}

/// Create the overlay window, hidden, at the configured geometry.
///
/// The window starts on the bare wrapper page; the session's first render
/// navigates it to the tagged load.
pub fn build_overlay_window(app: &AppHandle, config: &Configuration) -> Result<WebviewWindow, Error> {
    if app.get_webview_window(OVERLAY_LABEL).is_some() {
        return Err(Error::WindowCreation(format!("{OVERLAY_LABEL} already exists")));
    }

    WebviewWindowBuilder::new(app, OVERLAY_LABEL, WebviewUrl::App(WRAPPER_PAGE.into()))
        .title("Chatlay")
        .inner_size(f64::from(config.width), f64::from(config.height))
        .position(f64::from(config.position_x), f64::from(config.position_y))
        .decorations(false)
        .transparent(true)
        .background_color(Color(0, 0, 0, 0))
        .always_on_top(true)
        .skip_taskbar(true)
        .focused(false)
        .visible(false)
        .on_page_load(|window, payload| {
            if payload.event() == PageLoadEvent::Finished {
                dispatch_ready(window.app_handle(), generation_of(payload.url()));
            }
        })
        .build()
        .map_err(|e| Error::WindowCreation(e.to_string()))
}

/// Start a session on a freshly built overlay window and show it.
pub fn start_session(
    window: WebviewWindow,
    store: ConfigStore,
    config: Configuration,
    keys: Arc<dyn KeyState>,
) -> Session {
    let platform = NativeWindow::new(window.clone(), keys);
    let content = WebviewContent::new(window);
    let mut session = OverlaySession::new(platform, content, store, config);
    session.start();
    session.set_visible(true);
    session
}

// Page-load callbacks can fire from inside the navigation that caused them,
// while the session is still locked. Queue the ready signal instead.
fn dispatch_ready(app: &AppHandle, generation: u64) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let handle = app.clone();
        let queued = app.run_on_main_thread(move || {
            handle
                .state::<AppState>()
                .with_session(|session| session.content_ready(generation));
        });
        if let Err(e) = queued {
            warn!(error = %e, generation, "failed to deliver content ready signal");
        }
    });
}

/// Opens the settings window, or focuses it if already open.
pub fn open_settings(app: &AppHandle) -> Result<(), Error> {
    if let Some(window) = app.get_webview_window(SETTINGS_LABEL) {
        window.show()?;
        window.set_focus()?;
        return Ok(());
    }

    WebviewWindowBuilder::new(app, SETTINGS_LABEL, WebviewUrl::App(SETTINGS_PAGE.into()))
        .title("Chatlay Settings")
        .inner_size(460.0, 600.0)
        .resizable(false)
        .center()
        .always_on_top(true)
        .visible(true)
        .build()
        .map_err(|e| Error::WindowCreation(e.to_string()))?;

    info!("settings window opened");
    Ok(())
}

/// Remove the settings window without raising a close request.
pub fn close_settings(app: &AppHandle) {
    let Some(window) = app.get_webview_window(SETTINGS_LABEL) else {
        return;
    };
    if let Err(e) = window.destroy() {
        warn!(error = %e, "failed to close settings window");
    }
}
