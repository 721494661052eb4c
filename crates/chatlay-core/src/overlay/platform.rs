//! OS-facing window operations for the single overlay window.
//!
//! [`WindowPlatform`] is the seam the mode machine drives. [`NativeWindow`]
//! implements it over a Tauri webview window:
//! - Windows: extended style bits (`WS_EX_LAYERED`, `WS_EX_TRANSPARENT`,
//!   `WS_EX_TOOLWINDOW`, `WS_EX_NOACTIVATE`) and layered-window alpha
//! - macOS: ignore-mouse-events and `NSWindow` alpha
//! - elsewhere: ignore-cursor-events only, alpha is not supported

use std::sync::Arc;

use tauri::{LogicalPosition, LogicalSize, WebviewWindow};
use tracing::debug;

use crate::Error;
use crate::overlay::keys::{HotkeyCode, KeyState};
use crate::overlay::window::{Bounds, WindowStyle};

/// Window-system primitives used by the overlay mode machine.
///
/// Failures are reported but never fatal; callers log them and carry on with
/// their own view of the window state.
pub trait WindowPlatform {
    /// Set or clear input transparency together with the no-activate bit.
    fn set_click_through(&mut self, enabled: bool) -> Result<(), Error>;

    /// Set the compositing alpha, `0.0..=1.0`.
    fn set_layer_alpha(&mut self, alpha: f32) -> Result<(), Error>;

    /// Sample whether `key` is held right now.
    fn poll_key_down(&self, key: HotkeyCode) -> bool;

    fn set_window_bounds(&mut self, bounds: Bounds) -> Result<(), Error>;

    fn apply_style(&mut self, style: WindowStyle) -> Result<(), Error>;

    /// Re-show the window after a style change. Hidden windows stay hidden.
    fn refresh(&mut self) -> Result<(), Error>;

    fn set_visible(&mut self, visible: bool) -> Result<(), Error>;
}

/// Map `0.0..=1.0` to the layered-window alpha byte, truncating.
pub fn alpha_to_byte(alpha: f32) -> u8 {
    (alpha.clamp(0.0, 1.0) * 255.0) as u8
}

/// Interpret a `SetWindowLongPtrW` result. A zero return is only a failure
/// when the call set the thread's last error, which is cleared beforehand.
#[cfg(any(target_os = "windows", test))]
fn check_set_window_long(previous: isize, last_error: Option<i32>) -> Result<(), Error> {
    match last_error {
        Some(code) if previous == 0 && code != 0 => Err(Error::platform(
            "SetWindowLongPtrW",
            std::io::Error::from_raw_os_error(code),
        )),
        _ => Ok(()),
    }
}

/// Replace the extended window style.
#[cfg(target_os = "windows")]
fn set_ex_style(hwnd: windows::Win32::Foundation::HWND, ex_style: isize) -> Result<(), Error> {
    use windows::Win32::Foundation::{SetLastError, WIN32_ERROR};
    use windows::Win32::UI::WindowsAndMessaging::{GWL_EXSTYLE, SetWindowLongPtrW};

    unsafe {
        SetLastError(WIN32_ERROR(0));
        let previous = SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style);
        check_set_window_long(previous, std::io::Error::last_os_error().raw_os_error())
    }
}

/// The overlay's native window. Wraps exactly one webview window for the
/// lifetime of the process.
pub struct NativeWindow {
    window: WebviewWindow,
    keys: Arc<dyn KeyState>,
    click_through: Option<bool>,
    #[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
    alpha_warned: bool,
}

impl NativeWindow {
    pub fn new(window: WebviewWindow, keys: Arc<dyn KeyState>) -> Self {
        Self {
            window,
            keys,
            click_through: None,
            alpha_warned: false,
        }
    }

    #[cfg(target_os = "windows")]
    fn hwnd(&self) -> Result<windows::Win32::Foundation::HWND, Error> {
        let hwnd = self
            .window
            .hwnd()
            .map_err(|e| Error::platform("hwnd", e))?;
        Ok(windows::Win32::Foundation::HWND(hwnd.0))
    }

    #[cfg(target_os = "windows")]
    fn apply_click_through(&self, enabled: bool) -> Result<(), Error> {
        use windows::Win32::UI::WindowsAndMessaging::{
            GWL_EXSTYLE, GetWindowLongPtrW, HWND_TOPMOST, SWP_FRAMECHANGED, SWP_NOACTIVATE,
            SWP_NOMOVE, SWP_NOSIZE, SetWindowPos, WS_EX_LAYERED, WS_EX_NOACTIVATE,
            WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT,
        };

        let hwnd = self.hwnd()?;
        let input_bits = (WS_EX_TRANSPARENT.0 | WS_EX_NOACTIVATE.0) as isize;

        unsafe {
            let mut ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
            ex_style |= (WS_EX_LAYERED.0 | WS_EX_TOOLWINDOW.0) as isize;
            if enabled {
                ex_style |= input_bits;
            } else {
                ex_style &= !input_bits;
            }

            set_ex_style(hwnd, ex_style)?;

            SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            )
            .map_err(|e| Error::platform("SetWindowPos", e))?;
        }

        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    fn apply_click_through(&self, enabled: bool) -> Result<(), Error> {
        self.window
            .set_ignore_cursor_events(enabled)
            .map_err(|e| Error::platform("set_ignore_cursor_events", e))
    }

    #[cfg(target_os = "windows")]
    fn apply_alpha(&mut self, alpha: f32) -> Result<(), Error> {
        use windows::Win32::Foundation::COLORREF;
        use windows::Win32::UI::WindowsAndMessaging::{
            GWL_EXSTYLE, GetWindowLongPtrW, LWA_ALPHA, SetLayeredWindowAttributes, WS_EX_LAYERED,
        };

        let hwnd = self.hwnd()?;
        unsafe {
            // Alpha only takes effect on layered windows.
            let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
            let layered = WS_EX_LAYERED.0 as isize;
            if ex_style & layered == 0 {
                set_ex_style(hwnd, ex_style | layered)?;
            }

            SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha_to_byte(alpha), LWA_ALPHA)
                .map_err(|e| Error::platform("SetLayeredWindowAttributes", e))?;
        }
        Ok(())
    }

    #[cfg(target_os = "macos")]
    fn apply_alpha(&mut self, alpha: f32) -> Result<(), Error> {
        use objc2::rc::Retained;
        use objc2_app_kit::NSWindow;

        let ns_window_ptr = self
            .window
            .ns_window()
            .map_err(|e| Error::platform("ns_window", e))?;

        // SAFETY: the pointer stays valid while the window exists, and the
        // overlay window lives for the whole process.
        let ns_window: Retained<NSWindow> =
            unsafe { Retained::retain(ns_window_ptr as *mut NSWindow) }
                .ok_or_else(|| Error::platform("ns_window", "NSWindow pointer was null"))?;

        ns_window.setAlphaValue(f64::from(alpha));
        Ok(())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn apply_alpha(&mut self, alpha: f32) -> Result<(), Error> {
        if !self.alpha_warned {
            debug!(alpha, "window alpha is not supported on this platform");
            self.alpha_warned = true;
        }
        Ok(())
    }
}

impl WindowPlatform for NativeWindow {
    fn set_click_through(&mut self, enabled: bool) -> Result<(), Error> {
        if self.click_through == Some(enabled) {
            return Ok(());
        }
        debug!(enabled, "applying click-through");
        self.apply_click_through(enabled)?;
        self.click_through = Some(enabled);
        Ok(())
    }

    fn set_layer_alpha(&mut self, alpha: f32) -> Result<(), Error> {
        debug!(alpha, byte = alpha_to_byte(alpha), "applying layer alpha");
        self.apply_alpha(alpha)
    }

    fn poll_key_down(&self, key: HotkeyCode) -> bool {
        self.keys.is_down(key)
    }

    fn set_window_bounds(&mut self, bounds: Bounds) -> Result<(), Error> {
        self.window
            .set_position(LogicalPosition::new(f64::from(bounds.x), f64::from(bounds.y)))
            .map_err(|e| Error::platform("set_position", e))?;
        self.window
            .set_size(LogicalSize::new(
                f64::from(bounds.width),
                f64::from(bounds.height),
            ))
            .map_err(|e| Error::platform("set_size", e))?;
        Ok(())
    }

    fn apply_style(&mut self, style: WindowStyle) -> Result<(), Error> {
        let interactive = style == WindowStyle::Interactive;

        // Decoration changes rewrite native styles; force the next
        // click-through call through to the OS.
        self.click_through = None;

        self.window
            .set_decorations(interactive)
            .map_err(|e| Error::platform("set_decorations", e))?;
        self.window
            .set_focusable(interactive)
            .map_err(|e| Error::platform("set_focusable", e))?;
        self.window
            .set_skip_taskbar(true)
            .map_err(|e| Error::platform("set_skip_taskbar", e))?;
        self.window
            .set_always_on_top(true)
            .map_err(|e| Error::platform("set_always_on_top", e))?;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), Error> {
        let visible = self
            .window
            .is_visible()
            .map_err(|e| Error::platform("is_visible", e))?;
        if visible {
            self.window
                .show()
                .map_err(|e| Error::platform("show", e))?;
        }
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), Error> {
        let result = if visible {
            self.window.show()
        } else {
            self.window.hide()
        };
        result.map_err(|e| Error::platform(if visible { "show" } else { "hide" }, e))
    }
}
