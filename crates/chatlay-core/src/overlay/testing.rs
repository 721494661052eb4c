use std::cell::Cell;

use crate::Error;
use crate::overlay::keys::HotkeyCode;
use crate::overlay::platform::WindowPlatform;
use crate::overlay::window::{Bounds, WindowStyle};

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    ClickThrough(bool),
    Alpha(f32),
    Bounds(Bounds),
    Style(WindowStyle),
    Refresh,
    Visible(bool),
}

/// Records every window-system call. The held key is set by the test.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub calls: Vec<PlatformCall>,
    pub held: Option<HotkeyCode>,
    pub fail_click_through: bool,
    pub polls: Cell<usize>,
}

impl FakePlatform {
    pub fn take_calls(&mut self) -> Vec<PlatformCall> {
        std::mem::take(&mut self.calls)
    }
}

impl WindowPlatform for FakePlatform {
    fn set_click_through(&mut self, enabled: bool) -> Result<(), Error> {
        self.calls.push(PlatformCall::ClickThrough(enabled));
        if self.fail_click_through {
            return Err(Error::platform("SetWindowLongPtrW", "access denied"));
        }
        Ok(())
    }

    fn set_layer_alpha(&mut self, alpha: f32) -> Result<(), Error> {
        self.calls.push(PlatformCall::Alpha(alpha));
        Ok(())
    }

    fn poll_key_down(&self, key: HotkeyCode) -> bool {
        self.polls.set(self.polls.get() + 1);
        self.held == Some(key)
    }

    fn set_window_bounds(&mut self, bounds: Bounds) -> Result<(), Error> {
        self.calls.push(PlatformCall::Bounds(bounds));
        Ok(())
    }

    fn apply_style(&mut self, style: WindowStyle) -> Result<(), Error> {
        self.calls.push(PlatformCall::Style(style));
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), Error> {
        self.calls.push(PlatformCall::Refresh);
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), Error> {
        self.calls.push(PlatformCall::Visible(visible));
        Ok(())
    }
}
