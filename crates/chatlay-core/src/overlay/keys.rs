//! Hotkey identifiers and the key-state sources the poller samples.
//!
//! A hotkey is kept as an opaque platform virtual-key code. The settings page
//! offers a short list of named presets, but any code read from the
//! configuration file is polled as-is.

use serde::{Deserialize, Serialize};

/// Platform virtual-key identifier (Win32 `VK_*` numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotkeyCode(pub u32);

impl HotkeyCode {
    pub const SHIFT: Self = Self(0x10);
    pub const CONTROL: Self = Self(0x11);
    pub const ALT: Self = Self(0x12);
    pub const F1: Self = Self(0x70);
    pub const F2: Self = Self(0x71);
    pub const F3: Self = Self(0x72);
    pub const F4: Self = Self(0x73);

    /// Left and right variants of a modifier (`VK_LSHIFT`/`VK_RSHIFT` and so
    /// on). Either one held counts as the modifier held.
    pub fn sided(self) -> Option<[HotkeyCode; 2]> {
        match self {
            Self::SHIFT => Some([Self(0xA0), Self(0xA1)]),
            Self::CONTROL => Some([Self(0xA2), Self(0xA3)]),
            Self::ALT => Some([Self(0xA4), Self(0xA5)]),
            _ => None,
        }
    }
}

impl Default for HotkeyCode {
    fn default() -> Self {
        Self::CONTROL
    }
}

/// A named hotkey offered by the settings page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyPreset {
    pub code: HotkeyCode,
    pub label: String,
}

pub fn hotkey_presets() -> Vec<HotkeyPreset> {
    [
        (HotkeyCode::CONTROL, "Control"),
        (HotkeyCode::SHIFT, "Shift"),
        (HotkeyCode::ALT, "Alt"),
        (HotkeyCode::F1, "F1"),
        (HotkeyCode::F2, "F2"),
        (HotkeyCode::F3, "F3"),
        (HotkeyCode::F4, "F4"),
    ]
    .into_iter()
    .map(|(code, label)| HotkeyPreset {
        code,
        label: label.to_string(),
    })
    .collect()
}

/// Instantaneous "is this key held right now" query.
///
/// Implementations are sampled every poll tick and must not block. They report
/// level, not edges; the mode machine does its own edge detection.
pub trait KeyState: Send + Sync {
    fn is_down(&self, key: HotkeyCode) -> bool;
}

/// `GetAsyncKeyState` backed key state.
#[cfg(target_os = "windows")]
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncKeyState;

#[cfg(target_os = "windows")]
impl KeyState for AsyncKeyState {
    fn is_down(&self, key: HotkeyCode) -> bool {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

        // High bit set means the key is down at call time.
        let state = unsafe { GetAsyncKeyState(key.0 as i32) };
        (state as u16 & 0x8000) != 0
    }
}

/// Key state that never reports a press. Used when no source is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyState;

impl KeyState for NoKeyState {
    fn is_down(&self, _key: HotkeyCode) -> bool {
        false
    }
}
