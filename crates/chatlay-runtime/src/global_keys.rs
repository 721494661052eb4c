//! Hotkey state from a global keyboard listener, for platforms without an
//! instantaneous key-state query.
//!
//! A background thread records every key press and release as a Win32
//! virtual-key code. Modifiers are recorded per side, so Control stays held
//! while either Control key is down.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use chatlay_core::{HotkeyCode, KeyState};
use rdev::{EventType, Key, listen};
use tracing::{debug, warn};

#[derive(Default)]
pub struct ListenerKeyState {
    held: Arc<Mutex<HashSet<HotkeyCode>>>,
}

impl ListenerKeyState {
    /// Start the listener thread. It runs for the life of the process.
    pub fn spawn() -> Self {
        let state = Self::default();
        let held = Arc::clone(&state.held);

        let spawned = thread::Builder::new()
            .name("chatlay-keys".into())
            .spawn(move || {
                debug!("global key listener started");
                if let Err(e) = listen(move |event| record(&held, event.event_type)) {
                    warn!(error = ?e, "global key listener failed, hotkey unavailable");
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to start global key listener");
        }

        state
    }
}

impl KeyState for ListenerKeyState {
    fn is_down(&self, key: HotkeyCode) -> bool {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        is_held(&held, key)
    }
}

fn record(held: &Mutex<HashSet<HotkeyCode>>, event: EventType) {
    let (key, pressed) = match event {
        EventType::KeyPress(key) => (key, true),
        EventType::KeyRelease(key) => (key, false),
        _ => return,
    };
    let Some(code) = virtual_key(key) else {
        return;
    };

    let mut held = held.lock().unwrap_or_else(PoisonError::into_inner);
    if pressed {
        held.insert(code);
    } else {
        held.remove(&code);
    }
}

fn is_held(held: &HashSet<HotkeyCode>, key: HotkeyCode) -> bool {
    match key.sided() {
        Some(sides) => sides.iter().any(|side| held.contains(side)),
        None => held.contains(&key),
    }
}

/// Win32 virtual-key code of a physical key. Modifiers map to their sided
/// codes.
fn virtual_key(key: Key) -> Option<HotkeyCode> {
    let vk = match key {
        Key::ShiftLeft => 0xA0,
        Key::ShiftRight => 0xA1,
        Key::ControlLeft => 0xA2,
        Key::ControlRight => 0xA3,
        Key::Alt => 0xA4,
        Key::AltGr => 0xA5,
        Key::Space => 0x20,
        Key::Tab => 0x09,
        Key::CapsLock => 0x14,
        Key::F1 => 0x70,
        Key::F2 => 0x71,
        Key::F3 => 0x72,
        Key::F4 => 0x73,
        Key::F5 => 0x74,
        Key::F6 => 0x75,
        Key::F7 => 0x76,
        Key::F8 => 0x77,
        Key::F9 => 0x78,
        Key::F10 => 0x79,
        Key::F11 => 0x7A,
        Key::F12 => 0x7B,
        Key::Num0 => 0x30,
        Key::Num1 => 0x31,
        Key::Num2 => 0x32,
        Key::Num3 => 0x33,
        Key::Num4 => 0x34,
        Key::Num5 => 0x35,
        Key::Num6 => 0x36,
        Key::Num7 => 0x37,
        Key::Num8 => 0x38,
        Key::Num9 => 0x39,
        Key::KeyA => 0x41,
        Key::KeyB => 0x42,
        Key::KeyC => 0x43,
        Key::KeyD => 0x44,
        Key::KeyE => 0x45,
        Key::KeyF => 0x46,
        Key::KeyG => 0x47,
        Key::KeyH => 0x48,
        Key::KeyI => 0x49,
        Key::KeyJ => 0x4A,
        Key::KeyK => 0x4B,
        Key::KeyL => 0x4C,
        Key::KeyM => 0x4D,
        Key::KeyN => 0x4E,
        Key::KeyO => 0x4F,
        Key::KeyP => 0x50,
        Key::KeyQ => 0x51,
        Key::KeyR => 0x52,
        Key::KeyS => 0x53,
        Key::KeyT => 0x54,
        Key::KeyU => 0x55,
        Key::KeyV => 0x56,
        Key::KeyW => 0x57,
        Key::KeyX => 0x58,
        Key::KeyY => 0x59,
        Key::KeyZ => 0x5A,
        _ => return None,
    };
    Some(HotkeyCode(vk))
}
