pub mod keys;
pub mod manager;
pub mod mode;
pub mod platform;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use keys::*;
pub use manager::{OVERLAY_LABEL, SETTINGS_LABEL, WebviewContent};
pub use mode::{OverlayModeMachine, Transition};
pub use platform::{NativeWindow, WindowPlatform, alpha_to_byte};
pub use window::*;
