use serde::{Deserialize, Serialize};

/// The two overlay modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Input-transparent, translucent, frameless.
    #[default]
    Overlay,
    /// Interactive, opaque, decorated. Active while the hotkey is held.
    Edit,
}

/// Native window chrome applied on each mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStyle {
    /// Frameless, non-focusable tool window.
    FramelessTool,
    /// Decorated window that accepts focus and pointer input.
    Interactive,
}

impl From<Mode> for WindowStyle {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Overlay => Self::FramelessTool,
            Mode::Edit => Self::Interactive,
        }
    }
}

/// Logical 2D point, either screen-space or window-local depending on use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by the delta `to - from`, saturating at the `i32` range.
    pub fn offset_by(self, from: Point, to: Point) -> Point {
        Point::new(
            self.x.saturating_add(to.x.saturating_sub(from.x)),
            self.y.saturating_add(to.y.saturating_sub(from.y)),
        )
    }
}

/// Window rectangle in logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(position: Point, width: u32, height: u32) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
        }
    }
}

/// Runtime window state owned by the mode machine. Never persisted.
///
/// `click_through` and `opacity` are derived from `mode` and only change
/// together with it through [`OverlayWindowState::enter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayWindowState {
    mode: Mode,
    click_through: bool,
    opacity: f32,
    drag_anchor: Option<Point>,
    position: Point,
}

impl OverlayWindowState {
    /// Initial state: overlay mode at the given position.
    pub fn new(position: Point, overlay_opacity: f32) -> Self {
        let mut state = Self {
            mode: Mode::Overlay,
            click_through: true,
            opacity: overlay_opacity,
            drag_anchor: None,
            position,
        };
        state.enter(Mode::Overlay, overlay_opacity);
        state
    }

    /// Switch to `mode` and recompute every derived field.
    pub(crate) fn enter(&mut self, mode: Mode, overlay_opacity: f32) {
        self.mode = mode;
        self.click_through = mode == Mode::Overlay;
        self.opacity = match mode {
            Mode::Edit => 1.0,
            Mode::Overlay => overlay_opacity,
        };
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_click_through(&self) -> bool {
        self.click_through
    }

    pub fn current_opacity(&self) -> f32 {
        self.opacity
    }

    pub fn drag_anchor(&self) -> Option<Point> {
        self.drag_anchor
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub(crate) fn set_drag_anchor(&mut self, anchor: Option<Point>) {
        self.drag_anchor = anchor;
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }
}
