//! The overlay/edit mode state machine.
//!
//! The machine owns the runtime window state and is the only thing that
//! changes it. Every transition recomputes the derived fields first and only
//! then pushes them to the platform, so the window is never left solid but
//! input-transparent or translucent but interactive because a call was
//! skipped. Platform failures are logged; `mode` stays authoritative.

use tracing::{debug, info, warn};

use crate::Error;
use crate::config::Configuration;
use crate::overlay::platform::WindowPlatform;
use crate::overlay::window::{Bounds, Mode, OverlayWindowState, Point, WindowStyle};

/// A mode change emitted by [`OverlayModeMachine::on_key_sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    /// Position left behind by a drag that the transition cut short.
    pub interrupted_drag: Option<Point>,
}

pub struct OverlayModeMachine<P> {
    platform: P,
    config: Configuration,
    state: OverlayWindowState,
    key_was_down: bool,
}

impl<P: WindowPlatform> OverlayModeMachine<P> {
    pub fn new(platform: P, config: Configuration) -> Self {
        let position = Point::new(config.position_x, config.position_y);
        let state = OverlayWindowState::new(position, config.overlay_opacity());
        Self {
            platform,
            config,
            state,
            key_was_down: false,
        }
    }

    /// Push the initial overlay-mode state to the window.
    pub fn start(&mut self) {
        self.apply_mode();
        info!(position = ?self.state.position(), "overlay started in overlay mode");
    }

    pub fn state(&self) -> &OverlayWindowState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.state.position(), self.config.width, self.config.height)
    }

    /// Sample the hotkey through the platform and feed the result in.
    pub fn tick(&mut self) -> Option<Transition> {
        let held = self.platform.poll_key_down(self.config.hotkey_code);
        self.on_key_sample(held)
    }

    /// Feed one hotkey sample. Only a change from the previous sample can
    /// produce a transition; repeated samples are no-ops.
    pub fn on_key_sample(&mut self, held: bool) -> Option<Transition> {
        if held == self.key_was_down {
            return None;
        }
        self.key_was_down = held;

        let target = if held { Mode::Edit } else { Mode::Overlay };
        self.transition_to(target)
    }

    fn transition_to(&mut self, target: Mode) -> Option<Transition> {
        let from = self.state.mode();
        if from == target {
            return None;
        }

        let interrupted_drag = match self.state.drag_anchor() {
            Some(_) if target == Mode::Overlay => {
                self.state.set_drag_anchor(None);
                self.commit_position()
            }
            _ => None,
        };

        self.state.enter(target, self.config.overlay_opacity());
        info!(from = ?from, to = ?target, "overlay mode changed");
        self.apply_mode();

        Some(Transition {
            from,
            to: target,
            interrupted_drag,
        })
    }

    /// Push style, click-through and alpha for the current mode, then re-show.
    fn apply_mode(&mut self) {
        let style = WindowStyle::from(self.state.mode());
        let click_through = self.state.is_click_through();
        let opacity = self.state.current_opacity();

        log_platform(self.platform.apply_style(style));
        log_platform(self.platform.set_click_through(click_through));
        log_platform(self.platform.set_layer_alpha(opacity));
        // Decoration changes can shift the frame; pin it back.
        self.apply_bounds();
        log_platform(self.platform.refresh());
    }

    fn apply_bounds(&mut self) {
        let bounds = self.bounds();
        log_platform(self.platform.set_window_bounds(bounds));
    }

    /// Primary button pressed at a window-local point.
    pub fn press(&mut self, point: Point) {
        if self.state.mode() != Mode::Edit {
            debug!(?point, "ignoring press outside edit mode");
            return;
        }
        self.state.set_drag_anchor(Some(point));
    }

    /// Pointer moved to a window-local point.
    ///
    /// Returns the new window position when the window was moved.
    pub fn drag_to(&mut self, point: Point, primary_held: bool) -> Option<Point> {
        if self.state.mode() != Mode::Edit || !primary_held {
            return None;
        }
        let anchor = self.state.drag_anchor()?;
        if point == anchor {
            return None;
        }

        let position = self.state.position().offset_by(anchor, point);
        self.state.set_position(position);
        self.apply_bounds();
        Some(position)
    }

    /// Primary button released. Returns the position to persist when a drag
    /// was in progress.
    pub fn release(&mut self) -> Option<Point> {
        if self.state.mode() != Mode::Edit {
            return None;
        }
        self.state.drag_anchor()?;
        self.state.set_drag_anchor(None);
        self.commit_position()
    }

    /// Copy the current window position into the configuration.
    /// Returns it if it differs from what was stored.
    pub fn commit_position(&mut self) -> Option<Point> {
        let position = self.state.position();
        if position == Point::new(self.config.position_x, self.config.position_y) {
            return None;
        }
        self.config.position_x = position.x;
        self.config.position_y = position.y;
        debug!(?position, "window position committed");
        Some(position)
    }

    /// Replace the configuration and re-apply geometry and alpha for the
    /// current mode. Never changes the mode.
    pub fn reconfigure(&mut self, config: Configuration) {
        let mode = self.state.mode();
        // A drag in progress would otherwise continue from the new origin.
        self.state.set_drag_anchor(None);
        self.state
            .set_position(Point::new(config.position_x, config.position_y));
        self.config = config;
        self.state.enter(mode, self.config.overlay_opacity());

        self.apply_bounds();
        log_platform(self.platform.set_layer_alpha(self.state.current_opacity()));
        info!(?mode, "overlay reconfigured");
    }
}

fn log_platform(result: Result<(), Error>) {
    if let Err(e) = result {
        warn!(error = %e, "window-system call failed, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::keys::HotkeyCode;
    use crate::overlay::testing::{FakePlatform, PlatformCall};

    fn machine() -> OverlayModeMachine<FakePlatform> {
        let mut machine = OverlayModeMachine::new(FakePlatform::default(), Configuration::default());
        machine.start();
        machine.platform_mut().take_calls();
        machine
    }

    fn assert_invariants(machine: &OverlayModeMachine<FakePlatform>) {
        let state = machine.state();
        assert_eq!(state.is_click_through(), state.mode() == Mode::Overlay);
        let expected = match state.mode() {
            Mode::Edit => 1.0,
            Mode::Overlay => machine.config().overlay_opacity(),
        };
        assert_eq!(state.current_opacity(), expected);
    }

    fn edit_machine_at_100() -> OverlayModeMachine<FakePlatform> {
        let mut machine = machine();
        machine.on_key_sample(true);
        machine.platform_mut().take_calls();
        machine
    }

    #[test]
    fn start_applies_overlay_mode() {
        let mut machine = OverlayModeMachine::new(FakePlatform::default(), Configuration::default());
        machine.start();

        let calls = machine.platform_mut().take_calls();
        assert!(calls.contains(&PlatformCall::Style(WindowStyle::FramelessTool)));
        assert!(calls.contains(&PlatformCall::ClickThrough(true)));
        assert!(calls.contains(&PlatformCall::Alpha(0.4)));
        assert!(calls.contains(&PlatformCall::Bounds(Bounds {
            x: 100,
            y: 100,
            width: 300,
            height: 600,
        })));
        assert_eq!(machine.mode(), Mode::Overlay);
    }

    #[test]
    fn held_hotkey_enters_edit_mode() {
        let mut machine = machine();

        let transition = machine.on_key_sample(true).unwrap();
        assert_eq!(transition.from, Mode::Overlay);
        assert_eq!(transition.to, Mode::Edit);
        assert_eq!(machine.mode(), Mode::Edit);
        assert_invariants(&machine);

        let calls = machine.platform_mut().take_calls();
        assert_eq!(calls[0], PlatformCall::Style(WindowStyle::Interactive));
        assert_eq!(calls[1], PlatformCall::ClickThrough(false));
        assert_eq!(calls[2], PlatformCall::Alpha(1.0));
        assert_eq!(calls.last(), Some(&PlatformCall::Refresh));
    }

    #[test]
    fn released_hotkey_returns_to_overlay() {
        let mut machine = edit_machine_at_100();

        let transition = machine.on_key_sample(false).unwrap();
        assert_eq!(transition.to, Mode::Overlay);
        assert_invariants(&machine);

        let calls = machine.platform_mut().take_calls();
        assert!(calls.contains(&PlatformCall::Style(WindowStyle::FramelessTool)));
        assert!(calls.contains(&PlatformCall::ClickThrough(true)));
        assert!(calls.contains(&PlatformCall::Alpha(0.4)));
    }

    #[test]
    fn repeated_samples_transition_once() {
        let mut machine = machine();

        assert!(machine.on_key_sample(true).is_some());
        machine.platform_mut().take_calls();

        for _ in 0..5 {
            assert!(machine.on_key_sample(true).is_none());
        }
        assert!(machine.platform().calls.is_empty());
        assert_eq!(machine.mode(), Mode::Edit);
    }

    #[test]
    fn repeated_release_samples_issue_no_calls() {
        let mut machine = machine();
        for _ in 0..3 {
            assert!(machine.on_key_sample(false).is_none());
        }
        assert!(machine.platform().calls.is_empty());
        assert_eq!(machine.mode(), Mode::Overlay);
    }

    #[test]
    fn mode_tracks_last_sample_edge() {
        let samples = [
            false, true, true, false, true, false, false, true, true, true, false, true,
        ];
        let mut machine = machine();
        let mut transitions = 0;

        for held in samples {
            if machine.on_key_sample(held).is_some() {
                transitions += 1;
            }
            let expected = if held { Mode::Edit } else { Mode::Overlay };
            assert_eq!(machine.mode(), expected);
            assert_invariants(&machine);
        }

        let edges = samples
            .iter()
            .scan(false, |last, &held| {
                let edge = held != *last;
                *last = held;
                Some(edge)
            })
            .filter(|edge| *edge)
            .count();
        assert_eq!(transitions, edges);
    }

    #[test]
    fn tick_polls_configured_hotkey() {
        let mut machine = machine();
        machine.platform_mut().held = Some(HotkeyCode::CONTROL);

        assert!(machine.tick().is_some());
        assert_eq!(machine.mode(), Mode::Edit);
        assert_eq!(machine.platform().polls.get(), 1);

        machine.platform_mut().held = Some(HotkeyCode::F1);
        assert!(machine.tick().is_some());
        assert_eq!(machine.mode(), Mode::Overlay);
    }

    #[test]
    fn drag_moves_window_by_pointer_delta() {
        let mut machine = edit_machine_at_100();

        machine.press(Point::new(50, 50));
        let moved = machine.drag_to(Point::new(70, 80), true);
        assert_eq!(moved, Some(Point::new(120, 130)));
        assert_eq!(machine.state().position(), Point::new(120, 130));
        assert!(machine.platform().calls.contains(&PlatformCall::Bounds(Bounds {
            x: 120,
            y: 130,
            width: 300,
            height: 600,
        })));

        assert_eq!(machine.release(), Some(Point::new(120, 130)));
        assert_eq!(machine.config().position_x, 120);
        assert_eq!(machine.config().position_y, 130);
        assert_eq!(machine.state().drag_anchor(), None);
    }

    #[test]
    fn drag_requires_primary_button() {
        let mut machine = edit_machine_at_100();
        machine.press(Point::new(50, 50));

        assert_eq!(machine.drag_to(Point::new(70, 80), false), None);
        assert_eq!(machine.state().position(), Point::new(100, 100));
    }

    #[test]
    fn move_without_press_is_ignored() {
        let mut machine = edit_machine_at_100();
        assert_eq!(machine.drag_to(Point::new(70, 80), true), None);
        assert_eq!(machine.release(), None);
        assert!(machine.platform().calls.is_empty());
    }

    #[test]
    fn pointer_events_in_overlay_mode_have_no_effect() {
        let mut machine = machine();

        machine.press(Point::new(50, 50));
        assert_eq!(machine.state().drag_anchor(), None);
        assert_eq!(machine.drag_to(Point::new(70, 80), true), None);
        assert_eq!(machine.release(), None);

        assert_eq!(machine.state().position(), Point::new(100, 100));
        assert_eq!(machine.config().position_x, 100);
        assert!(machine.platform().calls.is_empty());
    }

    #[test]
    fn extreme_pointer_coordinates_saturate() {
        let mut machine = edit_machine_at_100();
        machine.press(Point::new(-10, 0));

        let moved = machine.drag_to(Point::new(i32::MAX, 0), true);
        assert_eq!(moved, Some(Point::new(i32::MAX, 100)));
        assert_invariants(&machine);
    }

    #[test]
    fn release_without_movement_persists_nothing() {
        let mut machine = edit_machine_at_100();
        machine.press(Point::new(10, 10));
        assert_eq!(machine.release(), None);
    }

    #[test]
    fn leaving_edit_mid_drag_commits_position() {
        let mut machine = edit_machine_at_100();
        machine.press(Point::new(0, 0));
        machine.drag_to(Point::new(-30, 5), true);

        let transition = machine.on_key_sample(false).unwrap();
        assert_eq!(transition.interrupted_drag, Some(Point::new(70, 105)));
        assert_eq!(machine.state().drag_anchor(), None);
        assert_eq!(machine.config().position_x, 70);
    }

    #[test]
    fn reconfigure_in_edit_keeps_mode_and_full_opacity() {
        let mut machine = edit_machine_at_100();
        let config = Configuration {
            width: 500,
            height: 400,
            position_x: 10,
            position_y: 20,
            opacity_percent: 80,
            content_url: "https://example.com/other".into(),
            ..Configuration::default()
        };

        machine.reconfigure(config);

        assert_eq!(machine.mode(), Mode::Edit);
        assert_eq!(machine.state().current_opacity(), 1.0);
        assert_eq!(machine.state().position(), Point::new(10, 20));
        assert_eq!(machine.config().content_url, "https://example.com/other");
        assert_invariants(&machine);

        let calls = machine.platform_mut().take_calls();
        assert!(calls.contains(&PlatformCall::Bounds(Bounds {
            x: 10,
            y: 20,
            width: 500,
            height: 400,
        })));
        assert!(calls.contains(&PlatformCall::Alpha(1.0)));
        assert!(!calls.iter().any(|c| matches!(c, PlatformCall::Style(_))));
    }

    #[test]
    fn reconfigure_mid_drag_ends_the_drag() {
        let mut machine = edit_machine_at_100();
        machine.press(Point::new(0, 0));
        machine.drag_to(Point::new(10, 10), true);

        machine.reconfigure(Configuration {
            position_x: 500,
            position_y: 500,
            ..Configuration::default()
        });

        assert_eq!(machine.state().drag_anchor(), None);
        assert_eq!(machine.drag_to(Point::new(40, 40), true), None);
        assert_eq!(machine.state().position(), Point::new(500, 500));
        assert_eq!(machine.release(), None);
    }

    #[test]
    fn reconfigure_in_overlay_applies_new_opacity() {
        let mut machine = machine();
        machine.reconfigure(Configuration {
            opacity_percent: 75,
            ..Configuration::default()
        });

        assert_eq!(machine.mode(), Mode::Overlay);
        assert_eq!(machine.state().current_opacity(), 0.75);
        assert!(machine.platform().calls.contains(&PlatformCall::Alpha(0.75)));
        assert_invariants(&machine);
    }

    #[test]
    fn failed_platform_call_does_not_change_mode() {
        let mut machine = machine();
        machine.platform_mut().fail_click_through = true;

        assert!(machine.on_key_sample(true).is_some());
        assert_eq!(machine.mode(), Mode::Edit);
        assert!(!machine.state().is_click_through());
        assert!(machine.platform().calls.contains(&PlatformCall::Alpha(1.0)));
    }
}
