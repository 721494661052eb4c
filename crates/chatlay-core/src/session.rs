//! The running overlay: mode machine, content surface and configuration
//! store bound together. Commands, the tray and the hotkey poller all go
//! through this type.

use tracing::{debug, error, info, warn};

use crate::Error;
use crate::config::{ConfigStore, Configuration};
use crate::content::{ContentHost, ContentSurface};
use crate::overlay::mode::{OverlayModeMachine, Transition};
use crate::overlay::platform::WindowPlatform;
use crate::overlay::window::{Mode, OverlayWindowState, Point};

pub struct OverlaySession<P, C> {
    machine: OverlayModeMachine<P>,
    content: C,
    surface: ContentSurface,
    store: ConfigStore,
    visible: bool,
}

impl<P: WindowPlatform, C: ContentHost> OverlaySession<P, C> {
    pub fn new(platform: P, content: C, store: ConfigStore, config: Configuration) -> Self {
        Self {
            machine: OverlayModeMachine::new(platform, config),
            content,
            surface: ContentSurface::new(),
            store,
            visible: true,
        }
    }

    /// Apply the initial window state and render the configured content.
    pub fn start(&mut self) {
        self.machine.start();
        self.render();
    }

    pub fn config(&self) -> &Configuration {
        self.machine.config()
    }

    pub fn state(&self) -> &OverlayWindowState {
        self.machine.state()
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn machine(&self) -> &OverlayModeMachine<P> {
        &self.machine
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    /// One hotkey poll.
    pub fn on_tick(&mut self) -> Option<Transition> {
        let transition = self.machine.tick()?;
        self.after_transition(transition);
        Some(transition)
    }

    /// Feed a hotkey sample directly, bypassing the platform poll.
    pub fn on_key_sample(&mut self, held: bool) -> Option<Transition> {
        let transition = self.machine.on_key_sample(held)?;
        self.after_transition(transition);
        Some(transition)
    }

    fn after_transition(&mut self, transition: Transition) {
        if let Err(e) = self.content.notify_mode(transition.to) {
            debug!(error = %e, "failed to notify page of mode change");
        }
        if transition.interrupted_drag.is_some() {
            self.persist_logged();
        }
    }

    pub fn pointer_press(&mut self, point: Point) {
        self.machine.press(point);
    }

    pub fn pointer_move(&mut self, point: Point, primary_held: bool) -> Option<Point> {
        self.machine.drag_to(point, primary_held)
    }

    /// End a drag. A moved window has its position persisted immediately.
    pub fn pointer_release(&mut self) -> Option<Point> {
        let position = self.machine.release()?;
        info!(?position, "window moved");
        self.persist_logged();
        Some(position)
    }

    /// Content reported ready for the load tagged `generation`.
    pub fn content_ready(&mut self, generation: u64) {
        if generation != self.surface.current_generation() {
            debug!(
                generation,
                current = self.surface.current_generation(),
                "ignoring ready signal for superseded load"
            );
            return;
        }

        if let Err(e) = self.content.notify_mode(self.machine.mode()) {
            debug!(error = %e, "failed to notify page of mode");
        }

        if let Some(script) = self.surface.on_ready(generation, self.machine.config()) {
            match self.content.inject_script(&script) {
                Ok(()) => debug!(generation, "notification sound script injected"),
                Err(e) => warn!(error = %e, "notification sound unavailable"),
            }
        }
    }

    /// Re-render the configured content under a new generation.
    pub fn reload(&mut self) {
        self.render();
    }

    fn render(&mut self) {
        let request = self.surface.begin_load(&self.machine.config().content_url);
        if let Err(e) = self.content.render(&request) {
            error!(error = %e, generation = request.generation, "failed to render content");
        }
    }

    /// Apply accepted settings live, then persist them.
    ///
    /// The window keeps its live position whatever the dialog sends. The new
    /// settings stay applied even when saving fails; the save error is
    /// returned so the caller can tell the user.
    pub fn apply_settings(&mut self, mut config: Configuration) -> Result<(), Error> {
        config.validate()?;

        let previous = self.machine.config().clone();
        // Position is owned by the window; the dialog's copy may predate a drag.
        let position = self.machine.state().position();
        config.position_x = position.x;
        config.position_y = position.y;

        let content_changed = config.content_url != previous.content_url
            || config.sound_enabled != previous.sound_enabled
            || config.sound_url != previous.sound_url;
        if config.hotkey_code != previous.hotkey_code {
            info!(
                code = config.hotkey_code.0,
                label = %config.hotkey_label,
                "hotkey changed"
            );
        }

        self.machine.reconfigure(config);
        if content_changed {
            self.render();
        }

        self.persist()
    }

    pub fn set_visible(&mut self, visible: bool) {
        if let Err(e) = self.machine.platform_mut().set_visible(visible) {
            warn!(error = %e, visible, "failed to change window visibility");
        }
        self.visible = visible;
    }

    /// Show a hidden window or hide a visible one. Returns the new visibility.
    pub fn toggle_visibility(&mut self) -> bool {
        self.set_visible(!self.visible);
        self.visible
    }

    /// Commit the current position and write the full record.
    pub fn persist_for_quit(&mut self) -> Result<(), Error> {
        self.machine.commit_position();
        self.persist()
    }

    fn persist(&self) -> Result<(), Error> {
        self.store.save(self.machine.config())
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, path = ?self.store.path(), "failed to persist configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::FakeContent;
    use crate::overlay::keys::HotkeyCode;
    use crate::overlay::testing::{FakePlatform, PlatformCall};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: ConfigStore,
        session: OverlaySession<FakePlatform, FakeContent>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("chatlay.json"));
        let mut session = OverlaySession::new(
            FakePlatform::default(),
            FakeContent::default(),
            store.clone(),
            Configuration::default(),
        );
        session.start();
        Fixture {
            _dir: dir,
            store,
            session,
        }
    }

    #[test]
    fn start_renders_first_generation() {
        let f = fixture();
        let rendered = &f.session.content().rendered;
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].generation, 1);
        assert_eq!(rendered[0].url, Configuration::default().content_url);
    }

    #[test]
    fn drag_release_persists_position() {
        let mut f = fixture();
        f.session.on_key_sample(true);

        f.session.pointer_press(Point::new(50, 50));
        assert_eq!(
            f.session.pointer_move(Point::new(70, 80), true),
            Some(Point::new(120, 130))
        );
        assert_eq!(f.session.pointer_release(), Some(Point::new(120, 130)));

        let saved = f.store.load();
        assert_eq!(saved.position_x, 120);
        assert_eq!(saved.position_y, 130);
    }

    #[test]
    fn drag_in_overlay_mode_persists_nothing() {
        let mut f = fixture();
        f.session.pointer_press(Point::new(50, 50));
        f.session.pointer_move(Point::new(70, 80), true);
        assert_eq!(f.session.pointer_release(), None);
        assert!(!f.store.exists());
    }

    #[test]
    fn mode_changes_reach_the_page() {
        let mut f = fixture();
        f.session.on_key_sample(true);
        f.session.on_key_sample(true);
        f.session.on_key_sample(false);
        assert_eq!(f.session.content().modes, [Mode::Edit, Mode::Overlay]);
    }

    #[test]
    fn ready_injects_sound_script_once_per_current_load() {
        let mut f = fixture();
        f.session.content_ready(1);
        assert_eq!(f.session.content().injected.len(), 1);
        assert!(f.session.content().injected[0].contains("MutationObserver"));
    }

    #[test]
    fn stale_ready_after_reload_is_ignored() {
        let mut f = fixture();
        f.session.reload();

        f.session.content_ready(1);
        assert!(f.session.content().injected.is_empty());

        f.session.content_ready(2);
        assert_eq!(f.session.content().injected.len(), 1);
    }

    #[test]
    fn failed_injection_keeps_overlay_running() {
        let mut f = fixture();
        let mut content = FakeContent::default();
        content.fail_inject = true;
        f.session.content = content;

        f.session.content_ready(1);
        assert!(f.session.on_key_sample(true).is_some());
        assert_eq!(f.session.mode(), Mode::Edit);
    }

    #[test]
    fn settings_in_edit_mode_apply_without_mode_change() {
        let mut f = fixture();
        f.session.on_key_sample(true);

        let config = Configuration {
            content_url: "https://example.com/other-chat".into(),
            width: 420,
            ..Configuration::default()
        };
        f.session.apply_settings(config.clone()).unwrap();

        assert_eq!(f.session.mode(), Mode::Edit);
        assert_eq!(f.session.state().position(), Point::new(100, 100));
        let rendered = &f.session.content().rendered;
        assert_eq!(rendered.last().unwrap().url, "https://example.com/other-chat");
        assert_eq!(rendered.last().unwrap().generation, 2);
        assert_eq!(f.store.load(), config);
    }

    #[test]
    fn settings_in_overlay_mode_update_opacity() {
        let mut f = fixture();
        f.session
            .apply_settings(Configuration {
                opacity_percent: 75,
                ..Configuration::default()
            })
            .unwrap();

        assert_eq!(f.session.state().current_opacity(), 0.75);
        assert!(
            f.session
                .machine()
                .platform()
                .calls
                .contains(&PlatformCall::Alpha(0.75))
        );
        // Same URL and sound settings: no reload.
        assert_eq!(f.session.content().rendered.len(), 1);
    }

    #[test]
    fn settings_mid_drag_keep_live_position_and_end_drag() {
        let mut f = fixture();
        f.session.on_key_sample(true);
        f.session.pointer_press(Point::new(0, 0));
        f.session.pointer_move(Point::new(10, 10), true);

        // Dialog opened before the drag: still holds (100, 100).
        f.session
            .apply_settings(Configuration {
                hotkey_code: HotkeyCode::F2,
                hotkey_label: "F2".into(),
                ..Configuration::default()
            })
            .unwrap();

        assert_eq!(f.session.state().position(), Point::new(110, 110));
        assert_eq!(f.session.state().drag_anchor(), None);
        assert_eq!(f.store.load().position_x, 110);
        assert_eq!(f.session.config().hotkey_code, HotkeyCode::F2);

        // The drag does not continue from the reconfigured origin.
        assert_eq!(f.session.pointer_move(Point::new(30, 30), true), None);
        assert_eq!(f.session.state().position(), Point::new(110, 110));
    }

    #[test]
    fn settings_keep_position_of_released_drag() {
        let mut f = fixture();
        // Dialog opened before the drag.
        let dialog_copy = f.session.config().clone();

        f.session.on_key_sample(true);
        f.session.pointer_press(Point::new(50, 50));
        f.session.pointer_move(Point::new(70, 80), true);
        f.session.pointer_release();
        assert_eq!(f.store.load().position_x, 120);

        f.session
            .apply_settings(Configuration {
                opacity_percent: 60,
                ..dialog_copy
            })
            .unwrap();

        assert_eq!(f.session.state().position(), Point::new(120, 130));
        let saved = f.store.load();
        assert_eq!((saved.position_x, saved.position_y), (120, 130));
        assert_eq!(saved.opacity_percent, 60);
    }

    #[test]
    fn settings_ignore_position_sent_by_dialog() {
        let mut f = fixture();
        f.session
            .apply_settings(Configuration {
                position_x: 900,
                position_y: -900,
                ..Configuration::default()
            })
            .unwrap();

        assert_eq!(f.session.state().position(), Point::new(100, 100));
        assert_eq!(f.store.load().position_x, 100);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut f = fixture();
        let result = f.session.apply_settings(Configuration {
            content_url: String::new(),
            ..Configuration::default()
        });
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert!(!f.store.exists());
        assert_eq!(f.session.config(), &Configuration::default());
    }

    #[test]
    fn toggle_visibility_leaves_mode_alone() {
        let mut f = fixture();
        f.session.on_key_sample(true);

        assert!(!f.session.toggle_visibility());
        assert!(f.session.toggle_visibility());
        assert_eq!(f.session.mode(), Mode::Edit);

        let calls = &f.session.machine().platform().calls;
        assert!(calls.contains(&PlatformCall::Visible(false)));
        assert!(calls.contains(&PlatformCall::Visible(true)));
    }

    #[test]
    fn quit_persists_full_record_with_position() {
        let mut f = fixture();
        f.session.on_key_sample(true);
        f.session.pointer_press(Point::new(0, 0));
        f.session.pointer_move(Point::new(-200, 25), true);

        f.session.persist_for_quit().unwrap();

        let saved = f.store.load();
        assert_eq!(saved.position_x, -100);
        assert_eq!(saved.position_y, 125);
        assert_eq!(saved.content_url, Configuration::default().content_url);
    }

    #[test]
    fn releasing_hotkey_mid_drag_persists_position() {
        let mut f = fixture();
        f.session.on_key_sample(true);
        f.session.pointer_press(Point::new(0, 0));
        f.session.pointer_move(Point::new(5, 5), true);

        let transition = f.session.on_key_sample(false).unwrap();
        assert_eq!(transition.interrupted_drag, Some(Point::new(105, 105)));
        assert_eq!(f.store.load().position_x, 105);
    }
}
