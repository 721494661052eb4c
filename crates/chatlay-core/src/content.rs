//! Boundary to the embedded content surface.
//!
//! Every render is tagged with a generation. Ready signals carrying an older
//! generation are dropped, so a slow page load can never inject the
//! notification script into content that has since been replaced.

use serde::Serialize;
use tauri::Url;
use tracing::{debug, warn};

use crate::Error;
use crate::config::Configuration;
use crate::overlay::window::Mode;

/// Local wrapper page that frames the remote widget.
pub const WRAPPER_PAGE: &str = "overlay.html";

/// Event the wrapper page listens on to toggle its drag shield.
pub const MODE_CHANGED_EVENT: &str = "chatlay://mode-changed";

/// Query parameter carrying the load generation.
pub const GENERATION_PARAM: &str = "generation";

/// Query parameter carrying the framed content URL.
pub const SOURCE_PARAM: &str = "src";

/// One render of the content surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub url: String,
}

impl LoadRequest {
    /// Path of the wrapper page for this load, relative to the app origin.
    pub fn wrapper_path(&self) -> String {
        format!(
            "{WRAPPER_PAGE}?{GENERATION_PARAM}={}&{SOURCE_PARAM}={}",
            self.generation,
            urlencoding::encode(&self.url)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModePayload {
    pub mode: Mode,
}

/// The embedded renderer, as seen from the core.
pub trait ContentHost {
    /// Replace the displayed content.
    fn render(&mut self, request: &LoadRequest) -> Result<(), Error>;

    /// Run a script in the current document.
    fn inject_script(&mut self, source: &str) -> Result<(), Error>;

    /// Tell the page which mode the window is in.
    fn notify_mode(&mut self, mode: Mode) -> Result<(), Error>;
}

/// Generation bookkeeping for the content surface.
#[derive(Debug, Default)]
pub struct ContentSurface {
    generation: u64,
}

impl ContentSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding any pending one.
    pub fn begin_load(&mut self, url: &str) -> LoadRequest {
        self.generation += 1;
        debug!(generation = self.generation, url, "content load started");
        LoadRequest {
            generation: self.generation,
            url: url.to_string(),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Handle a ready signal. Returns the script to inject, if any.
    ///
    /// Stale generations and disabled sound both yield `None`.
    pub fn on_ready(&self, generation: u64, config: &Configuration) -> Option<String> {
        if generation != self.generation || generation == 0 {
            debug!(
                generation,
                current = self.generation,
                "ignoring stale content ready signal"
            );
            return None;
        }
        if !config.sound_enabled {
            return None;
        }
        if config.sound_url.trim().is_empty() {
            warn!("sound is enabled but no sound URL is configured");
            return None;
        }
        Some(notification_script(&config.sound_url))
    }
}

/// Script that attaches a playback element for `sound_url` and plays it
/// whenever children are added to the chat message log.
pub fn notification_script(sound_url: &str) -> String {
    // Serialising a string cannot fail.
    let url = serde_json::to_string(sound_url).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(function () {{
  var soundUrl = {url};
  function attach(doc) {{
    if (!doc || !doc.body || doc.getElementById('chatlayNotificationSound')) return false;
    var target = doc.getElementById('log');
    if (!target) return false;
    var audio = doc.createElement('audio');
    audio.src = soundUrl;
    audio.id = 'chatlayNotificationSound';
    doc.body.appendChild(audio);
    new MutationObserver(function (mutations) {{
      for (var i = 0; i < mutations.length; i++) {{
        if (mutations[i].addedNodes.length) {{
          var played = audio.play();
          if (played && played.catch) played.catch(function () {{}});
          return;
        }}
      }}
    }}).observe(target, {{ childList: true }});
    return true;
  }}
  function attachToFrame() {{
    var frame = document.getElementById('chatFrame');
    if (!frame) return;
    try {{
      attach(frame.contentDocument || (frame.contentWindow && frame.contentWindow.document));
    }} catch (e) {{
      console.log('chatlay: cannot reach chat frame', e);
    }}
  }}
  if (attach(document)) return;
  var frame = document.getElementById('chatFrame');
  if (frame) {{
    frame.addEventListener('load', attachToFrame);
    attachToFrame();
  }}
}})();"#
    )
}

/// Generation tag of a wrapper page URL, `0` when absent or not ours.
pub fn generation_of(url: &Url) -> u64 {
    if !url.path().ends_with(WRAPPER_PAGE) {
        return 0;
    }
    url.query_pairs()
        .find(|(key, _)| key == GENERATION_PARAM)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(0)
}
