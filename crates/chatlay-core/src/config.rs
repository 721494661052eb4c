use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::Error;
use crate::overlay::keys::HotkeyCode;

pub const DEFAULT_CONTENT_URL: &str =
    "https://streamlabs.com/widgets/chat-box/v1/4485FA70F1938B583520";

pub const DEFAULT_SOUND_URL: &str = "https://uploads.twitchalerts.com/000/186/728/273/%5BZELDA%5D%20NAVI%20-%20HEY%20LISTEN%20%21%20Sound%20Effect%20%5BFree%20Ringtones%20Download%5D.ogg";

/// The persisted overlay configuration.
/// Keys are camelCase on disk and on the settings page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub content_url: String,
    pub width: u32,
    pub height: u32,
    pub opacity_percent: u8,
    pub position_x: i32,
    pub position_y: i32,
    pub sound_enabled: bool,
    pub sound_url: String,
    pub hotkey_code: HotkeyCode,
    pub hotkey_label: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            content_url: DEFAULT_CONTENT_URL.to_string(),
            width: 300,
            height: 600,
            opacity_percent: 40,
            position_x: 100,
            position_y: 100,
            sound_enabled: true,
            sound_url: DEFAULT_SOUND_URL.to_string(),
            hotkey_code: HotkeyCode::CONTROL,
            hotkey_label: "Control".to_string(),
        }
    }
}

impl Configuration {
    /// Overlay-mode opacity in `0.0..=1.0`.
    pub fn overlay_opacity(&self) -> f32 {
        f32::from(self.opacity_percent.min(100)) / 100.0
    }

    /// Merge a persisted record over the defaults, field by field.
    ///
    /// Missing fields keep their default. Fields with the wrong type or an
    /// out-of-range value are dropped without error.
    pub fn merged_over_defaults(record: &Map<String, Value>) -> Self {
        let mut config = Self::default();

        if let Some(url) = non_empty_str(record.get("contentUrl")) {
            config.content_url = url;
        }
        if let Some(width) = positive_u32(record.get("width")) {
            config.width = width;
        }
        if let Some(height) = positive_u32(record.get("height")) {
            config.height = height;
        }
        if let Some(opacity) = record
            .get("opacityPercent")
            .and_then(Value::as_u64)
            .filter(|v| *v <= 100)
        {
            config.opacity_percent = opacity as u8;
        }
        if let Some(x) = as_i32(record.get("positionX")) {
            config.position_x = x;
        }
        if let Some(y) = as_i32(record.get("positionY")) {
            config.position_y = y;
        }
        if let Some(enabled) = record.get("soundEnabled").and_then(Value::as_bool) {
            config.sound_enabled = enabled;
        }
        if let Some(url) = record.get("soundUrl").and_then(Value::as_str) {
            config.sound_url = url.to_string();
        }
        if let Some(code) = record
            .get("hotkeyCode")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
        {
            config.hotkey_code = HotkeyCode(code);
        }
        if let Some(label) = record.get("hotkeyLabel").and_then(Value::as_str) {
            config.hotkey_label = label.to_string();
        }

        config
    }

    /// Check the record invariants. Used on input from the settings page.
    pub fn validate(&self) -> Result<(), Error> {
        if self.content_url.trim().is_empty() {
            return Err(Error::InvalidConfig("content URL must not be empty".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "window size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.opacity_percent > 100 {
            return Err(Error::InvalidConfig(format!(
                "opacity must be between 0 and 100, got {}",
                self.opacity_percent
            )));
        }
        Ok(())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn positive_u32(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

fn as_i32(value: Option<&Value>) -> Option<i32> {
    value
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub const DEFAULT_FILE_NAME: &'static str = "chatlay.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `chatlay.json` relative to the working directory.
    pub fn in_working_dir() -> Self {
        Self::new(Self::DEFAULT_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted record exists. Drives first-run behaviour.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the configuration. Never fails: unreadable or unparsable files
    /// yield the defaults, with whatever fields could be recovered merged in.
    pub fn load(&self) -> Configuration {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no configuration file, using defaults");
                return Configuration::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read configuration, using defaults");
                return Configuration::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(record)) => {
                let config = Configuration::merged_over_defaults(&record);
                info!(path = ?self.path, "configuration loaded");
                config
            }
            Ok(other) => {
                warn!(path = ?self.path, kind = json_kind(&other), "configuration is not an object, using defaults");
                Configuration::default()
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to parse configuration, using defaults");
                Configuration::default()
            }
        }
    }

    /// Persist the full record. Writes and syncs a sibling temp file, then
    /// renames it over the target so a crash mid-write leaves the previous
    /// file intact. The temp file is removed on any failure.
    pub fn save(&self, config: &Configuration) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(config)?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(io::Error::from)?;

        debug!(path = ?self.path, "configuration saved");
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
