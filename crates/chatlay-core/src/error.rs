use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration I/O failed: {0}")]
    ConfigIo(#[from] io::Error),
    #[error("Configuration could not be encoded: {0}")]
    ConfigEncode(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Platform call {call} failed: {message}")]
    PlatformApi { call: &'static str, message: String },
    #[error("Content load failed: {0}")]
    ContentLoad(String),
    #[error("Failed to create window {0}")]
    WindowCreation(String),
    #[error("Tauri error: {0}")]
    TauriError(#[from] tauri::Error),
}

impl Error {
    pub fn platform(call: &'static str, err: impl ToString) -> Self {
        Self::PlatformApi {
            call,
            message: err.to_string(),
        }
    }
}
