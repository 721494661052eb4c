pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod overlay;
pub mod session;

pub use commands::AppState;
pub use config::{ConfigStore, Configuration};
pub use content::{ContentHost, ContentSurface, LoadRequest};
pub use error::*;
pub use overlay::manager::Session;
pub use overlay::*;
pub use session::OverlaySession;
