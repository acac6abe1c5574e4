//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-chat\
//!   macOS:   ~/Library/Application Support/voice-chat/
//!   Linux:   ~/.config/voice-chat/
//!
//! Data dir (Whisper models):
//!   Windows: %LOCALAPPDATA%\voice-chat\
//!   macOS:   ~/Library/Application Support/voice-chat/
//!   Linux:   ~/.local/share/voice-chat/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-chat";

    /// Resolves all paths using the `dirs` crate, falling back to the current
    /// directory when the platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// Resolve a configured model name.  Absolute paths are returned as is.
    pub fn model_path(&self, model: &str) -> PathBuf {
        let candidate = Path::new(model);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.models_dir.join(candidate)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
