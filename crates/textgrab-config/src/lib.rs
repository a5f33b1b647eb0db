use std::env;

use serde::{Deserialize, Serialize};
use textgrab_types::{BackendId, Shortcut};

use self::capture::CaptureConfig;
use self::hotkey::HotkeyConfig;
use self::ocr::OcrConfig;

pub mod capture;
pub mod hotkey;
pub mod ocr;
pub mod store;

pub use ocr::BackendConfig;
pub use store::{ConfigError, ConfigStore};

fn default_watch_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub ocr: OcrConfig,
    pub capture: CaptureConfig,
    /// How often the settings file is checked for external edits
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            ocr: OcrConfig::default(),
            capture: CaptureConfig::default(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl Config {
    /// Apply `TEXTGRAB_*` environment overrides on top of the current values
    pub fn apply_env(&mut self) {
        if let Some(shortcut) = env::var("TEXTGRAB_SHORTCUT")
            .ok()
            .and_then(|v| match v.parse::<Shortcut>() {
                Ok(shortcut) => Some(shortcut),
                Err(e) => {
                    tracing::warn!("Ignoring TEXTGRAB_SHORTCUT={v}: {e}");
                    None
                }
            })
        {
            self.hotkey.shortcut = shortcut;
        }

        if let Ok(backend) = env::var("TEXTGRAB_BACKEND")
            && !backend.trim().is_empty()
        {
            self.ocr.backend = BackendId::new(backend.trim());
        }

        if let Some(interval) = env::var("TEXTGRAB_WATCH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.watch_interval_ms = interval;
        }
    }

    /// The shortcut and backend selection, the only settings the pipeline reacts to
    pub fn selection(&self) -> (Shortcut, BackendId) {
        (self.hotkey.shortcut.clone(), self.ocr.backend.clone())
    }
}
