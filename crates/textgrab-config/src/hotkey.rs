use serde::{Deserialize, Serialize};
use textgrab_types::Shortcut;

fn default_poll_interval_ms() -> u64 {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Global trigger, canonical `modifier+...+key`
    pub shortcut: Shortcut,
    /// Sleep between polls of the OS hotkey event queue
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            shortcut: Shortcut::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
