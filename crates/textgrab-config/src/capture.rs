use serde::{Deserialize, Serialize};

fn default_all_monitors() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture the whole virtual screen; primary monitor only when false
    #[serde(default = "default_all_monitors")]
    pub all_monitors: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            all_monitors: default_all_monitors(),
        }
    }
}
