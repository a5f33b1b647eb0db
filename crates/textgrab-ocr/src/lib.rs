mod backend;
mod capture;
mod hotkey;

pub use backend::build_registry;
pub use capture::XcapCapture;
pub use hotkey::{GlobalHotkeyRegistrar, poll_hotkey_events};
