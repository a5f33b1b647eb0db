mod notice;
mod overlay;

pub use notice::SlintNotifier;
pub use overlay::SlintOverlay;

slint::include_modules!();
