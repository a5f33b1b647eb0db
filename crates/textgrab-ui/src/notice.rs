use std::time::Duration;

use slint::{Color, ComponentHandle, Timer, TimerMode};
use textgrab_core::Notifier;
use textgrab_types::{Notice, Severity};

use crate::NoticeWindow;

const NOTICE_TIMEOUT: Duration = Duration::from_secs(4);

/// Toast window for notices. Everything but `Persistent` hides itself after a few seconds.
pub struct SlintNotifier {
    window: NoticeWindow,
    timer: Timer,
}

impl SlintNotifier {
    pub fn new() -> anyhow::Result<Self> {
        let window = NoticeWindow::new()?;
        let window_weak = window.as_weak();
        window.on_dismiss(move || {
            if let Some(window) = window_weak.upgrade() {
                window.hide().ok();
            }
        });

        Ok(Self {
            window,
            timer: Timer::default(),
        })
    }
}

impl Notifier for SlintNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => tracing::info!(title = %notice.title, "{}", notice.message),
            Severity::Warning => tracing::warn!(title = %notice.title, "{}", notice.message),
            Severity::Error | Severity::Persistent => {
                tracing::error!(title = %notice.title, "{}", notice.message)
            }
        }

        self.window.set_heading(notice.title.as_str().into());
        self.window.set_message(notice.message.as_str().into());
        self.window.set_accent(accent(notice.severity));
        if let Err(e) = self.window.show() {
            tracing::warn!("Failed to show notice: {e}");
            return;
        }

        if notice.severity == Severity::Persistent {
            self.timer.stop();
            return;
        }

        let window_weak = self.window.as_weak();
        self.timer
            .start(TimerMode::SingleShot, NOTICE_TIMEOUT, move || {
                if let Some(window) = window_weak.upgrade() {
                    window.hide().ok();
                }
            });
    }
}

fn accent(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::from_rgb_u8(0x3a, 0x86, 0xff),
        Severity::Warning => Color::from_rgb_u8(0xf4, 0xb4, 0x00),
        Severity::Error | Severity::Persistent => Color::from_rgb_u8(0xea, 0x43, 0x35),
    }
}
