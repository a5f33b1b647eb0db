use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use textgrab_core::{HotkeyId, HotkeyRegistrar, RegistrarError};
use textgrab_types::Shortcut;

/// [`HotkeyRegistrar`] backed by the OS through `global-hotkey`
pub struct GlobalHotkeyRegistrar {
    manager: GlobalHotKeyManager,
    registered: HashMap<HotkeyId, HotKey>,
}

impl GlobalHotkeyRegistrar {
    /// Must be created on the thread that runs the platform event loop
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }
}

impl HotkeyRegistrar for GlobalHotkeyRegistrar {
    fn register(&mut self, shortcut: &Shortcut) -> Result<HotkeyId, RegistrarError> {
        let hotkey = to_hotkey(shortcut)?;
        self.manager.register(hotkey).map_err(|e| match e {
            global_hotkey::Error::AlreadyRegistered(_) => RegistrarError::Unavailable,
            other => RegistrarError::Os(other.to_string()),
        })?;

        tracing::debug!(%shortcut, id = hotkey.id(), "Registered OS hotkey");
        self.registered.insert(hotkey.id(), hotkey);
        Ok(hotkey.id())
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), RegistrarError> {
        let hotkey = self
            .registered
            .remove(&id)
            .ok_or_else(|| RegistrarError::Os(format!("hotkey {id} is not registered")))?;
        self.manager
            .unregister(hotkey)
            .map_err(|e| RegistrarError::Os(e.to_string()))
    }
}

impl Drop for GlobalHotkeyRegistrar {
    fn drop(&mut self) {
        for (_, hotkey) in self.registered.drain() {
            let _ = self.manager.unregister(hotkey);
        }
    }
}

pub(crate) fn to_hotkey(shortcut: &Shortcut) -> Result<HotKey, RegistrarError> {
    let code = key_code(shortcut.key())
        .ok_or_else(|| RegistrarError::Unsupported(shortcut.key().to_string()))?;

    let flags = shortcut.modifiers();
    let mut modifiers = Modifiers::empty();
    if flags.shift {
        modifiers |= Modifiers::SHIFT;
    }
    if flags.ctrl {
        modifiers |= Modifiers::CONTROL;
    }
    if flags.alt {
        modifiers |= Modifiers::ALT;
    }

    Ok(HotKey::new(
        (!modifiers.is_empty()).then_some(modifiers),
        code,
    ))
}

/// Physical key for a lowercase shortcut key token
pub(crate) fn key_code(key: &str) -> Option<Code> {
    let code = match key {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "tab" => Code::Tab,
        "enter" | "return" => Code::Enter,
        "backspace" => Code::Backspace,
        "delete" | "del" => Code::Delete,
        "insert" | "ins" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "printscreen" => Code::PrintScreen,
        "-" | "minus" => Code::Minus,
        "=" | "equal" => Code::Equal,
        "[" => Code::BracketLeft,
        "]" => Code::BracketRight,
        ";" => Code::Semicolon,
        "'" => Code::Quote,
        "," | "comma" => Code::Comma,
        "." | "period" => Code::Period,
        "/" | "slash" => Code::Slash,
        "\\" | "backslash" => Code::Backslash,
        "`" | "backquote" => Code::Backquote,
        _ => return None,
    };
    Some(code)
}

/// Forward OS hotkey presses to `on_press` until `is_cancelled` returns true.
///
/// Blocking; run it on a dedicated thread.
pub fn poll_hotkey_events(
    interval: Duration,
    is_cancelled: impl Fn() -> bool,
    mut on_press: impl FnMut(HotkeyId),
) {
    let receiver = GlobalHotKeyEvent::receiver();
    while !is_cancelled() {
        while let Ok(event) = receiver.try_recv() {
            if event.state() == HotKeyState::Pressed {
                tracing::debug!(id = event.id(), "Hotkey pressed");
                on_press(event.id());
            }
        }
        std::thread::sleep(interval);
    }
    tracing::info!("Hotkey listener stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shortcut_maps_to_shift_r() {
        let hotkey = to_hotkey(&Shortcut::default()).unwrap();
        assert_eq!(hotkey, HotKey::new(Some(Modifiers::SHIFT), Code::KeyR));
    }

    #[test]
    fn test_modifiers_are_combined() {
        let shortcut: Shortcut = "ctrl+alt+shift+f9".parse().unwrap();
        let hotkey = to_hotkey(&shortcut).unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(
                Some(Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::ALT),
                Code::F9
            )
        );
    }

    #[test]
    fn test_bare_key_has_no_modifiers() {
        let shortcut: Shortcut = "printscreen".parse().unwrap();
        assert_eq!(
            to_hotkey(&shortcut).unwrap(),
            HotKey::new(None, Code::PrintScreen)
        );
    }

    #[test]
    fn test_unknown_key_is_unsupported() {
        let shortcut: Shortcut = "shift+ß".parse().unwrap();
        assert_eq!(
            to_hotkey(&shortcut),
            Err(RegistrarError::Unsupported("ß".to_string()))
        );
    }
}
