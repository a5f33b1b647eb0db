use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShortcutError;

/// Modifier keys a shortcut may carry.
///
/// Rendered in the fixed order shift, ctrl, alt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt)
    }

    /// Canonical lowercase tokens in shift, ctrl, alt order
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.shift, "shift"),
            (self.ctrl, "ctrl"),
            (self.alt, "alt"),
        ]
        .into_iter()
        .filter_map(|(set, token)| set.then_some(token))
    }

    fn apply_token(&mut self, token: &str) -> bool {
        match token {
            "shift" => self.shift = true,
            "ctrl" | "control" => self.ctrl = true,
            "alt" | "option" => self.alt = true,
            _ => return false,
        }
        true
    }
}

fn is_modifier_token(token: &str) -> bool {
    Modifiers::default().apply_token(token)
}

fn is_escape_token(token: &str) -> bool {
    matches!(token, "esc" | "escape")
}

/// Global trigger combination: zero or more modifiers plus exactly one key.
///
/// The canonical form is lowercase `modifier+...+key`, e.g. `shift+ctrl+t`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shortcut {
    modifiers: Modifiers,
    key: String,
}

impl Shortcut {
    pub fn new(modifiers: Modifiers, key: &str) -> Result<Self, ShortcutError> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(ShortcutError::MissingKey);
        }
        if is_escape_token(&key) {
            return Err(ShortcutError::Escape);
        }
        if is_modifier_token(&key) {
            return Err(ShortcutError::MissingKey);
        }
        if key.contains('+') || key.chars().any(char::is_whitespace) {
            return Err(ShortcutError::InvalidKey(key));
        }

        Ok(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human readable form, e.g. `Shift+Ctrl+T`
    pub fn label(&self) -> String {
        self.modifiers
            .tokens()
            .map(|token| {
                let mut chars = token.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                    .unwrap_or_default()
            })
            .chain(std::iter::once(self.key.to_uppercase()))
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Encode a raw key press from the shortcut capture field
    pub fn from_key_input(modifiers: Modifiers, key_text: &str) -> KeyCapture {
        let key = key_text.trim().to_lowercase();
        if is_escape_token(&key) {
            return KeyCapture::Aborted;
        }
        if key.is_empty() || is_modifier_token(&key) {
            return KeyCapture::Pending;
        }

        match Shortcut::new(modifiers, &key) {
            Ok(shortcut) => KeyCapture::Captured(shortcut),
            Err(_) => KeyCapture::Pending,
        }
    }
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::NONE
            },
            key: "r".to_string(),
        }
    }
}

/// Outcome of feeding one key press into the shortcut capture field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCapture {
    /// Escape was pressed, capture is abandoned
    Aborted,
    /// Only modifiers so far
    Pending,
    Captured(Shortcut),
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.modifiers.tokens() {
            write!(f, "{token}+")?;
        }
        f.write_str(&self.key)
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<String> = s
            .split('+')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(ShortcutError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key: Option<String> = None;

        for token in tokens {
            if modifiers.apply_token(&token) {
                continue;
            }
            if let Some(existing) = &key {
                if *existing != token {
                    return Err(ShortcutError::MultipleKeys(existing.clone(), token));
                }
                continue;
            }
            key = Some(token);
        }

        let key = key.ok_or(ShortcutError::MissingKey)?;
        Shortcut::new(modifiers, &key)
    }
}

impl TryFrom<String> for Shortcut {
    type Error = ShortcutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Shortcut> for String {
    fn from(value: Shortcut) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes_modifier_order() {
        let shortcut: Shortcut = "ctrl+shift+t".parse().unwrap();
        assert_eq!(shortcut.to_string(), "shift+ctrl+t");

        let shortcut: Shortcut = "Alt + Control + Shift + F9".parse().unwrap();
        assert_eq!(shortcut.to_string(), "shift+ctrl+alt+f9");
    }

    #[test]
    fn test_parse_deduplicates_modifiers() {
        let shortcut: Shortcut = "shift+shift+ctrl+control+r".parse().unwrap();
        assert_eq!(shortcut.to_string(), "shift+ctrl+r");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("".parse::<Shortcut>(), Err(ShortcutError::Empty));
        assert_eq!("shift+ctrl".parse::<Shortcut>(), Err(ShortcutError::MissingKey));
        assert_eq!("shift+escape".parse::<Shortcut>(), Err(ShortcutError::Escape));
        assert_eq!(
            "shift+a+b".parse::<Shortcut>(),
            Err(ShortcutError::MultipleKeys("a".into(), "b".into()))
        );
    }

    #[test]
    fn test_label() {
        assert_eq!(Shortcut::default().label(), "Shift+R");
        let shortcut: Shortcut = "alt+ctrl+f1".parse().unwrap();
        assert_eq!(shortcut.label(), "Ctrl+Alt+F1");
    }

    #[test]
    fn test_key_input_capture() {
        let mods = Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::NONE
        };

        assert_eq!(
            Shortcut::from_key_input(mods, "T"),
            KeyCapture::Captured("shift+ctrl+t".parse().unwrap())
        );
        assert_eq!(Shortcut::from_key_input(mods, "Escape"), KeyCapture::Aborted);
        assert_eq!(Shortcut::from_key_input(Modifiers::NONE, "Esc"), KeyCapture::Aborted);
        assert_eq!(Shortcut::from_key_input(mods, "shift"), KeyCapture::Pending);
        assert_eq!(Shortcut::from_key_input(mods, ""), KeyCapture::Pending);
    }

    #[test]
    fn test_key_input_without_modifiers_is_bare_key() {
        assert_eq!(
            Shortcut::from_key_input(Modifiers::NONE, "F8"),
            KeyCapture::Captured("f8".parse().unwrap())
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let shortcut: Shortcut = serde_json::from_str("\"CTRL+Shift+T\"").unwrap();
        assert_eq!(serde_json::to_string(&shortcut).unwrap(), "\"shift+ctrl+t\"");
        assert!(serde_json::from_str::<Shortcut>("\"shift\"").is_err());
    }
}
