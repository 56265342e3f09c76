//! Hotkey detection over the currently held keys.
//!
//! A handful of well-known combinations get fixed names; anything else with a modifier is
//! labeled by joining the modifier names and the key.

use crate::capture::input::keymap::{self, KeyIdentity};
use crate::telemetry::keys::PressedKeys;

/// Modifier families held alongside a key. Left/right variants collapse into one bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000);
    pub const NONE: Modifiers = Modifiers(0);

    pub const fn with(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub fn from_code(code: &str) -> Modifiers {
        match code {
            "ControlLeft" | "ControlRight" => Self::CTRL,
            "ShiftLeft" | "ShiftRight" => Self::SHIFT,
            "AltLeft" | "AltRight" => Self::ALT,
            "MetaLeft" | "MetaRight" => Self::META,
            _ => Self::NONE,
        }
    }

    pub fn of_held(held: &PressedKeys) -> Modifiers {
        held.identities()
            .map(|k| Self::from_code(&keymap::collapse_legacy_alias(&k.code)))
            .fold(Self::NONE, |acc, m| acc | m)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// "Ctrl", "Shift", "Alt", "Win" in that order.
    fn labels(self) -> Vec<&'static str> {
        [
            (Self::CTRL, "Ctrl"),
            (Self::SHIFT, "Shift"),
            (Self::ALT, "Alt"),
            (Self::META, "Win"),
        ]
        .into_iter()
        .filter(|(m, _)| self.contains(*m))
        .map(|(_, label)| label)
        .collect()
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.with(rhs)
    }
}

/// Well-known shortcuts, matched on the exact modifier set.
const KNOWN_HOTKEYS: &[(Modifiers, &str, &str)] = &[
    (Modifiers::CTRL, "KeyC", "Ctrl+C"),
    (Modifiers::CTRL, "KeyV", "Ctrl+V"),
    (Modifiers::CTRL, "KeyX", "Ctrl+X"),
    (Modifiers::CTRL, "KeyZ", "Ctrl+Z"),
    (Modifiers::CTRL, "KeyY", "Ctrl+Y"),
    (Modifiers::CTRL, "KeyA", "Ctrl+A"),
    (Modifiers::CTRL, "KeyS", "Ctrl+S"),
    (Modifiers::CTRL, "KeyF", "Ctrl+F"),
    (Modifiers::CTRL, "KeyP", "Ctrl+P"),
    (Modifiers::CTRL, "KeyO", "Ctrl+O"),
    (Modifiers::CTRL, "KeyN", "Ctrl+N"),
    (Modifiers::ALT, "F4", "Alt+F4"),
    (Modifiers::CTRL.with(Modifiers::SHIFT), "KeyZ", "Ctrl+Shift+Z"),
];

/// Hotkey label for `pressed`, given the keys held at that moment (including `pressed`).
///
/// A hotkey needs at least one held modifier and a non-modifier key. Shift alone with a
/// printable key is ordinary typing.
pub fn detect(held: &PressedKeys, pressed: &KeyIdentity) -> Option<String> {
    if held.len() < 2 || pressed.is_modifier() {
        return None;
    }
    let modifiers = Modifiers::of_held(held);
    if modifiers.is_empty() {
        return None;
    }
    if modifiers == Modifiers::SHIFT && pressed.is_printable() {
        return None;
    }

    let code = keymap::collapse_legacy_alias(&pressed.code);
    if let Some((_, _, name)) = KNOWN_HOTKEYS
        .iter()
        .find(|(mask, key, _)| *mask == modifiers && *key == code)
    {
        return Some((*name).to_string());
    }

    let key_label = if pressed.key.trim().is_empty() {
        pressed.code.as_str()
    } else {
        pressed.key.as_str()
    };
    let mut parts = modifiers.labels();
    parts.push(key_label);
    Some(parts.join("+"))
}
