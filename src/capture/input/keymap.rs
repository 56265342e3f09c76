//! Key/code normalization
//!
//! Translates platform-native key identifiers into the three parallel views carried by every
//! keyboard record: the physical `code` ("KeyA", "ShiftLeft"), the legacy numeric `keyCode`
//! and the display `key` label. Lookups never fail; unknown keys degrade to a literal code.

use crate::capture::input::types::RawKey;
use serde::{Deserialize, Serialize};

/// Shift-layer symbols of the digit row, indexed by digit.
const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

/// The normalized identity of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyIdentity {
    pub code: String,
    pub key_code: u32,
    pub key: String,
}

impl KeyIdentity {
    /// Build the identity of a canonical code using the fixed label and numeric tables.
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        let key_code = key_code_for(&code);
        let key = key_label_for(&code).unwrap_or_else(|| code.clone());
        Self {
            code,
            key_code,
            key,
        }
    }

    pub fn is_modifier(&self) -> bool {
        is_modifier(&self.code)
    }

    /// True when the key types a single visible character (letters, digits, symbols, space).
    pub fn is_printable(&self) -> bool {
        let mut chars = self.key.chars();
        matches!((chars.next(), chars.next()), (Some(_), None))
    }
}

/// Normalize a raw key into its canonical identity.
pub fn normalize(raw: &RawKey) -> KeyIdentity {
    match raw {
        RawKey::Char { ch, .. } => {
            let code = collapse_legacy_alias(&char_code(*ch));
            let mut identity = KeyIdentity::from_code(code);
            // Keys outside the tables still show the character that was typed.
            if key_label_for(&identity.code).is_none() && !ch.is_control() {
                identity.key = ch.to_string();
            }
            identity
        }
        _ => KeyIdentity::from_code(canonical_code(raw)),
    }
}

/// Resolve the canonical physical code of a raw key.
///
/// Resolution order: named control keys, printable characters, virtual-code heuristics,
/// legacy aliases, and finally the raw identifier echoed back unchanged.
pub fn canonical_code(raw: &RawKey) -> String {
    let code = match raw {
        RawKey::Named(name) => named_code(name)
            .map(str::to_string)
            .or_else(|| legacy_alias(name))
            .unwrap_or_else(|| name.clone()),
        RawKey::Char { ch, .. } => char_code(*ch),
        RawKey::Vk(vk) => vk_code(*vk)
            .or_else(|| legacy_alias(&raw.to_string()))
            .unwrap_or_else(|| raw.to_string()),
    };
    collapse_legacy_alias(&code)
}

/// Collapse "Key1".."Key26" (control-character ordinals and older recordings) to letter codes.
pub fn collapse_legacy_alias(code: &str) -> String {
    if let Some(rest) = code.strip_prefix("Key") {
        if let Ok(n) = rest.parse::<u8>() {
            if (1..=26).contains(&n) {
                return format!("Key{}", char::from(b'A' + n - 1));
            }
        }
    }
    code.to_string()
}

/// Legacy numeric key code, 0 when unknown.
pub fn key_code_for(code: &str) -> u32 {
    if let Some(letter) = letter_of(code) {
        return letter as u32;
    }
    if let Some(digit) = digit_of(code) {
        return 48 + digit;
    }
    if let Some(n) = code.strip_prefix("Numpad").and_then(|d| d.parse::<u32>().ok()) {
        if n <= 9 {
            return 96 + n;
        }
    }
    if let Some(n) = function_key_number(code) {
        return 111 + n;
    }
    match code {
        "ControlLeft" | "ControlRight" => 17,
        "ShiftLeft" | "ShiftRight" => 16,
        "AltLeft" | "AltRight" => 18,
        "MetaLeft" | "MetaRight" => 224,
        "AltGraph" => 225,
        "Enter" | "NumpadEnter" => 13,
        "Tab" => 9,
        "Space" => 32,
        "Backspace" => 8,
        "Escape" => 27,
        "CapsLock" => 20,
        "Delete" => 46,
        "Insert" => 45,
        "Home" => 36,
        "End" => 35,
        "PageUp" => 33,
        "PageDown" => 34,
        "ArrowUp" => 38,
        "ArrowDown" => 40,
        "ArrowLeft" => 37,
        "ArrowRight" => 39,
        "Minus" => 189,
        "Equal" => 187,
        "BracketLeft" => 219,
        "BracketRight" => 221,
        "Semicolon" => 186,
        "Quote" => 222,
        "Backquote" => 192,
        "Backslash" => 220,
        "Comma" => 188,
        "Period" => 190,
        "Slash" => 191,
        "NumLock" => 144,
        "NumpadMultiply" => 106,
        "NumpadAdd" => 107,
        "NumpadSubtract" => 109,
        "NumpadDecimal" => 110,
        "NumpadDivide" => 111,
        _ => 0,
    }
}

/// Display label of a canonical code, if the code is in the fixed tables.
pub fn key_label_for(code: &str) -> Option<String> {
    if let Some(letter) = letter_of(code) {
        return Some(letter.to_string());
    }
    if let Some(digit) = digit_of(code) {
        return Some(digit.to_string());
    }
    if let Some(n) = code.strip_prefix("Numpad").and_then(|d| d.parse::<u32>().ok()) {
        if n <= 9 {
            return Some(n.to_string());
        }
    }
    if function_key_number(code).is_some() {
        return Some(code.to_string());
    }
    let label = match code {
        "ControlLeft" | "ControlRight" => "Control",
        "ShiftLeft" | "ShiftRight" => "Shift",
        "AltLeft" | "AltRight" => "Alt",
        "MetaLeft" | "MetaRight" => "Meta",
        "Space" => " ",
        "AltGraph" | "Enter" | "Tab" | "Backspace" | "Escape" | "CapsLock" | "Delete"
        | "Insert" | "Home" | "End" | "PageUp" | "PageDown" | "ArrowUp" | "ArrowDown"
        | "ArrowLeft" | "ArrowRight" | "NumLock" => code,
        "Minus" => "-",
        "Equal" => "=",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "Semicolon" => ";",
        "Quote" => "'",
        "Backquote" => "`",
        "Backslash" => "\\",
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        "NumpadMultiply" => "*",
        "NumpadAdd" => "+",
        "NumpadSubtract" => "-",
        "NumpadDecimal" => ".",
        "NumpadDivide" => "/",
        "NumpadEnter" => "Enter",
        _ => return None,
    };
    Some(label.to_string())
}

pub fn is_modifier(code: &str) -> bool {
    matches!(
        code,
        "ControlLeft"
            | "ControlRight"
            | "ShiftLeft"
            | "ShiftRight"
            | "AltLeft"
            | "AltRight"
            | "MetaLeft"
            | "MetaRight"
    )
}

pub fn is_shift(code: &str) -> bool {
    matches!(code, "ShiftLeft" | "ShiftRight")
}

/// Modifier, navigation, editing and function keys: none of them can open a text-input run.
pub fn is_non_text_key(code: &str) -> bool {
    is_modifier(code)
        || function_key_number(code).is_some()
        || matches!(
            code,
            "AltGraph"
                | "CapsLock"
                | "Escape"
                | "Tab"
                | "Enter"
                | "Backspace"
                | "Delete"
                | "Insert"
                | "Home"
                | "End"
                | "PageUp"
                | "PageDown"
                | "ArrowUp"
                | "ArrowDown"
                | "ArrowLeft"
                | "ArrowRight"
                | "NumLock"
        )
}

/// Upper-case letter of a "KeyA".."KeyZ" code.
pub fn letter_of(code: &str) -> Option<char> {
    let rest = code.strip_prefix("Key")?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Some(c),
        _ => None,
    }
}

/// Digit of a "Digit0".."Digit9" code.
pub fn digit_of(code: &str) -> Option<u32> {
    let rest = code.strip_prefix("Digit")?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10),
        _ => None,
    }
}

/// Character produced by a digit key with Shift held (US layout).
pub fn shifted_digit(digit: u32) -> Option<char> {
    SHIFTED_DIGITS.get(digit as usize).copied()
}

fn function_key_number(code: &str) -> Option<u32> {
    let n = code.strip_prefix('F')?.parse::<u32>().ok()?;
    (1..=12).contains(&n).then_some(n)
}

fn named_code(name: &str) -> Option<&'static str> {
    let code = match name {
        "enter" => "Enter",
        "tab" => "Tab",
        "space" => "Space",
        "backspace" => "Backspace",
        "esc" => "Escape",
        "caps_lock" => "CapsLock",
        "delete" => "Delete",
        "insert" => "Insert",
        "home" => "Home",
        "end" => "End",
        "page_up" => "PageUp",
        "page_down" => "PageDown",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "f1" => "F1",
        "f2" => "F2",
        "f3" => "F3",
        "f4" => "F4",
        "f5" => "F5",
        "f6" => "F6",
        "f7" => "F7",
        "f8" => "F8",
        "f9" => "F9",
        "f10" => "F10",
        "f11" => "F11",
        "f12" => "F12",
        "shift" => "ShiftLeft",
        "shift_r" => "ShiftRight",
        "ctrl" => "ControlLeft",
        "ctrl_r" => "ControlRight",
        "alt" => "AltLeft",
        "alt_r" => "AltRight",
        "cmd" => "MetaLeft",
        "cmd_r" => "MetaRight",
        "num_lock" => "NumLock",
        "alt_gr" => "AltGraph",
        _ => return None,
    };
    Some(code)
}

fn char_code(ch: char) -> String {
    let symbol = match ch {
        '!' | '1' => Some("Digit1"),
        '@' | '2' => Some("Digit2"),
        '#' | '3' | '№' => Some("Digit3"),
        '$' | '4' => Some("Digit4"),
        '%' | '5' => Some("Digit5"),
        '^' | '6' => Some("Digit6"),
        '&' | '7' => Some("Digit7"),
        '*' | '8' => Some("Digit8"),
        '(' | '9' => Some("Digit9"),
        ')' | '0' => Some("Digit0"),
        '_' | '-' => Some("Minus"),
        '+' | '=' => Some("Equal"),
        '"' | '\'' => Some("Quote"),
        ':' | ';' => Some("Semicolon"),
        '?' | '/' => Some("Slash"),
        '>' | '.' => Some("Period"),
        '<' | ',' => Some("Comma"),
        '~' | '`' => Some("Backquote"),
        '|' | '\\' => Some("Backslash"),
        '{' | '[' => Some("BracketLeft"),
        '}' | ']' => Some("BracketRight"),
        ' ' => Some("Space"),
        _ => None,
    };
    match symbol {
        Some(code) => code.to_string(),
        None if ch.is_ascii_alphabetic() => format!("Key{}", ch.to_ascii_uppercase()),
        None => format!("Key{}", ch as u32),
    }
}

fn vk_code(vk: u32) -> Option<String> {
    let code = match vk {
        54 | 55 => "MetaLeft",
        58 => "AltLeft",
        61 => "AltRight",
        225 => "AltGraph",
        96..=105 => return Some(format!("Numpad{}", vk - 96)),
        106 => "NumpadMultiply",
        107 => "NumpadAdd",
        109 => "NumpadSubtract",
        110 => "NumpadDecimal",
        111 => "NumpadDivide",
        144 => "NumLock",
        _ => return None,
    };
    Some(code.to_string())
}

fn legacy_alias(name: &str) -> Option<String> {
    if name.eq_ignore_ascii_case("key26") {
        return Some("KeyZ".to_string());
    }
    let code = match name {
        "ctrl_l" => "ControlLeft",
        "alt_l" | "option" => "AltLeft",
        "option_r" => "AltRight",
        "cmd_l" => "MetaLeft",
        "shift_l" => "ShiftLeft",
        _ => {
            let collapsed = collapse_legacy_alias(name);
            return (collapsed != name).then_some(collapsed);
        }
    };
    Some(code.to_string())
}
