use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-native key identifier as delivered by the input hook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawKey {
    /// A non-printable key reported by name ("enter", "shift_r", "cmd", "f5", ...).
    Named(String),
    /// A key that reported a printable character, with its virtual key code when known.
    Char { ch: char, vk: Option<u32> },
    /// A key known only by its virtual key code.
    Vk(u32),
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawKey::Named(name) => write!(f, "{}", name),
            RawKey::Char { ch, .. } => write!(f, "'{}'", ch),
            RawKey::Vk(vk) => write!(f, "<{}>", vk),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// One low-level notification from the input source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawInputEvent {
    KeyDown {
        key: RawKey,
    },
    KeyUp {
        key: RawKey,
    },
    ButtonDown {
        x: f64,
        y: f64,
        button: MouseButton,
    },
    ButtonUp {
        x: f64,
        y: f64,
        button: MouseButton,
    },
    Scroll {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
    },
    /// Pointer movement; only refreshes the last known pointer position.
    Move {
        x: f64,
        y: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_key_display_matches_hook_spelling() {
        assert_eq!(RawKey::Named("shift_r".into()).to_string(), "shift_r");
        assert_eq!(RawKey::Char { ch: 'a', vk: None }.to_string(), "'a'");
        assert_eq!(RawKey::Vk(96).to_string(), "<96>");
    }

    #[test]
    fn test_raw_event_deserializes_from_tagged_json() {
        let event: RawInputEvent =
            serde_json::from_str(r#"{"kind":"buttonDown","x":10.0,"y":20.0,"button":"left"}"#)
                .expect("parse raw event");
        assert_eq!(
            event,
            RawInputEvent::ButtonDown {
                x: 10.0,
                y: 20.0,
                button: MouseButton::Left
            }
        );
    }
}
