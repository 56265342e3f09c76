//! Persisted event records and the session metadata document.
//!
//! Times are kept as pause-adjusted milliseconds and written as seconds with three decimals.

use crate::capture::input::keymap::KeyIdentity;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const METADATA_VERSION: &str = "1.0";

fn as_seconds<S: Serializer>(ms: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(ms_to_seconds(*ms))
}

pub fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Held-key snapshot attached to pointer and scroll records (`null` fields when none held).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldKeys {
    pub keys: Option<Vec<String>>,
    pub codes: Option<Vec<String>>,
    pub key_codes: Option<Vec<u32>>,
}

impl HeldKeys {
    pub fn from_identities<'a>(identities: impl Iterator<Item = &'a KeyIdentity>) -> Self {
        let identities: Vec<&KeyIdentity> = identities.collect();
        if identities.is_empty() {
            return Self::default();
        }
        Self {
            keys: Some(identities.iter().map(|k| k.key.clone()).collect()),
            codes: Some(identities.iter().map(|k| k.code.clone()).collect()),
            key_codes: Some(identities.iter().map(|k| k.key_code).collect()),
        }
    }
}

/// A position with the pause-adjusted time it was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(serialize_with = "as_seconds")]
    pub time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Why an input run was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEndReason {
    Enter,
    Tab,
    Escape,
    Click,
    Scroll,
    Pause,
    Stop,
}

impl InputEndReason {
    pub fn terminator(code: &str) -> Option<Self> {
        match code {
            "Enter" => Some(Self::Enter),
            "Tab" => Some(Self::Tab),
            "Escape" => Some(Self::Escape),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Tab => "Tab",
            Self::Escape => "Escape",
            Self::Click => "Click",
            Self::Scroll => "Scroll",
            Self::Pause => "Pause",
            Self::Stop => "Stop",
        }
    }
}

/// Type-specific payload of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    KeyPress {
        key: String,
        code: String,
        key_code: u32,
    },
    #[serde(rename_all = "camelCase")]
    KeyLongPress {
        #[serde(rename = "duration", serialize_with = "as_seconds")]
        duration_ms: u64,
        key: String,
        code: String,
        key_code: u32,
    },
    #[serde(rename_all = "camelCase")]
    Hotkey {
        hotkey: String,
        keys: Vec<String>,
        codes: Vec<String>,
        key_codes: Vec<u32>,
    },
    LeftClick {
        x: f64,
        y: f64,
        #[serde(flatten)]
        held: HeldKeys,
    },
    DoubleClick {
        x: f64,
        y: f64,
        #[serde(flatten)]
        held: HeldKeys,
    },
    RightClick {
        x: f64,
        y: f64,
        #[serde(flatten)]
        held: HeldKeys,
    },
    #[serde(rename_all = "camelCase")]
    Drag {
        #[serde(serialize_with = "as_seconds")]
        start_time: u64,
        #[serde(serialize_with = "as_seconds")]
        end_time: u64,
        x: f64,
        y: f64,
        start: Point,
        end: Point,
        #[serde(rename = "duration", serialize_with = "as_seconds")]
        duration_ms: u64,
        #[serde(flatten)]
        held: HeldKeys,
    },
    #[serde(rename_all = "camelCase")]
    Scroll {
        #[serde(serialize_with = "as_seconds")]
        start_time: u64,
        #[serde(serialize_with = "as_seconds")]
        end_time: u64,
        start: Point,
        end: Point,
        scroll_amount: i64,
        direction: ScrollDirection,
        #[serde(rename = "duration", serialize_with = "as_seconds")]
        duration_ms: u64,
        #[serde(flatten)]
        held: HeldKeys,
    },
    #[serde(rename_all = "camelCase")]
    Input {
        #[serde(rename = "duration", serialize_with = "as_seconds")]
        duration_ms: u64,
        keys: Vec<String>,
        codes: Vec<String>,
        key_codes: Vec<u32>,
        length: usize,
        value: String,
        reason: String,
    },
    Custom {
        #[serde(skip)]
        kind: String,
        #[serde(flatten)]
        data: Map<String, Value>,
    },
}

impl EventKind {
    /// The `type` field written for this record.
    pub fn type_name(&self) -> &str {
        match self {
            EventKind::KeyPress { .. } => "keyPress",
            EventKind::KeyLongPress { .. } => "keyLongPress",
            EventKind::Hotkey { .. } => "hotkey",
            EventKind::LeftClick { .. } => "leftClick",
            EventKind::DoubleClick { .. } => "doubleClick",
            EventKind::RightClick { .. } => "rightClick",
            EventKind::Drag { .. } => "drag",
            EventKind::Scroll { .. } => "scroll",
            EventKind::Input { .. } => "input",
            EventKind::Custom { kind, .. } => kind.as_str(),
        }
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    /// Pause-adjusted time at which the gesture began.
    pub time_ms: u64,
    pub kind: EventKind,
}

impl EventRecord {
    pub fn new(time_ms: u64, kind: EventKind) -> Self {
        Self {
            id: short_id(),
            time_ms,
            kind,
        }
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn time(&self) -> f64 {
        ms_to_seconds(self.time_ms)
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a str,
            #[serde(rename = "type")]
            kind: &'a str,
            #[serde(serialize_with = "as_seconds")]
            time: u64,
            #[serde(flatten)]
            details: &'a EventKind,
        }

        Wire {
            id: &self.id,
            kind: self.kind.type_name(),
            time: self.time_ms,
            details: &self.kind,
        }
        .serialize(serializer)
    }
}

/// Short random token; readable, not a reference key.
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// On-disk session document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument<'a> {
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_start: Option<&'a str>,
    #[serde(serialize_with = "as_seconds")]
    pub recording_duration: u64,
    pub screen: ScreenSize,
    pub fps: u32,
    pub events: &'a [EventRecord],
}
