//! Interaction telemetry
//!
//! Turns raw keyboard and mouse notifications into semantic records (clicks, drags, scroll
//! bursts, text-input runs, hotkeys, long presses) stamped with pause-adjusted recording time,
//! and renders them into the session metadata document.

pub mod clock;
pub mod config;
pub mod engine;
pub mod event_log;
pub mod hotkey;
pub mod keys;
pub mod long_press;
pub mod pointer;
pub mod record;
pub mod scroll;
pub mod text_input;

pub use clock::{ManualTimeSource, SessionClock, SystemTimeSource, TimeSource};
pub use config::TelemetryConfig;
pub use engine::{InputEffects, SessionState, StopOutcome, TelemetryEngine};
pub use event_log::{EventLog, PendingFlush};
pub use long_press::{LongPressArm, LongPressFire};
pub use record::{EventKind, EventRecord, HeldKeys, InputEndReason, Point, ScrollDirection};
