//! Input capture for interaction telemetry
//!
//! Raw keyboard and mouse notifications arrive through an `InputSource`, are normalized to
//! canonical key identities, and feed the `InputTrackingChannel`, which classifies them into
//! semantic records and persists the session metadata document.

pub mod channel;
pub mod keymap;
pub mod source;
pub mod types;

pub use channel::InputTrackingChannel;
pub use keymap::KeyIdentity;
pub use source::{InjectedInputSource, InputSink, InputSource};
pub use types::{MouseButton, RawInputEvent, RawKey};
