//! Capture-side plumbing
//!
//! Screen capture lives outside this crate and joins a session as another
//! `RecordingChannel`; this module provides the input side.

pub mod input;

// Re-export input channel
pub use input::InputTrackingChannel;
