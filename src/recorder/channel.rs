//! Recording channel trait
//!
//! Defines the interface shared by everything the coordinator drives in lock-step:
//! the external video capture and the interaction telemetry channel.

use crate::recorder::state::RecordingConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Capture error: {0}")]
    CaptureError(String),

    #[error("Input source error: {0}")]
    InputSource(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to persist metadata to {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Trait for recording channels
///
/// Each channel represents one stream of the recording (screen video, interaction telemetry).
/// Channels are managed by the `RecordingCoordinator`, which calls every lifecycle method on
/// all channels in the same order so their clocks stay aligned.
#[async_trait]
pub trait RecordingChannel: Send + Sync {
    /// Get the channel identifier (e.g., "display", "input")
    fn id(&self) -> &str;

    /// Get the channel type
    fn channel_type(&self) -> ChannelType;

    /// Prepare the channel for a session: output location and per-channel settings
    async fn initialize(
        &mut self,
        config: &RecordingConfig,
        session_index: usize,
    ) -> RecordingResult<()>;

    /// Start recording
    async fn start(&mut self) -> RecordingResult<()>;

    /// Stop recording
    async fn stop(&mut self) -> RecordingResult<()>;

    /// Pause recording
    async fn pause(&mut self) -> RecordingResult<()>;

    /// Resume recording after a pause
    async fn resume(&mut self) -> RecordingResult<()>;

    /// Check if the channel is currently recording
    fn is_recording(&self) -> bool;

    /// Get output files created by this channel
    fn output_files(&self) -> Vec<String>;
}

/// Types of recording channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// Screen/display capture
    Display,
    /// Input telemetry (mouse, keyboard)
    Input,
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Display => write!(f, "display"),
            ChannelType::Input => write!(f, "input"),
        }
    }
}
