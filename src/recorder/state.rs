//! Recording session configuration and state types

use crate::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-session recording configuration handed to every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// Directory receiving every channel's output.
    pub output_dir: PathBuf,
    /// Metadata file name; `recording-<session>-metadata.json` when absent.
    #[serde(default)]
    pub metadata_file_name: Option<String>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl RecordingConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            metadata_file_name: None,
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Where the telemetry document for `session_index` is written.
    pub fn metadata_path(&self, session_index: usize) -> PathBuf {
        let name = self
            .metadata_file_name
            .clone()
            .unwrap_or_else(|| format!("recording-{}-metadata.json", session_index));
        self.output_dir.join(name)
    }
}

/// Current state of the recording coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
}

/// What a finished recording produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOutput {
    pub output_dir: PathBuf,
    pub files: Vec<String>,
    /// Pause-adjusted duration in milliseconds.
    pub duration_ms: u64,
}
