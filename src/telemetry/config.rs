//! Telemetry thresholds, loaded from JSON with defaults for every field.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Gesture thresholds and metadata header values for a telemetry session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// Screen size written to the metadata header; not used for classification.
    pub screen_width: u32,
    pub screen_height: u32,
    /// Capture frame rate written to the metadata header.
    pub fps: u32,
    /// How long a key must stay down before it is recorded as a long press.
    pub long_press_threshold_ms: u64,
    /// Displacement in either axis that turns a press/release into a drag.
    pub drag_threshold_px: f64,
    /// Maximum gap between a click and the next release for a double-click.
    pub double_click_window_ms: u64,
    /// Maximum gap between wheel ticks of one scroll burst.
    pub scroll_coalesce_ms: u64,
    /// Maximum gap between two plain keypresses that opens a text-input run.
    pub input_chain_window_ms: u64,
    /// Interval of the background metadata flush.
    pub flush_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            fps: 30,
            long_press_threshold_ms: 500,
            drag_threshold_px: 5.0,
            double_click_window_ms: 500,
            scroll_coalesce_ms: 500,
            input_chain_window_ms: 1000,
            flush_interval_ms: 5000,
        }
    }
}

impl TelemetryConfig {
    /// Read the config file, or write the defaults there if it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read telemetry config {}", path.display()))?;
            let config: TelemetryConfig = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse telemetry config {}", path.display()))?;
            return Ok(config.normalize());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let config = TelemetryConfig::default();
        let payload = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        fs::write(path, payload).context("Failed to write config file")?;
        Ok(config)
    }

    /// Clamp values that would make a classifier degenerate.
    pub fn normalize(mut self) -> Self {
        self.fps = self.fps.max(1);
        self.long_press_threshold_ms = self.long_press_threshold_ms.max(1);
        if !self.drag_threshold_px.is_finite() || self.drag_threshold_px < 1.0 {
            self.drag_threshold_px = 1.0;
        }
        self.double_click_window_ms = self.double_click_window_ms.max(1);
        self.scroll_coalesce_ms = self.scroll_coalesce_ms.max(1);
        self.input_chain_window_ms = self.input_chain_window_ms.max(1);
        self.flush_interval_ms = self.flush_interval_ms.max(100);
        self
    }

    pub fn long_press_threshold(&self) -> Duration {
        Duration::from_millis(self.long_press_threshold_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
