//! Screencaster - interaction telemetry for screen recordings.
//!
//! This library turns raw keyboard and mouse activity captured during a recording into
//! semantic records (clicks, drags, scroll bursts, typed text, hotkeys, long presses) on the
//! recording's pause-adjusted timeline, and persists them as a JSON metadata document next to
//! the video.

pub mod capture;
pub mod recorder;
pub mod telemetry;

pub use capture::input::{InjectedInputSource, InputSink, InputSource, InputTrackingChannel};
pub use recorder::{RecordingConfig, RecordingCoordinator, RecordingError, RecordingResult};
pub use telemetry::{TelemetryConfig, TelemetryEngine};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to debug output for this crate. Calling it again is harmless.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screencaster_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting screencaster v{}", env!("CARGO_PKG_VERSION"));
    }
}
