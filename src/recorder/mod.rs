//! Recording coordinator
//!
//! Drives every registered channel (screen capture, interaction telemetry) through the same
//! start/pause/resume/stop sequence so their timelines stay aligned.

pub mod channel;
pub mod state;

pub use channel::{ChannelType, RecordingChannel, RecordingError, RecordingResult};
pub use state::{RecordingConfig, RecordingOutput, RecordingState};

use crate::telemetry::{SessionClock, SystemTimeSource, TimeSource};
use std::sync::Arc;

pub struct RecordingCoordinator {
    channels: Vec<Box<dyn RecordingChannel>>,
    state: RecordingState,
    clock: SessionClock,
    session_index: usize,
    config: Option<RecordingConfig>,
}

impl Default for RecordingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCoordinator {
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource::new()))
    }

    pub fn with_time_source(source: Arc<dyn TimeSource>) -> Self {
        Self {
            channels: Vec::new(),
            state: RecordingState::Idle,
            clock: SessionClock::new(source),
            session_index: 0,
            config: None,
        }
    }

    pub fn add_channel(&mut self, channel: Box<dyn RecordingChannel>) {
        tracing::debug!(
            "Adding {} channel '{}'",
            channel.channel_type(),
            channel.id()
        );
        self.channels.push(channel);
    }

    pub fn clear_channels(&mut self) {
        if self.state != RecordingState::Idle {
            tracing::warn!("Refusing to clear channels while a recording is active");
            return;
        }
        self.channels.clear();
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Pause-adjusted duration of the current recording in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Initialize and start every channel. If one fails, those already started are stopped.
    pub async fn start(&mut self, config: RecordingConfig) -> RecordingResult<()> {
        if self.state != RecordingState::Idle {
            return Err(RecordingError::AlreadyRecording);
        }
        if self.channels.is_empty() {
            return Err(RecordingError::ConfigurationError(
                "No recording channels configured".to_string(),
            ));
        }

        std::fs::create_dir_all(&config.output_dir)?;
        for channel in self.channels.iter_mut() {
            channel.initialize(&config, self.session_index).await?;
        }

        for i in 0..self.channels.len() {
            if let Err(e) = self.channels[i].start().await {
                tracing::warn!("Channel '{}' failed to start: {}", self.channels[i].id(), e);
                for started in self.channels[..i].iter_mut().rev() {
                    if let Err(stop_err) = started.stop().await {
                        tracing::warn!("Rollback stop of '{}' failed: {}", started.id(), stop_err);
                    }
                }
                return Err(e);
            }
        }

        self.clock.start();
        self.state = RecordingState::Recording;
        tracing::info!(
            "Recording started (session={}, channels={}, output={:?})",
            self.session_index,
            self.channels.len(),
            config.output_dir
        );
        self.config = Some(config);
        Ok(())
    }

    /// Pause every channel. A no-op unless recording.
    pub async fn pause(&mut self) -> RecordingResult<()> {
        if self.state != RecordingState::Recording {
            return Ok(());
        }
        for channel in self.channels.iter_mut() {
            channel.pause().await?;
        }
        self.clock.pause();
        self.state = RecordingState::Paused;
        tracing::info!("Recording paused at {}ms", self.clock.elapsed_ms());
        Ok(())
    }

    /// Resume every channel. A no-op unless paused.
    pub async fn resume(&mut self) -> RecordingResult<()> {
        if self.state != RecordingState::Paused {
            return Ok(());
        }
        for channel in self.channels.iter_mut() {
            channel.resume().await?;
        }
        self.clock.resume();
        self.state = RecordingState::Recording;
        tracing::info!("Recording resumed");
        Ok(())
    }

    /// Stop every channel, even if one of them fails, and report what was produced.
    pub async fn stop(&mut self) -> RecordingResult<RecordingOutput> {
        if self.state == RecordingState::Idle {
            return Err(RecordingError::NotRecording);
        }

        let mut first_error = None;
        for channel in self.channels.iter_mut() {
            if let Err(e) = channel.stop().await {
                tracing::warn!("Channel '{}' failed to stop cleanly: {}", channel.id(), e);
                first_error.get_or_insert(e);
            }
        }

        let duration_ms = self.clock.elapsed_ms();
        self.clock.reset();
        self.state = RecordingState::Idle;
        self.session_index += 1;

        if let Some(e) = first_error {
            return Err(e);
        }

        let files = self
            .channels
            .iter()
            .flat_map(|channel| channel.output_files())
            .collect();
        let output_dir = self
            .config
            .take()
            .map(|config| config.output_dir)
            .unwrap_or_default();
        tracing::info!("Recording stopped after {}ms", duration_ms);
        Ok(RecordingOutput {
            output_dir,
            files,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::{
        InjectedInputSource, InputTrackingChannel, MouseButton, RawInputEvent,
    };
    use crate::telemetry::ManualTimeSource;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Stand-in for the screen capture channel; records the calls it receives.
    struct FakeDisplayChannel {
        calls: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
        recording: bool,
        output: Option<String>,
    }

    impl FakeDisplayChannel {
        fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                calls,
                fail_start: false,
                recording: false,
                output: None,
            }
        }
    }

    #[async_trait]
    impl RecordingChannel for FakeDisplayChannel {
        fn id(&self) -> &str {
            "display"
        }

        fn channel_type(&self) -> ChannelType {
            ChannelType::Display
        }

        async fn initialize(
            &mut self,
            config: &RecordingConfig,
            session_index: usize,
        ) -> RecordingResult<()> {
            let path = config.output_dir.join(format!("recording-{}-display.mp4", session_index));
            self.output = Some(path.to_string_lossy().to_string());
            self.calls.lock().push(format!("display:init:{}", session_index));
            Ok(())
        }

        async fn start(&mut self) -> RecordingResult<()> {
            if self.fail_start {
                return Err(RecordingError::CaptureError("no display".to_string()));
            }
            self.recording = true;
            self.calls.lock().push("display:start".to_string());
            Ok(())
        }

        async fn stop(&mut self) -> RecordingResult<()> {
            self.recording = false;
            self.calls.lock().push("display:stop".to_string());
            Ok(())
        }

        async fn pause(&mut self) -> RecordingResult<()> {
            self.calls.lock().push("display:pause".to_string());
            Ok(())
        }

        async fn resume(&mut self) -> RecordingResult<()> {
            self.calls.lock().push("display:resume".to_string());
            Ok(())
        }

        fn is_recording(&self) -> bool {
            self.recording
        }

        fn output_files(&self) -> Vec<String> {
            self.output.iter().cloned().collect()
        }
    }

    #[tokio::test]
    async fn test_lifecycle_reaches_every_channel_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = RecordingCoordinator::new();
        coordinator.add_channel(Box::new(FakeDisplayChannel::new(calls.clone())));

        coordinator
            .start(RecordingConfig::new(dir.path()))
            .await
            .expect("start");
        assert_eq!(coordinator.state(), RecordingState::Recording);
        coordinator.pause().await.expect("pause");
        coordinator.pause().await.expect("duplicate pause is a no-op");
        coordinator.resume().await.expect("resume");
        let output = coordinator.stop().await.expect("stop");

        assert_eq!(
            *calls.lock(),
            vec![
                "display:init:0",
                "display:start",
                "display:pause",
                "display:resume",
                "display:stop"
            ]
        );
        assert_eq!(output.files.len(), 1);
        assert_eq!(coordinator.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_duration_excludes_pauses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let time = ManualTimeSource::new();
        let mut coordinator = RecordingCoordinator::with_time_source(Arc::new(time.clone()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        coordinator.add_channel(Box::new(FakeDisplayChannel::new(calls)));

        coordinator
            .start(RecordingConfig::new(dir.path()))
            .await
            .expect("start");
        time.advance_ms(2_000);
        coordinator.pause().await.expect("pause");
        time.advance_ms(30_000);
        coordinator.resume().await.expect("resume");
        time.advance_ms(500);
        assert_eq!(coordinator.duration_ms(), 2_500);
        let output = coordinator.stop().await.expect("stop");
        assert_eq!(output.duration_ms, 2_500);
    }

    #[tokio::test]
    async fn test_failed_start_rolls_back_started_channels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = RecordingCoordinator::new();
        coordinator.add_channel(Box::new(FakeDisplayChannel::new(calls.clone())));
        let mut broken = FakeDisplayChannel::new(calls.clone());
        broken.fail_start = true;
        coordinator.add_channel(Box::new(broken));

        let err = coordinator
            .start(RecordingConfig::new(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::CaptureError(_)));
        assert_eq!(coordinator.state(), RecordingState::Idle);
        assert_eq!(calls.lock().last().map(String::as_str), Some("display:stop"));
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut coordinator = RecordingCoordinator::new();
        assert!(matches!(
            coordinator.stop().await,
            Err(RecordingError::NotRecording)
        ));
        assert!(matches!(
            coordinator.start(RecordingConfig::new(dir.path())).await,
            Err(RecordingError::ConfigurationError(_))
        ));
        coordinator.resume().await.expect("resume while idle is a no-op");
    }

    #[tokio::test]
    async fn test_channels_cannot_be_cleared_mid_recording() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = RecordingCoordinator::new();
        coordinator.add_channel(Box::new(FakeDisplayChannel::new(calls)));
        coordinator
            .start(RecordingConfig::new(dir.path()))
            .await
            .expect("start");

        coordinator.clear_channels();
        assert_eq!(coordinator.channel_count(), 1, "active channels are kept");
        coordinator.stop().await.expect("stop");
        coordinator.clear_channels();
        assert_eq!(coordinator.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_telemetry_channel_follows_coordinator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = Arc::new(InjectedInputSource::new());
        let mut coordinator = RecordingCoordinator::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        coordinator.add_channel(Box::new(FakeDisplayChannel::new(calls)));
        coordinator.add_channel(Box::new(InputTrackingChannel::new(source.clone())));

        coordinator
            .start(RecordingConfig::new(dir.path()))
            .await
            .expect("start");
        source.emit(RawInputEvent::ButtonDown {
            x: 0.0,
            y: 0.0,
            button: MouseButton::Left,
        });
        source.emit(RawInputEvent::Move { x: 30.0, y: 0.0 });
        coordinator.pause().await.expect("pause");
        let output = coordinator.stop().await.expect("stop");

        let metadata = dir.path().join("recording-0-metadata.json");
        assert!(output
            .files
            .contains(&metadata.to_string_lossy().to_string()));
        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&metadata).expect("metadata written"))
                .expect("valid json");
        assert_eq!(doc["events"][0]["type"], "drag", "pause force-closed the drag");
        assert_eq!(doc["events"].as_array().map(Vec::len), Some(1));
    }
}
