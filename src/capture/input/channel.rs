use crate::capture::input::source::{InputSink, InputSource};
use crate::capture::input::types::{MouseButton, RawInputEvent, RawKey};
use crate::recorder::channel::{ChannelType, RecordingChannel, RecordingError, RecordingResult};
use crate::recorder::state::RecordingConfig;
use crate::telemetry::{
    EventRecord, InputEffects, LongPressArm, LongPressFire, SessionState, TelemetryConfig,
    TelemetryEngine,
};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Long-press checks in flight, one tokio task per armed key.
struct TimerSet {
    runtime: Handle,
    engine: Arc<ParkingMutex<TelemetryEngine>>,
    tasks: ParkingMutex<HashMap<u64, JoinHandle<()>>>,
}

impl TimerSet {
    fn new(runtime: Handle, engine: Arc<ParkingMutex<TelemetryEngine>>) -> Self {
        Self {
            runtime,
            engine,
            tasks: ParkingMutex::new(HashMap::new()),
        }
    }

    fn apply(self: &Arc<Self>, effects: InputEffects) {
        if let Some(token) = effects.cancelled {
            self.cancel(token);
        }
        if let Some(arm) = effects.armed {
            self.schedule(arm);
        }
    }

    fn schedule(self: &Arc<Self>, arm: LongPressArm) {
        let timers = Arc::clone(self);
        let token = arm.token;
        // Held across the spawn so the task cannot remove its handle before it is stored
        let mut tasks = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(arm.delay).await;
            let outcome = timers.engine.lock().fire_long_press(&arm.code, arm.token);
            match outcome {
                LongPressFire::Rearm(next) => timers.schedule(next),
                LongPressFire::Emitted | LongPressFire::Stale => {
                    timers.tasks.lock().remove(&arm.token);
                }
                LongPressFire::Dormant => {}
            }
        });
        tasks.insert(token, task);
    }

    fn cancel(&self, token: u64) {
        if let Some(task) = self.tasks.lock().remove(&token) {
            task.abort();
        }
    }

    fn cancel_all(&self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

/// Subscriber handed to the input source; funnels every callback through the engine lock.
struct TelemetrySink {
    engine: Arc<ParkingMutex<TelemetryEngine>>,
    timers: Arc<TimerSet>,
}

impl TelemetrySink {
    fn apply(&self, event: RawInputEvent) {
        let effects = self.engine.lock().handle(event);
        self.timers.apply(effects);
    }
}

impl InputSink for TelemetrySink {
    fn on_key_down(&self, key: RawKey) {
        self.apply(RawInputEvent::KeyDown { key });
    }

    fn on_key_up(&self, key: RawKey) {
        self.apply(RawInputEvent::KeyUp { key });
    }

    fn on_button_down(&self, x: f64, y: f64, button: MouseButton) {
        self.apply(RawInputEvent::ButtonDown { x, y, button });
    }

    fn on_button_up(&self, x: f64, y: f64, button: MouseButton) {
        self.apply(RawInputEvent::ButtonUp { x, y, button });
    }

    fn on_scroll(&self, x: f64, y: f64, dx: f64, dy: f64) {
        self.apply(RawInputEvent::Scroll { x, y, dx, dy });
    }

    fn on_move(&self, x: f64, y: f64) {
        self.apply(RawInputEvent::Move { x, y });
    }

    fn dispatch(&self, event: RawInputEvent) {
        self.apply(event);
    }
}

/// Render and write the document with `writer` held, so snapshots land on disk in render order.
fn flush_serialized(
    engine: &ParkingMutex<TelemetryEngine>,
    writer: &ParkingMutex<()>,
) -> RecordingResult<Option<PathBuf>> {
    let _writing = writer.lock();
    let pending = engine.lock().prepare_flush()?;
    match pending {
        Some(pending) => {
            pending.write()?;
            Ok(Some(pending.path))
        }
        None => Ok(None),
    }
}

fn spawn_flush_loop(
    runtime: &Handle,
    engine: Arc<ParkingMutex<TelemetryEngine>>,
    writer: Arc<ParkingMutex<()>>,
    period: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the start flush already covered it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = flush_serialized(&engine, &writer) {
                tracing::warn!("Periodic metadata flush failed: {}", e);
            }
        }
    })
}

/// Session controller for interaction telemetry.
///
/// Subscribes to an `InputSource` while collecting, owns the long-press timers and the
/// periodic flush, and persists the metadata document. All classification state lives in
/// one `TelemetryEngine` behind one lock.
pub struct InputTrackingChannel {
    id: String,
    source: Arc<dyn InputSource>,
    engine: Arc<ParkingMutex<TelemetryEngine>>,
    writer: Arc<ParkingMutex<()>>,
    runtime: Option<Handle>,
    timers: Option<Arc<TimerSet>>,
    flush_task: Option<JoinHandle<()>>,
    metadata_path: Option<PathBuf>,
    session_index: usize,
    output_files: Vec<String>,
}

impl InputTrackingChannel {
    pub fn new(source: Arc<dyn InputSource>) -> Self {
        Self::with_engine(
            source,
            TelemetryEngine::with_system_clock(TelemetryConfig::default()),
        )
    }

    pub fn with_engine(source: Arc<dyn InputSource>, engine: TelemetryEngine) -> Self {
        Self {
            id: "input".to_string(),
            source,
            engine: Arc::new(ParkingMutex::new(engine)),
            writer: Arc::new(ParkingMutex::new(())),
            runtime: None,
            timers: None,
            flush_task: None,
            metadata_path: None,
            session_index: 0,
            output_files: Vec::new(),
        }
    }

    /// Run timers and flushes on `runtime` instead of the runtime current at start.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Start collecting into the metadata file at `path`.
    pub fn start_collection(&mut self, path: impl Into<PathBuf>) -> RecordingResult<()> {
        let path = path.into();
        let runtime = match self.runtime.clone() {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| {
                RecordingError::ConfigurationError(format!(
                    "No async runtime for telemetry timers: {}",
                    e
                ))
            })?,
        };

        let flush_interval = {
            let mut engine = self.engine.lock();
            if !engine.start(Some(path.clone())) {
                return Err(RecordingError::AlreadyRecording);
            }
            engine.config().flush_interval()
        };

        let timers = Arc::new(TimerSet::new(runtime.clone(), Arc::clone(&self.engine)));
        let sink = Arc::new(TelemetrySink {
            engine: Arc::clone(&self.engine),
            timers: Arc::clone(&timers),
        });
        if let Err(e) = self.source.subscribe(sink) {
            tracing::warn!("Failed to subscribe to input source: {}", e);
            self.engine.lock().stop();
            return Err(e);
        }

        self.timers = Some(timers);
        self.flush_task = Some(spawn_flush_loop(
            &runtime,
            Arc::clone(&self.engine),
            Arc::clone(&self.writer),
            flush_interval,
        ));
        if let Err(e) = self.flush() {
            tracing::warn!("Initial metadata flush failed: {}", e);
        }

        let path_string = path.to_string_lossy().to_string();
        if !self.output_files.contains(&path_string) {
            self.output_files.push(path_string);
        }
        tracing::info!("Input tracking started (metadata={:?})", path);
        Ok(())
    }

    /// Freeze the clock and close open gestures. Returns false if not collecting.
    pub fn pause_collection(&mut self) -> bool {
        self.engine.lock().pause()
    }

    /// Unfreeze the clock. Returns false if not paused.
    pub fn resume_collection(&mut self) -> bool {
        let Some(rearmed) = self.engine.lock().resume() else {
            return false;
        };
        if let Some(timers) = &self.timers {
            for arm in rearmed {
                timers.schedule(arm);
            }
        }
        true
    }

    /// Close open gestures, drop timers, unsubscribe and write the final document.
    ///
    /// Stopping an already stopped channel is a no-op.
    pub async fn stop_collection(&mut self) -> RecordingResult<()> {
        if let Some(task) = self.flush_task.take() {
            task.abort();
            // Wait out a flush that may be mid-write
            let _ = task.await;
        }

        let _writing = self.writer.lock();
        let Some(outcome) = self.engine.lock().stop() else {
            return Ok(());
        };
        if let Some(timers) = self.timers.take() {
            timers.cancel_all();
        }
        self.source.unsubscribe();

        if let Some(pending) = outcome.flush? {
            pending.write()?;
        }
        tracing::info!(
            "Input tracking stopped (duration={:.3}s, events={}, timers cancelled={})",
            outcome.duration_ms as f64 / 1000.0,
            self.engine.lock().events().len(),
            outcome.cancelled_timers.len()
        );
        Ok(())
    }

    /// Render and write the metadata document now.
    pub fn flush(&self) -> RecordingResult<()> {
        if let Some(path) = flush_serialized(&self.engine, &self.writer)? {
            tracing::debug!("Metadata flushed to {:?}", path);
        }
        Ok(())
    }

    /// Log a caller-labeled record and flush immediately.
    ///
    /// Returns the record id, or `None` when not collecting. A failed flush is returned as an
    /// error; the record stays in the log for the next flush.
    pub fn add_custom_event(
        &self,
        kind: &str,
        data: Map<String, Value>,
    ) -> RecordingResult<Option<String>> {
        let id = self.engine.lock().add_custom_event(kind, data);
        if id.is_some() {
            self.flush()?;
        }
        Ok(id)
    }

    pub fn clear_events(&self) -> RecordingResult<()> {
        self.engine.lock().clear_events();
        self.flush()
    }

    pub fn state(&self) -> SessionState {
        self.engine.lock().state()
    }

    pub fn is_collecting(&self) -> bool {
        self.engine.lock().is_collecting()
    }

    pub fn is_paused(&self) -> bool {
        self.engine.lock().is_paused()
    }

    /// Pause-adjusted recording time in seconds.
    pub fn recording_duration(&self) -> f64 {
        self.engine.lock().recording_duration()
    }

    pub fn total_pause_ms(&self) -> u64 {
        self.engine.lock().total_pause_ms()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.engine.lock().pressed_keys()
    }

    pub fn key_press_times(&self) -> HashMap<String, u64> {
        self.engine.lock().key_press_times()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.engine.lock().events().to_vec()
    }

    pub fn recording_start(&self) -> Option<String> {
        self.engine.lock().recording_start().map(str::to_string)
    }

    pub fn metadata_file(&self) -> Option<PathBuf> {
        self.engine.lock().metadata_file().map(|p| p.to_path_buf())
    }
}

impl Drop for InputTrackingChannel {
    fn drop(&mut self) {
        if let Some(task) = self.flush_task.take() {
            task.abort();
        }
        if let Some(timers) = self.timers.take() {
            timers.cancel_all();
            self.source.unsubscribe();
        }
    }
}

#[async_trait]
impl RecordingChannel for InputTrackingChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Input
    }

    async fn initialize(
        &mut self,
        config: &RecordingConfig,
        session_index: usize,
    ) -> RecordingResult<()> {
        if !self
            .engine
            .lock()
            .reconfigure(config.telemetry.clone().normalize())
        {
            return Err(RecordingError::AlreadyRecording);
        }
        self.session_index = session_index;
        self.metadata_path = Some(config.metadata_path(session_index));

        tracing::info!(
            "Input tracking channel initialized (session={}, metadata={:?})",
            self.session_index,
            self.metadata_path
        );
        Ok(())
    }

    async fn start(&mut self) -> RecordingResult<()> {
        let path = self.metadata_path.clone().ok_or_else(|| {
            RecordingError::ConfigurationError("Output directory not set".to_string())
        })?;
        self.start_collection(path)
    }

    async fn stop(&mut self) -> RecordingResult<()> {
        self.stop_collection().await
    }

    async fn pause(&mut self) -> RecordingResult<()> {
        self.pause_collection();
        Ok(())
    }

    async fn resume(&mut self) -> RecordingResult<()> {
        self.resume_collection();
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_collecting()
    }

    fn output_files(&self) -> Vec<String> {
        self.output_files.clone()
    }
}
