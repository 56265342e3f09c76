//! Interaction telemetry engine
//!
//! Owns all classification state of one session: clock, pressed keys, the three gesture
//! classifiers, long-press bookkeeping and the event log. Every transition takes `&mut self`,
//! so wrapping the engine in a single mutex serializes keyboard, pointer, timer and flush
//! producers. Timers and file writes are not performed here; methods return what the caller
//! must schedule or write.

use crate::capture::input::keymap::{self, KeyIdentity};
use crate::capture::input::types::{MouseButton, RawInputEvent, RawKey};
use crate::recorder::channel::RecordingResult;
use crate::telemetry::clock::{SessionClock, SystemTimeSource, TimeSource};
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::event_log::{EventLog, PendingFlush};
use crate::telemetry::hotkey;
use crate::telemetry::keys::PressedKeys;
use crate::telemetry::long_press::{LongPressArm, LongPressFire, LongPressTimers};
use crate::telemetry::pointer::PointerClassifier;
use crate::telemetry::record::{EventKind, EventRecord, InputEndReason, ScreenSize};
use crate::telemetry::scroll::ScrollClassifier;
use crate::telemetry::text_input::{InputAggregator, TypedKey};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Fields every record already carries; custom payloads cannot override them.
const RESERVED_FIELDS: [&str; 3] = ["id", "type", "time"];

/// Collection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Stopped,
    Collecting,
    Paused,
}

/// Timer work the caller must carry out after an input event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InputEffects {
    /// A long-press check to schedule.
    pub armed: Option<LongPressArm>,
    /// Token of a long-press check that no longer matters.
    pub cancelled: Option<u64>,
}

/// Result of stopping a session.
#[derive(Debug)]
pub struct StopOutcome {
    pub cancelled_timers: Vec<u64>,
    pub duration_ms: u64,
    pub flush: RecordingResult<Option<PendingFlush>>,
}

pub struct TelemetryEngine {
    config: TelemetryConfig,
    state: SessionState,
    clock: SessionClock,
    pressed: PressedKeys,
    pointer: PointerClassifier,
    scroll: ScrollClassifier,
    input: InputAggregator,
    long_press: LongPressTimers,
    log: EventLog,
    last_position: (f64, f64),
    metadata_file: Option<PathBuf>,
    recording_start: Option<String>,
    final_duration_ms: u64,
}

impl TelemetryEngine {
    pub fn new(config: TelemetryConfig, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            pointer: PointerClassifier::new(
                config.drag_threshold_px,
                config.double_click_window_ms,
            ),
            scroll: ScrollClassifier::new(config.scroll_coalesce_ms),
            input: InputAggregator::new(config.input_chain_window_ms),
            config,
            state: SessionState::Stopped,
            clock: SessionClock::new(time_source),
            pressed: PressedKeys::new(),
            long_press: LongPressTimers::new(),
            log: EventLog::new(),
            last_position: (0.0, 0.0),
            metadata_file: None,
            recording_start: None,
            final_duration_ms: 0,
        }
    }

    pub fn with_system_clock(config: TelemetryConfig) -> Self {
        Self::new(config, Arc::new(SystemTimeSource::new()))
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Replace the thresholds. Only possible between sessions.
    pub fn reconfigure(&mut self, config: TelemetryConfig) -> bool {
        if self.state != SessionState::Stopped {
            return false;
        }
        self.pointer =
            PointerClassifier::new(config.drag_threshold_px, config.double_click_window_ms);
        self.scroll = ScrollClassifier::new(config.scroll_coalesce_ms);
        self.input = InputAggregator::new(config.input_chain_window_ms);
        self.config = config;
        true
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Begin a new session. Returns false if one is already running.
    pub fn start(&mut self, metadata_file: Option<PathBuf>) -> bool {
        if self.state != SessionState::Stopped {
            return false;
        }

        self.pointer.clear();
        self.scroll.clear();
        self.input.clear();
        self.pressed.clear();
        self.long_press.cancel_all();
        self.log.clear();
        self.final_duration_ms = 0;

        self.clock.start();
        self.recording_start = Some(chrono::Utc::now().to_rfc3339());
        self.metadata_file = metadata_file;
        self.state = SessionState::Collecting;

        tracing::info!(
            "Telemetry collection started (metadata: {:?})",
            self.metadata_file
        );
        true
    }

    /// Freeze the clock after closing every open gesture at the current time.
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Collecting {
            return false;
        }
        let now = self.clock.elapsed_ms();
        self.close_gestures(now, InputEndReason::Pause);
        self.log.seal();
        self.clock.pause();
        self.state = SessionState::Paused;
        tracing::info!("Telemetry paused at {:.3}s", self.clock.elapsed());
        true
    }

    /// Unfreeze the clock. Returns the long-press checks that went dormant during the pause,
    /// re-armed for their remaining time, or `None` if the session was not paused.
    pub fn resume(&mut self) -> Option<Vec<LongPressArm>> {
        if self.state != SessionState::Paused {
            return None;
        }
        self.clock.resume();
        self.state = SessionState::Collecting;

        let now = self.clock.elapsed_ms();
        let threshold = self.config.long_press_threshold_ms;
        let mut rearmed = Vec::new();
        for (code, token) in self.long_press.wake_dormant() {
            match self.pressed.pressed_at(&code) {
                Some(pressed_at) => {
                    let held_for = now.saturating_sub(pressed_at);
                    rearmed.push(LongPressArm {
                        code,
                        token,
                        delay: Duration::from_millis(threshold.saturating_sub(held_for)),
                    });
                }
                None => {
                    self.long_press.cancel(&code);
                }
            }
        }
        tracing::info!(
            "Telemetry resumed at {:.3}s (paused {}ms total)",
            self.clock.elapsed(),
            self.clock.total_pause_ms()
        );
        Some(rearmed)
    }

    /// End the session: close open gestures, drop all timers, render the final document.
    pub fn stop(&mut self) -> Option<StopOutcome> {
        if self.state == SessionState::Stopped {
            return None;
        }
        if self.state == SessionState::Paused {
            self.clock.resume();
            self.state = SessionState::Collecting;
        }

        let now = self.clock.elapsed_ms();
        self.close_gestures(now, InputEndReason::Stop);
        self.log.seal();
        let cancelled_timers = self.long_press.cancel_all();
        self.final_duration_ms = now;
        self.state = SessionState::Stopped;
        self.clock.reset();
        self.pressed.clear();

        let flush = self.prepare_flush();
        tracing::info!(
            "Telemetry collection stopped after {:.3}s with {} events",
            now as f64 / 1000.0,
            self.log.len()
        );
        Some(StopOutcome {
            cancelled_timers,
            duration_ms: now,
            flush,
        })
    }

    fn close_gestures(&mut self, now: u64, reason: InputEndReason) {
        let (x, y) = self.last_position;
        if self.pointer.is_open() {
            self.pointer.release(x, y, now, &mut self.log);
        }
        self.scroll.close_if_expired(now, &mut self.log);
        self.scroll.force_close(x, y, now, &mut self.log);
        self.input
            .finish(reason, now, self.pressed.shift_held(), &mut self.log);
    }

    // ------------------------------------------------------------------
    // Raw input
    // ------------------------------------------------------------------

    pub fn handle(&mut self, event: RawInputEvent) -> InputEffects {
        match event {
            RawInputEvent::KeyDown { key } => self.key_down(&key),
            RawInputEvent::KeyUp { key } => self.key_up(&key),
            RawInputEvent::ButtonDown { x, y, button } => {
                self.button_down(x, y, button);
                InputEffects::default()
            }
            RawInputEvent::ButtonUp { x, y, button } => {
                self.button_up(x, y, button);
                InputEffects::default()
            }
            RawInputEvent::Scroll { x, y, dx, dy } => {
                self.scroll(x, y, dx, dy);
                InputEffects::default()
            }
            RawInputEvent::Move { x, y } => {
                self.pointer_moved(x, y);
                InputEffects::default()
            }
        }
    }

    pub fn key_down(&mut self, raw: &RawKey) -> InputEffects {
        let mut effects = InputEffects::default();
        if self.state != SessionState::Collecting {
            return effects;
        }
        let identity = keymap::normalize(raw);
        let now = self.clock.elapsed_ms();
        self.close_expired(now);

        if !self.pressed.press(identity.clone(), now) {
            return effects;
        }
        effects.armed = Some(
            self.long_press
                .arm(&identity.code, self.config.long_press_threshold()),
        );

        let shifted = self.pressed.shift_held();
        let hotkey = hotkey::detect(&self.pressed, &identity);

        if self.input.is_open() {
            match InputEndReason::terminator(&identity.code) {
                Some(reason) => {
                    self.input.finish(reason, now, shifted, &mut self.log);
                }
                None => {
                    if let Some(name) = hotkey {
                        self.push_hotkey(name, now);
                    }
                    self.input.append(TypedKey { identity, shifted });
                    return effects;
                }
            }
        }

        if let Some(name) = hotkey {
            self.push_hotkey(name, now);
            self.input.clear_candidate();
            return effects;
        }

        let typed = TypedKey { identity, shifted };
        if self.input.try_open(&typed, now, &mut self.log) {
            return effects;
        }

        let TypedKey { identity, shifted } = typed;
        let text_key = !keymap::is_non_text_key(&identity.code);
        let record = self.log.push(EventRecord::new(
            now,
            EventKind::KeyPress {
                key: identity.key,
                code: identity.code,
                key_code: identity.key_code,
            },
        ));
        let record_id = record.id.clone();
        if text_key {
            self.input.set_candidate(&record_id, shifted);
        } else {
            self.input.clear_candidate();
        }
        effects
    }

    /// Releases are honored while paused so keys let go during a pause do not stay held.
    pub fn key_up(&mut self, raw: &RawKey) -> InputEffects {
        let mut effects = InputEffects::default();
        if self.state == SessionState::Stopped {
            return effects;
        }
        let identity = keymap::normalize(raw);
        if self.state == SessionState::Collecting {
            let now = self.clock.elapsed_ms();
            self.close_expired(now);
        }
        if self.pressed.release(&identity.code).is_none() {
            tracing::debug!("Release of {} without a recorded press", identity.code);
        }
        effects.cancelled = self.long_press.cancel(&identity.code);
        effects
    }

    pub fn button_down(&mut self, x: f64, y: f64, button: MouseButton) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.last_position = (x, y);
        if self.state != SessionState::Collecting {
            return;
        }
        let now = self.clock.elapsed_ms();
        self.close_expired(now);
        self.input.finish(
            InputEndReason::Click,
            now,
            self.pressed.shift_held(),
            &mut self.log,
        );

        match button {
            MouseButton::Left => {
                let held = self.pressed.snapshot();
                self.pointer.press(x, y, now, held, &mut self.log);
            }
            MouseButton::Right => {
                let held = self.pressed.snapshot();
                self.pointer.right_click(x, y, now, held, &mut self.log);
            }
            MouseButton::Middle | MouseButton::Other => {}
        }
    }

    pub fn button_up(&mut self, x: f64, y: f64, button: MouseButton) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.last_position = (x, y);
        if self.state != SessionState::Collecting || button != MouseButton::Left {
            return;
        }
        let now = self.clock.elapsed_ms();
        self.close_expired(now);
        if !self.pointer.release(x, y, now, &mut self.log) {
            tracing::debug!("Left button released without a recorded press");
        }
    }

    /// Wheel notification. Only the vertical delta carries ticks.
    pub fn scroll(&mut self, x: f64, y: f64, _dx: f64, dy: f64) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.last_position = (x, y);
        if self.state != SessionState::Collecting {
            return;
        }
        let now = self.clock.elapsed_ms();
        self.input.finish(
            InputEndReason::Scroll,
            now,
            self.pressed.shift_held(),
            &mut self.log,
        );
        let held = self.pressed.snapshot();
        self.scroll.tick(x, y, dy, now, held, &mut self.log);
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.last_position = (x, y);
        if self.state == SessionState::Collecting {
            let now = self.clock.elapsed_ms();
            self.close_expired(now);
        }
    }

    /// A scheduled long-press check came due.
    pub fn fire_long_press(&mut self, code: &str, token: u64) -> LongPressFire {
        if !self.long_press.is_current(code, token) {
            return LongPressFire::Stale;
        }
        match self.state {
            SessionState::Stopped => {
                self.long_press.cancel(code);
                return LongPressFire::Stale;
            }
            SessionState::Paused => {
                self.long_press.mark_dormant(code);
                return LongPressFire::Dormant;
            }
            SessionState::Collecting => {}
        }

        let Some(pressed_at) = self.pressed.pressed_at(code) else {
            self.long_press.cancel(code);
            return LongPressFire::Stale;
        };
        let now = self.clock.elapsed_ms();
        let held_for = now.saturating_sub(pressed_at);
        let threshold = self.config.long_press_threshold_ms;
        if held_for < threshold {
            return LongPressFire::Rearm(LongPressArm {
                code: code.to_string(),
                token,
                delay: Duration::from_millis(threshold - held_for),
            });
        }

        let identity = self
            .pressed
            .identity(code)
            .cloned()
            .unwrap_or_else(|| KeyIdentity::from_code(code));
        self.log.push(EventRecord::new(
            pressed_at,
            EventKind::KeyLongPress {
                duration_ms: held_for,
                key: identity.key,
                code: identity.code,
                key_code: identity.key_code,
            },
        ));
        self.long_press.cancel(code);
        LongPressFire::Emitted
    }

    fn push_hotkey(&mut self, name: String, now: u64) {
        let held: Vec<&KeyIdentity> = self.pressed.identities().collect();
        let kind = EventKind::Hotkey {
            hotkey: name,
            keys: held.iter().map(|k| k.key.clone()).collect(),
            codes: held.iter().map(|k| k.code.clone()).collect(),
            key_codes: held.iter().map(|k| k.key_code).collect(),
        };
        self.log.push(EventRecord::new(now, kind));
    }

    /// Close a scroll burst whose coalescing window lapsed with no further ticks.
    pub fn close_expired(&mut self, now: u64) {
        self.scroll.close_if_expired(now, &mut self.log);
    }

    // ------------------------------------------------------------------
    // Log access
    // ------------------------------------------------------------------

    /// Append a caller-labeled record at the current elapsed time.
    pub fn add_custom_event(&mut self, kind: &str, mut data: Map<String, Value>) -> Option<String> {
        if self.state == SessionState::Stopped {
            return None;
        }
        for field in RESERVED_FIELDS {
            data.remove(field);
        }
        let now = self.clock.elapsed_ms();
        let id = self
            .log
            .push(EventRecord::new(
                now,
                EventKind::Custom {
                    kind: kind.to_string(),
                    data,
                },
            ))
            .id
            .clone();
        self.log.seal();
        self.input.clear_candidate();
        Some(id)
    }

    pub fn clear_events(&mut self) {
        self.log.clear();
        self.input.clear_candidate();
        tracing::info!("Telemetry events cleared");
    }

    /// Render the metadata document for writing, if the session has a metadata file.
    pub fn prepare_flush(&mut self) -> RecordingResult<Option<PendingFlush>> {
        if self.state == SessionState::Collecting {
            let now = self.clock.elapsed_ms();
            self.close_expired(now);
        }
        let Some(path) = self.metadata_file.clone() else {
            return Ok(None);
        };
        let screen = ScreenSize {
            width: self.config.screen_width,
            height: self.config.screen_height,
        };
        let bytes = self.log.render(
            self.recording_start.as_deref(),
            self.recording_duration_ms(),
            screen,
            self.config.fps,
        )?;
        Ok(Some(PendingFlush { path, bytes }))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True from start until stop, paused or not.
    pub fn is_collecting(&self) -> bool {
        self.state != SessionState::Stopped
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// Pause-adjusted elapsed time; the final duration once stopped.
    pub fn recording_duration_ms(&self) -> u64 {
        match self.state {
            SessionState::Stopped => self.final_duration_ms,
            _ => self.clock.elapsed_ms(),
        }
    }

    pub fn recording_duration(&self) -> f64 {
        self.recording_duration_ms() as f64 / 1000.0
    }

    pub fn total_pause_ms(&self) -> u64 {
        self.clock.total_pause_ms()
    }

    pub fn events(&self) -> &[EventRecord] {
        self.log.records()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.pressed.codes()
    }

    pub fn key_press_times(&self) -> HashMap<String, u64> {
        self.pressed.press_times()
    }

    pub fn recording_start(&self) -> Option<&str> {
        self.recording_start.as_deref()
    }

    pub fn metadata_file(&self) -> Option<&Path> {
        self.metadata_file.as_deref()
    }

    pub fn pending_long_presses(&self) -> usize {
        self.long_press.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::clock::ManualTimeSource;
    use crate::telemetry::record::ScrollDirection;
    use serde_json::json;

    fn engine() -> (ManualTimeSource, TelemetryEngine) {
        let time = ManualTimeSource::new();
        let mut engine = TelemetryEngine::new(TelemetryConfig::default(), Arc::new(time.clone()));
        assert!(engine.start(None));
        (time, engine)
    }

    fn ch(c: char) -> RawKey {
        RawKey::Char { ch: c, vk: None }
    }

    fn named(name: &str) -> RawKey {
        RawKey::Named(name.to_string())
    }

    fn tap(engine: &mut TelemetryEngine, time: &ManualTimeSource, key: RawKey) {
        engine.key_down(&key);
        time.advance_ms(30);
        engine.key_up(&key);
    }

    fn types(engine: &TelemetryEngine) -> Vec<String> {
        engine.events().iter().map(|r| r.type_name().to_string()).collect()
    }

    fn input_value(record: &EventRecord) -> (&str, &str, usize) {
        match &record.kind {
            EventKind::Input {
                value,
                reason,
                length,
                ..
            } => (value.as_str(), reason.as_str(), *length),
            other => panic!("expected input record, got {:?}", other),
        }
    }

    #[test]
    fn test_two_quick_letters_become_one_input_run() {
        let (time, mut engine) = engine();
        time.advance_ms(100);
        engine.key_down(&ch('a'));
        time.advance_ms(200);
        engine.key_down(&ch('b'));
        time.advance_ms(50);
        engine.key_up(&ch('a'));
        engine.key_up(&ch('b'));
        time.advance_ms(100);
        engine.stop().expect("session was running");

        assert_eq!(engine.events().len(), 1, "exactly one input record");
        let record = &engine.events()[0];
        assert_eq!(input_value(record), ("ab", "Stop", 2));
        assert_eq!(record.time_ms, 100, "run is backdated to its first key");
        match &record.kind {
            EventKind::Input { codes, .. } => {
                assert_eq!(codes, &vec!["KeyA".to_string(), "KeyB".to_string()])
            }
            _ => unreachable!(),
        }
        assert!(engine.pressed_keys().is_empty());
    }

    #[test]
    fn test_single_key_is_a_keypress() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('x'));
        assert_eq!(types(&engine), vec!["keyPress"]);
        match &engine.events()[0].kind {
            EventKind::KeyPress { key, code, key_code } => {
                assert_eq!((key.as_str(), code.as_str(), *key_code), ("X", "KeyX", 88));
            }
            other => panic!("expected keyPress, got {:?}", other),
        }
    }

    #[test]
    fn test_auto_repeat_is_not_recorded_twice() {
        let (time, mut engine) = engine();
        engine.key_down(&ch('a'));
        time.advance_ms(40);
        let repeat = engine.key_down(&ch('a'));
        assert_eq!(repeat, InputEffects::default(), "repeat arms nothing");
        assert_eq!(engine.events().len(), 1);
        assert_eq!(engine.key_press_times().get("KeyA"), Some(&0));
    }

    #[test]
    fn test_enter_terminates_run_and_is_logged() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('o'));
        tap(&mut engine, &time, ch('k'));
        tap(&mut engine, &time, named("backspace"));
        tap(&mut engine, &time, named("enter"));

        assert_eq!(types(&engine), vec!["input", "keyPress"]);
        assert_eq!(input_value(&engine.events()[0]), ("o", "Enter", 3));
    }

    #[test]
    fn test_shift_only_on_first_letter_gives_hi() {
        let (time, mut engine) = engine();
        engine.key_down(&named("shift"));
        time.advance_ms(50);
        engine.key_down(&ch('H'));
        time.advance_ms(50);
        engine.key_up(&ch('H'));
        engine.key_up(&named("shift"));
        time.advance_ms(100);
        tap(&mut engine, &time, ch('i'));
        tap(&mut engine, &time, named("tab"));

        assert_eq!(types(&engine), vec!["keyPress", "input", "keyPress"]);
        assert_eq!(input_value(&engine.events()[1]), ("Hi", "Tab", 2));
    }

    #[test]
    fn test_ctrl_c_is_a_hotkey() {
        let (time, mut engine) = engine();
        engine.key_down(&named("ctrl"));
        time.advance_ms(50);
        engine.key_down(&ch('\u{3}'));
        assert_eq!(types(&engine), vec!["keyPress", "hotkey"]);
        match &engine.events()[1].kind {
            EventKind::Hotkey { hotkey, codes, .. } => {
                assert_eq!(hotkey, "Ctrl+C");
                assert_eq!(codes, &vec!["ControlLeft".to_string(), "KeyC".to_string()]);
            }
            other => panic!("expected hotkey, got {:?}", other),
        }
    }

    #[test]
    fn test_ctrl_shift_z_is_a_hotkey() {
        let (time, mut engine) = engine();
        engine.key_down(&named("ctrl"));
        time.advance_ms(20);
        engine.key_down(&named("shift"));
        time.advance_ms(20);
        engine.key_down(&ch('Z'));
        match &engine.events().last().expect("hotkey").kind {
            EventKind::Hotkey { hotkey, .. } => assert_eq!(hotkey, "Ctrl+Shift+Z"),
            other => panic!("expected hotkey, got {:?}", other),
        }
    }

    #[test]
    fn test_hotkey_inside_run_is_logged_and_kept_in_run() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('a'));
        tap(&mut engine, &time, ch('b'));
        engine.key_down(&named("ctrl"));
        time.advance_ms(20);
        engine.key_down(&ch('\u{1}'));
        time.advance_ms(20);
        engine.key_up(&ch('\u{1}'));
        engine.key_up(&named("ctrl"));
        engine.stop();

        assert_eq!(types(&engine), vec!["hotkey", "input"]);
        let (value, _, length) = input_value(&engine.events()[1]);
        assert_eq!(length, 4, "modifier and letter are appended to the run");
        assert_eq!(value, "aba");
    }

    #[test]
    fn test_click_and_double_click() {
        let (time, mut engine) = engine();
        engine.button_down(10.0, 10.0, MouseButton::Left);
        time.advance_ms(60);
        engine.button_up(10.0, 10.0, MouseButton::Left);
        assert_eq!(types(&engine), vec!["leftClick"]);

        time.advance_ms(120);
        engine.button_down(11.0, 10.0, MouseButton::Left);
        time.advance_ms(60);
        engine.button_up(11.0, 10.0, MouseButton::Left);
        assert_eq!(types(&engine), vec!["doubleClick"]);
    }

    #[test]
    fn test_drag_duration_matches_endpoints() {
        let (time, mut engine) = engine();
        time.advance_ms(1_000);
        engine.button_down(100.0, 100.0, MouseButton::Left);
        time.advance_ms(400);
        engine.button_up(180.0, 140.0, MouseButton::Left);
        let record = engine.events().last().expect("drag");
        assert_eq!(record.time_ms, 1_000, "drag time is the press time");
        match &record.kind {
            EventKind::Drag {
                start, end, duration_ms, ..
            } => assert_eq!(*duration_ms, end.time - start.time),
            other => panic!("expected drag, got {:?}", other),
        }
    }

    #[test]
    fn test_right_click_is_immediate_with_held_keys() {
        let (time, mut engine) = engine();
        engine.key_down(&named("shift"));
        time.advance_ms(10);
        engine.button_down(5.0, 6.0, MouseButton::Right);
        let value = serde_json::to_value(engine.events().last().expect("right click"))
            .expect("serialize");
        assert_eq!(value["type"], "rightClick");
        assert_eq!(value["codes"], json!(["ShiftLeft"]));
        engine.button_down(5.0, 6.0, MouseButton::Middle);
        assert_eq!(engine.events().len(), 2, "middle button is not recorded");
    }

    #[test]
    fn test_click_and_scroll_terminate_runs() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('a'));
        tap(&mut engine, &time, ch('b'));
        engine.button_down(0.0, 0.0, MouseButton::Left);
        engine.button_up(0.0, 0.0, MouseButton::Left);
        assert_eq!(types(&engine), vec!["input", "leftClick"]);
        assert_eq!(input_value(&engine.events()[0]).1, "Click");

        time.advance_ms(600);
        tap(&mut engine, &time, ch('c'));
        tap(&mut engine, &time, ch('d'));
        engine.scroll(0.0, 0.0, 0.0, 0.0);
        assert_eq!(input_value(&engine.events()[2]).1, "Scroll");
    }

    #[test]
    fn test_scroll_burst_is_closed_by_a_later_event() {
        let (time, mut engine) = engine();
        for _ in 0..3 {
            engine.scroll(50.0, 50.0, 0.0, 1.0);
            time.advance_ms(100);
        }
        assert!(engine.events().is_empty());
        time.advance_ms(1_000);
        engine.pointer_moved(60.0, 60.0);
        match &engine.events()[0].kind {
            EventKind::Scroll {
                scroll_amount,
                direction,
                ..
            } => {
                assert_eq!(*scroll_amount, 3);
                assert_eq!(*direction, ScrollDirection::Up);
            }
            other => panic!("expected scroll, got {:?}", other),
        }
    }

    #[test]
    fn test_pause_force_closes_drag_and_resume_does_not_reopen() {
        let (time, mut engine) = engine();
        engine.button_down(0.0, 0.0, MouseButton::Left);
        time.advance_ms(100);
        engine.pointer_moved(40.0, 0.0);
        assert!(engine.pause());
        assert_eq!(types(&engine), vec!["drag"]);

        time.advance_ms(5_000);
        engine.button_up(40.0, 0.0, MouseButton::Left);
        assert!(engine.resume().is_some());
        engine.button_up(40.0, 0.0, MouseButton::Left);
        assert_eq!(engine.events().len(), 1, "closed gesture stays closed");
    }

    #[test]
    fn test_pause_force_closes_scroll_and_input() {
        let (time, mut engine) = engine();
        engine.scroll(0.0, 0.0, 0.0, -2.0);
        time.advance_ms(50);
        assert!(engine.pause());
        assert_eq!(types(&engine), vec!["scroll"]);
        engine.resume();

        tap(&mut engine, &time, ch('a'));
        tap(&mut engine, &time, ch('b'));
        engine.pause();
        assert_eq!(types(&engine), vec!["scroll", "input"]);
        assert_eq!(input_value(&engine.events()[1]).1, "Pause");
    }

    #[test]
    fn test_pause_blocks_retraction_across_it() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('a'));
        engine.pause();
        engine.resume();
        tap(&mut engine, &time, ch('b'));
        assert_eq!(types(&engine), vec!["keyPress", "keyPress"]);
    }

    #[test]
    fn test_events_during_pause_are_ignored_but_releases_count() {
        let (time, mut engine) = engine();
        engine.key_down(&ch('a'));
        engine.pause();
        time.advance_ms(100);
        engine.key_down(&ch('b'));
        let effects = engine.key_up(&ch('a'));
        assert!(effects.cancelled.is_some(), "release cancels the long-press check");
        assert!(engine.pressed_keys().is_empty());
        assert_eq!(engine.events().len(), 1);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let time = ManualTimeSource::new();
        let mut engine = TelemetryEngine::new(TelemetryConfig::default(), Arc::new(time));
        assert!(!engine.pause());
        assert!(engine.resume().is_none());
        assert!(engine.stop().is_none());
        assert!(engine.start(None));
        assert!(!engine.start(None));
        assert!(engine.resume().is_none());
        assert!(engine.pause());
        assert!(!engine.pause());
    }

    #[test]
    fn test_duration_excludes_pauses() {
        let (time, mut engine) = engine();
        time.advance_ms(1_000);
        engine.pause();
        time.advance_ms(10_000);
        assert_eq!(engine.recording_duration_ms(), 1_000);
        engine.resume();
        time.advance_ms(500);
        engine.pause();
        time.advance_ms(2_000);
        let outcome = engine.stop().expect("stop");
        assert_eq!(outcome.duration_ms, 1_500);
        assert_eq!(engine.recording_duration(), 1.5);
        assert!(!engine.is_collecting());
    }

    #[test]
    fn test_long_press_emits_once_when_held() {
        let (time, mut engine) = engine();
        time.advance_ms(200);
        let arm = engine.key_down(&ch('a')).armed.expect("armed");
        assert_eq!(arm.delay, Duration::from_millis(500));
        time.advance_ms(500);
        assert_eq!(engine.fire_long_press(&arm.code, arm.token), LongPressFire::Emitted);
        assert_eq!(engine.fire_long_press(&arm.code, arm.token), LongPressFire::Stale);

        let record = engine.events().last().expect("long press");
        assert_eq!(record.time_ms, 200);
        match &record.kind {
            EventKind::KeyLongPress { duration_ms, code, .. } => {
                assert_eq!(*duration_ms, 500);
                assert_eq!(code, "KeyA");
            }
            other => panic!("expected keyLongPress, got {:?}", other),
        }
    }

    #[test]
    fn test_release_wins_over_long_press() {
        let (time, mut engine) = engine();
        let arm = engine.key_down(&ch('a')).armed.expect("armed");
        time.advance_ms(100);
        let effects = engine.key_up(&ch('a'));
        assert_eq!(effects.cancelled, Some(arm.token));
        time.advance_ms(400);
        assert_eq!(engine.fire_long_press(&arm.code, arm.token), LongPressFire::Stale);
        assert_eq!(types(&engine), vec!["keyPress"]);
    }

    #[test]
    fn test_long_press_waits_out_a_pause() {
        let (time, mut engine) = engine();
        let arm = engine.key_down(&named("shift")).armed.expect("armed");
        time.advance_ms(300);
        engine.pause();
        time.advance_ms(200);
        assert_eq!(engine.fire_long_press(&arm.code, arm.token), LongPressFire::Dormant);

        time.advance_ms(1_000);
        let rearmed = engine.resume().expect("was paused");
        assert_eq!(rearmed.len(), 1);
        assert_eq!(rearmed[0].token, arm.token);
        assert_eq!(rearmed[0].delay, Duration::from_millis(200));

        time.advance_ms(200);
        assert_eq!(engine.fire_long_press(&arm.code, arm.token), LongPressFire::Emitted);
    }

    #[test]
    fn test_early_fire_is_rearmed_for_the_remainder() {
        let (time, mut engine) = engine();
        let arm = engine.key_down(&ch('q')).armed.expect("armed");
        time.advance_ms(350);
        match engine.fire_long_press(&arm.code, arm.token) {
            LongPressFire::Rearm(next) => assert_eq!(next.delay, Duration::from_millis(150)),
            other => panic!("expected rearm, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_event_strips_reserved_fields_and_seals() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('a'));
        let mut data = Map::new();
        data.insert("id".into(), json!("spoofed"));
        data.insert("time".into(), json!(99));
        data.insert("label".into(), json!("intro"));
        let id = engine.add_custom_event("chapter", data).expect("collecting");
        tap(&mut engine, &time, ch('b'));

        assert_eq!(types(&engine), vec!["keyPress", "chapter", "keyPress"]);
        let value = serde_json::to_value(&engine.events()[1]).expect("serialize");
        assert_eq!(value["id"], json!(id));
        assert_eq!(value["label"], "intro");
        assert_eq!(value["time"], 0.03);
    }

    #[test]
    fn test_flush_renders_document_with_header() {
        let time = ManualTimeSource::new();
        let config = TelemetryConfig {
            screen_width: 1280,
            screen_height: 720,
            fps: 60,
            ..TelemetryConfig::default()
        };
        let mut engine = TelemetryEngine::new(config, Arc::new(time.clone()));
        assert!(engine.prepare_flush().expect("render").is_none());
        engine.start(Some(PathBuf::from("session.json")));
        time.advance_ms(2_500);
        let pending = engine.prepare_flush().expect("render").expect("has path");
        let value: Value = serde_json::from_slice(&pending.bytes).expect("parse");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["recordingDuration"], 2.5);
        assert_eq!(value["screen"], json!({"width": 1280, "height": 720}));
        assert_eq!(value["fps"], 60);
        assert!(value["recordingStart"].is_string());
        assert_eq!(value["events"], json!([]));
    }

    #[test]
    fn test_restart_resets_state() {
        let (time, mut engine) = engine();
        tap(&mut engine, &time, ch('a'));
        engine.key_down(&ch('z'));
        engine.stop();
        assert!(engine.start(None));
        assert!(engine.events().is_empty());
        assert!(engine.pressed_keys().is_empty());
        assert_eq!(engine.recording_duration_ms(), 0);
        assert_eq!(engine.pending_long_presses(), 0);
    }

    #[test]
    fn test_reconfigure_takes_effect_next_session() {
        let (_time, mut engine) = engine();
        let wide = TelemetryConfig {
            drag_threshold_px: 50.0,
            ..TelemetryConfig::default()
        };
        assert!(
            !engine.reconfigure(wide.clone()),
            "thresholds are fixed while collecting"
        );
        engine.stop();
        assert!(engine.reconfigure(wide));
        assert!(engine.start(None));

        engine.button_down(0.0, 0.0, MouseButton::Left);
        engine.button_up(20.0, 0.0, MouseButton::Left);
        assert_eq!(types(&engine), vec!["leftClick"], "20px is under the new drag threshold");
    }
}
