//! Raw input source contract
//!
//! Platform hooks (or a replay, or a test) deliver low-level notifications to one subscribed
//! `InputSink`. The telemetry channel subscribes on start and unsubscribes on stop.

use crate::capture::input::types::{MouseButton, RawInputEvent, RawKey};
use crate::recorder::channel::{RecordingError, RecordingResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Receiver of raw input callbacks. Callbacks may arrive from any thread.
pub trait InputSink: Send + Sync {
    fn on_key_down(&self, key: RawKey);
    fn on_key_up(&self, key: RawKey);
    fn on_button_down(&self, x: f64, y: f64, button: MouseButton);
    fn on_button_up(&self, x: f64, y: f64, button: MouseButton);
    fn on_scroll(&self, x: f64, y: f64, dx: f64, dy: f64);

    /// Pointer position update; sources that cannot report moves may skip it.
    fn on_move(&self, _x: f64, _y: f64) {}

    fn dispatch(&self, event: RawInputEvent) {
        match event {
            RawInputEvent::KeyDown { key } => self.on_key_down(key),
            RawInputEvent::KeyUp { key } => self.on_key_up(key),
            RawInputEvent::ButtonDown { x, y, button } => self.on_button_down(x, y, button),
            RawInputEvent::ButtonUp { x, y, button } => self.on_button_up(x, y, button),
            RawInputEvent::Scroll { x, y, dx, dy } => self.on_scroll(x, y, dx, dy),
            RawInputEvent::Move { x, y } => self.on_move(x, y),
        }
    }
}

/// Producer of raw input notifications.
pub trait InputSource: Send + Sync {
    fn subscribe(&self, sink: Arc<dyn InputSink>) -> RecordingResult<()>;
    fn unsubscribe(&self);
}

/// In-process source: whoever holds it pushes events by hand.
#[derive(Default)]
pub struct InjectedInputSource {
    sink: RwLock<Option<Arc<dyn InputSink>>>,
}

impl InjectedInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one event. Returns false if nobody is subscribed.
    pub fn emit(&self, event: RawInputEvent) -> bool {
        let sink = self.sink.read().clone();
        match sink {
            Some(sink) => {
                sink.dispatch(event);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.read().is_some()
    }
}

impl InputSource for InjectedInputSource {
    fn subscribe(&self, sink: Arc<dyn InputSink>) -> RecordingResult<()> {
        let mut slot = self.sink.write();
        if slot.is_some() {
            return Err(RecordingError::InputSource(
                "Input source already has a subscriber".to_string(),
            ));
        }
        *slot = Some(sink);
        Ok(())
    }

    fn unsubscribe(&self) {
        self.sink.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl InputSink for Recorder {
        fn on_key_down(&self, key: RawKey) {
            self.seen.lock().push(format!("down {}", key));
        }
        fn on_key_up(&self, key: RawKey) {
            self.seen.lock().push(format!("up {}", key));
        }
        fn on_button_down(&self, x: f64, y: f64, _button: MouseButton) {
            self.seen.lock().push(format!("press {},{}", x, y));
        }
        fn on_button_up(&self, x: f64, y: f64, _button: MouseButton) {
            self.seen.lock().push(format!("release {},{}", x, y));
        }
        fn on_scroll(&self, _x: f64, _y: f64, _dx: f64, dy: f64) {
            self.seen.lock().push(format!("scroll {}", dy));
        }
    }

    #[test]
    fn test_emit_reaches_subscriber_only_while_subscribed() {
        let source = InjectedInputSource::new();
        let sink = Arc::new(Recorder::default());
        assert!(!source.emit(RawInputEvent::KeyDown {
            key: RawKey::Named("enter".into())
        }));

        source.subscribe(sink.clone()).expect("subscribe");
        assert!(source.emit(RawInputEvent::KeyDown {
            key: RawKey::Named("enter".into())
        }));
        assert!(source.emit(RawInputEvent::Scroll {
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy: -1.0
        }));
        assert!(source.emit(RawInputEvent::Move { x: 1.0, y: 1.0 }));

        source.unsubscribe();
        assert!(!source.is_subscribed());
        assert!(!source.emit(RawInputEvent::KeyUp {
            key: RawKey::Named("enter".into())
        }));
        assert_eq!(
            *sink.seen.lock(),
            vec!["down enter".to_string(), "scroll -1".to_string()]
        );
    }

    #[test]
    fn test_second_subscriber_is_rejected() {
        let source = InjectedInputSource::new();
        source.subscribe(Arc::new(Recorder::default())).expect("first");
        let err = source.subscribe(Arc::new(Recorder::default())).unwrap_err();
        assert!(matches!(err, RecordingError::InputSource(_)));
    }
}
