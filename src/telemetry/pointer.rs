//! Left-button gesture classification: click, double-click and drag.

use crate::telemetry::event_log::EventLog;
use crate::telemetry::record::{EventKind, EventRecord, HeldKeys, Point};

#[derive(Debug, Clone)]
struct PendingPress {
    x: f64,
    y: f64,
    time_ms: u64,
    held: HeldKeys,
}

#[derive(Debug)]
pub struct PointerClassifier {
    drag_threshold_px: f64,
    double_click_window_ms: u64,
    pending: Option<PendingPress>,
}

impl PointerClassifier {
    pub fn new(drag_threshold_px: f64, double_click_window_ms: u64) -> Self {
        Self {
            drag_threshold_px,
            double_click_window_ms,
            pending: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Left button went down. A press that is still open is resolved first at this position.
    pub fn press(&mut self, x: f64, y: f64, now_ms: u64, held: HeldKeys, log: &mut EventLog) {
        if self.pending.is_some() {
            tracing::debug!("Left button pressed twice without release; resolving previous press");
            self.release(x, y, now_ms, log);
        }
        self.pending = Some(PendingPress {
            x,
            y,
            time_ms: now_ms,
            held,
        });
    }

    /// Left button came up. Returns false when there was no matching press.
    pub fn release(&mut self, x: f64, y: f64, now_ms: u64, log: &mut EventLog) -> bool {
        let Some(press) = self.pending.take() else {
            return false;
        };

        let dx = (x - press.x).abs();
        let dy = (y - press.y).abs();
        if dx >= self.drag_threshold_px || dy >= self.drag_threshold_px {
            log.push(EventRecord::new(
                press.time_ms,
                EventKind::Drag {
                    start_time: press.time_ms,
                    end_time: now_ms,
                    x: press.x,
                    y: press.y,
                    start: Point {
                        x: press.x,
                        y: press.y,
                        time: press.time_ms,
                    },
                    end: Point { x, y, time: now_ms },
                    duration_ms: now_ms.saturating_sub(press.time_ms),
                    held: press.held,
                },
            ));
            return true;
        }

        let window = self.double_click_window_ms;
        let previous_click = log.retract_if(|record| {
            matches!(record.kind, EventKind::LeftClick { .. })
                && now_ms.saturating_sub(record.time_ms) < window
        });

        let record = if previous_click.is_some() {
            EventRecord::new(
                now_ms,
                EventKind::DoubleClick {
                    x: press.x,
                    y: press.y,
                    held: press.held,
                },
            )
        } else {
            EventRecord::new(
                press.time_ms,
                EventKind::LeftClick {
                    x: press.x,
                    y: press.y,
                    held: press.held,
                },
            )
        };
        log.push(record);
        true
    }

    /// Right button went down: logged immediately, no release tracking.
    pub fn right_click(&self, x: f64, y: f64, now_ms: u64, held: HeldKeys, log: &mut EventLog) {
        log.push(EventRecord::new(now_ms, EventKind::RightClick { x, y, held }));
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
