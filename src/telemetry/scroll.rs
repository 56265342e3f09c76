//! Wheel tick coalescing.
//!
//! Consecutive ticks in the same direction, each within the coalesce window of the one
//! before, form a single burst. A burst closes on a direction change, a gap longer than the
//! window (noticed by the next event or flush), or a pause/stop.

use crate::telemetry::event_log::EventLog;
use crate::telemetry::record::{EventKind, EventRecord, HeldKeys, Point, ScrollDirection};

#[derive(Debug, Clone)]
struct Burst {
    start: Point,
    last: Point,
    ticks: i64,
    held: HeldKeys,
}

#[derive(Debug)]
pub struct ScrollClassifier {
    coalesce_ms: u64,
    burst: Option<Burst>,
}

impl ScrollClassifier {
    pub fn new(coalesce_ms: u64) -> Self {
        Self {
            coalesce_ms,
            burst: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.burst.is_some()
    }

    /// Feed one wheel event. Vertical deltas of zero carry no tick and are dropped.
    pub fn tick(
        &mut self,
        x: f64,
        y: f64,
        dy: f64,
        now_ms: u64,
        held: HeldKeys,
        log: &mut EventLog,
    ) {
        let step: i64 = if dy > 0.0 {
            1
        } else if dy < 0.0 {
            -1
        } else {
            return;
        };

        self.close_if_expired(now_ms, log);
        if let Some(burst) = self.burst.as_mut() {
            if burst.ticks.signum() == step {
                burst.ticks += step;
                burst.last = Point { x, y, time: now_ms };
                return;
            }
            self.close(log);
        }

        let point = Point { x, y, time: now_ms };
        self.burst = Some(Burst {
            start: point,
            last: point,
            ticks: step,
            held,
        });
    }

    /// Close the burst if its last tick is older than the coalesce window.
    pub fn close_if_expired(&mut self, now_ms: u64, log: &mut EventLog) -> bool {
        let expired = self
            .burst
            .as_ref()
            .is_some_and(|b| now_ms.saturating_sub(b.last.time) > self.coalesce_ms);
        if expired {
            self.close(log);
        }
        expired
    }

    /// Close the burst at its last tick.
    pub fn close(&mut self, log: &mut EventLog) {
        if let Some(burst) = self.burst.take() {
            let end = burst.last;
            log.push(Self::record(burst, end));
        }
    }

    /// Close the burst as if it ended at `(x, y)` at `now_ms` (pause and stop).
    pub fn force_close(&mut self, x: f64, y: f64, now_ms: u64, log: &mut EventLog) {
        if let Some(burst) = self.burst.take() {
            let end = Point { x, y, time: now_ms };
            log.push(Self::record(burst, end));
        }
    }

    pub fn clear(&mut self) {
        self.burst = None;
    }

    fn record(burst: Burst, end: Point) -> EventRecord {
        let direction = if burst.ticks > 0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        };
        EventRecord::new(
            burst.start.time,
            EventKind::Scroll {
                start_time: burst.start.time,
                end_time: end.time,
                start: burst.start,
                end,
                scroll_amount: burst.ticks,
                direction,
                duration_ms: end.time.saturating_sub(burst.start.time),
                held: burst.held,
            },
        )
    }
}
