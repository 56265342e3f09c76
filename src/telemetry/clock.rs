//! Pause-aware session clock
//!
//! Every record is stamped with elapsed recording time: wall time since start minus all
//! accumulated pauses, frozen while paused, at millisecond precision.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source. The offset is measured from an arbitrary fixed origin.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by `Instant`.
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time source for deterministic tests and offline replays.
#[derive(Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<Mutex<Duration>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Recording timeline: start instant, optional pause instant, accumulated pause span.
pub struct SessionClock {
    source: Arc<dyn TimeSource>,
    started_at: Option<Duration>,
    paused_at: Option<Duration>,
    accumulated_pause: Duration,
}

impl SessionClock {
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        Self {
            source,
            started_at: None,
            paused_at: None,
            accumulated_pause: Duration::ZERO,
        }
    }

    /// Start a fresh timeline at the current instant.
    pub fn start(&mut self) {
        self.started_at = Some(self.source.now());
        self.paused_at = None;
        self.accumulated_pause = Duration::ZERO;
    }

    /// Freeze the clock. Returns false if it was not running.
    pub fn pause(&mut self) -> bool {
        if self.started_at.is_none() || self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(self.source.now());
        true
    }

    /// Unfreeze the clock, adding the finished pause span. Returns false if not paused.
    pub fn resume(&mut self) -> bool {
        match self.paused_at.take() {
            Some(paused_at) => {
                let span = self.source.now().saturating_sub(paused_at);
                self.accumulated_pause += span;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.paused_at = None;
        self.accumulated_pause = Duration::ZERO;
    }

    /// Pause-adjusted elapsed time in whole milliseconds (rounded).
    pub fn elapsed_ms(&self) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let reference = self.paused_at.unwrap_or_else(|| self.source.now());
        let elapsed = reference
            .saturating_sub(started_at)
            .saturating_sub(self.accumulated_pause);
        ((elapsed.as_micros() + 500) / 1000) as u64
    }

    /// Pause-adjusted elapsed time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed_ms() as f64 / 1000.0
    }

    /// Total time spent paused, including an ongoing pause.
    pub fn total_pause_ms(&self) -> u64 {
        let ongoing = self
            .paused_at
            .map(|p| self.source.now().saturating_sub(p))
            .unwrap_or_default();
        (self.accumulated_pause + ongoing).as_millis() as u64
    }
}
