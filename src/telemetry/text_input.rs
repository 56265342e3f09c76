//! Text-input run aggregation.
//!
//! Two plain keypresses in quick succession open a run: the first keypress record is
//! retracted and both keys become the run's seed. Keys keep accumulating until a
//! terminator (Enter, Tab, Escape), a click, a scroll, or a pause/stop closes the run into a
//! single `input` record with a reconstructed value.

use crate::capture::input::keymap::{self, KeyIdentity};
use crate::telemetry::event_log::EventLog;
use crate::telemetry::record::{EventKind, EventRecord, InputEndReason};

/// One keystroke of a run, with whether Shift was held when it went down.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedKey {
    pub identity: KeyIdentity,
    pub shifted: bool,
}

#[derive(Debug)]
struct Run {
    started_ms: u64,
    keys: Vec<TypedKey>,
}

/// The last plain keypress logged outside a run; it may become the seed of the next one.
#[derive(Debug)]
struct Candidate {
    record_id: String,
    shifted: bool,
}

#[derive(Debug)]
pub struct InputAggregator {
    chain_window_ms: u64,
    run: Option<Run>,
    candidate: Option<Candidate>,
}

impl InputAggregator {
    pub fn new(chain_window_ms: u64) -> Self {
        Self {
            chain_window_ms,
            run: None,
            candidate: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.run.is_some()
    }

    /// Append a key to the open run.
    pub fn append(&mut self, key: TypedKey) -> bool {
        match self.run.as_mut() {
            Some(run) => {
                run.keys.push(key);
                true
            }
            None => false,
        }
    }

    /// Try to open a run with `key` as its second keystroke.
    ///
    /// Succeeds when the retractable tail of the log is a plain keyPress less than the chain
    /// window old. That record is retracted and becomes the first keystroke.
    pub fn try_open(&mut self, key: &TypedKey, now_ms: u64, log: &mut EventLog) -> bool {
        if self.run.is_some() || keymap::is_non_text_key(&key.identity.code) {
            return false;
        }
        let window = self.chain_window_ms;
        let Some(previous) = log.retract_if(|record| match &record.kind {
            EventKind::KeyPress { code, .. } => {
                !keymap::is_non_text_key(code) && now_ms.saturating_sub(record.time_ms) < window
            }
            _ => false,
        }) else {
            return false;
        };

        let EventKind::KeyPress { key: label, code, key_code } = previous.kind else {
            return false;
        };
        let shifted = self
            .candidate
            .take()
            .filter(|c| c.record_id == previous.id)
            .is_some_and(|c| c.shifted);
        let seed = TypedKey {
            identity: KeyIdentity {
                code,
                key_code,
                key: label,
            },
            shifted,
        };
        tracing::debug!("Input run opened at {}ms", previous.time_ms);
        self.run = Some(Run {
            started_ms: previous.time_ms,
            keys: vec![seed, key.clone()],
        });
        true
    }

    /// Remember a plain keypress record that may seed the next run.
    pub fn set_candidate(&mut self, record_id: &str, shifted: bool) {
        self.candidate = Some(Candidate {
            record_id: record_id.to_string(),
            shifted,
        });
    }

    pub fn clear_candidate(&mut self) {
        self.candidate = None;
    }

    /// Close the open run into an `input` record.
    pub fn finish(
        &mut self,
        reason: InputEndReason,
        now_ms: u64,
        shift_at_end: bool,
        log: &mut EventLog,
    ) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        let value = reconstruct_value(&run.keys, shift_at_end);
        log.push(EventRecord::new(
            run.started_ms,
            EventKind::Input {
                duration_ms: now_ms.saturating_sub(run.started_ms),
                keys: run.keys.iter().map(|k| k.identity.key.clone()).collect(),
                codes: run.keys.iter().map(|k| k.identity.code.clone()).collect(),
                key_codes: run.keys.iter().map(|k| k.identity.key_code).collect(),
                length: run.keys.len(),
                value,
                reason: reason.label().to_string(),
            },
        ));
        true
    }

    pub fn clear(&mut self) {
        self.run = None;
        self.candidate = None;
    }
}

/// Rebuild the typed text from a run's keystrokes.
///
/// A letter or digit is shifted when Shift was held at that keystroke or at the end of the run.
pub fn reconstruct_value(keys: &[TypedKey], shift_at_end: bool) -> String {
    let mut value = String::new();
    for typed in keys {
        let code = typed.identity.code.as_str();
        let shift = typed.shifted || shift_at_end;
        match code {
            "Backspace" => {
                value.pop();
            }
            "Enter" => value.push('\n'),
            "Tab" => value.push('\t'),
            "Space" => value.push(' '),
            _ if keymap::is_non_text_key(code) => {}
            _ => {
                if let Some(letter) = keymap::letter_of(code) {
                    value.push(if shift {
                        letter
                    } else {
                        letter.to_ascii_lowercase()
                    });
                } else if let Some(digit) = keymap::digit_of(code) {
                    let ch = if shift {
                        keymap::shifted_digit(digit)
                    } else {
                        char::from_digit(digit, 10)
                    };
                    value.extend(ch);
                } else if typed.identity.is_printable() {
                    value.push_str(&typed.identity.key);
                }
            }
        }
    }
    value
}
