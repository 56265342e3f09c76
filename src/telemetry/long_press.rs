use std::collections::HashMap;
use std::time::Duration;

/// Request to schedule a long-press check for `code` after `delay`.
///
/// The token identifies this arming; a check carrying a stale token is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPressArm {
    pub code: String,
    pub token: u64,
    pub delay: Duration,
}

/// Outcome of a long-press check firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LongPressFire {
    /// The key was released, re-pressed, or the session ended since arming.
    Stale,
    /// A keyLongPress record was logged.
    Emitted,
    /// Session is paused; the timer waits for resume.
    Dormant,
    /// The key has not been held long enough yet in recording time.
    Rearm(LongPressArm),
}

#[derive(Debug)]
struct Armed {
    token: u64,
    dormant: bool,
}

/// Per-key long-press timer bookkeeping. At most one armed timer per key code.
#[derive(Debug, Default)]
pub struct LongPressTimers {
    next_token: u64,
    armed: HashMap<String, Armed>,
}

impl LongPressTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, code: &str, delay: Duration) -> LongPressArm {
        self.next_token += 1;
        let token = self.next_token;
        self.armed.insert(
            code.to_string(),
            Armed {
                token,
                dormant: false,
            },
        );
        LongPressArm {
            code: code.to_string(),
            token,
            delay,
        }
    }

    /// Disarm the timer for `code`, returning its token.
    pub fn cancel(&mut self, code: &str) -> Option<u64> {
        self.armed.remove(code).map(|armed| armed.token)
    }

    pub fn cancel_all(&mut self) -> Vec<u64> {
        self.armed.drain().map(|(_, armed)| armed.token).collect()
    }

    pub fn is_current(&self, code: &str, token: u64) -> bool {
        self.armed.get(code).is_some_and(|armed| armed.token == token)
    }

    pub fn mark_dormant(&mut self, code: &str) {
        if let Some(armed) = self.armed.get_mut(code) {
            armed.dormant = true;
        }
    }

    /// Wake every dormant timer, pairing each code with its token.
    pub fn wake_dormant(&mut self) -> Vec<(String, u64)> {
        self.armed
            .iter_mut()
            .filter(|(_, armed)| armed.dormant)
            .map(|(code, armed)| {
                armed.dormant = false;
                (code.clone(), armed.token)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
