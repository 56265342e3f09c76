//! Held-key bookkeeping: what is down right now, since when, and in which order.

use crate::capture::input::keymap::{self, KeyIdentity};
use crate::telemetry::record::HeldKeys;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct HeldKey {
    identity: KeyIdentity,
    pressed_at_ms: u64,
}

/// Keys currently held down, in press order, with their press times.
#[derive(Debug, Default)]
pub struct PressedKeys {
    held: Vec<HeldKey>,
}

impl PressedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Returns false if the key is already held (auto-repeat).
    pub fn press(&mut self, identity: KeyIdentity, at_ms: u64) -> bool {
        if self.contains(&identity.code) {
            return false;
        }
        self.held.push(HeldKey {
            identity,
            pressed_at_ms: at_ms,
        });
        true
    }

    /// Record a release. Releasing a key that was never seen pressed is harmless.
    pub fn release(&mut self, code: &str) -> Option<KeyIdentity> {
        let index = self.held.iter().position(|k| k.identity.code == code)?;
        Some(self.held.remove(index).identity)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.held.iter().any(|k| k.identity.code == code)
    }

    pub fn pressed_at(&self, code: &str) -> Option<u64> {
        self.held
            .iter()
            .find(|k| k.identity.code == code)
            .map(|k| k.pressed_at_ms)
    }

    pub fn identity(&self, code: &str) -> Option<&KeyIdentity> {
        self.held
            .iter()
            .find(|k| k.identity.code == code)
            .map(|k| &k.identity)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn shift_held(&self) -> bool {
        self.held.iter().any(|k| keymap::is_shift(&k.identity.code))
    }

    pub fn identities(&self) -> impl Iterator<Item = &KeyIdentity> {
        self.held.iter().map(|k| &k.identity)
    }

    pub fn codes(&self) -> Vec<String> {
        self.identities().map(|k| k.code.clone()).collect()
    }

    pub fn press_times(&self) -> HashMap<String, u64> {
        self.held
            .iter()
            .map(|k| (k.identity.code.clone(), k.pressed_at_ms))
            .collect()
    }

    /// Snapshot for gesture records; empty when nothing is held.
    pub fn snapshot(&self) -> HeldKeys {
        HeldKeys::from_identities(self.identities())
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
