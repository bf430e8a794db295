use std::collections::BTreeMap;

use lyre_input::{Diagnostics, KeyBackend, NoteMirror};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct Held {
    depth: u32,
    pitch: u8,
    /// Clock time of the most recent press.
    since_us: i64,
}

/// Owns the backend and the held-key map for one performance.
///
/// Every exit path drains held keys exactly once: explicitly through
/// [`KeyDriver::finish`], or on drop if the worker unwinds first.
pub(crate) struct KeyDriver {
    backend: Box<dyn KeyBackend>,
    mirror: Box<dyn NoteMirror>,
    held: BTreeMap<char, Held>,
    finished: bool,
}

impl KeyDriver {
    pub(crate) fn new(backend: Box<dyn KeyBackend>, mirror: Box<dyn NoteMirror>) -> Self {
        Self {
            backend,
            mirror,
            held: BTreeMap::new(),
            finished: false,
        }
    }

    pub(crate) fn depth(&self, key: char) -> u32 {
        self.held.get(&key).map_or(0, |h| h.depth)
    }

    pub(crate) fn is_held(&self, key: char) -> bool {
        self.depth(key) > 0
    }

    pub(crate) fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Returns whether the backend accepted the press.
    pub(crate) fn press(&mut self, key: char, pitch: u8, now_us: i64) -> bool {
        match self.backend.press(key, pitch) {
            Ok(()) => {
                let held = self.held.entry(key).or_insert(Held {
                    depth: 0,
                    pitch,
                    since_us: now_us,
                });
                held.depth += 1;
                held.pitch = pitch;
                held.since_us = now_us;
                self.mirror.note_on(pitch);
                true
            }
            Err(e) => {
                warn!("press {key:?} failed: {e}");
                false
            }
        }
    }

    /// Release one level of `key`. A failed release leaves the key held so
    /// stuck-key recovery can retry it.
    pub(crate) fn release(&mut self, key: char, pitch: u8) -> bool {
        let Some(held) = self.held.get_mut(&key) else {
            return false;
        };
        match self.backend.release(key, pitch) {
            Ok(()) => {
                held.depth -= 1;
                if held.depth == 0 {
                    self.held.remove(&key);
                }
                self.mirror.note_off(pitch);
                true
            }
            Err(e) => {
                warn!("release {key:?} failed: {e}");
                false
            }
        }
    }

    /// Fully release one key. Returns whether it ended up up.
    fn release_fully(&mut self, key: char) -> bool {
        while let Some(held) = self.held.get(&key).copied() {
            if !self.release(key, held.pitch) {
                return false;
            }
        }
        true
    }

    /// Release every held key. Returns how many keys went up.
    pub(crate) fn release_held(&mut self) -> usize {
        let keys: Vec<char> = self.held.keys().copied().collect();
        keys.into_iter().filter(|&k| self.release_fully(k)).count()
    }

    /// Keys held for at least `max_hold_us`.
    pub(crate) fn stuck(&self, now_us: i64, max_hold_us: i64) -> Vec<char> {
        self.held
            .iter()
            .filter(|(_, h)| now_us - h.since_us >= max_hold_us)
            .map(|(&k, _)| k)
            .collect()
    }

    pub(crate) fn force_release(&mut self, key: char) -> bool {
        debug!(key = %key, "forcing release of stuck key");
        self.release_fully(key)
    }

    /// Drain held keys and silence the mirror. Only the first call acts.
    pub(crate) fn finish(&mut self) -> usize {
        if self.finished {
            return 0;
        }
        self.finished = true;
        let released = self.release_held();
        if !self.held.is_empty() {
            // Whatever could not be released key by key.
            self.backend.release_all();
            self.held.clear();
        }
        self.mirror.all_notes_off();
        released
    }

    pub(crate) fn diagnostics(&self) -> Diagnostics {
        self.backend.diagnostics()
    }
}

impl Drop for KeyDriver {
    fn drop(&mut self) {
        self.finish();
    }
}
