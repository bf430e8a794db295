use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{KeyBackend, WindowHandle};
use crate::clock::Clock;
use crate::diagnostics::{Diagnostics, DiagnosticsRecorder};
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionKind {
    Press,
    Release,
}

/// One injection the backend accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Clock time in microseconds.
    pub at_us: i64,
    pub kind: InjectionKind,
    pub key: char,
    pub pitch: u8,
}

#[derive(Default)]
struct RecordingState {
    log: Vec<Injection>,
    depth: BTreeMap<char, u32>,
    fail_presses: u32,
    fail_releases: HashSet<char>,
    recorder: DiagnosticsRecorder,
    target: Option<WindowHandle>,
    invalid_targets: HashSet<WindowHandle>,
}

/// In-memory backend that records every injection.
///
/// Clones share the same log, so a test can keep one handle while the player
/// owns another.
#[derive(Clone)]
pub struct RecordingBackend {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(RecordingState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log(&self) -> Vec<Injection> {
        self.lock().log.clone()
    }

    pub fn presses(&self) -> Vec<Injection> {
        self.filtered(InjectionKind::Press)
    }

    pub fn releases(&self) -> Vec<Injection> {
        self.filtered(InjectionKind::Release)
    }

    fn filtered(&self, kind: InjectionKind) -> Vec<Injection> {
        self.lock().log.iter().filter(|i| i.kind == kind).copied().collect()
    }

    /// Current press depth of `key`.
    pub fn depth(&self, key: char) -> u32 {
        self.lock().depth.get(&key).copied().unwrap_or(0)
    }

    /// Keys currently down, in key order.
    pub fn held(&self) -> Vec<char> {
        self.lock()
            .depth
            .iter()
            .filter(|&(_, &d)| d > 0)
            .map(|(&k, _)| k)
            .collect()
    }

    pub fn target(&self) -> Option<WindowHandle> {
        self.lock().target
    }

    /// Make the next `count` presses fail.
    pub fn fail_next_presses(&self, count: u32) {
        self.lock().fail_presses = count;
    }

    /// Make the next release of `key` fail.
    pub fn fail_next_release(&self, key: char) {
        self.lock().fail_releases.insert(key);
    }

    /// Reject `handle` in [`KeyBackend::set_target`].
    pub fn reject_target(&self, handle: WindowHandle) {
        self.lock().invalid_targets.insert(handle);
    }
}

impl KeyBackend for RecordingBackend {
    fn press(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        let at_us = self.clock.now_us();
        let mut state = self.lock();
        let state = &mut *state;
        let (result, _) = state.recorder.time(|| {
            if state.fail_presses > 0 {
                state.fail_presses -= 1;
                return Err(BackendError::Injection { key, op: "press" });
            }
            *state.depth.entry(key).or_insert(0) += 1;
            state.log.push(Injection {
                at_us,
                kind: InjectionKind::Press,
                key,
                pitch,
            });
            Ok(())
        });
        state.recorder.record_press(result.is_ok());
        result
    }

    fn release(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        let at_us = self.clock.now_us();
        let mut state = self.lock();
        let state = &mut *state;
        let (result, _) = state.recorder.time(|| {
            if state.fail_releases.remove(&key) {
                return Err(BackendError::Injection { key, op: "release" });
            }
            match state.depth.get_mut(&key) {
                Some(depth) if *depth > 0 => *depth -= 1,
                _ => return Err(BackendError::NotHeld(key)),
            }
            state.log.push(Injection {
                at_us,
                kind: InjectionKind::Release,
                key,
                pitch,
            });
            Ok(())
        });
        state.recorder.record_release(result.is_ok());
        result
    }

    fn release_all(&mut self) -> usize {
        let at_us = self.clock.now_us();
        let mut state = self.lock();
        let state = &mut *state;
        let mut released = 0;
        for (&key, depth) in state.depth.iter_mut() {
            if *depth == 0 {
                continue;
            }
            released += 1;
            for _ in 0..*depth {
                state.log.push(Injection {
                    at_us,
                    kind: InjectionKind::Release,
                    key,
                    pitch: 0,
                });
                state.recorder.record_release(true);
            }
            *depth = 0;
        }
        released
    }

    fn set_target(&mut self, target: Option<WindowHandle>) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(handle) = target {
            if state.invalid_targets.contains(&handle) {
                return Err(BackendError::InvalidTarget(handle));
            }
        }
        state.target = target;
        Ok(())
    }

    fn diagnostics(&self) -> Diagnostics {
        self.lock().recorder.snapshot()
    }
}
