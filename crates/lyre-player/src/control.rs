use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::state::PlayerState;

/// Upper bound on any single wait, so control calls take effect promptly.
pub(crate) const WAIT_SLICE_US: i64 = 20_000;

#[derive(Debug, Default)]
pub(crate) struct PauseFlags {
    pub(crate) requested: bool,
    pub(crate) paused: bool,
}

/// State shared between the worker and any number of control handles.
#[derive(Debug)]
pub(crate) struct Shared {
    state: AtomicU8,
    stop: AtomicBool,
    flags: Mutex<PauseFlags>,
    wake: Condvar,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(PlayerState::Idle as u8),
            stop: AtomicBool::new(false),
            flags: Mutex::new(PauseFlags::default()),
            wake: Condvar::new(),
        }
    }

    pub(crate) fn flags(&self) -> MutexGuard<'_, PauseFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> PlayerState {
        PlayerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: PlayerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: PlayerState, to: PlayerState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Block while paused, waking at least every wait slice.
    /// Returns once resumed or stopped.
    pub(crate) fn wait_while_paused(&self) {
        let mut flags = self.flags();
        while flags.paused && !self.stop_requested() {
            let (guard, _) = self
                .wake
                .wait_timeout(flags, Duration::from_micros(WAIT_SLICE_US as u64))
                .unwrap_or_else(PoisonError::into_inner);
            flags = guard;
        }
    }
}

/// Cloneable handle for controlling a running performance from any thread.
#[derive(Debug, Clone)]
pub struct PlayerControl {
    shared: Arc<Shared>,
}

impl PlayerControl {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Request a stop. Returns immediately; the worker drains held keys.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let _flags = self.shared.flags();
        self.shared.wake.notify_all();
    }

    /// Request a pause at the next bar marker.
    pub fn pause(&self) {
        let mut flags = self.shared.flags();
        if flags.paused || self.shared.stop_requested() {
            return;
        }
        match self.shared.state() {
            PlayerState::Countdown | PlayerState::Pausing => flags.requested = true,
            PlayerState::Playing => {
                flags.requested = true;
                self.shared.transition(PlayerState::Playing, PlayerState::Pausing);
            }
            _ => {}
        }
    }

    /// Resume when paused, or cancel a pause that has not reached its marker.
    pub fn resume(&self) {
        let mut flags = self.shared.flags();
        if flags.paused {
            flags.paused = false;
            self.shared.wake.notify_all();
        } else if flags.requested {
            flags.requested = false;
            self.shared.transition(PlayerState::Pausing, PlayerState::Playing);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state() == PlayerState::Paused
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }
}
