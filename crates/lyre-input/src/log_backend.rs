use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::backend::{KeyBackend, WindowHandle};
use crate::diagnostics::{Diagnostics, DiagnosticsRecorder};
use crate::error::BackendError;

/// Backend that only logs what it would inject. Used for dry runs on
/// platforms without a real injector.
#[derive(Default)]
pub struct LogBackend {
    depth: BTreeMap<char, u32>,
    recorder: DiagnosticsRecorder,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyBackend for LogBackend {
    fn press(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        debug!(key = %key, pitch, "press");
        *self.depth.entry(key).or_insert(0) += 1;
        self.recorder.record_press(true);
        Ok(())
    }

    fn release(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        match self.depth.get_mut(&key) {
            Some(depth) if *depth > 0 => {
                *depth -= 1;
                debug!(key = %key, pitch, "release");
                self.recorder.record_release(true);
                Ok(())
            }
            _ => {
                self.recorder.record_release(false);
                Err(BackendError::NotHeld(key))
            }
        }
    }

    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (key, depth) in self.depth.iter_mut().filter(|(_, d)| **d > 0) {
            debug!(key = %key, "release (all)");
            *depth = 0;
            released += 1;
            self.recorder.record_release(true);
        }
        released
    }

    fn set_target(&mut self, target: Option<WindowHandle>) -> Result<(), BackendError> {
        match target {
            Some(handle) => info!("target window {handle}"),
            None => info!("no target window, injecting into the foreground"),
        }
        Ok(())
    }

    fn diagnostics(&self) -> Diagnostics {
        self.recorder.snapshot()
    }
}
