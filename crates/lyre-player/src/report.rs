use lyre_config::SimErrorKind;
use lyre_input::Diagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Stopped,
}

/// Simulated errors that actually fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorStats {
    pub wrong_note: u64,
    pub miss_note: u64,
    pub extra_note: u64,
    pub pause: u64,
    /// Planned errors that reached a press already taken by an earlier error.
    pub displaced: u64,
}

impl ErrorStats {
    pub(crate) fn record(&mut self, kind: SimErrorKind) {
        match kind {
            SimErrorKind::WrongNote => self.wrong_note += 1,
            SimErrorKind::MissNote => self.miss_note += 1,
            SimErrorKind::ExtraNote => self.extra_note += 1,
            SimErrorKind::Pause => self.pause += 1,
        }
    }

    pub fn fired(&self) -> u64 {
        self.wrong_note + self.miss_note + self.extra_note + self.pause
    }
}

/// Final snapshot of one performance.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub outcome: Outcome,
    /// Backend totals with the player's recovery counters merged in.
    pub diagnostics: Diagnostics,
    /// Planned presses the backend accepted.
    pub presses: u64,
    pub releases: u64,
    /// Presses skipped because the target was not focused.
    pub missed: u64,
    /// Planned releases skipped because the key was already up.
    pub skipped_releases: u64,
    pub errors: ErrorStats,
    pub last_bar: u32,
    /// Performance time reached, in seconds.
    pub elapsed: f64,
    /// Time spent paused, in seconds.
    pub paused: f64,
}
