use serde::{Deserialize, Serialize};

/// Highest valid MIDI note number.
pub const MAX_PITCH: i32 = 127;

/// A parsed note: absolute start time, MIDI pitch and duration, all in seconds.
///
/// `duration == 0.0` means the parser did not know the length; the planner
/// substitutes the configured press length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub time: f64,
    pub pitch: i32,
    #[serde(default)]
    pub duration: f64,
}

impl NoteEvent {
    pub fn new(time: f64, pitch: i32, duration: f64) -> Self {
        Self {
            time,
            pitch,
            duration,
        }
    }

    /// Whether this event can enter the quantizer at all.
    ///
    /// Rejects negative or non-finite times and durations and pitches outside 0..=127.
    pub fn is_valid(&self) -> bool {
        self.time.is_finite()
            && self.time >= 0.0
            && self.duration.is_finite()
            && self.duration >= 0.0
            && (0..=MAX_PITCH).contains(&self.pitch)
    }

    pub fn end_time(&self) -> f64 {
        self.time + self.duration
    }
}
