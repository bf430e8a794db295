use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::note::NoteEvent;
use crate::timing::{BarTiming, DEFAULT_TEMPO_US};

/// A parsed performance: tempo, time signature and time-sorted notes.
///
/// This is the document handed over by the MIDI parser. Tempo changes and
/// sustain have already been folded into absolute note times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Score {
    pub tempo_us: u32,
    pub numerator: u8,
    pub denominator: u8,
    pub notes: Vec<NoteEvent>,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            tempo_us: DEFAULT_TEMPO_US,
            numerator: 4,
            denominator: 4,
            notes: Vec::new(),
        }
    }
}

impl Score {
    pub fn new(notes: Vec<NoteEvent>) -> Self {
        let mut score = Self {
            notes,
            ..Default::default()
        };
        score.sort();
        score
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.tempo_us == 0 {
            return Err(ModelError::InvalidTempo(self.tempo_us));
        }
        if self.numerator == 0 || self.denominator == 0 || !self.denominator.is_power_of_two() {
            return Err(ModelError::InvalidTimeSignature {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    pub fn timing(&self) -> BarTiming {
        BarTiming::new(self.tempo_us, self.numerator, self.denominator)
    }

    /// Stable sort by start time; equal times keep parser order.
    pub fn sort(&mut self) {
        self.notes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Latest note end, ignoring malformed events.
    pub fn end_time(&self) -> f64 {
        self.notes
            .iter()
            .filter(|n| n.is_valid())
            .map(NoteEvent::end_time)
            .fold(0.0, f64::max)
    }

    /// Read a score from a JSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut score: Score = serde_json::from_str(&data)?;
        score.validate()?;
        score.sort();
        Ok(score)
    }

    /// Write a score to a JSON file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
