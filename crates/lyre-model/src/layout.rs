use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Target instrument keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LayoutKind {
    /// Three diatonic octaves on the Z/A/Q rows.
    #[default]
    #[serde(rename = "21")]
    Diatonic21,
    /// Three chromatic octaves on the A/Q/number rows.
    #[serde(rename = "36")]
    Chromatic36,
}

impl LayoutKind {
    pub fn key_count(self) -> usize {
        match self {
            LayoutKind::Diatonic21 => 21,
            LayoutKind::Chromatic36 => 36,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_count())
    }
}

impl FromStr for LayoutKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "21" => Ok(LayoutKind::Diatonic21),
            "36" => Ok(LayoutKind::Chromatic36),
            other => Err(ModelError::UnknownLayout(other.to_string())),
        }
    }
}

const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

// Rows listed from the lowest octave up.
const DIATONIC_ROWS: [&str; 3] = ["zxcvbnm", "asdfghj", "qwertyu"];
const CHROMATIC_ROWS: [&str; 3] = ["asdfghjkl;'\\", "qwertyuiop[]", "1234567890-="];

/// Immutable mapping from semitone offsets (relative to the root pitch) to keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    kind: LayoutKind,
    keys: Vec<(i32, char)>,
}

impl Layout {
    pub fn new(kind: LayoutKind) -> Self {
        let mut keys = Vec::with_capacity(kind.key_count());
        match kind {
            LayoutKind::Diatonic21 => {
                for (octave, row) in DIATONIC_ROWS.iter().enumerate() {
                    let base = (octave as i32 - 1) * 12;
                    for (degree, key) in row.chars().enumerate() {
                        keys.push((base + MAJOR_SCALE[degree], key));
                    }
                }
            }
            LayoutKind::Chromatic36 => {
                for (octave, row) in CHROMATIC_ROWS.iter().enumerate() {
                    let base = (octave as i32 - 1) * 12;
                    for (semitone, key) in row.chars().enumerate() {
                        keys.push((base + semitone as i32, key));
                    }
                }
            }
        }
        Self { kind, keys }
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// `(offset, key)` pairs in ascending offset order.
    pub fn keys(&self) -> &[(i32, char)] {
        &self.keys
    }

    pub fn key_for_offset(&self, offset: i32) -> Option<char> {
        self.keys
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, k)| *k)
    }

    /// Materialize the playable `(pitch, key)` pairs for a root pitch.
    pub fn available(&self, root_pitch: i32) -> AvailableNotes {
        let notes = self
            .keys
            .iter()
            .map(|&(offset, key)| (root_pitch + offset, key))
            .collect();
        AvailableNotes { notes }
    }
}

/// Playable pitches of a layout at a given root, ordered by pitch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableNotes {
    notes: BTreeMap<i32, char>,
}

impl AvailableNotes {
    pub fn contains(&self, pitch: i32) -> bool {
        self.notes.contains_key(&pitch)
    }

    pub fn key_for(&self, pitch: i32) -> Option<char> {
        self.notes.get(&pitch).copied()
    }

    pub fn min_pitch(&self) -> Option<i32> {
        self.notes.keys().next().copied()
    }

    pub fn max_pitch(&self) -> Option<i32> {
        self.notes.keys().next_back().copied()
    }

    /// Greatest available pitch `<= pitch`.
    pub fn floor(&self, pitch: i32) -> Option<i32> {
        self.notes.range(..=pitch).next_back().map(|(p, _)| *p)
    }

    /// Lowest available pitch `>= pitch`.
    pub fn ceil(&self, pitch: i32) -> Option<i32> {
        self.notes.range(pitch..).next().map(|(p, _)| *p)
    }

    /// Keys in ascending pitch order; neighbours in this list are "adjacent keys".
    pub fn keys_in_order(&self) -> Vec<char> {
        self.notes.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, char)> + '_ {
        self.notes.iter().map(|(p, k)| (*p, *k))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
