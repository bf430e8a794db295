use std::collections::{BTreeMap, HashMap};

use lyre_config::{AccidentalPolicy, OctaveRange};
use lyre_model::{AvailableNotes, NoteEvent};
use tracing::{debug, warn};

/// Notes starting within this many seconds of a chord's first note belong to it.
pub const CHORD_WINDOW: f64 = 0.005;

/// A note that survived quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedNote {
    /// Index of the source event in the input slice.
    pub source_index: usize,
    pub time: f64,
    /// Parser duration; 0 means unknown.
    pub duration: f64,
    /// Pitch after transposition and octave shift, before placement.
    pub source_pitch: i32,
    /// Playable pitch.
    pub pitch: i32,
    pub key: char,
    /// Folded by whole octaves under the octave policy.
    pub octave_shifted: bool,
    pub chord: usize,
    /// Position among the surviving members of the chord.
    pub chord_member: usize,
    pub chord_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantizeReport {
    /// Malformed input events (negative time, pitch outside 0..=127, ...).
    pub rejected: usize,
    /// Notes the accidental policy could not place, including beat-filter drops.
    pub dropped: usize,
    pub beat_filtered: usize,
    pub octave_shifted: usize,
    /// The explicit octave range was given upside down and swapped.
    pub range_swapped: bool,
}

/// Pitches sounding in one quarter-note window, restricted to notes that are
/// playable without folding.
#[derive(Debug, Default)]
struct BeatWindow {
    longest: BTreeMap<i32, f64>,
}

impl BeatWindow {
    fn highest(&self) -> Option<i32> {
        self.longest.keys().next_back().copied()
    }

    fn lowest(&self) -> Option<i32> {
        self.longest.keys().next().copied()
    }
}

/// Places arbitrary MIDI pitches on the finite target keyboard.
#[derive(Debug, Clone)]
pub struct Quantizer {
    available: AvailableNotes,
    policy: AccidentalPolicy,
    min_note: i32,
    max_note: i32,
    range_swapped: bool,
    /// Whole-semitone transposition plus the signed octave shift.
    shift: i32,
    /// Beat-filter window length in seconds.
    window: f64,
}

impl Quantizer {
    pub fn new(
        available: AvailableNotes,
        policy: AccidentalPolicy,
        range: OctaveRange,
        transpose_semitones: i32,
        octave_shift: i32,
        window: f64,
    ) -> Self {
        let auto = (
            available.min_pitch().unwrap_or(0),
            available.max_pitch().unwrap_or(127),
        );
        let (mut min_note, mut max_note) = match range {
            OctaveRange::Auto => auto,
            OctaveRange::Explicit { min, max } => (min, max),
        };
        let range_swapped = min_note > max_note;
        if range_swapped {
            warn!("octave range {min_note}..{max_note} is inverted, swapping");
            std::mem::swap(&mut min_note, &mut max_note);
        }
        Self {
            available,
            policy,
            min_note,
            max_note,
            range_swapped,
            shift: transpose_semitones + 12 * octave_shift,
            window: if window > 0.0 { window } else { 0.5 },
        }
    }

    pub fn available(&self) -> &AvailableNotes {
        &self.available
    }

    pub fn octave_range(&self) -> (i32, i32) {
        (self.min_note, self.max_note)
    }

    /// Apply transposition and octave shift.
    pub fn shifted(&self, pitch: i32) -> i32 {
        pitch + self.shift
    }

    /// Fold by whole octaves into `[min_note, max_note]`.
    fn fold(&self, pitch: i32) -> Option<i32> {
        let mut p = pitch;
        if p > self.max_note {
            p -= 12 * (p - self.max_note + 11).div_euclid(12);
        }
        if p < self.min_note {
            p += 12 * (self.min_note - p + 11).div_euclid(12);
        }
        (self.min_note..=self.max_note).contains(&p).then_some(p)
    }

    /// Place an already-shifted pitch under the active policy, ignoring the beat filter.
    ///
    /// Returns the playable pitch and whether it was folded by octaves.
    pub fn place(&self, pitch: i32) -> Option<(i32, bool)> {
        match self.policy {
            AccidentalPolicy::Drop => self.available.contains(pitch).then_some((pitch, false)),
            AccidentalPolicy::Lower => {
                if self.available.contains(pitch) {
                    return Some((pitch, false));
                }
                self.available
                    .floor(pitch)
                    .or_else(|| self.available.min_pitch())
                    .map(|p| (p, false))
            }
            AccidentalPolicy::Upper => {
                if self.available.contains(pitch) {
                    return Some((pitch, false));
                }
                self.available
                    .ceil(pitch)
                    .or_else(|| self.available.max_pitch())
                    .map(|p| (p, false))
            }
            AccidentalPolicy::Octave => {
                let folded = self.fold(pitch)?;
                self.available
                    .contains(folded)
                    .then_some((folded, folded != pitch))
            }
        }
    }

    fn window_index(&self, time: f64) -> i64 {
        (time / self.window).floor() as i64
    }

    fn is_direct(&self, pitch: i32) -> bool {
        (self.min_note..=self.max_note).contains(&pitch) && self.available.contains(pitch)
    }

    fn beat_windows(&self, notes: &[(usize, &NoteEvent)]) -> HashMap<i64, BeatWindow> {
        let mut windows: HashMap<i64, BeatWindow> = HashMap::new();
        for (_, note) in notes {
            let pitch = self.shifted(note.pitch);
            if !self.is_direct(pitch) {
                continue;
            }
            let window = windows.entry(self.window_index(note.time)).or_default();
            let longest = window.longest.entry(pitch).or_insert(0.0);
            *longest = longest.max(note.duration);
        }
        windows
    }

    /// Whether a folded monophonic note would break the melodic contour of its window.
    fn beat_filter_rejects(
        &self,
        window: Option<&BeatWindow>,
        source: i32,
        folded: i32,
        duration: f64,
    ) -> bool {
        let Some(window) = window else {
            return false;
        };
        if folded < source && window.highest().is_some_and(|h| h > folded) {
            return true;
        }
        if folded > source && window.lowest().is_some_and(|l| l < folded) {
            return true;
        }
        // Same pitch already sounds at least as long in this window.
        window
            .longest
            .get(&folded)
            .is_some_and(|&longest| longest >= duration)
    }

    /// Quantize a time-sorted note list.
    pub fn quantize(&self, notes: &[NoteEvent]) -> (Vec<QuantizedNote>, QuantizeReport) {
        let mut report = QuantizeReport {
            range_swapped: self.range_swapped,
            ..Default::default()
        };

        let valid: Vec<(usize, &NoteEvent)> = notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_valid())
            .collect();
        report.rejected = notes.len() - valid.len();
        if report.rejected > 0 {
            warn!("rejected {} malformed note events", report.rejected);
        }

        // Chord membership on original times, before any note is dropped.
        let mut chords: Vec<usize> = Vec::with_capacity(valid.len());
        let mut chord_sizes: Vec<usize> = Vec::new();
        let mut chord_start = f64::NEG_INFINITY;
        for (_, note) in &valid {
            if chord_sizes.is_empty() || (note.time - chord_start).abs() >= CHORD_WINDOW {
                chord_start = note.time;
                chord_sizes.push(0);
            }
            let chord = chord_sizes.len() - 1;
            chord_sizes[chord] += 1;
            chords.push(chord);
        }

        let windows = if self.policy == AccidentalPolicy::Octave {
            self.beat_windows(&valid)
        } else {
            HashMap::new()
        };

        let mut out: Vec<QuantizedNote> = Vec::with_capacity(valid.len());
        for (&(source_index, note), &chord) in valid.iter().zip(&chords) {
            let source_pitch = self.shifted(note.pitch);
            let Some((pitch, octave_shifted)) = self.place(source_pitch) else {
                debug!(pitch = source_pitch, time = note.time, "dropped unplaceable note");
                report.dropped += 1;
                continue;
            };
            let monophonic = chord_sizes[chord] == 1;
            if octave_shifted
                && monophonic
                && self.beat_filter_rejects(
                    windows.get(&self.window_index(note.time)),
                    source_pitch,
                    pitch,
                    note.duration,
                )
            {
                debug!(pitch = source_pitch, time = note.time, "beat filter dropped folded note");
                report.beat_filtered += 1;
                report.dropped += 1;
                continue;
            }
            let Some(key) = self.available.key_for(pitch) else {
                report.dropped += 1;
                continue;
            };
            if octave_shifted {
                report.octave_shifted += 1;
            }
            out.push(QuantizedNote {
                source_index,
                time: note.time,
                duration: note.duration,
                source_pitch,
                pitch,
                key,
                octave_shifted,
                chord,
                chord_member: 0,
                chord_size: 0,
            });
        }

        // Renumber chord members among survivors.
        let mut start = 0;
        while start < out.len() {
            let chord = out[start].chord;
            let end = out[start..]
                .iter()
                .position(|n| n.chord != chord)
                .map_or(out.len(), |p| start + p);
            let size = end - start;
            for (member, note) in out[start..end].iter_mut().enumerate() {
                note.chord_member = member;
                note.chord_size = size;
            }
            start = end;
        }

        (out, report)
    }
}
