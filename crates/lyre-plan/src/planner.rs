use std::collections::HashMap;

use lyre_config::{
    AccidentalPolicy, Config, EightBarStyle, ErrorConfig, InputStyle, OctaveRange,
};
use lyre_model::{AvailableNotes, BarTiming, Layout, LayoutKind, NoteEvent, Score};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::PlanError;
use crate::error_plan::ErrorPlan;
use crate::event::{EventKind, EventQueue, KeyEvent};
use crate::humanize::Humanizer;
use crate::quantize::{QuantizedNote, Quantizer};
use crate::section::{BARS_PER_SEGMENT, SectionModulator};

/// Minimum time between a release and the next press of the same key.
pub const POST_RELEASE_GAP: f64 = 0.010;

/// Floor applied to the global speed before dividing by it.
pub const MIN_SPEED: f64 = 1e-9;

/// Everything the planner needs, taken by value at construction.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub layout: LayoutKind,
    pub root_pitch: i32,
    pub transpose_semitones: i32,
    pub octave_shift: i32,
    pub accidental_policy: AccidentalPolicy,
    pub octave_range: OctaveRange,
    pub speed: f64,
    /// Fallback hold time in seconds for notes without a usable duration.
    pub press: f64,
    pub use_midi_duration: bool,
    /// Shortest hold in seconds.
    pub min_hold: f64,
    pub style: InputStyle,
    pub eight_bar: EightBarStyle,
    pub errors: ErrorConfig,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PlanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            layout: config.layout,
            root_pitch: config.root_pitch,
            transpose_semitones: config.transpose_semitones,
            octave_shift: config.octave_shift,
            accidental_policy: config.accidental_policy,
            octave_range: config.octave_range,
            speed: config.speed,
            press: config.press_ms_default as f64 / 1000.0,
            use_midi_duration: config.use_midi_duration,
            min_hold: config.min_hold_ms as f64 / 1000.0,
            style: config.active_style(),
            eight_bar: config.eight_bar_style.clone(),
            errors: config.error_config.clone(),
        }
    }
}

/// Counters gathered while planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanReport {
    pub input_notes: usize,
    pub rejected: usize,
    /// Every note that did not make it into the queue for mapping reasons,
    /// suppressed chord duplicates included.
    pub dropped: usize,
    pub suppressed: usize,
    pub beat_filtered: usize,
    pub octave_shifted: usize,
    pub range_swapped: bool,
    pub scheduled: usize,
    pub delayed_chords: usize,
    /// Largest chord-lock delay applied, in seconds.
    pub max_chord_delay: f64,
}

/// A fully planned performance, handed off once to the player.
#[derive(Debug, Clone)]
pub struct Plan {
    pub queue: EventQueue,
    /// Performance length in seconds, rounded up to the last bar.
    pub total_duration: f64,
    pub timing: BarTiming,
    /// Playable keys from lowest to highest pitch; neighbours are adjacent.
    pub keys: Vec<char>,
    pub errors: ErrorPlan,
    pub report: PlanReport,
    pub seed: u64,
}

impl Plan {
    /// Events in dispatch order.
    pub fn events(&self) -> Vec<KeyEvent> {
        self.queue.to_sorted_vec()
    }

    pub fn press_count(&self) -> usize {
        self.queue.count(EventKind::Press)
    }

    /// Key next to `key` in the given direction, if any.
    pub fn neighbour(&self, key: char, direction: i32) -> Option<char> {
        let index = self.keys.iter().position(|&k| k == key)?;
        let next = index as i64 + direction.signum() as i64;
        if next < 0 {
            return None;
        }
        self.keys.get(next as usize).copied()
    }
}

/// A note after humanization and section modulation, ready for scheduling.
#[derive(Debug, Clone)]
struct Timed {
    key: char,
    pitch: u8,
    octave_shifted: bool,
    start: f64,
    duration: f64,
    bar: u32,
    group_position: f64,
}

fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[derive(Debug)]
pub struct Planner {
    settings: PlanSettings,
    available: AvailableNotes,
    speed: f64,
}

impl Planner {
    /// Validates the speed and layout, and clamps the style, eight-bar and
    /// error blocks into range before any planning happens.
    pub fn new(mut settings: PlanSettings) -> Result<Self, PlanError> {
        if !settings.speed.is_finite() || settings.speed <= 0.0 {
            return Err(PlanError::InvalidSpeed(settings.speed));
        }
        settings.style.validate();
        settings.eight_bar.validate();
        settings.errors.validate();
        settings.min_hold = finite_non_negative(settings.min_hold);
        settings.press = finite_non_negative(settings.press);
        let available = Layout::new(settings.layout).available(settings.root_pitch);
        if available.is_empty() {
            return Err(PlanError::EmptyLayout(settings.root_pitch));
        }
        let speed = settings.speed.max(MIN_SPEED);
        Ok(Self {
            settings,
            available,
            speed,
        })
    }

    pub fn settings(&self) -> &PlanSettings {
        &self.settings
    }

    /// Plan `score` with a fresh generator seeded from `seed`.
    pub fn plan(&self, score: &Score, seed: u64) -> Plan {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut plan = self.plan_with_rng(&score.notes, score.timing(), &mut rng);
        plan.seed = seed;
        plan
    }

    /// Plan a time-sorted note list, drawing humanizer, section and error
    /// randomness from `rng` in that order.
    pub fn plan_with_rng(&self, notes: &[NoteEvent], timing: BarTiming, rng: &mut ChaCha8Rng) -> Plan {
        let s = &self.settings;
        let quantizer = Quantizer::new(
            self.available.clone(),
            s.accidental_policy,
            s.octave_range,
            s.transpose_semitones,
            s.octave_shift,
            timing.quarter,
        );
        let (quantized, q) = quantizer.quantize(notes);
        let mut report = PlanReport {
            input_notes: notes.len(),
            rejected: q.rejected,
            dropped: q.dropped,
            beat_filtered: q.beat_filtered,
            octave_shifted: q.octave_shifted,
            range_swapped: q.range_swapped,
            ..Default::default()
        };

        // Every chord member is humanized from the chord's first note, so
        // members a few ms apart still start together before jitter.
        let humanizer = Humanizer::new(s.style.clone(), s.min_hold);
        let mut anchor: Option<(usize, f64)> = None;
        let humanized: Vec<(f64, f64)> = quantized
            .iter()
            .map(|n| {
                let start = match anchor {
                    Some((chord, time)) if chord == n.chord => time,
                    _ => {
                        anchor = Some((n.chord, n.time));
                        n.time
                    }
                };
                humanizer.apply(start, self.base_duration(n), n.chord_member, rng)
            })
            .collect();

        let original_end = quantized
            .iter()
            .map(|n| n.time + self.base_duration(n))
            .fold(0.0, f64::max);
        let modulator = SectionModulator::new(&s.eight_bar, &timing, original_end, rng);

        let bar_count = timing.bar_count(original_end);
        let group_count = bar_count.div_ceil(BARS_PER_SEGMENT) as usize;
        let errors = ErrorPlan::generate(&s.errors, group_count, rng);

        let group_len = timing.bar * BARS_PER_SEGMENT as f64;
        let timed: Vec<Timed> = quantized
            .iter()
            .zip(&humanized)
            .map(|(n, &(time, duration))| {
                let bar = timing.bar_index(n.time);
                let group_start = (bar / BARS_PER_SEGMENT) as f64 * group_len;
                Timed {
                    key: n.key,
                    pitch: n.pitch.clamp(0, 127) as u8,
                    octave_shifted: n.octave_shifted,
                    start: modulator.map_time(time) / self.speed,
                    duration: (modulator.map_duration(time, duration) / self.speed)
                        .max(s.min_hold),
                    bar,
                    group_position: ((n.time - group_start) / group_len).clamp(0.0, 1.0),
                }
            })
            .collect();

        let mut queue = EventQueue::new();
        let mut next_free: HashMap<char, f64> = HashMap::new();
        let mut begin = 0;
        while begin < quantized.len() {
            let chord = quantized[begin].chord;
            let end = quantized[begin..]
                .iter()
                .position(|n| n.chord != chord)
                .map_or(quantized.len(), |p| begin + p);
            self.schedule_chord(&timed[begin..end], &mut next_free, &mut queue, &mut report);
            begin = end;
        }

        for k in 1..bar_count {
            let boundary = k as f64 * timing.bar;
            if boundary < original_end {
                queue.push(KeyEvent::pause_marker(
                    modulator.map_time(boundary) / self.speed,
                    k,
                ));
            }
        }

        let padded_end = modulator.map_time(bar_count as f64 * timing.bar) / self.speed;
        let total_duration = if quantized.is_empty() {
            queue.last_time()
        } else {
            queue.last_time().max(padded_end)
        };

        info!(
            notes = report.input_notes,
            scheduled = report.scheduled,
            dropped = report.dropped,
            suppressed = report.suppressed,
            rejected = report.rejected,
            errors = errors.total(),
            "planned {:.2}s performance",
            total_duration
        );

        Plan {
            queue,
            total_duration,
            timing,
            keys: self.available.keys_in_order(),
            errors,
            report,
            seed: 0,
        }
    }

    fn base_duration(&self, note: &QuantizedNote) -> f64 {
        let s = &self.settings;
        let duration = if s.use_midi_duration && note.duration > 0.0 {
            note.duration
        } else {
            s.press
        };
        duration.max(s.min_hold)
    }

    /// Chord-lock one chord: resolve same-key collisions, then shift every
    /// member by the largest recovery delay among its keys.
    fn schedule_chord(
        &self,
        chord: &[Timed],
        next_free: &mut HashMap<char, f64>,
        queue: &mut EventQueue,
        report: &mut PlanReport,
    ) {
        let min_hold = self.settings.min_hold;

        let mut by_key: Vec<(char, Vec<&Timed>)> = Vec::new();
        for note in chord {
            match by_key.iter_mut().find(|(k, _)| *k == note.key) {
                Some((_, notes)) => notes.push(note),
                None => by_key.push((note.key, vec![note])),
            }
        }

        // (key, start, duration, note) after same-key serialization.
        let mut laid: Vec<(char, f64, f64, &Timed)> = Vec::with_capacity(chord.len());
        for (key, notes) in by_key {
            let total = notes.len();
            let mut survivors: Vec<&Timed> = if notes.iter().any(|n| !n.octave_shifted) {
                notes.into_iter().filter(|n| !n.octave_shifted).collect()
            } else {
                // Longest wins; the earliest chord member breaks ties.
                let mut best = notes[0];
                for &n in &notes[1..] {
                    if n.duration > best.duration {
                        best = n;
                    }
                }
                vec![best]
            };
            let suppressed = total - survivors.len();
            if suppressed > 0 {
                debug!(key = %key, suppressed, "suppressed same-key chord notes");
                report.suppressed += suppressed;
                report.dropped += suppressed;
            }

            survivors.sort_by(|a, b| a.duration.total_cmp(&b.duration));
            let base = survivors.iter().map(|n| n.start).fold(f64::INFINITY, f64::min);
            let mut offset = 0.0;
            let last = survivors.len() - 1;
            for (i, note) in survivors.into_iter().enumerate() {
                if i < last {
                    laid.push((key, base + offset, note.duration, note));
                    offset += note.duration + POST_RELEASE_GAP;
                } else {
                    let duration = (note.duration - offset).max(min_hold);
                    laid.push((key, base + offset, duration, note));
                }
            }
        }

        let delay = laid
            .iter()
            .map(|&(key, start, _, _)| next_free.get(&key).map_or(0.0, |free| free - start))
            .fold(0.0, f64::max);
        if delay > 0.0 {
            report.delayed_chords += 1;
            report.max_chord_delay = report.max_chord_delay.max(delay);
        }

        for (key, start, duration, note) in laid {
            let free = next_free.get(&key).copied().unwrap_or(f64::NEG_INFINITY);
            let start = (start + delay).max(free);
            let release = start + duration;
            queue.push(KeyEvent::press(start, key, note.pitch, note.bar, note.group_position));
            queue.push(KeyEvent::release(release, key, note.pitch, note.bar, note.group_position));
            next_free.insert(key, release + POST_RELEASE_GAP);
            report.scheduled += 1;
        }
    }
}
