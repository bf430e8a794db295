use lyre_config::{EightBarMode, EightBarStyle};
use lyre_model::BarTiming;
use rand::Rng;

/// Bars per modulated segment.
pub const BARS_PER_SEGMENT: u32 = 8;

/// Beat-lock never pushes a note past this fraction of its beat.
const MAX_BEAT_FRACTION: f64 = 0.95;

/// Multipliers drawn for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMultipliers {
    pub speed: f64,
    pub timing: f64,
    pub duration: f64,
}

impl SegmentMultipliers {
    pub const IDENTITY: SegmentMultipliers = SegmentMultipliers {
        speed: 1.0,
        timing: 1.0,
        duration: 1.0,
    };
}

fn draw<R: Rng>(style: &EightBarStyle, (lo, hi): (f64, f64), rng: &mut R) -> f64 {
    let value = if lo < hi { rng.gen_range(lo..=hi) } else { lo };
    style.clamp_multiplier(value)
}

/// Retimes eight-bar segments of a performance, in warp or beat-lock mode.
#[derive(Debug, Clone)]
pub struct SectionModulator {
    enabled: bool,
    mode: EightBarMode,
    segment_len: f64,
    beat: f64,
    segments: Vec<SegmentMultipliers>,
    /// Mapped start time of each segment, plus the mapped end of the last one.
    warp_start: Vec<f64>,
}

impl SectionModulator {
    /// A modulator that maps every time and duration to itself.
    pub fn identity() -> Self {
        Self {
            enabled: false,
            mode: EightBarMode::Warp,
            segment_len: f64::INFINITY,
            beat: 1.0,
            segments: Vec::new(),
            warp_start: vec![0.0],
        }
    }

    /// Draw per-segment multipliers for a performance ending at `end_time`.
    ///
    /// A disabled style yields [`SectionModulator::identity`] without touching `rng`.
    pub fn new<R: Rng>(
        style: &EightBarStyle,
        timing: &BarTiming,
        end_time: f64,
        rng: &mut R,
    ) -> Self {
        if !style.enabled {
            return Self::identity();
        }
        let segment_len = timing.bar * BARS_PER_SEGMENT as f64;
        let count = ((end_time / segment_len).ceil() as usize).max(1);

        let segments: Vec<SegmentMultipliers> = (0..count)
            .map(|i| {
                if !style.pattern.selects(i) {
                    return SegmentMultipliers::IDENTITY;
                }
                SegmentMultipliers {
                    speed: draw(style, style.speed_range, rng),
                    timing: draw(style, style.timing_range, rng),
                    duration: draw(style, style.duration_range, rng),
                }
            })
            .collect();

        let mut warp_start = Vec::with_capacity(count + 1);
        warp_start.push(0.0);
        for seg in &segments {
            let last = warp_start[warp_start.len() - 1];
            let speed = match style.mode {
                EightBarMode::Warp => seg.speed,
                EightBarMode::BeatLock => 1.0,
            };
            warp_start.push(last + segment_len / speed);
        }

        Self {
            enabled: true,
            mode: style.mode,
            segment_len,
            beat: timing.beat,
            segments,
            warp_start,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.enabled
    }

    pub fn segments(&self) -> &[SegmentMultipliers] {
        &self.segments
    }

    fn segment_index(&self, time: f64) -> usize {
        if time <= 0.0 {
            0
        } else {
            (time / self.segment_len).floor() as usize
        }
    }

    fn multipliers(&self, index: usize) -> SegmentMultipliers {
        self.segments
            .get(index)
            .copied()
            .unwrap_or(SegmentMultipliers::IDENTITY)
    }

    /// Map an original time onto the modulated timeline.
    pub fn map_time(&self, time: f64) -> f64 {
        if !self.enabled {
            return time;
        }
        let index = self.segment_index(time);
        let seg_start = index as f64 * self.segment_len;
        let local = time - seg_start;
        match self.mode {
            EightBarMode::Warp => {
                let last = self.segments.len();
                if index >= last {
                    // Past the drawn segments the performance runs at base speed.
                    let end = self.warp_start[last];
                    return end + (time - last as f64 * self.segment_len);
                }
                self.warp_start[index] + local / self.segments[index].speed
            }
            EightBarMode::BeatLock => {
                let timing = self.multipliers(index).timing;
                if timing == 1.0 {
                    return time;
                }
                let beat_index = (local / self.beat).floor();
                let frac = (local - beat_index * self.beat) / self.beat;
                let stretched = (frac * timing).min(frac.max(MAX_BEAT_FRACTION));
                seg_start + (beat_index + stretched) * self.beat
            }
        }
    }

    /// Scale a duration that starts at original time `time`.
    pub fn map_duration(&self, time: f64, duration: f64) -> f64 {
        if !self.enabled {
            return duration;
        }
        let m = self.multipliers(self.segment_index(time));
        match self.mode {
            EightBarMode::Warp => duration * m.duration / m.speed,
            EightBarMode::BeatLock => duration * m.duration,
        }
    }
}
