/// Default MIDI tempo: 120 BPM.
pub const DEFAULT_TEMPO_US: u32 = 500_000;

/// Resolve `(bar_duration_s, beat_duration_s)` from a MIDI tempo and time signature.
///
/// `beat = (tempo / 1e6) * (4 / den)` and `bar = beat * num`. Zero tempo or a
/// zero numerator/denominator falls back to 120 BPM in 4/4.
pub fn resolve_bar_beat(tempo_us: u32, numerator: u8, denominator: u8) -> (f64, f64) {
    let tempo_us = if tempo_us == 0 {
        DEFAULT_TEMPO_US
    } else {
        tempo_us
    };
    let (numerator, denominator) = if numerator == 0 || denominator == 0 {
        (4, 4)
    } else {
        (numerator, denominator)
    };
    let beat = (tempo_us as f64 / 1e6) * (4.0 / denominator as f64);
    (beat * numerator as f64, beat)
}

/// Bar, beat and quarter-note lengths for one performance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarTiming {
    pub bar: f64,
    pub beat: f64,
    /// Length of a quarter note, independent of the signature denominator.
    pub quarter: f64,
}

impl BarTiming {
    pub fn new(tempo_us: u32, numerator: u8, denominator: u8) -> Self {
        let (bar, beat) = resolve_bar_beat(tempo_us, numerator, denominator);
        let tempo_us = if tempo_us == 0 {
            DEFAULT_TEMPO_US
        } else {
            tempo_us
        };
        Self {
            bar,
            beat,
            quarter: tempo_us as f64 / 1e6,
        }
    }

    /// Zero-based index of the bar containing `time`.
    pub fn bar_index(&self, time: f64) -> u32 {
        if time <= 0.0 {
            0
        } else {
            (time / self.bar).floor() as u32
        }
    }

    /// Number of bars needed to cover `end` seconds (at least one).
    pub fn bar_count(&self, end: f64) -> u32 {
        ((end / self.bar).ceil() as u32).max(1)
    }
}

impl Default for BarTiming {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO_US, 4, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_two_second_bars() {
        assert_eq!(resolve_bar_beat(DEFAULT_TEMPO_US, 4, 4), (2.0, 0.5));
        let t = BarTiming::default();
        assert_eq!(t.bar, 2.0);
        assert_eq!(t.beat, 0.5);
        assert_eq!(t.quarter, 0.5);
    }

    #[test]
    fn test_compound_meter() {
        // 6/8 at 120 BPM: eighth = 0.25 s, bar = 1.5 s
        let (bar, beat) = resolve_bar_beat(500_000, 6, 8);
        assert!((beat - 0.25).abs() < 1e-12);
        assert!((bar - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs_fall_back() {
        assert_eq!(resolve_bar_beat(0, 0, 0), (2.0, 0.5));
        assert_eq!(resolve_bar_beat(500_000, 3, 0), (2.0, 0.5));
    }

    #[test]
    fn test_bar_index_and_count() {
        let t = BarTiming::default();
        assert_eq!(t.bar_index(0.0), 0);
        assert_eq!(t.bar_index(1.99), 0);
        assert_eq!(t.bar_index(2.0), 1);
        assert_eq!(t.bar_index(-1.0), 0);
        assert_eq!(t.bar_count(0.0), 1);
        assert_eq!(t.bar_count(32.0), 16);
        assert_eq!(t.bar_count(32.1), 17);
    }
}
