use lyre_config::InputStyle;
use rand::Rng;

/// Shortest duration the humanizer will ever produce, in seconds.
pub const MIN_HUMANIZED_DURATION: f64 = 0.010;

/// Applies an input style's timing jitter, chord stagger and duration variation.
#[derive(Debug, Clone)]
pub struct Humanizer {
    style: InputStyle,
    min_duration: f64,
}

impl Humanizer {
    /// `min_hold` is in seconds; results are never shorter than `max(min_hold, 10 ms)`.
    pub fn new(mut style: InputStyle, min_hold: f64) -> Self {
        style.validate();
        Self {
            style,
            min_duration: min_hold.max(MIN_HUMANIZED_DURATION),
        }
    }

    pub fn style(&self) -> &InputStyle {
        &self.style
    }

    /// Timing offset in seconds for the chord member at `member`.
    pub fn offset<R: Rng>(&self, member: usize, rng: &mut R) -> f64 {
        let (lo, hi) = self.style.timing_offset_range;
        let jitter_ms = if lo < hi { rng.gen_range(lo..=hi) } else { lo };
        (jitter_ms + member as f64 * self.style.stagger_ms) / 1000.0
    }

    /// Scaled duration, clamped to the minimum hold.
    pub fn duration<R: Rng>(&self, duration: f64, rng: &mut R) -> f64 {
        let v = self.style.duration_variation;
        let scaled = if v > 0.0 {
            duration * (1.0 + rng.gen_range(-v..=v))
        } else if v < 0.0 {
            duration * (1.0 + rng.gen_range(v..=0.0))
        } else {
            duration
        };
        scaled.max(self.min_duration)
    }

    /// Humanize one note: returns `(time, duration)` in seconds.
    pub fn apply<R: Rng>(&self, time: f64, duration: f64, member: usize, rng: &mut R) -> (f64, f64) {
        let offset = self.offset(member, rng);
        let time = if offset == 0.0 {
            time
        } else {
            (time + offset).max(0.0)
        };
        (time, self.duration(duration, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn style(offset: (f64, f64), stagger: f64, variation: f64) -> InputStyle {
        InputStyle {
            name: "test".to_string(),
            description: String::new(),
            timing_offset_range: offset,
            stagger_ms: stagger,
            duration_variation: variation,
            builtin: false,
        }
    }

    #[test]
    fn test_mechanical_is_identity_on_timing() {
        let h = Humanizer::new(InputStyle::mechanical(), 0.02);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for (i, t) in [0.0, 0.1, 1.2345, 99.5].into_iter().enumerate() {
            let (time, duration) = h.apply(t, 0.4, i, &mut rng);
            assert_eq!(time, t);
            assert_eq!(duration, 0.4);
        }
    }

    #[test]
    fn test_duration_clamped_to_min_hold() {
        let h = Humanizer::new(InputStyle::mechanical(), 0.005);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(h.duration(0.001, &mut rng), MIN_HUMANIZED_DURATION);
        let h = Humanizer::new(InputStyle::mechanical(), 0.05);
        assert_eq!(h.duration(0.001, &mut rng), 0.05);
    }

    #[test]
    fn test_offsets_stay_in_range() {
        let h = Humanizer::new(style((-10.0, 20.0), 0.0, 0.0), 0.02);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let off = h.offset(0, &mut rng);
            assert!((-0.010..=0.020).contains(&off), "{off}");
        }
    }

    #[test]
    fn test_stagger_adds_per_member() {
        let h = Humanizer::new(style((0.0, 0.0), 5.0, 0.0), 0.02);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(h.offset(0, &mut rng), 0.0);
        assert!((h.offset(3, &mut rng) - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_negative_variation_only_shortens() {
        let h = Humanizer::new(style((0.0, 0.0), 0.0, -0.3), 0.01);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let d = h.duration(1.0, &mut rng);
            assert!((0.7..=1.0).contains(&d), "{d}");
        }
    }

    #[test]
    fn test_positive_variation_is_symmetric() {
        let h = Humanizer::new(style((0.0, 0.0), 0.0, 0.2), 0.01);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let samples: Vec<f64> = (0..2000).map(|_| h.duration(1.0, &mut rng)).collect();
        assert!(samples.iter().all(|d| (0.8..=1.2).contains(d)));
        assert!(samples.iter().any(|&d| d < 1.0));
        assert!(samples.iter().any(|&d| d > 1.0));
    }

    #[test]
    fn test_negative_offset_never_goes_before_zero() {
        let h = Humanizer::new(style((-50.0, -40.0), 0.0, 0.0), 0.02);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (time, _) = h.apply(0.01, 0.1, 0, &mut rng);
        assert_eq!(time, 0.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let h = Humanizer::new(style((-20.0, 20.0), 3.0, 0.1), 0.02);
        let mut a = ChaCha8Rng::seed_from_u64(11);
        let mut b = ChaCha8Rng::seed_from_u64(11);
        for i in 0..50 {
            assert_eq!(h.apply(i as f64, 0.3, i % 3, &mut a), h.apply(i as f64, 0.3, i % 3, &mut b));
        }
    }
}
