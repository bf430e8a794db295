use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound accepted for any eight-bar multiplier.
pub const MULTIPLIER_MAX: f64 = 4.0;
/// Lower bound accepted for any eight-bar multiplier.
pub const MULTIPLIER_MIN: f64 = 0.25;

/// How a selected segment is modulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EightBarMode {
    /// The whole segment plays faster or slower; later segments shift accordingly.
    #[default]
    Warp,
    /// Beat onsets stay put; only positions inside each beat stretch.
    BeatLock,
}

/// Which eight-bar segments receive non-identity multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentPattern {
    #[default]
    Every,
    EverySecond,
    EveryThird,
    EveryFourth,
}

impl SegmentPattern {
    pub fn period(self) -> u32 {
        match self {
            SegmentPattern::Every => 1,
            SegmentPattern::EverySecond => 2,
            SegmentPattern::EveryThird => 3,
            SegmentPattern::EveryFourth => 4,
        }
    }

    /// Whether zero-based segment `index` is selected. "Every second" picks 1, 3, 5...
    pub fn selects(self, index: usize) -> bool {
        (index as u32 + 1) % self.period() == 0
    }
}

/// Segment-level tempo, timing and duration modulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EightBarStyle {
    pub enabled: bool,
    pub mode: EightBarMode,
    pub pattern: SegmentPattern,
    pub speed_range: (f64, f64),
    pub timing_range: (f64, f64),
    pub duration_range: (f64, f64),
    /// Optional `(min, max)` applied to every drawn multiplier.
    pub clamp: Option<(f64, f64)>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EightBarStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: EightBarMode::Warp,
            pattern: SegmentPattern::Every,
            speed_range: (1.0, 1.0),
            timing_range: (1.0, 1.0),
            duration_range: (1.0, 1.0),
            clamp: None,
            extra: Map::new(),
        }
    }
}

fn ordered_range((lo, hi): (f64, f64)) -> (f64, f64) {
    let lo = if lo.is_finite() { lo } else { 1.0 };
    let hi = if hi.is_finite() { hi } else { 1.0 };
    let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
    (
        lo.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX),
        hi.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX),
    )
}

impl EightBarStyle {
    /// Named starting points; all come back enabled.
    pub fn preset(name: &str) -> Option<Self> {
        let style = match name {
            "subtle_warp" => Self {
                speed_range: (0.95, 1.05),
                duration_range: (0.95, 1.05),
                ..Default::default()
            },
            "rubato" => Self {
                pattern: SegmentPattern::EverySecond,
                speed_range: (0.85, 1.1),
                duration_range: (0.9, 1.15),
                clamp: Some((0.8, 1.2)),
                ..Default::default()
            },
            "beat_swing" => Self {
                mode: EightBarMode::BeatLock,
                timing_range: (1.05, 1.2),
                duration_range: (0.9, 1.0),
                ..Default::default()
            },
            _ => return None,
        };
        Some(Self {
            enabled: true,
            ..style
        })
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["subtle_warp", "rubato", "beat_swing"]
    }

    pub fn validate(&mut self) {
        self.speed_range = ordered_range(self.speed_range);
        self.timing_range = ordered_range(self.timing_range);
        self.duration_range = ordered_range(self.duration_range);
        self.clamp = self.clamp.map(ordered_range);
    }

    /// Apply the global clamp, if any, to a drawn multiplier.
    pub fn clamp_multiplier(&self, value: f64) -> f64 {
        match self.clamp {
            Some((lo, hi)) => value.clamp(lo, hi),
            None => value,
        }
    }
}
