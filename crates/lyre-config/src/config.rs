use std::path::Path;

use anyhow::Result;
use lyre_model::LayoutKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::eight_bar::EightBarStyle;
use crate::error::ConfigError;
use crate::error_sim::ErrorConfig;
use crate::style::{InputStyle, MECHANICAL, StyleRegistry};

/// Current schema version written by [`Config::write`].
pub const CONFIG_VERSION: u32 = 1;

pub const SPEED_MIN: f64 = 0.25;
pub const SPEED_MAX: f64 = 4.0;
pub const PRESS_MS_MIN: u32 = 5;
pub const PRESS_MS_MAX: u32 = 500;
pub const COUNTDOWN_MAX: u32 = 10;
pub const OCTAVE_SHIFT_MAX: i32 = 2;
pub const TRANSPOSE_MAX: i32 = 24;
pub const MIN_HOLD_MS_MIN: u32 = 10;
pub const MIN_HOLD_MS_MAX: u32 = 500;
pub const MAX_HOLD_MS_MIN: u32 = 500;
pub const MAX_HOLD_MS_MAX: u32 = 60_000;
pub const FOCUS_POLL_MS_MIN: u32 = 10;
pub const FOCUS_POLL_MS_MAX: u32 = 1000;

/// How pitches that are not on the layout get placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccidentalPolicy {
    Drop,
    Lower,
    Upper,
    #[default]
    Octave,
}

/// Pitch window used by the octave policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "OctaveRangeRepr", into = "OctaveRangeRepr")]
pub enum OctaveRange {
    /// Use the lowest and highest pitch of the layout.
    #[default]
    Auto,
    Explicit { min: i32, max: i32 },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OctaveRangeRepr {
    Keyword(String),
    Bounds([i32; 2]),
}

impl TryFrom<OctaveRangeRepr> for OctaveRange {
    type Error = ConfigError;

    fn try_from(repr: OctaveRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            OctaveRangeRepr::Keyword(s) if s.eq_ignore_ascii_case("auto") => Ok(OctaveRange::Auto),
            OctaveRangeRepr::Keyword(s) => Err(ConfigError::InvalidOctaveRange(s)),
            OctaveRangeRepr::Bounds([min, max]) => Ok(OctaveRange::Explicit { min, max }),
        }
    }
}

impl From<OctaveRange> for OctaveRangeRepr {
    fn from(range: OctaveRange) -> Self {
        match range {
            OctaveRange::Auto => OctaveRangeRepr::Keyword("auto".to_string()),
            OctaveRange::Explicit { min, max } => OctaveRangeRepr::Bounds([min, max]),
        }
    }
}

/// Performance configuration (lyre_config.json).
///
/// Keys this version does not know about are kept in `extra` and written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub root_pitch: i32,
    pub octave_shift: i32,
    pub transpose_semitones: i32,
    pub layout: LayoutKind,
    pub accidental_policy: AccidentalPolicy,
    pub octave_range: OctaveRange,
    pub speed: f64,
    pub press_ms_default: u32,
    pub use_midi_duration: bool,
    pub countdown_seconds: u32,
    pub input_style: String,
    pub custom_styles: Vec<InputStyle>,
    pub eight_bar_style: EightBarStyle,
    pub error_config: ErrorConfig,
    pub enable_diagnostics: bool,
    pub min_hold_ms: u32,
    pub max_hold_ms: u32,
    pub focus_poll_ms: u32,
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            root_pitch: 60,
            octave_shift: 0,
            transpose_semitones: 0,
            layout: LayoutKind::Diatonic21,
            accidental_policy: AccidentalPolicy::Octave,
            octave_range: OctaveRange::Auto,
            speed: 1.0,
            press_ms_default: 100,
            use_midi_duration: true,
            countdown_seconds: 3,
            input_style: MECHANICAL.to_string(),
            custom_styles: Vec::new(),
            eight_bar_style: EightBarStyle::default(),
            error_config: ErrorConfig::default(),
            enable_diagnostics: false,
            min_hold_ms: 20,
            max_hold_ms: 4000,
            focus_poll_ms: 50,
            seed: None,
            extra: Map::new(),
        }
    }
}

impl Config {
    pub fn validate(&mut self) {
        if self.version < CONFIG_VERSION {
            info!(
                "upgrading config schema from version {} to {}",
                self.version, CONFIG_VERSION
            );
            self.version = CONFIG_VERSION;
        }

        self.root_pitch = self.root_pitch.clamp(0, 127);
        self.octave_shift = self.octave_shift.clamp(-OCTAVE_SHIFT_MAX, OCTAVE_SHIFT_MAX);
        self.transpose_semitones = self
            .transpose_semitones
            .clamp(-TRANSPOSE_MAX, TRANSPOSE_MAX);

        if !self.speed.is_finite() {
            self.speed = 1.0;
        }
        self.speed = self.speed.clamp(SPEED_MIN, SPEED_MAX);
        self.press_ms_default = self.press_ms_default.clamp(PRESS_MS_MIN, PRESS_MS_MAX);
        self.countdown_seconds = self.countdown_seconds.min(COUNTDOWN_MAX);

        self.min_hold_ms = self.min_hold_ms.clamp(MIN_HOLD_MS_MIN, MIN_HOLD_MS_MAX);
        self.max_hold_ms = self.max_hold_ms.clamp(MAX_HOLD_MS_MIN, MAX_HOLD_MS_MAX);
        self.focus_poll_ms = self.focus_poll_ms.clamp(FOCUS_POLL_MS_MIN, FOCUS_POLL_MS_MAX);

        if self.input_style.trim().is_empty() {
            self.input_style = MECHANICAL.to_string();
        }
        for style in &mut self.custom_styles {
            style.builtin = false;
            style.validate();
        }

        self.eight_bar_style.validate();
        self.error_config.validate();
    }

    /// Registry of built-in plus user-defined input styles.
    pub fn style_registry(&self) -> StyleRegistry {
        StyleRegistry::with_custom(&self.custom_styles)
    }

    /// The active input style, falling back to `mechanical`.
    pub fn active_style(&self) -> InputStyle {
        self.style_registry().resolve(&self.input_style)
    }

    /// Read config from a JSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&data)?;
        config.validate();
        Ok(config)
    }

    /// Write config to a JSON file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
