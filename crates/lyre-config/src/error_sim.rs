use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ERRORS_PER_8BARS_MAX: u32 = 8;
pub const PAUSE_MS_MAX: u32 = 2000;

/// Kind of deliberate mistake injected during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimErrorKind {
    /// Press a neighbouring key instead of the right one.
    WrongNote,
    /// Skip the press entirely.
    MissNote,
    /// Play the right key plus a short tap on a neighbour.
    ExtraNote,
    /// Hesitate before the press.
    Pause,
}

impl SimErrorKind {
    pub const ALL: [SimErrorKind; 4] = [
        SimErrorKind::WrongNote,
        SimErrorKind::MissNote,
        SimErrorKind::ExtraNote,
        SimErrorKind::Pause,
    ];
}

impl fmt::Display for SimErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimErrorKind::WrongNote => "wrong note",
            SimErrorKind::MissNote => "missed note",
            SimErrorKind::ExtraNote => "extra note",
            SimErrorKind::Pause => "pause",
        };
        f.write_str(name)
    }
}

/// Error simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ErrorConfig {
    pub enabled: bool,
    #[serde(rename = "errorsPer8Bars")]
    pub errors_per_8bars: u32,
    pub wrong_note: bool,
    pub miss_note: bool,
    pub extra_note: bool,
    pub pause: bool,
    pub pause_min_ms: u32,
    pub pause_max_ms: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            errors_per_8bars: 1,
            wrong_note: true,
            miss_note: true,
            extra_note: true,
            pause: true,
            pause_min_ms: 100,
            pause_max_ms: 500,
            extra: Map::new(),
        }
    }
}

impl ErrorConfig {
    pub fn validate(&mut self) {
        self.errors_per_8bars = self.errors_per_8bars.min(ERRORS_PER_8BARS_MAX);
        self.pause_min_ms = self.pause_min_ms.min(PAUSE_MS_MAX);
        self.pause_max_ms = self.pause_max_ms.min(PAUSE_MS_MAX);
        if self.pause_min_ms > self.pause_max_ms {
            std::mem::swap(&mut self.pause_min_ms, &mut self.pause_max_ms);
        }
    }

    pub fn enabled_kinds(&self) -> Vec<SimErrorKind> {
        SimErrorKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                SimErrorKind::WrongNote => self.wrong_note,
                SimErrorKind::MissNote => self.miss_note,
                SimErrorKind::ExtraNote => self.extra_note,
                SimErrorKind::Pause => self.pause,
            })
            .collect()
    }

    /// Whether any error will actually be planned.
    pub fn is_active(&self) -> bool {
        self.enabled && self.errors_per_8bars > 0 && !self.enabled_kinds().is_empty()
    }
}
