use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const MECHANICAL: &str = "mechanical";

/// Largest accepted magnitude for `duration_variation`.
pub const DURATION_VARIATION_MAX: f64 = 0.9;

/// Humanization parameters.
///
/// Built-in styles ship with the crate; user styles have the same shape with
/// `builtin = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputStyle {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `(min, max)` per-note timing offset in milliseconds.
    #[serde(default)]
    pub timing_offset_range: (f64, f64),
    /// Extra delay per chord member, in milliseconds.
    #[serde(default)]
    pub stagger_ms: f64,
    /// Fractional duration change; negative values only shorten.
    #[serde(default)]
    pub duration_variation: f64,
    #[serde(default)]
    pub builtin: bool,
}

impl InputStyle {
    fn builtin(
        name: &str,
        description: &str,
        timing_offset_range: (f64, f64),
        stagger_ms: f64,
        duration_variation: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            timing_offset_range,
            stagger_ms,
            duration_variation,
            builtin: true,
        }
    }

    /// The identity style: no offsets, no stagger, no duration change.
    pub fn mechanical() -> Self {
        Self::builtin(MECHANICAL, "Exact timing, no variation", (0.0, 0.0), 0.0, 0.0)
    }

    pub fn is_identity(&self) -> bool {
        self.timing_offset_range == (0.0, 0.0)
            && self.stagger_ms == 0.0
            && self.duration_variation == 0.0
    }

    /// Order the offset range, clamp stagger to >= 0 and bound the duration variation.
    pub fn validate(&mut self) {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let (lo, hi) = (finite(self.timing_offset_range.0), finite(self.timing_offset_range.1));
        self.timing_offset_range = (lo, hi);
        if lo > hi {
            self.timing_offset_range = (hi, lo);
        }
        if !self.stagger_ms.is_finite() || self.stagger_ms < 0.0 {
            self.stagger_ms = 0.0;
        }
        if !self.duration_variation.is_finite() {
            self.duration_variation = 0.0;
        }
        self.duration_variation = self
            .duration_variation
            .clamp(-DURATION_VARIATION_MAX, DURATION_VARIATION_MAX);
    }
}

impl Default for InputStyle {
    fn default() -> Self {
        Self::mechanical()
    }
}

fn builtin_styles() -> Vec<InputStyle> {
    vec![
        InputStyle::mechanical(),
        InputStyle::builtin(
            "natural",
            "Light timing drift with a slight chord roll",
            (-10.0, 10.0),
            4.0,
            0.05,
        ),
        InputStyle::builtin(
            "expressive",
            "Wider rubato and noticeably rolled chords",
            (-20.0, 25.0),
            8.0,
            0.12,
        ),
        InputStyle::builtin(
            "aggressive",
            "Rushes ahead and clips notes short",
            (-12.0, 2.0),
            2.0,
            -0.2,
        ),
        InputStyle::builtin(
            "casual",
            "Loose timing, lazy chords",
            (-30.0, 30.0),
            12.0,
            0.2,
        ),
    ]
}

/// Name-indexed collection of input styles.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    styles: BTreeMap<String, InputStyle>,
}

impl StyleRegistry {
    /// Registry holding only the built-in styles.
    pub fn new() -> Self {
        let styles = builtin_styles()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        Self { styles }
    }

    /// Built-ins plus user styles. Invalid user styles are skipped with a warning.
    pub fn with_custom<'a>(custom: impl IntoIterator<Item = &'a InputStyle>) -> Self {
        let mut registry = Self::new();
        for style in custom {
            if let Err(e) = registry.register(style.clone()) {
                warn!("skipping custom style {:?}: {e}", style.name);
            }
        }
        registry
    }

    /// Add or replace a user style. Built-in names are reserved.
    pub fn register(&mut self, mut style: InputStyle) -> Result<(), ConfigError> {
        let name = style.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyStyleName);
        }
        if self.styles.get(&name).is_some_and(|s| s.builtin) {
            return Err(ConfigError::BuiltinOverride(name));
        }
        style.name = name.clone();
        style.builtin = false;
        style.validate();
        self.styles.insert(name, style);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&InputStyle> {
        self.styles.get(name)
    }

    /// Look up a style; unknown names resolve to `mechanical`.
    pub fn resolve(&self, name: &str) -> InputStyle {
        match self.styles.get(name) {
            Some(style) => style.clone(),
            None => {
                warn!("unknown input style {name:?}, using {MECHANICAL}");
                InputStyle::mechanical()
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputStyle> {
        self.styles.values()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
