use lyre_config::{ErrorConfig, SimErrorKind};
use rand::Rng;
use rand::seq::SliceRandom;

/// One deliberate mistake, positioned inside an eight-bar group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedError {
    pub kind: SimErrorKind,
    /// Fraction of the group at which the error arms, in `[0, 1)`.
    pub position: f64,
    /// Neighbour direction for wrong and extra notes: `-1` or `1`.
    pub direction: i32,
    /// Hesitation length, only meaningful for [`SimErrorKind::Pause`].
    pub pause_ms: u32,
}

/// Errors planned for every eight-bar group of a performance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPlan {
    groups: Vec<Vec<PlannedError>>,
}

impl ErrorPlan {
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a plan from explicit groups; each group is sorted by position.
    pub fn from_groups(mut groups: Vec<Vec<PlannedError>>) -> Self {
        for group in &mut groups {
            group.sort_by(|a, b| a.position.total_cmp(&b.position));
        }
        Self { groups }
    }

    /// Draw `errors_per_8bars` errors for each of `group_count` groups.
    ///
    /// Inactive configurations return [`ErrorPlan::none`] without drawing.
    pub fn generate<R: Rng>(config: &ErrorConfig, group_count: usize, rng: &mut R) -> Self {
        if !config.is_active() {
            return Self::none();
        }
        let kinds = config.enabled_kinds();
        let (pause_min, pause_max) = if config.pause_min_ms <= config.pause_max_ms {
            (config.pause_min_ms, config.pause_max_ms)
        } else {
            (config.pause_max_ms, config.pause_min_ms)
        };

        let groups = (0..group_count)
            .map(|_| {
                let mut errors: Vec<PlannedError> = (0..config.errors_per_8bars)
                    .filter_map(|_| {
                        let kind = *kinds.choose(rng)?;
                        let position = rng.gen_range(0.0..1.0);
                        let direction = if rng.gen_bool(0.5) { 1 } else { -1 };
                        let pause_ms = if kind == SimErrorKind::Pause {
                            rng.gen_range(pause_min..=pause_max)
                        } else {
                            0
                        };
                        Some(PlannedError {
                            kind,
                            position,
                            direction,
                            pause_ms,
                        })
                    })
                    .collect();
                errors.sort_by(|a, b| a.position.total_cmp(&b.position));
                errors
            })
            .collect();
        Self { groups }
    }

    /// Errors of group `index`, ordered by position. Empty past the end.
    pub fn group(&self, index: usize) -> &[PlannedError] {
        self.groups.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
