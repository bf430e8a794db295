use std::ops::Range;
use std::sync::Arc;

use crate::clock::Clock;

/// Answers whether the target application currently owns the foreground.
pub trait FocusProbe: Send {
    fn is_focused(&mut self) -> bool;
}

/// Probe for platforms or runs without a target window.
pub struct AlwaysFocused;

impl FocusProbe for AlwaysFocused {
    fn is_focused(&mut self) -> bool {
        true
    }
}

/// Focus follows a script of blurred intervals on a clock.
pub struct ScriptedFocus {
    clock: Arc<dyn Clock>,
    /// Microsecond ranges during which focus is lost.
    blurred: Vec<Range<i64>>,
}

impl ScriptedFocus {
    pub fn new(clock: Arc<dyn Clock>, blurred: Vec<Range<i64>>) -> Self {
        Self { clock, blurred }
    }
}

impl FocusProbe for ScriptedFocus {
    fn is_focused(&mut self) -> bool {
        let now = self.clock.now_us();
        !self.blurred.iter().any(|r| r.contains(&now))
    }
}
