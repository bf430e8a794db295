use lyre_config::Config;

/// Executor timing knobs, all in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    pub countdown_us: i64,
    pub focus_poll_us: i64,
    /// Held longer than this with no planned release ahead, a key counts as
    /// stuck and is force-released.
    pub max_hold_us: i64,
    /// Log a diagnostics summary when the performance ends.
    pub log_diagnostics: bool,
}

impl PlayerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            countdown_us: config.countdown_seconds as i64 * 1_000_000,
            focus_poll_us: config.focus_poll_ms as i64 * 1_000,
            max_hold_us: config.max_hold_ms as i64 * 1_000,
            log_diagnostics: config.enable_diagnostics,
        }
    }

    pub fn with_countdown_us(mut self, countdown_us: i64) -> Self {
        self.countdown_us = countdown_us.max(0);
        self
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
