use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use lyre_config::SimErrorKind;
use lyre_input::{Clock, FocusProbe};
use lyre_plan::{EventKind, EventQueue, KeyEvent, Plan, PlannedError};
use tracing::{debug, info, warn};

use crate::control::{Shared, WAIT_SLICE_US};
use crate::keys::KeyDriver;
use crate::observer::Observers;
use crate::options::PlayerOptions;
use crate::report::{ErrorStats, Outcome, PerformanceReport};
use crate::state::PlayerState;

/// Most events dispatched per wake-up before control flags are rechecked.
pub const MAX_BATCH: usize = 50;

/// Minimum performance time between progress callbacks.
pub const PROGRESS_INTERVAL_US: i64 = 50_000;

/// How long a simulated neighbour key stays down.
pub const TAP_HOLD_US: i64 = 30_000;

fn to_us(seconds: f64) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}

/// The worker side of a performance. Runs on the player thread and owns the
/// queue, the held keys and the backend.
pub(crate) struct Executor {
    plan: Plan,
    queue: EventQueue,
    options: PlayerOptions,
    clock: Arc<dyn Clock>,
    focus: Box<dyn FocusProbe>,
    driver: KeyDriver,
    observers: Observers,
    shared: Arc<Shared>,

    started: bool,
    epoch_us: i64,
    paused_total_us: i64,
    last_poll_us: i64,
    focused: bool,
    last_progress_us: i64,
    progress_sent: f64,
    current_bar: u32,
    error_cursor: Vec<usize>,
    /// Planned release times per key that have not been dispatched yet.
    releases_ahead: BTreeMap<char, VecDeque<i64>>,
    /// Planned release time of each key's current hold.
    hold_until: BTreeMap<char, i64>,

    presses: u64,
    releases: u64,
    missed: u64,
    skipped_releases: u64,
    error_stats: ErrorStats,
    focus_lost_releases: u64,
    stuck_recoveries: u64,
}

impl Executor {
    pub(crate) fn new(
        mut plan: Plan,
        options: PlayerOptions,
        clock: Arc<dyn Clock>,
        focus: Box<dyn FocusProbe>,
        driver: KeyDriver,
        observers: Observers,
        shared: Arc<Shared>,
    ) -> Self {
        let queue = std::mem::take(&mut plan.queue);
        let mut releases_ahead: BTreeMap<char, VecDeque<i64>> = BTreeMap::new();
        for event in queue.to_sorted_vec() {
            if let (EventKind::Release, Some(key)) = (event.kind, event.key) {
                releases_ahead.entry(key).or_default().push_back(to_us(event.time));
            }
        }
        Self {
            plan,
            queue,
            options,
            clock,
            focus,
            driver,
            observers,
            shared,
            started: false,
            epoch_us: 0,
            paused_total_us: 0,
            last_poll_us: 0,
            focused: true,
            last_progress_us: 0,
            progress_sent: 0.0,
            current_bar: 0,
            error_cursor: Vec::new(),
            releases_ahead,
            hold_until: BTreeMap::new(),
            presses: 0,
            releases: 0,
            missed: 0,
            skipped_releases: 0,
            error_stats: ErrorStats::default(),
            focus_lost_releases: 0,
            stuck_recoveries: 0,
        }
    }

    pub(crate) fn run(mut self) -> PerformanceReport {
        let outcome = self.perform();
        self.shutdown(outcome)
    }

    fn set_state(&mut self, state: PlayerState) {
        debug!("player state {state}");
        self.shared.set_state(state);
        self.observers.state(state);
    }

    fn log(&mut self, message: &str) {
        info!("{message}");
        self.observers.log(message);
    }

    fn perf_us(&self, now_us: i64) -> i64 {
        now_us - self.epoch_us - self.paused_total_us
    }

    fn perform(&mut self) -> Outcome {
        if self.queue.is_empty() {
            return Outcome::Finished;
        }

        self.set_state(PlayerState::Countdown);
        if !self.countdown() {
            return Outcome::Stopped;
        }

        self.started = true;
        self.epoch_us = self.clock.now_us();
        self.last_poll_us = self.epoch_us;
        self.resume_state();
        self.emit_progress(0);

        loop {
            if self.shared.stop_requested() {
                return Outcome::Stopped;
            }
            let now = self.clock.now_us();
            self.poll_focus(now);
            self.recover_stuck(now);

            let perf = self.perf_us(now);
            if perf - self.last_progress_us >= PROGRESS_INTERVAL_US {
                self.emit_progress(perf);
            }

            let Some(next) = self.queue.peek() else {
                return Outcome::Finished;
            };
            let due = to_us(next.time);
            if perf < due {
                let until_poll = self.last_poll_us + self.options.focus_poll_us - now;
                let wait = (due - perf).min(WAIT_SLICE_US).min(until_poll.max(1));
                self.clock.sleep_us(wait);
                continue;
            }
            self.dispatch_batch(perf);
        }
    }

    /// Returns false if stopped before the countdown ran out.
    fn countdown(&mut self) -> bool {
        let end = self.clock.now_us() + self.options.countdown_us;
        let mut announced = None;
        loop {
            if self.shared.stop_requested() {
                return false;
            }
            let now = self.clock.now_us();
            if now >= end {
                return true;
            }
            let remaining = (end - now + 999_999) / 1_000_000;
            if announced != Some(remaining) {
                announced = Some(remaining);
                self.log(&format!("starting in {remaining}..."));
            }
            self.clock.sleep_us((end - now).min(WAIT_SLICE_US));
        }
    }

    /// Enter PLAYING, or PAUSING when a pause is already pending.
    fn resume_state(&mut self) {
        let state = if self.shared.flags().requested {
            PlayerState::Pausing
        } else {
            PlayerState::Playing
        };
        self.set_state(state);
    }

    fn emit_progress(&mut self, perf_us: i64) {
        let total = self.plan.total_duration;
        let current = (perf_us as f64 / 1_000_000.0)
            .min(total)
            .max(self.progress_sent);
        self.progress_sent = current;
        self.last_progress_us = perf_us;
        self.observers.progress(current, total);
    }

    fn dispatch_batch(&mut self, perf_us: i64) {
        for _ in 0..MAX_BATCH {
            let Some(next) = self.queue.peek() else {
                return;
            };
            if to_us(next.time) > perf_us {
                return;
            }
            let Some(event) = self.queue.pop() else {
                return;
            };
            let marker = event.kind == EventKind::PauseMarker;
            self.dispatch(event);
            if marker || self.shared.stop_requested() {
                return;
            }
        }
    }

    fn dispatch(&mut self, event: KeyEvent) {
        match event.kind {
            EventKind::Release => self.release(event),
            EventKind::PauseMarker => self.marker(event),
            EventKind::Press => self.press(event),
        }
    }

    fn release(&mut self, event: KeyEvent) {
        let Some(key) = event.key else {
            return;
        };
        if let Some(ahead) = self.releases_ahead.get_mut(&key) {
            ahead.pop_front();
        }
        self.hold_until.remove(&key);
        if !self.driver.is_held(key) {
            // Already released by focus loss, a pause, an error or stuck recovery.
            self.skipped_releases += 1;
            return;
        }
        if self.driver.release(key, event.pitch) {
            self.releases += 1;
        }
    }

    fn press(&mut self, event: KeyEvent) {
        let Some(key) = event.key else {
            return;
        };
        if !self.focused {
            self.missed += 1;
            debug!(key = %key, bar = event.bar, "press skipped while unfocused");
            return;
        }
        match self.take_error(&event) {
            Some(error) => self.fire_error(error, key, &event),
            None => self.press_key(key, event.pitch),
        }
    }

    fn press_key(&mut self, key: char, pitch: u8) {
        let now = self.clock.now_us();
        if self.driver.press(key, pitch, now) {
            self.presses += 1;
            if let Some(&due) = self.releases_ahead.get(&key).and_then(VecDeque::front) {
                self.hold_until.insert(key, due);
            }
        }
    }

    /// The planned error this press triggers, if any. Errors reaching the
    /// same press after the first are counted as displaced.
    fn take_error(&mut self, event: &KeyEvent) -> Option<PlannedError> {
        let group = event.group();
        let errors = self.plan.errors.group(group);
        if errors.is_empty() {
            return None;
        }
        if self.error_cursor.len() <= group {
            self.error_cursor.resize(group + 1, 0);
        }
        let cursor = self.error_cursor[group];
        let due = errors[cursor..]
            .iter()
            .take_while(|e| e.position <= event.group_position)
            .count();
        if due == 0 {
            return None;
        }
        let first = errors[cursor];
        self.error_cursor[group] += due;
        self.error_stats.displaced += (due - 1) as u64;
        Some(first)
    }

    fn fire_error(&mut self, error: PlannedError, key: char, event: &KeyEvent) {
        self.error_stats.record(error.kind);
        self.log(&format!("simulated {} at bar {}", error.kind, event.bar + 1));
        match error.kind {
            SimErrorKind::WrongNote => {
                if let Some(neighbour) = self.free_neighbour(key, error.direction) {
                    self.tap(neighbour, event.pitch);
                }
            }
            SimErrorKind::MissNote => {}
            SimErrorKind::ExtraNote => {
                self.press_key(key, event.pitch);
                if let Some(neighbour) = self.free_neighbour(key, error.direction) {
                    self.tap(neighbour, event.pitch);
                }
            }
            SimErrorKind::Pause => {
                self.sleep_sliced(error.pause_ms as i64 * 1_000);
                if !self.shared.stop_requested() {
                    self.press_key(key, event.pitch);
                }
            }
        }
    }

    /// Adjacent key that is currently up, preferring `direction`.
    fn free_neighbour(&self, key: char, direction: i32) -> Option<char> {
        [direction, -direction]
            .into_iter()
            .filter_map(|d| self.plan.neighbour(key, d))
            .find(|&k| k != key && !self.driver.is_held(k))
    }

    fn tap(&mut self, key: char, pitch: u8) {
        let now = self.clock.now_us();
        if self.driver.press(key, pitch, now) {
            self.sleep_sliced(TAP_HOLD_US);
            self.driver.release(key, pitch);
        }
    }

    /// Sleep in wait slices, still reporting progress while asleep.
    fn sleep_sliced(&mut self, us: i64) {
        let end = self.clock.now_us() + us;
        loop {
            let now = self.clock.now_us();
            if now >= end || self.shared.stop_requested() {
                return;
            }
            let perf = self.perf_us(now);
            if perf - self.last_progress_us >= PROGRESS_INTERVAL_US {
                self.emit_progress(perf);
            }
            self.clock.sleep_us((end - now).min(WAIT_SLICE_US));
        }
    }

    fn marker(&mut self, event: KeyEvent) {
        self.current_bar = event.bar;
        self.observers.bar(event.bar);
        let pausing = {
            let mut flags = self.shared.flags();
            if flags.requested {
                flags.requested = false;
                flags.paused = true;
                true
            } else {
                false
            }
        };
        if pausing {
            self.pause_at_bar(event.bar);
        }
    }

    fn pause_at_bar(&mut self, bar: u32) {
        let released = self.driver.release_held();
        self.set_state(PlayerState::Paused);
        self.log(&format!("paused at bar {}", bar + 1));
        if released > 0 {
            debug!(released, "released held keys for pause");
        }

        let start = self.clock.now_us();
        self.shared.wait_while_paused();
        self.paused_total_us += self.clock.now_us() - start;

        if self.shared.stop_requested() {
            return;
        }
        self.resume_state();
        self.log("resumed");
    }

    fn poll_focus(&mut self, now_us: i64) {
        if now_us - self.last_poll_us < self.options.focus_poll_us {
            return;
        }
        self.last_poll_us = now_us;
        let focused = self.focus.is_focused();
        if focused == self.focused {
            return;
        }
        self.focused = focused;
        if focused {
            self.log("focus regained");
        } else {
            let held = self.driver.held_count();
            let released = self.driver.release_held();
            if released < held {
                warn!(stuck = held - released, "keys still down after focus loss");
            }
            self.focus_lost_releases += released as u64;
            self.log(&format!("focus lost, released {released} held keys"));
        }
    }

    /// Force up keys held past the hold limit. A hold whose planned release
    /// is still ahead is a long note, not a stuck key.
    fn recover_stuck(&mut self, now_us: i64) {
        let perf = self.perf_us(now_us);
        for key in self.driver.stuck(now_us, self.options.max_hold_us) {
            if self.hold_until.get(&key).is_some_and(|&due| due >= perf) {
                continue;
            }
            self.hold_until.remove(&key);
            if self.driver.force_release(key) {
                self.stuck_recoveries += 1;
                warn!(key = %key, "released stuck key");
            }
        }
    }

    fn shutdown(&mut self, outcome: Outcome) -> PerformanceReport {
        if outcome == Outcome::Stopped {
            self.set_state(PlayerState::Stopping);
        }
        let released = self.driver.finish();
        if released > 0 {
            debug!(released, "released held keys at end of performance");
        }

        let perf = if self.started {
            self.perf_us(self.clock.now_us())
        } else {
            0
        };
        self.emit_progress(perf);

        let mut diagnostics = self.driver.diagnostics();
        diagnostics.focus_lost_releases += self.focus_lost_releases;
        diagnostics.stuck_recoveries += self.stuck_recoveries;
        if self.options.log_diagnostics {
            info!(
                press = diagnostics.press,
                release = diagnostics.release,
                failed_press = diagnostics.failed_press,
                failed_release = diagnostics.failed_release,
                avg_ms = diagnostics.latency.avg_ms,
                max_ms = diagnostics.latency.max_ms,
                focus_lost_releases = diagnostics.focus_lost_releases,
                stuck_recoveries = diagnostics.stuck_recoveries,
                "injection diagnostics"
            );
        }

        let (state, message) = match outcome {
            Outcome::Finished => (PlayerState::Finished, "finished"),
            Outcome::Stopped => (PlayerState::Stopped, "stopped"),
        };
        self.set_state(state);
        self.log(message);

        PerformanceReport {
            outcome,
            diagnostics,
            presses: self.presses,
            releases: self.releases,
            missed: self.missed,
            skipped_releases: self.skipped_releases,
            errors: self.error_stats,
            last_bar: self.current_bar,
            elapsed: perf as f64 / 1_000_000.0,
            paused: self.paused_total_us as f64 / 1_000_000.0,
        }
    }
}
