use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Abstraction over monotonic time sources.
/// Implementations: SystemClock (production), ManualClock (testing).
pub trait Clock: Send + Sync {
    /// Current time in microseconds from an arbitrary epoch.
    fn now_us(&self) -> i64;

    /// Block for `us` microseconds. Non-positive values return immediately.
    fn sleep_us(&self, us: i64);
}

/// Wall clock backed by `std::time::Instant`.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        self.start.elapsed().as_micros() as i64
    }

    fn sleep_us(&self, us: i64) {
        if us > 0 {
            std::thread::sleep(Duration::from_micros(us as u64));
        }
    }
}

/// Virtual clock for deterministic tests.
///
/// Sleeping advances the clock instead of blocking, so a whole performance
/// runs as fast as the executor can dispatch it.
#[derive(Default)]
pub struct ManualClock {
    current_us: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, us: i64) {
        self.current_us.store(us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: i64) {
        self.current_us.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.current_us.load(Ordering::SeqCst)
    }

    fn sleep_us(&self, us: i64) {
        if us > 0 {
            self.advance(us);
        }
        std::thread::yield_now();
    }
}
