use std::time::{Duration, Instant};

/// Upper bounds of the latency histogram buckets, in milliseconds.
/// The last bucket collects everything at or above 20 ms.
pub const LATENCY_BUCKETS_MS: [f64; 5] = [1.0, 2.0, 5.0, 10.0, 20.0];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub max_ms: f64,
    pub histogram: [u64; LATENCY_BUCKETS_MS.len() + 1],
}

/// Snapshot of backend and recovery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Diagnostics {
    pub press: u64,
    pub release: u64,
    pub failed_press: u64,
    pub failed_release: u64,
    pub latency: LatencyStats,
    pub focus_lost_releases: u64,
    pub stuck_recoveries: u64,
}

impl Diagnostics {
    /// Successful plus failed injections.
    pub fn total_calls(&self) -> u64 {
        self.press + self.release + self.failed_press + self.failed_release
    }
}

/// Accumulates injection counts and call latency for a backend.
#[derive(Debug, Default)]
pub struct DiagnosticsRecorder {
    snapshot: Diagnostics,
    latency_total_ms: f64,
    timed_calls: u64,
}

impl DiagnosticsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one injection call and record its latency.
    pub fn time<T, E>(&mut self, f: impl FnOnce() -> Result<T, E>) -> (Result<T, E>, Duration) {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        self.record_latency(elapsed);
        (result, elapsed)
    }

    pub fn record_latency(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.timed_calls += 1;
        self.latency_total_ms += ms;
        let latency = &mut self.snapshot.latency;
        latency.max_ms = latency.max_ms.max(ms);
        latency.avg_ms = self.latency_total_ms / self.timed_calls as f64;
        let bucket = LATENCY_BUCKETS_MS
            .iter()
            .position(|&bound| ms < bound)
            .unwrap_or(LATENCY_BUCKETS_MS.len());
        latency.histogram[bucket] += 1;
    }

    pub fn record_press(&mut self, ok: bool) {
        if ok {
            self.snapshot.press += 1;
        } else {
            self.snapshot.failed_press += 1;
        }
    }

    pub fn record_release(&mut self, ok: bool) {
        if ok {
            self.snapshot.release += 1;
        } else {
            self.snapshot.failed_release += 1;
        }
    }

    pub fn snapshot(&self) -> Diagnostics {
        self.snapshot
    }
}
