//! Request/build counters threaded through every pipeline stage.
//!
//! Grounded on the original implementation's `monitoring` package
//! (`RequestTracker` + `ArticleCounter`): a `defaultdict`-of-counts kept behind
//! a lock, reported at INFO via a couple of summary methods. Here the two are
//! folded into one `Telemetry` struct shared behind an `Arc` and mutated from
//! whichever worker task is running at the time — a per-field mutex is
//! sufficient given the low contention the design doc calls out.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

/// Counters for request outcomes, keyed by `(method, status_code)`.
///
/// `method` is one of `custom_<host>_request`, `basic_request`,
/// `postman_request`, `playwright_request`, `all_methods_failed`.
#[derive(Debug, Default)]
struct RequestTracker {
    counts: HashMap<(String, u16), u64>,
}

impl RequestTracker {
    fn track(&mut self, method: &str, status: u16) {
        *self.counts.entry((method.to_string(), status)).or_insert(0) += 1;
    }
}

/// Per-provider (URL host) build success/failure counts.
#[derive(Debug, Default)]
struct BuildCounter {
    counts: HashMap<String, (u64, u64)>, // provider -> (successful, failed)
}

impl BuildCounter {
    fn track(&mut self, provider: &str, success: bool) {
        let entry = self.counts.entry(provider.to_string()).or_insert((0, 0));
        if success {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
}

/// Shared, concurrency-safe telemetry sink for one pipeline run.
///
/// Counters live for the duration of a single `NewsPipeline::run` call; the
/// caller constructs a fresh one per run.
#[derive(Debug, Default)]
pub struct Telemetry {
    requests: Mutex<RequestTracker>,
    builds: Mutex<BuildCounter>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fetch-stage outcome.
    pub fn track_request(&self, method: &str, status: u16) {
        self.requests
            .lock()
            .expect("telemetry request lock poisoned")
            .track(method, status);
    }

    /// Record one build attempt for `provider` (typically the URL host).
    pub fn track_build(&self, provider: &str, success: bool) {
        self.builds
            .lock()
            .expect("telemetry build lock poisoned")
            .track(provider, success);
    }

    /// Current count for a specific `(method, status)` pair. Mostly useful in
    /// tests asserting fallback-chain behavior.
    pub fn request_count(&self, method: &str, status: u16) -> u64 {
        self.requests
            .lock()
            .expect("telemetry request lock poisoned")
            .counts
            .get(&(method.to_string(), status))
            .copied()
            .unwrap_or(0)
    }

    /// Log a one-line INFO summary of every request outcome recorded so far.
    pub fn log_request_summary(&self) {
        let tracker = self.requests.lock().expect("telemetry request lock poisoned");
        for ((method, status), count) in tracker.counts.iter() {
            info!(method = %method, status, count, "request outcome");
        }
    }

    /// Log per-provider build success/fail totals.
    pub fn log_build_summary(&self) {
        let builds = self.builds.lock().expect("telemetry build lock poisoned");
        for (provider, (success, failed)) in builds.counts.iter() {
            info!(provider = %provider, successful = success, failed, "build outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_requests_by_method_and_status() {
        let t = Telemetry::new();
        t.track_request("basic_request", 200);
        t.track_request("basic_request", 200);
        t.track_request("postman_request", 403);
        assert_eq!(t.request_count("basic_request", 200), 2);
        assert_eq!(t.request_count("postman_request", 403), 1);
        assert_eq!(t.request_count("playwright_request", 200), 0);
    }

    #[test]
    fn tracks_builds_by_provider() {
        let t = Telemetry::new();
        t.track_build("example.com", true);
        t.track_build("example.com", false);
        t.track_build("example.com", true);
        let builds = t.builds.lock().unwrap();
        assert_eq!(builds.counts.get("example.com"), Some(&(2, 1)));
    }
}
