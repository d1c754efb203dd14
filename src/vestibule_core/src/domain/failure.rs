use chrono::{DateTime, Duration, Utc};

/// Sliding window of failed login attempts for one account.
///
/// Only failures within the trailing window length count toward the lockout
/// threshold; anything older is pruned on the next write.
#[derive(Debug, Clone, Default)]
pub struct FailureWindow {
    failures: Vec<DateTime<Utc>>,
}

impl FailureWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure at `at` and return the in-window count including
    /// it. Pruning and counting happen together so a caller holding the
    /// account's entry lock gets an exact answer.
    pub fn record(&mut self, at: DateTime<Utc>, window: Duration) -> u32 {
        let cutoff = at - window;
        self.failures.retain(|stamp| *stamp > cutoff);
        self.failures.push(at);
        self.failures.len() as u32
    }

    pub fn clear(&mut self) {
        self.failures.clear();
    }

    pub fn count_within(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        let cutoff = now - window;
        self.failures.iter().filter(|stamp| **stamp > cutoff).count() as u32
    }
}
