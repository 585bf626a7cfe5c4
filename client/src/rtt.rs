//! Heartbeat bookkeeping: when to ping, what the last round trip was, and
//! whether the link has gone quiet for too long.

#[derive(Debug, Clone)]
pub struct RttTracker {
    interval_ms: u64,
    timeout_ms: u64,
    next_ping_at: u64,
    last_pong_at: u64,
    current_rtt: Option<u64>,
}

impl RttTracker {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            next_ping_at: 0,
            last_pong_at: 0,
            current_rtt: None,
        }
    }

    /// Starts a fresh measurement window for a newly opened connection.
    pub fn reset(&mut self, now: u64) {
        self.next_ping_at = now;
        self.last_pong_at = now;
        self.current_rtt = None;
    }

    pub fn ping_due(&self, now: u64) -> bool {
        now >= self.next_ping_at
    }

    pub fn mark_ping_sent(&mut self, now: u64) {
        self.next_ping_at = now + self.interval_ms;
    }

    /// Records a pong echoing `echoed` and returns the measured round trip.
    pub fn record_pong(&mut self, echoed: u64, now: u64) -> u64 {
        let rtt = now.saturating_sub(echoed);
        self.current_rtt = Some(rtt);
        self.last_pong_at = now;
        rtt
    }

    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.last_pong_at) >= self.timeout_ms
    }

    pub fn current_rtt(&self) -> Option<u64> {
        self.current_rtt
    }

    pub fn last_pong_at(&self) -> u64 {
        self.last_pong_at
    }
}
