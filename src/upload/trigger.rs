#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerDecision {
    NotDue,
    /// Interval elapsed but there is nothing to send; the interval restarts.
    SkipEmpty,
    Fire,
}

/// Fixed-interval upload schedule, only running while scanning.
#[derive(Clone, Copy, Debug)]
pub struct UploadTrigger {
    interval_ms: u64,
    last_ms: u64,
}

impl UploadTrigger {
    pub fn new(interval_ms: u32, now_ms: u64) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            last_ms: now_ms,
        }
    }

    pub fn due(&mut self, now_ms: u64, scanning: bool, network_count: usize) -> TriggerDecision {
        if !scanning || now_ms.saturating_sub(self.last_ms) < self.interval_ms {
            return TriggerDecision::NotDue;
        }
        self.last_ms = now_ms;
        if network_count == 0 {
            TriggerDecision::SkipEmpty
        } else {
            TriggerDecision::Fire
        }
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }

    pub fn last_ms(&self) -> u64 {
        self.last_ms
    }
}
