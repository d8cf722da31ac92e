//! Channel hopping while the radio is in monitor mode.

use crate::config::HopPolicy;
use crate::radio::RadioDriver;
use crate::telemetry;
use crate::types::ScanState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HopOutcome {
    #[default]
    Idle,
    Hopped { channel: u8 },
    RetuneFailed { channel: u8 },
}

pub struct ChannelScheduler {
    policy: HopPolicy,
    state: ScanState,
}

impl ChannelScheduler {
    pub fn new(policy: HopPolicy) -> Self {
        let policy = policy.sanitized();
        Self {
            policy,
            state: ScanState {
                current_channel: policy.first_channel,
                last_hop_ms: 0,
                active: false,
            },
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn current_channel(&self) -> u8 {
        self.state.current_channel
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn policy(&self) -> HopPolicy {
        self.policy
    }

    /// Starts (or resumes) hopping from the frozen channel and re-tunes the
    /// radio to it, since client mode may have moved the radio elsewhere.
    pub fn resume<R: RadioDriver>(&mut self, now_ms: u64, radio: &mut R) -> HopOutcome {
        self.state.active = true;
        self.state.last_hop_ms = now_ms;
        self.tune(radio)
    }

    pub fn suspend(&mut self) {
        self.state.active = false;
    }

    pub fn poll<R: RadioDriver>(&mut self, now_ms: u64, radio: &mut R) -> HopOutcome {
        if !self.state.active {
            return HopOutcome::Idle;
        }
        let dwell = u64::from(self.policy.dwell_ms);
        let steps = now_ms.saturating_sub(self.state.last_hop_ms) / dwell;
        if steps == 0 {
            return HopOutcome::Idle;
        }
        self.state.last_hop_ms += steps * dwell;

        let range = u64::from(self.policy.channel_count());
        let offset = u64::from(self.state.current_channel - self.policy.first_channel);
        let next = self.policy.first_channel + ((offset + steps) % range) as u8;
        if next == self.state.current_channel {
            return HopOutcome::Idle;
        }
        self.state.current_channel = next;
        telemetry::record_channel_hop();
        self.tune(radio)
    }

    fn tune<R: RadioDriver>(&mut self, radio: &mut R) -> HopOutcome {
        let channel = self.state.current_channel;
        match radio.set_channel(channel) {
            Ok(()) => HopOutcome::Hopped { channel },
            Err(err) => {
                telemetry::record_retune_failure();
                log::warn!("hop: retune failed channel={} err={:?}", channel, err);
                HopOutcome::RetuneFailed { channel }
            }
        }
    }
}
