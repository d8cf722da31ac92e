use crate::types::{CHANNEL_MAX, CHANNEL_MIN};

pub const BADGE_ID: &str = match option_env!("NETBADGE_ID") {
    Some(id) => id,
    None => "MVP-BADGE-001",
};
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backing storage for the network table. Must stay a power of two because
/// the BSSID index is an `FnvIndexMap` of the same size.
pub const NETWORK_SLOTS: usize = 128;
/// Networks admitted per session; later BSSIDs are dropped.
pub const NETWORK_CAPACITY: usize = 100;

pub const CAPTURE_QUEUE_DEPTH: usize = 8;
pub const CONTROL_LOOP_PERIOD_MS: u64 = 20;
pub const AUTO_START_SCANNING: bool = true;

pub const UPLOAD_HOST: Option<&str> = option_env!("NETBADGE_UPLOAD_HOST");
pub const UPLOAD_PORT: u16 = match option_env!("NETBADGE_UPLOAD_PORT") {
    Some(port) => parse_port(port, 80),
    None => 80,
};
pub const UPLOAD_PATH: &str = match option_env!("NETBADGE_UPLOAD_PATH") {
    Some(path) => path,
    None => "/api/badge-data",
};
pub const UPLOAD_KEY: Option<&str> = option_env!("NETBADGE_UPLOAD_KEY");

pub const HOP_DWELL_DEFAULT_MS: u32 = 200;
// 13 covers ETSI; Japan allows 14.
pub const HOP_LAST_CHANNEL_DEFAULT: u8 = 13;

pub const UPLOAD_INTERVAL_DEFAULT_MS: u32 = 30_000;
pub const CONNECT_ATTEMPTS_DEFAULT: u8 = 3;
pub const CONNECT_ATTEMPT_TIMEOUT_DEFAULT_MS: u32 = 4_000;
pub const CONNECT_RETRY_DELAY_DEFAULT_MS: u32 = 500;
pub const TRANSPORT_TIMEOUT_DEFAULT_MS: u32 = 10_000;
pub const TEARDOWN_RETRY_MAX_DEFAULT: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HopPolicy {
    pub first_channel: u8,
    pub last_channel: u8,
    pub dwell_ms: u32,
}

impl HopPolicy {
    pub const fn defaults() -> Self {
        Self {
            first_channel: CHANNEL_MIN,
            last_channel: HOP_LAST_CHANNEL_DEFAULT,
            dwell_ms: HOP_DWELL_DEFAULT_MS,
        }
    }

    pub const fn sanitized(self) -> Self {
        let first_channel = clamp_u8(self.first_channel, CHANNEL_MIN, CHANNEL_MAX);
        let mut last_channel = clamp_u8(self.last_channel, CHANNEL_MIN, CHANNEL_MAX);
        if last_channel < first_channel {
            last_channel = first_channel;
        }
        Self {
            first_channel,
            last_channel,
            dwell_ms: clamp_u32(self.dwell_ms, 20, 5_000),
        }
    }

    pub const fn channel_count(&self) -> u8 {
        self.last_channel - self.first_channel + 1
    }
}

impl Default for HopPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    pub interval_ms: u32,
    pub connect_attempts: u8,
    pub attempt_timeout_ms: u32,
    pub retry_delay_ms: u32,
    pub transport_timeout_ms: u32,
    pub teardown_retry_max: u8,
}

impl UploadPolicy {
    pub const fn defaults() -> Self {
        Self {
            interval_ms: UPLOAD_INTERVAL_DEFAULT_MS,
            connect_attempts: CONNECT_ATTEMPTS_DEFAULT,
            attempt_timeout_ms: CONNECT_ATTEMPT_TIMEOUT_DEFAULT_MS,
            retry_delay_ms: CONNECT_RETRY_DELAY_DEFAULT_MS,
            transport_timeout_ms: TRANSPORT_TIMEOUT_DEFAULT_MS,
            teardown_retry_max: TEARDOWN_RETRY_MAX_DEFAULT,
        }
    }

    pub const fn sanitized(self) -> Self {
        let attempt_timeout_ms = clamp_u32(self.attempt_timeout_ms, 500, 60_000);
        let mut retry_delay_ms = clamp_u32(self.retry_delay_ms, 0, 10_000);
        // The delay sits inside the association deadline, so it must leave room
        // for the next attempt.
        if retry_delay_ms >= attempt_timeout_ms {
            retry_delay_ms = attempt_timeout_ms / 2;
        }
        Self {
            interval_ms: clamp_u32(self.interval_ms, 1_000, 3_600_000),
            connect_attempts: clamp_u8(self.connect_attempts, 1, 20),
            attempt_timeout_ms,
            retry_delay_ms,
            transport_timeout_ms: clamp_u32(self.transport_timeout_ms, 1_000, 120_000),
            teardown_retry_max: clamp_u8(self.teardown_retry_max, 1, 50),
        }
    }

    /// Upper bound on time spent associating before the window is abandoned.
    pub const fn association_budget_ms(&self) -> u64 {
        self.connect_attempts as u64 * self.attempt_timeout_ms as u64
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Decimal port from a build variable; anything unparsable keeps `fallback`.
const fn parse_port(text: &str, fallback: u16) -> u16 {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return fallback;
    }
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if !digit.is_ascii_digit() {
            return fallback;
        }
        value = value * 10 + (digit - b'0') as u32;
        if value > u16::MAX as u32 {
            return fallback;
        }
        i += 1;
    }
    if value == 0 {
        fallback
    } else {
        value as u16
    }
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
