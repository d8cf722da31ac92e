use core::fmt::Debug;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::types::SSID_MAX;

pub const WIFI_PASSWORD_MAX: usize = 64;

/// Association progress as last reported by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed,
}

/// The operations the scan core needs from the Wi-Fi driver.
///
/// Every call must return promptly. Association is started by `connect` and
/// observed through `link_state`; the caller owns the retry and timeout policy.
pub trait RadioDriver {
    type Error: Debug;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error>;
    fn enable_capture(&mut self) -> Result<(), Self::Error>;
    fn disable_capture(&mut self) -> Result<(), Self::Error>;
    fn set_client_mode(&mut self) -> Result<(), Self::Error>;
    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), Self::Error>;
    fn link_state(&mut self) -> LinkState;
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

const LINK_IDLE: u8 = 0;
const LINK_CONNECTING: u8 = 1;
const LINK_CONNECTED: u8 = 2;
const LINK_FAILED: u8 = 3;

/// Link state shared between driver event handlers and `link_state` polls.
///
/// Disconnect events caused by our own `disconnect` are swallowed so a late
/// one cannot fail the next association attempt.
pub struct LinkTracker {
    state: AtomicU8,
    requested_disconnects: AtomicU8,
}

impl LinkTracker {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(LINK_IDLE),
            requested_disconnects: AtomicU8::new(0),
        }
    }

    pub fn state(&self) -> LinkState {
        match self.state.load(Ordering::Relaxed) {
            LINK_CONNECTING => LinkState::Connecting,
            LINK_CONNECTED => LinkState::Connected,
            LINK_FAILED => LinkState::Failed,
            _ => LinkState::Idle,
        }
    }

    /// New window: nothing outstanding.
    pub fn reset(&self) {
        self.state.store(LINK_IDLE, Ordering::Relaxed);
        self.requested_disconnects.store(0, Ordering::Relaxed);
    }

    pub fn connect_started(&self) {
        self.state.store(LINK_CONNECTING, Ordering::Relaxed);
    }

    pub fn connect_rejected(&self) {
        self.state.store(LINK_FAILED, Ordering::Relaxed);
    }

    pub fn disconnect_requested(&self) {
        // Only a live or pending association produces a disconnect event.
        let previous = self.state.swap(LINK_IDLE, Ordering::Relaxed);
        if matches!(previous, LINK_CONNECTING | LINK_CONNECTED) {
            self.requested_disconnects.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_connected(&self) {
        self.state.store(LINK_CONNECTED, Ordering::Relaxed);
    }

    /// Returns whether the event counted as a failure.
    pub fn on_disconnected(&self) -> bool {
        let requested = self
            .requested_disconnects
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |pending| {
                pending.checked_sub(1)
            })
            .is_ok();
        if requested {
            return false;
        }
        self.state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |state| {
                matches!(state, LINK_CONNECTING | LINK_CONNECTED).then_some(LINK_FAILED)
            })
            .is_ok()
    }
}

impl Default for LinkTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: [u8; SSID_MAX],
    ssid_len: u8,
    password: [u8; WIFI_PASSWORD_MAX],
    password_len: u8,
}

impl WifiCredentials {
    pub fn from_parts(ssid: &[u8], password: &[u8]) -> Result<Self, &'static str> {
        if ssid.is_empty() || ssid.len() > SSID_MAX || password.len() > WIFI_PASSWORD_MAX {
            return Err("invalid wifi credentials length");
        }
        let mut result = Self {
            ssid: [0u8; SSID_MAX],
            ssid_len: ssid.len() as u8,
            password: [0u8; WIFI_PASSWORD_MAX],
            password_len: password.len() as u8,
        };
        result.ssid[..ssid.len()].copy_from_slice(ssid);
        result.password[..password.len()].copy_from_slice(password);
        Ok(result)
    }

    /// Credentials baked in at build time, if any.
    pub fn compiled() -> Option<Self> {
        let ssid = option_env!("NETBADGE_WIFI_SSID")?;
        let password = option_env!("NETBADGE_WIFI_PASSWORD").unwrap_or("");
        Self::from_parts(ssid.as_bytes(), password.as_bytes()).ok()
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid[..self.ssid_len as usize]
    }

    pub fn password(&self) -> &[u8] {
        &self.password[..self.password_len as usize]
    }
}
