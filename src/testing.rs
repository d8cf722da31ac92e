//! Host-side fixtures shared by the unit tests.

// Links the std critical-section impl the capture queue needs on the host.
use critical_section as _;

use crate::radio::{LinkState, RadioDriver, WifiCredentials};

pub(crate) const BEACON: u8 = 0x80;
pub(crate) const PROBE_RESPONSE: u8 = 0x50;
pub(crate) const PROBE_REQUEST: u8 = 0x40;

pub(crate) struct FrameBuilder {
    bytes: Vec<u8>,
}

impl FrameBuilder {
    pub(crate) fn new(fc0: u8, bssid: [u8; 6]) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[fc0, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xFF; 6]);
        bytes.extend_from_slice(&bssid);
        bytes.extend_from_slice(&bssid);
        bytes.extend_from_slice(&[0x10, 0x00]);
        // timestamp, beacon interval, capability
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&[0x64, 0x00]);
        bytes.extend_from_slice(&[0x01, 0x00]);
        Self { bytes }
    }

    pub(crate) fn beacon(bssid: [u8; 6], ssid: &[u8]) -> Self {
        Self::new(BEACON, bssid).element(0, ssid)
    }

    pub(crate) fn privacy(mut self) -> Self {
        self.bytes[34] |= 0x10;
        self
    }

    pub(crate) fn element(mut self, id: u8, body: &[u8]) -> Self {
        self.bytes.push(id);
        self.bytes.push(body.len() as u8);
        self.bytes.extend_from_slice(body);
        self
    }

    pub(crate) fn rsn(self, akms: &[u8]) -> Self {
        let mut body = vec![0x01, 0x00, 0x00, 0x0F, 0xAC, 0x04, 0x01, 0x00, 0x00, 0x0F, 0xAC, 0x04];
        body.extend_from_slice(&(akms.len() as u16).to_le_bytes());
        for &akm in akms {
            body.extend_from_slice(&[0x00, 0x0F, 0xAC, akm]);
        }
        self.element(48, &body)
    }

    pub(crate) fn wpa(self) -> Self {
        self.element(
            221,
            &[
                0x00, 0x50, 0xF2, 0x01, 0x01, 0x00, 0x00, 0x50, 0xF2, 0x02, 0x01, 0x00, 0x00, 0x50,
                0xF2, 0x02, 0x01, 0x00, 0x00, 0x50, 0xF2, 0x02,
            ],
        )
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub(crate) fn bssid(tag: u8) -> [u8; 6] {
    [0x02, 0x00, 0x00, 0x00, 0x00, tag]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RadioCall {
    SetChannel(u8),
    EnableCapture,
    DisableCapture,
    SetClientMode,
    Connect,
    LinkState,
    Disconnect,
}

/// Scripted radio: records every call and fails the ones it is told to.
#[derive(Default)]
pub(crate) struct FakeRadio {
    pub(crate) calls: Vec<RadioCall>,
    pub(crate) link: Option<LinkState>,
    /// Link state reported after this many `connect` calls; `None` never links.
    pub(crate) connect_succeeds_on: Option<usize>,
    pub(crate) connects: usize,
    pub(crate) fail_enable_capture: usize,
    pub(crate) fail_disable_capture: bool,
    pub(crate) fail_client_mode: bool,
    pub(crate) fail_set_channel: bool,
    pub(crate) capture_enabled: bool,
    pub(crate) client_mode: bool,
}

impl FakeRadio {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn always_failing_association() -> Self {
        Self {
            link: Some(LinkState::Failed),
            ..Self::default()
        }
    }

    pub(crate) fn connecting_forever() -> Self {
        Self {
            link: Some(LinkState::Connecting),
            ..Self::default()
        }
    }

    pub(crate) fn associates_on(attempt: usize) -> Self {
        Self {
            connect_succeeds_on: Some(attempt),
            ..Self::default()
        }
    }

    pub(crate) fn channels(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RadioCall::SetChannel(channel) => Some(*channel),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, wanted: RadioCall) -> usize {
        self.calls.iter().filter(|call| **call == wanted).count()
    }

    pub(crate) fn position(&self, wanted: RadioCall) -> Option<usize> {
        self.calls.iter().position(|call| *call == wanted)
    }
}

impl RadioDriver for FakeRadio {
    type Error = &'static str;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::SetChannel(channel));
        if self.fail_set_channel {
            return Err("set_channel");
        }
        Ok(())
    }

    fn enable_capture(&mut self) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::EnableCapture);
        if self.fail_enable_capture > 0 {
            self.fail_enable_capture -= 1;
            return Err("enable_capture");
        }
        self.capture_enabled = true;
        self.client_mode = false;
        Ok(())
    }

    fn disable_capture(&mut self) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::DisableCapture);
        if self.fail_disable_capture {
            return Err("disable_capture");
        }
        self.capture_enabled = false;
        Ok(())
    }

    fn set_client_mode(&mut self) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::SetClientMode);
        assert!(
            !self.capture_enabled,
            "client mode requested while capture still active"
        );
        if self.fail_client_mode {
            return Err("set_client_mode");
        }
        self.client_mode = true;
        Ok(())
    }

    fn connect(&mut self, _credentials: &WifiCredentials) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::Connect);
        self.connects += 1;
        Ok(())
    }

    fn link_state(&mut self) -> LinkState {
        self.calls.push(RadioCall::LinkState);
        if let Some(target) = self.connect_succeeds_on {
            return if self.connects >= target {
                LinkState::Connected
            } else {
                LinkState::Failed
            };
        }
        self.link.unwrap_or(LinkState::Connecting)
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(RadioCall::Disconnect);
        Ok(())
    }
}

pub(crate) fn credentials() -> WifiCredentials {
    WifiCredentials::from_parts(b"collector", b"hunter22").unwrap()
}
