use core::fmt;

pub const BSSID_LEN: usize = 6;
pub const SSID_MAX: usize = 32;
pub const CHANNEL_MIN: u8 = 1;
pub const CHANNEL_MAX: u8 = 14;

/// Hardware identity of an access point radio; the table's dedup key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bssid(pub [u8; BSSID_LEN]);

impl Bssid {
    pub const fn new(octets: [u8; BSSID_LEN]) -> Self {
        Self(octets)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; BSSID_LEN] = bytes.get(..BSSID_LEN)?.try_into().ok()?;
        Some(Self(octets))
    }

    pub const fn octets(&self) -> &[u8; BSSID_LEN] {
        &self.0
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// Broadcast network name. Raw bytes; not guaranteed to be UTF-8.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ssid(heapless::Vec<u8, SSID_MAX>);

impl Ssid {
    pub const fn empty() -> Self {
        Self(heapless::Vec::new())
    }

    /// Returns `None` when `bytes` is longer than an SSID may be.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        heapless::Vec::from_slice(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionClass {
    #[default]
    Open = 0,
    Wep = 1,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
    Wpa2Enterprise = 5,
    Wpa3Psk = 6,
}

impl EncryptionClass {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Open),
            1 => Some(Self::Wep),
            2 => Some(Self::WpaPsk),
            3 => Some(Self::Wpa2Psk),
            4 => Some(Self::WpaWpa2Psk),
            5 => Some(Self::Wpa2Enterprise),
            6 => Some(Self::Wpa3Psk),
            _ => None,
        }
    }

    /// Short label used on the badge list view and in the upload payload.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Wep => "WEP",
            Self::WpaPsk => "WPA",
            Self::Wpa2Psk => "WPA2",
            Self::WpaWpa2Psk => "WPA/WPA2",
            Self::Wpa2Enterprise => "WPA2-Ent",
            Self::Wpa3Psk => "WPA3",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkRecord {
    pub bssid: Bssid,
    pub ssid: Ssid,
    pub channel: u8,
    pub signal_strength: i8,
    pub encryption: EncryptionClass,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub frame_count: u32,
    /// Changed since a reader last consumed the record. Only readers clear it.
    pub dirty: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    pub current_channel: u8,
    pub last_hop_ms: u64,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum RadioMode {
    #[default]
    Monitor = 0,
    TransitioningToStation = 1,
    Station = 2,
    TransitioningToMonitor = 3,
}

impl RadioMode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Monitor),
            1 => Some(Self::TransitioningToStation),
            2 => Some(Self::Station),
            3 => Some(Self::TransitioningToMonitor),
            _ => None,
        }
    }
}
