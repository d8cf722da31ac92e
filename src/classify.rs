//! Beacon / probe-response classification.
//!
//! Runs on every captured frame, so it is allocation free and linear in the
//! frame length. Anything it does not understand is rejected, never escalated.

use crate::types::{Bssid, EncryptionClass, Ssid, CHANNEL_MAX, CHANNEL_MIN, SSID_MAX};

const MGMT_HEADER_LEN: usize = 24;
const HT_CONTROL_LEN: usize = 4;
const BSSID_OFFSET: usize = 16;
// timestamp(8) + beacon interval(2) + capability(2)
const FIXED_PARAMS_LEN: usize = 12;
const CAPABILITY_OFFSET: usize = 10;
const CAP_PRIVACY: u16 = 1 << 4;

const FC_TYPE_MASK: u8 = 0b0000_1100;
const FC_TYPE_MGMT: u8 = 0b0000_0000;
const FC_SUBTYPE_SHIFT: u8 = 4;
const FC_FLAG_ORDER: u8 = 1 << 7;
const SUBTYPE_PROBE_RESP: u8 = 5;
const SUBTYPE_BEACON: u8 = 8;

const EID_SSID: u8 = 0;
const EID_RSN: u8 = 48;
const EID_VENDOR: u8 = 221;
const WPA_OUI: [u8; 3] = [0x00, 0x50, 0xF2];
const WPA_OUI_TYPE: u8 = 1;
const RSN_OUI: [u8; 3] = [0x00, 0x0F, 0xAC];

const AKM_8021X: u8 = 1;
const AKM_PSK: u8 = 2;
const AKM_FT_8021X: u8 = 3;
const AKM_FT_PSK: u8 = 4;
const AKM_8021X_SHA256: u8 = 5;
const AKM_PSK_SHA256: u8 = 6;
const AKM_SAE: u8 = 8;
const AKM_SUITE_B: u8 = 11;
const AKM_SUITE_B_192: u8 = 12;
const AKM_FT_8021X_SHA384: u8 = 13;
const AKM_SAE_EXT: u8 = 24;

/// Capture metadata reported by the radio alongside the frame bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WireMeta {
    pub channel: u8,
    pub rssi: i8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub bssid: Bssid,
    pub ssid: Ssid,
    pub channel: u8,
    pub signal_strength: i8,
    pub encryption: EncryptionClass,
    /// False when the capture was clipped before any RSN or WPA element, so
    /// `encryption` is only a guess from the privacy bit.
    pub encryption_known: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    TooShort,
    NotManagement,
    UnsupportedSubtype,
    MissingSsid,
    SsidTooLong,
    MalformedElement,
    ChannelOutOfRange,
}

/// Cheap header check used on the receive path before a frame is queued.
pub fn is_candidate(frame: &[u8]) -> bool {
    matches!(frame_subtype(frame), Ok(SUBTYPE_BEACON | SUBTYPE_PROBE_RESP))
}

pub fn classify(frame: &[u8], wire: WireMeta) -> Result<Observation, Rejection> {
    classify_with(frame, wire, false)
}

/// Like [`classify`], but accepts a trailing element cut short by a capture
/// buffer that was smaller than the frame.
pub fn classify_clipped(frame: &[u8], wire: WireMeta) -> Result<Observation, Rejection> {
    classify_with(frame, wire, true)
}

fn classify_with(
    frame: &[u8],
    wire: WireMeta,
    tolerate_clip: bool,
) -> Result<Observation, Rejection> {
    let subtype = frame_subtype(frame)?;
    if subtype != SUBTYPE_BEACON && subtype != SUBTYPE_PROBE_RESP {
        return Err(Rejection::UnsupportedSubtype);
    }
    if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&wire.channel) {
        return Err(Rejection::ChannelOutOfRange);
    }

    let header_len = if frame[1] & FC_FLAG_ORDER != 0 {
        MGMT_HEADER_LEN + HT_CONTROL_LEN
    } else {
        MGMT_HEADER_LEN
    };
    let body = frame
        .get(header_len..)
        .filter(|body| body.len() >= FIXED_PARAMS_LEN)
        .ok_or(Rejection::TooShort)?;
    let bssid = Bssid::from_slice(&frame[BSSID_OFFSET..]).ok_or(Rejection::TooShort)?;
    let capability = u16::from_le_bytes([body[CAPABILITY_OFFSET], body[CAPABILITY_OFFSET + 1]]);

    let mut ssid = None;
    let mut rsn = None;
    let mut wpa = false;
    let mut rest = &body[FIXED_PARAMS_LEN..];
    while !rest.is_empty() {
        let Some((&id, tail)) = rest.split_first() else {
            break;
        };
        let Some((&len, tail)) = tail.split_first() else {
            if tolerate_clip {
                break;
            }
            return Err(Rejection::MalformedElement);
        };
        let len = len as usize;
        if tail.len() < len {
            if tolerate_clip {
                break;
            }
            return Err(Rejection::MalformedElement);
        }
        let (element, tail) = tail.split_at(len);
        rest = tail;

        match id {
            EID_SSID if ssid.is_none() => {
                if len > SSID_MAX {
                    return Err(Rejection::SsidTooLong);
                }
                ssid = Some(element);
            }
            EID_RSN if rsn.is_none() => rsn = Some(parse_rsn_akms(element)),
            EID_VENDOR if is_wpa_vendor_element(element) => wpa = true,
            _ => {}
        }
    }

    let ssid = ssid.ok_or(Rejection::MissingSsid)?;
    // Hidden networks often advertise a run of NULs instead of a zero length.
    let ssid = if ssid.iter().all(|&byte| byte == 0) {
        Ssid::empty()
    } else {
        Ssid::from_bytes(ssid).ok_or(Rejection::SsidTooLong)?
    };

    Ok(Observation {
        bssid,
        ssid,
        channel: wire.channel,
        signal_strength: wire.rssi,
        encryption: encryption_class(rsn, wpa, capability & CAP_PRIVACY != 0),
        encryption_known: !tolerate_clip || rsn.is_some() || wpa,
    })
}

fn frame_subtype(frame: &[u8]) -> Result<u8, Rejection> {
    let fc0 = *frame.first().ok_or(Rejection::TooShort)?;
    if frame.len() < MGMT_HEADER_LEN {
        return Err(Rejection::TooShort);
    }
    if fc0 & FC_TYPE_MASK != FC_TYPE_MGMT {
        return Err(Rejection::NotManagement);
    }
    Ok(fc0 >> FC_SUBTYPE_SHIFT)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct AkmFlags {
    psk: bool,
    sae: bool,
    enterprise: bool,
}

fn encryption_class(rsn: Option<AkmFlags>, wpa: bool, privacy: bool) -> EncryptionClass {
    match rsn {
        Some(akm) if akm.sae => EncryptionClass::Wpa3Psk,
        Some(akm) if akm.enterprise && !akm.psk => EncryptionClass::Wpa2Enterprise,
        Some(_) if wpa => EncryptionClass::WpaWpa2Psk,
        Some(_) => EncryptionClass::Wpa2Psk,
        None if wpa => EncryptionClass::WpaPsk,
        None if privacy => EncryptionClass::Wep,
        None => EncryptionClass::Open,
    }
}

fn is_wpa_vendor_element(element: &[u8]) -> bool {
    element.len() >= 4 && element[..3] == WPA_OUI && element[3] == WPA_OUI_TYPE
}

/// Reads the AKM suite list. A body cut short before the list simply reports
/// no suites; the element's presence alone still means WPA2.
fn parse_rsn_akms(element: &[u8]) -> AkmFlags {
    let mut flags = AkmFlags::default();
    // version(2) + group cipher(4)
    let Some(rest) = element.get(6..) else {
        return flags;
    };
    let Some(rest) = skip_suite_list(rest) else {
        return flags;
    };
    let Some((count, rest)) = read_u16_le(rest) else {
        return flags;
    };
    for suite in rest.chunks_exact(4).take(count as usize) {
        if suite[..3] != RSN_OUI {
            continue;
        }
        match suite[3] {
            AKM_PSK | AKM_FT_PSK | AKM_PSK_SHA256 => flags.psk = true,
            AKM_SAE | AKM_SAE_EXT => flags.sae = true,
            AKM_8021X | AKM_FT_8021X | AKM_8021X_SHA256 | AKM_SUITE_B | AKM_SUITE_B_192
            | AKM_FT_8021X_SHA384 => flags.enterprise = true,
            _ => {}
        }
    }
    flags
}

fn skip_suite_list(bytes: &[u8]) -> Option<&[u8]> {
    let (count, rest) = read_u16_le(bytes)?;
    rest.get(count as usize * 4..)
}

fn read_u16_le(bytes: &[u8]) -> Option<(u16, &[u8])> {
    let value = bytes.get(..2)?;
    Some((u16::from_le_bytes([value[0], value[1]]), &bytes[2..]))
}
