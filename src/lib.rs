//! Passive Wi-Fi network discovery for a battery badge.
//!
//! The radio sniffs beacons and probe responses while hopping channels; the
//! control loop classifies them into a bounded table of access points and
//! periodically switches the radio to station mode to upload what it found.
#![cfg_attr(not(test), no_std)]

pub mod capture;
pub mod classify;
pub mod config;
pub mod engine;
pub mod hop;
pub mod mode;
pub mod radio;
pub mod table;
pub mod telemetry;
pub mod types;
pub mod upload;

#[cfg(test)]
mod testing;

pub use capture::{CaptureQueue, FrameMeta, RawFrame};
pub use engine::{EngineOutput, ScanEngine};
pub use mode::{ModeApplyStatus, ModeController, ModeNotice, ModeOutput, UploadFailure};
pub use radio::{LinkState, RadioDriver, WifiCredentials};
pub use table::NetworkTable;
pub use types::{Bssid, EncryptionClass, NetworkRecord, RadioMode, Ssid};
