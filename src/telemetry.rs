//! Process-wide counters and the published status the display reads.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::mode::UploadFailure;
use crate::types::RadioMode;

static FRAMES_CAPTURED: AtomicU32 = AtomicU32::new(0);
static FRAMES_QUEUE_DROPPED: AtomicU32 = AtomicU32::new(0);
static FRAMES_REJECTED: AtomicU32 = AtomicU32::new(0);
static FRAMES_ACCEPTED: AtomicU32 = AtomicU32::new(0);
static TABLE_CAPACITY_DROPS: AtomicU32 = AtomicU32::new(0);
static CHANNEL_HOPS: AtomicU32 = AtomicU32::new(0);
static CHANNEL_RETUNE_FAILURES: AtomicU32 = AtomicU32::new(0);
static UPLOAD_WINDOWS_OPENED: AtomicU32 = AtomicU32::new(0);
static ASSOC_ATTEMPTS: AtomicU32 = AtomicU32::new(0);
static ASSOC_FAILURES: AtomicU32 = AtomicU32::new(0);
static UPLOADS_OK: AtomicU32 = AtomicU32::new(0);
static UPLOADS_FAILED: AtomicU32 = AtomicU32::new(0);
static UPLOADS_SKIPPED_EMPTY: AtomicU32 = AtomicU32::new(0);
static DRIVER_FAULTS: AtomicU32 = AtomicU32::new(0);
static NETWORK_COUNT: AtomicU32 = AtomicU32::new(0);
static RADIO_MODE: AtomicU8 = AtomicU8::new(RadioMode::Monitor as u8);
static SCANNING: AtomicBool = AtomicBool::new(false);
static LAST_UPLOAD: AtomicU8 = AtomicU8::new(UPLOAD_STATUS_NEVER);

const UPLOAD_STATUS_NEVER: u8 = 0;
const UPLOAD_STATUS_DELIVERED: u8 = 1;
const UPLOAD_STATUS_FAILED_BASE: u8 = 0x10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Never,
    Delivered,
    Failed(UploadFailure),
}

impl UploadStatus {
    const fn code(self) -> u8 {
        match self {
            Self::Never => UPLOAD_STATUS_NEVER,
            Self::Delivered => UPLOAD_STATUS_DELIVERED,
            Self::Failed(failure) => UPLOAD_STATUS_FAILED_BASE + failure.as_u8(),
        }
    }

    const fn from_code(code: u8) -> Self {
        match code {
            UPLOAD_STATUS_DELIVERED => Self::Delivered,
            _ if code >= UPLOAD_STATUS_FAILED_BASE => {
                match UploadFailure::from_u8(code - UPLOAD_STATUS_FAILED_BASE) {
                    Some(failure) => Self::Failed(failure),
                    None => Self::Never,
                }
            }
            _ => Self::Never,
        }
    }
}

pub fn record_frame_captured() {
    FRAMES_CAPTURED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_queue_drop() {
    FRAMES_QUEUE_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_frame_rejected() {
    FRAMES_REJECTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_frame_accepted() {
    FRAMES_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_capacity_drop() {
    TABLE_CAPACITY_DROPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_channel_hop() {
    CHANNEL_HOPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_retune_failure() {
    CHANNEL_RETUNE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_window_opened() {
    UPLOAD_WINDOWS_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_association_attempt() {
    ASSOC_ATTEMPTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_association_failure() {
    ASSOC_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_skipped_empty() {
    UPLOADS_SKIPPED_EMPTY.fetch_add(1, Ordering::Relaxed);
}

pub fn record_driver_fault() {
    DRIVER_FAULTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_outcome(status: UploadStatus) {
    match status {
        UploadStatus::Never => return,
        UploadStatus::Delivered => UPLOADS_OK.fetch_add(1, Ordering::Relaxed),
        UploadStatus::Failed(_) => UPLOADS_FAILED.fetch_add(1, Ordering::Relaxed),
    };
    LAST_UPLOAD.store(status.code(), Ordering::Relaxed);
}

pub fn publish_mode(mode: RadioMode, scanning: bool) {
    RADIO_MODE.store(mode.as_u8(), Ordering::Relaxed);
    SCANNING.store(scanning, Ordering::Relaxed);
}

pub fn publish_network_count(count: usize) {
    NETWORK_COUNT.store(count as u32, Ordering::Relaxed);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub mode: RadioMode,
    pub scanning: bool,
    pub network_count: u32,
    pub last_upload: UploadStatus,
    pub frames_captured: u32,
    pub frames_queue_dropped: u32,
    pub frames_rejected: u32,
    pub frames_accepted: u32,
    pub table_capacity_drops: u32,
    pub channel_hops: u32,
    pub channel_retune_failures: u32,
    pub upload_windows_opened: u32,
    pub association_attempts: u32,
    pub association_failures: u32,
    pub uploads_ok: u32,
    pub uploads_failed: u32,
    pub uploads_skipped_empty: u32,
    pub driver_faults: u32,
}

pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        mode: RadioMode::from_u8(RADIO_MODE.load(Ordering::Relaxed)).unwrap_or_default(),
        scanning: SCANNING.load(Ordering::Relaxed),
        network_count: NETWORK_COUNT.load(Ordering::Relaxed),
        last_upload: UploadStatus::from_code(LAST_UPLOAD.load(Ordering::Relaxed)),
        frames_captured: FRAMES_CAPTURED.load(Ordering::Relaxed),
        frames_queue_dropped: FRAMES_QUEUE_DROPPED.load(Ordering::Relaxed),
        frames_rejected: FRAMES_REJECTED.load(Ordering::Relaxed),
        frames_accepted: FRAMES_ACCEPTED.load(Ordering::Relaxed),
        table_capacity_drops: TABLE_CAPACITY_DROPS.load(Ordering::Relaxed),
        channel_hops: CHANNEL_HOPS.load(Ordering::Relaxed),
        channel_retune_failures: CHANNEL_RETUNE_FAILURES.load(Ordering::Relaxed),
        upload_windows_opened: UPLOAD_WINDOWS_OPENED.load(Ordering::Relaxed),
        association_attempts: ASSOC_ATTEMPTS.load(Ordering::Relaxed),
        association_failures: ASSOC_FAILURES.load(Ordering::Relaxed),
        uploads_ok: UPLOADS_OK.load(Ordering::Relaxed),
        uploads_failed: UPLOADS_FAILED.load(Ordering::Relaxed),
        uploads_skipped_empty: UPLOADS_SKIPPED_EMPTY.load(Ordering::Relaxed),
        driver_faults: DRIVER_FAULTS.load(Ordering::Relaxed),
    }
}
