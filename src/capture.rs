//! Hand-off from the radio receive callback to the control loop.
//!
//! The callback runs in the driver's context and must not block, so it only
//! copies candidate frames into a bounded queue. Everything else happens when
//! the control loop drains it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::classify::{classify, classify_clipped, is_candidate, Observation, Rejection, WireMeta};
use crate::config::CAPTURE_QUEUE_DEPTH;
use crate::telemetry;

/// Longest frame prefix kept. Beacons past this are classified from the
/// prefix with a tolerant element walk.
pub const FRAME_CAPTURE_MAX: usize = 512;

pub type CaptureQueue = Channel<CriticalSectionRawMutex, RawFrame, CAPTURE_QUEUE_DEPTH>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Channel the frame was received on, as reported by the driver.
    pub channel: u8,
    pub rssi: i8,
    pub rx_ms: u64,
}

#[derive(Clone)]
pub struct RawFrame {
    meta: FrameMeta,
    len: u16,
    clipped: bool,
    data: [u8; FRAME_CAPTURE_MAX],
}

impl RawFrame {
    pub fn copy_from(payload: &[u8], meta: FrameMeta) -> Self {
        let len = payload.len().min(FRAME_CAPTURE_MAX);
        let mut data = [0u8; FRAME_CAPTURE_MAX];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            meta,
            len: len as u16,
            clipped: payload.len() > FRAME_CAPTURE_MAX,
            data,
        }
    }

    pub fn meta(&self) -> FrameMeta {
        self.meta
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    pub fn classify(&self) -> Result<Observation, Rejection> {
        let wire = WireMeta {
            channel: self.meta.channel,
            rssi: self.meta.rssi,
        };
        if self.clipped {
            classify_clipped(self.bytes(), wire)
        } else {
            classify(self.bytes(), wire)
        }
    }
}

pub const fn new_queue() -> CaptureQueue {
    Channel::new()
}

/// Called from the receive callback. Returns whether the frame was queued;
/// non-candidates and overflow are dropped without blocking.
pub fn offer(queue: &CaptureQueue, payload: &[u8], meta: FrameMeta) -> bool {
    if !is_candidate(payload) {
        return false;
    }
    telemetry::record_frame_captured();
    if queue.try_send(RawFrame::copy_from(payload, meta)).is_err() {
        telemetry::record_queue_drop();
        return false;
    }
    true
}
