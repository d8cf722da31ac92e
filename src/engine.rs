//! The control loop body: drains captured frames into the table, ticks the
//! mode controller and fires upload windows on schedule.

use crate::capture::{CaptureQueue, RawFrame};
use crate::classify::Rejection;
use crate::config::{HopPolicy, UploadPolicy};
use crate::mode::{ModeController, ModeOutput};
use crate::radio::{RadioDriver, WifiCredentials};
use crate::table::{InsertOutcome, NetworkTable};
use crate::telemetry;
use crate::types::{NetworkRecord, RadioMode};
use crate::upload::{TriggerDecision, UploadTrigger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestResult {
    Stored(InsertOutcome),
    Rejected(Rejection),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub inserted: u16,
    pub updated: u16,
    pub dropped: u16,
    pub rejected: u16,
    /// Frames drained while scanning was off and thrown away.
    pub discarded: u16,
}

impl IngestStats {
    fn add(&mut self, result: IngestResult) {
        let slot = match result {
            IngestResult::Stored(InsertOutcome::Inserted { .. }) => &mut self.inserted,
            IngestResult::Stored(InsertOutcome::Updated { .. }) => &mut self.updated,
            IngestResult::Stored(InsertOutcome::Dropped) => &mut self.dropped,
            IngestResult::Rejected(_) => &mut self.rejected,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        u32::from(self.inserted)
            + u32::from(self.updated)
            + u32::from(self.dropped)
            + u32::from(self.rejected)
            + u32::from(self.discarded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOutput {
    pub ingest: IngestStats,
    pub mode: ModeOutput,
    pub trigger: TriggerDecision,
    /// Set when the trigger fired and a window was requested this poll.
    pub window: Option<ModeOutput>,
}

pub struct ScanEngine<'q, R: RadioDriver, const N: usize> {
    radio: R,
    queue: &'q CaptureQueue,
    table: NetworkTable<N>,
    controller: ModeController,
    trigger: UploadTrigger,
}

impl<'q, R: RadioDriver, const N: usize> ScanEngine<'q, R, N> {
    pub fn new(
        radio: R,
        queue: &'q CaptureQueue,
        table: NetworkTable<N>,
        hop: HopPolicy,
        upload: UploadPolicy,
        credentials: Option<WifiCredentials>,
        now_ms: u64,
    ) -> Self {
        let upload = upload.sanitized();
        Self {
            radio,
            queue,
            table,
            controller: ModeController::new(hop, upload, credentials),
            trigger: UploadTrigger::new(upload.interval_ms, now_ms),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        self.controller.upload_policy()
    }

    pub fn mode(&self) -> RadioMode {
        self.controller.mode()
    }

    pub fn is_scanning(&self) -> bool {
        self.controller.is_scanning()
    }

    pub fn networks(&self) -> &[NetworkRecord] {
        self.table.all()
    }

    pub fn network_count(&self) -> usize {
        self.table.count()
    }

    pub fn table(&self) -> &NetworkTable<N> {
        &self.table
    }

    pub fn clear_networks(&mut self) {
        self.table.clear();
        telemetry::publish_network_count(0);
        log::info!("table: cleared");
    }

    /// Called after a delivered upload; records stay, only the dirty flags go.
    pub fn mark_all_consumed(&mut self) {
        self.table.clear_all_dirty();
    }

    pub fn ingest(&mut self, frame: &RawFrame) -> IngestResult {
        let observation = match frame.classify() {
            Ok(observation) => observation,
            Err(rejection) => {
                telemetry::record_frame_rejected();
                log::trace!("table: frame rejected reason={:?}", rejection);
                return IngestResult::Rejected(rejection);
            }
        };

        let outcome = self.table.observe(observation, frame.meta().rx_ms);
        match outcome {
            InsertOutcome::Inserted { index } => {
                telemetry::record_frame_accepted();
                telemetry::publish_network_count(self.table.count());
                if let Some(record) = self.table.get(index) {
                    log::info!(
                        "table: new bssid={} ssid={} ch={} enc={}",
                        record.bssid,
                        record.ssid,
                        record.channel,
                        record.encryption.label()
                    );
                }
            }
            InsertOutcome::Updated { .. } => telemetry::record_frame_accepted(),
            InsertOutcome::Dropped => {
                telemetry::record_capacity_drop();
                log::debug!("table: full, frame dropped capacity={}", self.table.capacity());
            }
        }
        IngestResult::Stored(outcome)
    }

    /// Empties the capture queue into the table. Once scanning is off, frames
    /// still arriving from a radio that has not released capture are dropped.
    pub fn drain(&mut self) -> IngestStats {
        let mut stats = IngestStats::default();
        let scanning = self.is_scanning();
        while let Ok(frame) = self.queue.try_receive() {
            if scanning {
                stats.add(self.ingest(&frame));
            } else {
                stats.discarded = stats.discarded.saturating_add(1);
            }
        }
        if stats.discarded > 0 {
            log::debug!("table: discarded {} frames while stopped", stats.discarded);
        }
        stats
    }

    pub fn start_scanning(&mut self, now_ms: u64) -> ModeOutput {
        self.trigger.reset(now_ms);
        self.controller.start_scanning(now_ms, &mut self.radio)
    }

    pub fn request_stop(&mut self, now_ms: u64) -> ModeOutput {
        self.drain();
        self.controller.request_stop(now_ms, &mut self.radio)
    }

    pub fn toggle_scanning(&mut self, now_ms: u64) -> ModeOutput {
        if self.is_scanning() && !self.controller.stop_pending() {
            self.request_stop(now_ms)
        } else {
            self.start_scanning(now_ms)
        }
    }

    /// Frames already queued are ingested before capture goes down.
    pub fn begin_upload_window(&mut self, now_ms: u64) -> ModeOutput {
        self.drain();
        self.controller.begin_upload_window(now_ms, &mut self.radio)
    }

    pub fn end_upload_window(&mut self, now_ms: u64, delivered: bool) -> ModeOutput {
        let output = self
            .controller
            .end_upload_window(now_ms, delivered, &mut self.radio);
        self.trigger.reset(now_ms);
        output
    }

    pub fn poll(&mut self, now_ms: u64) -> EngineOutput {
        let ingest = self.drain();
        let mode = self.controller.tick(now_ms, &mut self.radio);

        let in_monitor = mode.mode == RadioMode::Monitor;
        let trigger = self
            .trigger
            .due(now_ms, in_monitor && self.is_scanning(), self.table.count());
        let window = match trigger {
            TriggerDecision::Fire => Some(self.begin_upload_window(now_ms)),
            TriggerDecision::SkipEmpty => {
                telemetry::record_upload_skipped_empty();
                log::info!("upload: skipped, no networks yet");
                None
            }
            TriggerDecision::NotDue => None,
        };

        EngineOutput {
            ingest,
            mode,
            trigger,
            window,
        }
    }
}
