use heapless::Vec;
use statig::blocking::IntoStateMachineExt as _;

use super::actions::{ModeApplyStatus, ModeNotice, RadioStep, UploadFailure};
use super::events::ModeEvent;
use super::machine::{DispatchContext, ModeMachine};
use crate::config::{HopPolicy, UploadPolicy};
use crate::hop::{ChannelScheduler, HopOutcome};
use crate::radio::{LinkState, RadioDriver, WifiCredentials};
use crate::telemetry::{self, UploadStatus};
use crate::types::{RadioMode, ScanState};

pub const NOTICE_CAPACITY: usize = 8;
// Longest chain: teardown success, then the follow-up steps it schedules.
const MAX_FOLLOW_UPS: usize = 4;

pub type NoticeBuffer = Vec<ModeNotice, NOTICE_CAPACITY>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeOutput {
    pub status: ModeApplyStatus,
    pub mode: RadioMode,
    pub notices: NoticeBuffer,
    pub hop: HopOutcome,
}

impl ModeOutput {
    pub fn has(&self, notice: ModeNotice) -> bool {
        self.notices.contains(&notice)
    }

    pub fn upload_ready(&self) -> bool {
        self.has(ModeNotice::UploadReady)
    }

    pub fn wedged(&self) -> bool {
        self.has(ModeNotice::RadioWedged)
    }

    pub fn upload_failure(&self) -> Option<UploadFailure> {
        self.notices.iter().find_map(|notice| match notice {
            ModeNotice::UploadFailed(failure) => Some(*failure),
            _ => None,
        })
    }
}

/// Owns the mode state machine and the hopper; the radio is lent per call so
/// the scan engine stays its single owner.
pub struct ModeController {
    machine: statig::blocking::StateMachine<ModeMachine>,
    hopper: ChannelScheduler,
    credentials: Option<WifiCredentials>,
}

impl ModeController {
    pub fn new(
        hop: HopPolicy,
        upload: UploadPolicy,
        credentials: Option<WifiCredentials>,
    ) -> Self {
        Self {
            machine: ModeMachine::new(upload, credentials.is_some()).state_machine(),
            hopper: ChannelScheduler::new(hop),
            credentials,
        }
    }

    pub fn mode(&self) -> RadioMode {
        self.machine.inner().mode
    }

    pub fn is_scanning(&self) -> bool {
        self.machine.inner().scanning
    }

    pub fn stop_pending(&self) -> bool {
        self.machine.inner().stop_pending
    }

    pub fn upload_ready(&self) -> bool {
        self.mode() == RadioMode::Station && self.machine.inner().window.ready_since_ms.is_some()
    }

    pub fn association_attempt(&self) -> u8 {
        self.machine.inner().window.attempt
    }

    /// The sanitized policy the mode watchdog runs on.
    pub fn upload_policy(&self) -> UploadPolicy {
        self.machine.inner().policy
    }

    pub fn scan_state(&self) -> ScanState {
        self.hopper.state()
    }

    pub fn start_scanning<R: RadioDriver>(&mut self, now_ms: u64, radio: &mut R) -> ModeOutput {
        self.dispatch(ModeEvent::SetScanning { enabled: true }, now_ms, radio)
    }

    pub fn request_stop<R: RadioDriver>(&mut self, now_ms: u64, radio: &mut R) -> ModeOutput {
        self.dispatch(ModeEvent::SetScanning { enabled: false }, now_ms, radio)
    }

    pub fn begin_upload_window<R: RadioDriver>(
        &mut self,
        now_ms: u64,
        radio: &mut R,
    ) -> ModeOutput {
        let output = self.dispatch(ModeEvent::OpenWindow { now_ms }, now_ms, radio);
        if output.status == ModeApplyStatus::Applied {
            telemetry::record_upload_window_opened();
        }
        output
    }

    pub fn end_upload_window<R: RadioDriver>(
        &mut self,
        now_ms: u64,
        delivered: bool,
        radio: &mut R,
    ) -> ModeOutput {
        self.dispatch(ModeEvent::CloseWindow { now_ms, delivered }, now_ms, radio)
    }

    pub fn tick<R: RadioDriver>(&mut self, now_ms: u64, radio: &mut R) -> ModeOutput {
        let link = if self.mode() == RadioMode::Station {
            radio.link_state()
        } else {
            LinkState::Idle
        };
        let mut output = self.dispatch(ModeEvent::Tick { now_ms, link }, now_ms, radio);
        if output.mode == RadioMode::Monitor && self.is_scanning() {
            output.hop = self.hopper.poll(now_ms, radio);
        }
        output
    }

    fn dispatch<R: RadioDriver>(
        &mut self,
        event: ModeEvent,
        now_ms: u64,
        radio: &mut R,
    ) -> ModeOutput {
        let mut notices = NoticeBuffer::new();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        let status = context.status;
        collect(&mut notices, &context);

        let mut pending = context.steps;
        for _ in 0..MAX_FOLLOW_UPS {
            if pending.is_empty() {
                break;
            }
            let follow_up = match self.apply_steps(&pending, now_ms, radio) {
                Ok(()) => ModeEvent::StepsApplied { now_ms },
                Err(step) => ModeEvent::StepFailed { now_ms, step },
            };
            let mut context = DispatchContext::default();
            self.machine.handle_with_context(&follow_up, &mut context);
            collect(&mut notices, &context);
            pending = context.steps;
        }

        record_notices(&notices);
        let mode = self.mode();
        telemetry::publish_mode(mode, self.is_scanning());
        ModeOutput {
            status,
            mode,
            notices,
            hop: HopOutcome::Idle,
        }
    }

    /// Runs steps in order and stops at the first failure. A failed
    /// disconnect is logged and skipped since the next step supersedes it.
    fn apply_steps<R: RadioDriver>(
        &mut self,
        steps: &[RadioStep],
        now_ms: u64,
        radio: &mut R,
    ) -> Result<(), RadioStep> {
        for &step in steps {
            let result = match step {
                RadioStep::SuspendHopping => {
                    self.hopper.suspend();
                    Ok(())
                }
                RadioStep::ResumeHopping => {
                    self.hopper.resume(now_ms, radio);
                    Ok(())
                }
                RadioStep::DisableCapture => radio.disable_capture(),
                RadioStep::EnableCapture => radio.enable_capture(),
                RadioStep::SetClientMode => radio.set_client_mode(),
                RadioStep::Connect => {
                    let Some(credentials) = self.credentials.as_ref() else {
                        log::warn!("mode: connect without credentials");
                        return Err(step);
                    };
                    telemetry::record_association_attempt();
                    radio.connect(credentials)
                }
                RadioStep::Disconnect => {
                    if let Err(err) = radio.disconnect() {
                        log::warn!("mode: disconnect failed err={:?}", err);
                    }
                    Ok(())
                }
            };
            if let Err(err) = result {
                log::warn!("mode: step failed step={:?} err={:?}", step, err);
                return Err(step);
            }
        }
        Ok(())
    }
}

fn collect(notices: &mut NoticeBuffer, context: &DispatchContext) {
    for notice in &context.notices {
        if notices.push(*notice).is_err() {
            log::warn!("mode: notice dropped {:?}", notice);
        }
    }
}

fn record_notices(notices: &[ModeNotice]) {
    for notice in notices {
        match notice {
            ModeNotice::AttemptFailed { .. } => telemetry::record_association_failure(),
            ModeNotice::UploadCompleted => telemetry::record_upload_outcome(UploadStatus::Delivered),
            ModeNotice::UploadFailed(failure) => {
                telemetry::record_upload_outcome(UploadStatus::Failed(*failure))
            }
            ModeNotice::DriverFault(_) => telemetry::record_driver_fault(),
            _ => {}
        }
    }
}
