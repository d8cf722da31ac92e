use heapless::Vec;
use statig::prelude::*;

use super::actions::{ModeApplyStatus, ModeNotice, RadioStep, UploadFailure};
use super::events::ModeEvent;
use crate::config::UploadPolicy;
use crate::radio::LinkState;
use crate::types::RadioMode;

pub(crate) const STEP_CAPACITY: usize = 4;
pub(crate) const DISPATCH_NOTICE_CAPACITY: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct WindowProgress {
    pub(super) attempt: u8,
    attempt_started_ms: u64,
    retry_at_ms: Option<u64>,
    deadline_ms: u64,
    pub(super) ready_since_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TeardownProgress {
    failures: u8,
    retry: bool,
    capture_restored: bool,
    wedged: bool,
}

#[derive(Clone, Debug)]
pub(super) struct ModeMachine {
    pub(super) mode: RadioMode,
    pub(super) scanning: bool,
    pub(super) stop_pending: bool,
    pub(super) has_credentials: bool,
    pub(super) window: WindowProgress,
    starting: bool,
    /// Set by a stop until capture is confirmed off; retried on each tick.
    releasing_capture: bool,
    teardown: TeardownProgress,
    pub(super) policy: UploadPolicy,
}

pub(super) struct DispatchContext {
    pub(super) status: ModeApplyStatus,
    pub(super) steps: Vec<RadioStep, STEP_CAPACITY>,
    pub(super) notices: Vec<ModeNotice, DISPATCH_NOTICE_CAPACITY>,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: ModeApplyStatus::Unchanged,
            steps: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl DispatchContext {
    fn step(&mut self, step: RadioStep) {
        let _ = self.steps.push(step);
    }

    fn notice(&mut self, notice: ModeNotice) {
        let _ = self.notices.push(notice);
    }
}

impl ModeMachine {
    pub(super) fn new(policy: UploadPolicy, has_credentials: bool) -> Self {
        Self {
            mode: RadioMode::Monitor,
            scanning: false,
            stop_pending: false,
            has_credentials,
            window: WindowProgress::default(),
            starting: false,
            releasing_capture: false,
            teardown: TeardownProgress::default(),
            policy: policy.sanitized(),
        }
    }

    fn enter_station(&mut self, now_ms: u64, context: &mut DispatchContext) {
        self.mode = RadioMode::Station;
        self.window = WindowProgress {
            attempt: 1,
            attempt_started_ms: now_ms,
            retry_at_ms: None,
            deadline_ms: now_ms + self.policy.association_budget_ms(),
            ready_since_ms: None,
        };
        context.step(RadioStep::Connect);
        log::info!(
            "mode: station attempt=1 deadline_ms={}",
            self.window.deadline_ms
        );
    }

    fn station_tick(
        &mut self,
        now_ms: u64,
        link: LinkState,
        context: &mut DispatchContext,
    ) -> Outcome<State> {
        if let Some(ready_since_ms) = self.window.ready_since_ms {
            if link != LinkState::Connected {
                return self.fail_window(UploadFailure::TransportFailed, context);
            }
            if now_ms.saturating_sub(ready_since_ms) >= u64::from(self.policy.transport_timeout_ms)
            {
                return self.fail_window(UploadFailure::TransportTimeout, context);
            }
            return Handled;
        }

        if let Some(retry_at_ms) = self.window.retry_at_ms {
            if now_ms >= self.window.deadline_ms {
                return self.fail_window(UploadFailure::AssociationExhausted, context);
            }
            if now_ms < retry_at_ms {
                return Handled;
            }
            self.window.retry_at_ms = None;
            self.window.attempt += 1;
            self.window.attempt_started_ms = now_ms;
            context.step(RadioStep::Connect);
            log::info!("mode: station attempt={}", self.window.attempt);
            return Handled;
        }

        match link {
            LinkState::Connected => {
                self.window.ready_since_ms = Some(now_ms);
                context.notice(ModeNotice::UploadReady);
                log::info!("mode: upload ready attempt={}", self.window.attempt);
                Handled
            }
            LinkState::Failed => self.attempt_failed(now_ms, context),
            LinkState::Idle | LinkState::Connecting => {
                let attempt_elapsed = now_ms.saturating_sub(self.window.attempt_started_ms);
                if now_ms >= self.window.deadline_ms
                    || attempt_elapsed >= u64::from(self.policy.attempt_timeout_ms)
                {
                    self.attempt_failed(now_ms, context)
                } else {
                    Handled
                }
            }
        }
    }

    fn attempt_failed(&mut self, now_ms: u64, context: &mut DispatchContext) -> Outcome<State> {
        context.notice(ModeNotice::AttemptFailed {
            attempt: self.window.attempt,
        });
        log::warn!("mode: association failed attempt={}", self.window.attempt);
        let retry_at_ms = now_ms + u64::from(self.policy.retry_delay_ms);
        if self.window.attempt >= self.policy.connect_attempts
            || retry_at_ms >= self.window.deadline_ms
        {
            return self.fail_window(UploadFailure::AssociationExhausted, context);
        }
        context.step(RadioStep::Disconnect);
        self.window.retry_at_ms = Some(retry_at_ms);
        Handled
    }

    fn fail_window(
        &mut self,
        failure: UploadFailure,
        context: &mut DispatchContext,
    ) -> Outcome<State> {
        context.notice(ModeNotice::UploadFailed(failure));
        log::warn!("mode: upload window failed reason={:?}", failure);
        self.begin_teardown(context)
    }

    fn begin_teardown(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        self.mode = RadioMode::TransitioningToMonitor;
        self.window.ready_since_ms = None;
        self.window.retry_at_ms = None;
        self.teardown = TeardownProgress::default();
        self.push_teardown_steps(context);
        Transition(State::transitioning_to_monitor())
    }

    fn push_teardown_steps(&mut self, context: &mut DispatchContext) {
        // A stop requested meanwhile means capture stays off.
        self.teardown.capture_restored = !self.stop_pending;
        context.step(RadioStep::Disconnect);
        if self.teardown.capture_restored {
            context.step(RadioStep::EnableCapture);
            context.step(RadioStep::ResumeHopping);
        }
    }

    fn arrive_monitor(&mut self, context: &mut DispatchContext) {
        let capture_restored = self.teardown.capture_restored;
        self.mode = RadioMode::Monitor;
        self.teardown = TeardownProgress::default();

        // Teardown samples `stop_pending` and its steps apply in the same
        // dispatch, so a pending stop here always left capture off.
        if self.stop_pending {
            self.stop_pending = false;
            self.scanning = false;
            context.notice(ModeNotice::ScanningStopped);
            log::info!("mode: monitor, deferred stop applied");
            return;
        }

        context.notice(ModeNotice::MonitorResumed);
        if !capture_restored {
            self.starting = true;
            context.step(RadioStep::EnableCapture);
            context.step(RadioStep::ResumeHopping);
        }
        log::info!("mode: monitor resumed");
    }
}

#[state_machine(initial = "State::monitor()")]
impl ModeMachine {
    #[state]
    fn monitor(&mut self, context: &mut DispatchContext, event: &ModeEvent) -> Outcome<State> {
        match *event {
            ModeEvent::SetScanning { enabled } => {
                if enabled == self.scanning {
                    context.status = ModeApplyStatus::Unchanged;
                    return Handled;
                }
                self.scanning = enabled;
                if enabled {
                    self.starting = true;
                    self.releasing_capture = false;
                    context.step(RadioStep::EnableCapture);
                    context.step(RadioStep::ResumeHopping);
                } else {
                    self.starting = false;
                    self.releasing_capture = true;
                    context.step(RadioStep::SuspendHopping);
                    context.step(RadioStep::DisableCapture);
                    context.notice(ModeNotice::ScanningStopped);
                }
                context.status = ModeApplyStatus::Applied;
                Handled
            }
            ModeEvent::OpenWindow { now_ms } => {
                if !self.scanning || !self.has_credentials {
                    context.status = ModeApplyStatus::Rejected;
                    return Handled;
                }
                self.mode = RadioMode::TransitioningToStation;
                self.window = WindowProgress::default();
                context.step(RadioStep::SuspendHopping);
                context.step(RadioStep::DisableCapture);
                context.step(RadioStep::SetClientMode);
                context.status = ModeApplyStatus::Applied;
                log::info!("mode: upload window opened now_ms={}", now_ms);
                Transition(State::transitioning_to_station())
            }
            ModeEvent::StepsApplied { .. } => {
                if self.starting {
                    self.starting = false;
                    context.notice(ModeNotice::ScanningStarted);
                }
                if self.releasing_capture {
                    self.releasing_capture = false;
                    log::info!("mode: capture released");
                }
                Handled
            }
            ModeEvent::StepFailed { step, .. } => {
                context.notice(ModeNotice::DriverFault(step));
                if self.releasing_capture {
                    log::warn!("mode: capture release failed step={:?}, retrying", step);
                }
                if self.starting {
                    self.starting = false;
                    self.scanning = false;
                    log::warn!("mode: scanning start failed step={:?}", step);
                }
                Handled
            }
            ModeEvent::CloseWindow { .. } => {
                context.status = ModeApplyStatus::InvalidTransition;
                Handled
            }
            ModeEvent::Tick { .. } => {
                if self.releasing_capture {
                    context.step(RadioStep::SuspendHopping);
                    context.step(RadioStep::DisableCapture);
                }
                Handled
            }
        }
    }

    #[state(superstate = "window")]
    fn transitioning_to_station(
        &mut self,
        context: &mut DispatchContext,
        event: &ModeEvent,
    ) -> Outcome<State> {
        match *event {
            ModeEvent::StepsApplied { now_ms } => {
                self.enter_station(now_ms, context);
                Transition(State::station())
            }
            ModeEvent::StepFailed { step, .. } => {
                context.notice(ModeNotice::DriverFault(step));
                self.fail_window(UploadFailure::DriverFault, context)
            }
            ModeEvent::CloseWindow { .. } => {
                context.status = ModeApplyStatus::Applied;
                self.fail_window(UploadFailure::Aborted, context)
            }
            _ => Super,
        }
    }

    #[state(superstate = "window")]
    fn station(&mut self, context: &mut DispatchContext, event: &ModeEvent) -> Outcome<State> {
        match *event {
            ModeEvent::Tick { now_ms, link } => self.station_tick(now_ms, link, context),
            ModeEvent::StepFailed {
                now_ms,
                step: RadioStep::Connect,
            } => {
                context.notice(ModeNotice::DriverFault(RadioStep::Connect));
                self.attempt_failed(now_ms, context)
            }
            ModeEvent::StepFailed { step, .. } => {
                context.notice(ModeNotice::DriverFault(step));
                Handled
            }
            ModeEvent::CloseWindow { delivered, .. } => {
                context.status = ModeApplyStatus::Applied;
                if self.window.ready_since_ms.is_none() {
                    return self.fail_window(UploadFailure::Aborted, context);
                }
                if !delivered {
                    return self.fail_window(UploadFailure::TransportFailed, context);
                }
                context.notice(ModeNotice::UploadCompleted);
                log::info!("mode: upload completed");
                self.begin_teardown(context)
            }
            _ => Super,
        }
    }

    #[state(superstate = "window")]
    fn transitioning_to_monitor(
        &mut self,
        context: &mut DispatchContext,
        event: &ModeEvent,
    ) -> Outcome<State> {
        match *event {
            ModeEvent::StepsApplied { .. } => {
                self.arrive_monitor(context);
                Transition(State::monitor())
            }
            ModeEvent::StepFailed { step, .. } => {
                self.teardown.failures = self.teardown.failures.saturating_add(1);
                self.teardown.retry = true;
                context.notice(ModeNotice::DriverFault(step));
                if self.teardown.wedged {
                    return Handled;
                }
                if self.teardown.failures >= self.policy.teardown_retry_max {
                    self.teardown.wedged = true;
                    context.notice(ModeNotice::RadioWedged);
                    log::error!(
                        "mode: radio wedged failures={} step={:?}",
                        self.teardown.failures,
                        step
                    );
                } else {
                    context.notice(ModeNotice::RadioRecoveryPending {
                        failures: self.teardown.failures,
                    });
                    log::warn!(
                        "mode: teardown failed failures={} step={:?}",
                        self.teardown.failures,
                        step
                    );
                }
                Handled
            }
            ModeEvent::Tick { .. } => {
                if self.teardown.retry {
                    self.teardown.retry = false;
                    self.push_teardown_steps(context);
                }
                Handled
            }
            _ => Super,
        }
    }

    #[superstate]
    fn window(&mut self, context: &mut DispatchContext, event: &ModeEvent) -> Outcome<State> {
        match *event {
            ModeEvent::SetScanning { enabled: false } => {
                if !self.stop_pending {
                    self.stop_pending = true;
                    context.notice(ModeNotice::StopDeferred);
                }
                context.status = ModeApplyStatus::Deferred;
                Handled
            }
            ModeEvent::SetScanning { enabled: true } => {
                context.status = if self.stop_pending {
                    self.stop_pending = false;
                    ModeApplyStatus::Applied
                } else {
                    ModeApplyStatus::Unchanged
                };
                Handled
            }
            ModeEvent::OpenWindow { .. } => {
                context.status = ModeApplyStatus::Rejected;
                Handled
            }
            ModeEvent::CloseWindow { .. } => {
                context.status = ModeApplyStatus::InvalidTransition;
                Handled
            }
            _ => Handled,
        }
    }
}
