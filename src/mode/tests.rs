use super::*;
use crate::config::{HopPolicy, UploadPolicy};
use crate::hop::HopOutcome;
use crate::radio::LinkState;
use crate::testing::{credentials, FakeRadio, RadioCall};
use crate::types::RadioMode;

const TICK_MS: u64 = 20;

fn scanning_controller(radio: &mut FakeRadio) -> ModeController {
    let mut controller = ModeController::new(
        HopPolicy::defaults(),
        UploadPolicy::defaults(),
        Some(credentials()),
    );
    let output = controller.start_scanning(0, radio);
    assert!(output.has(ModeNotice::ScanningStarted));
    controller
}

/// Ticks until the controller is back in monitor mode or `limit_ms` passes.
fn tick_until_monitor(
    controller: &mut ModeController,
    radio: &mut FakeRadio,
    from_ms: u64,
    limit_ms: u64,
    seen: &mut std::vec::Vec<ModeNotice>,
) -> u64 {
    let mut now = from_ms;
    while now <= limit_ms {
        let output = controller.tick(now, radio);
        seen.extend(output.notices.iter().copied());
        if output.mode == RadioMode::Monitor {
            return now;
        }
        now += TICK_MS;
    }
    panic!("controller never returned to monitor by {limit_ms} ms");
}

#[test]
fn starting_enables_capture_and_tunes_first_channel() {
    let mut radio = FakeRadio::new();
    let controller = scanning_controller(&mut radio);
    assert!(controller.is_scanning());
    assert_eq!(controller.mode(), RadioMode::Monitor);
    assert_eq!(
        radio.calls,
        [RadioCall::EnableCapture, RadioCall::SetChannel(1)]
    );
}

#[test]
fn failed_start_leaves_scanning_off() {
    let mut radio = FakeRadio::new();
    radio.fail_enable_capture = 1;
    let mut controller =
        ModeController::new(HopPolicy::defaults(), UploadPolicy::defaults(), None);
    let output = controller.start_scanning(0, &mut radio);
    assert!(output.has(ModeNotice::DriverFault(RadioStep::EnableCapture)));
    assert!(!output.has(ModeNotice::ScanningStarted));
    assert!(!controller.is_scanning());
}

#[test]
fn hops_only_while_scanning_in_monitor() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    assert_eq!(
        controller.tick(200, &mut radio).hop,
        HopOutcome::Hopped { channel: 2 }
    );

    controller.request_stop(210, &mut radio);
    assert_eq!(controller.tick(1_000, &mut radio).hop, HopOutcome::Idle);
    assert_eq!(controller.scan_state().current_channel, 2);
}

#[test]
fn window_requires_scanning_and_credentials() {
    let mut radio = FakeRadio::new();
    let mut idle = ModeController::new(
        HopPolicy::defaults(),
        UploadPolicy::defaults(),
        Some(credentials()),
    );
    assert_eq!(
        idle.begin_upload_window(0, &mut radio).status,
        ModeApplyStatus::Rejected
    );

    let mut anonymous =
        ModeController::new(HopPolicy::defaults(), UploadPolicy::defaults(), None);
    anonymous.start_scanning(0, &mut radio);
    assert_eq!(
        anonymous.begin_upload_window(10, &mut radio).status,
        ModeApplyStatus::Rejected
    );
    assert_eq!(anonymous.mode(), RadioMode::Monitor);
}

#[test]
fn second_window_is_rejected_while_busy() {
    let mut radio = FakeRadio::connecting_forever();
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    assert_eq!(
        controller.begin_upload_window(20, &mut radio).status,
        ModeApplyStatus::Rejected
    );
}

#[test]
fn capture_is_off_before_client_mode_is_requested() {
    let mut radio = FakeRadio::connecting_forever();
    let mut controller = scanning_controller(&mut radio);
    let output = controller.begin_upload_window(1_000, &mut radio);

    assert_eq!(output.status, ModeApplyStatus::Applied);
    assert_eq!(output.mode, RadioMode::Station);
    let disable = radio.position(RadioCall::DisableCapture).unwrap();
    let client = radio.position(RadioCall::SetClientMode).unwrap();
    let connect = radio.position(RadioCall::Connect).unwrap();
    assert!(disable < client && client < connect);
    assert!(!controller.scan_state().active);
}

#[test]
fn delivered_window_returns_to_monitor_on_frozen_channel() {
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.tick(600, &mut radio);
    assert_eq!(controller.scan_state().current_channel, 4);

    controller.begin_upload_window(1_000, &mut radio);
    let ready = controller.tick(1_020, &mut radio);
    assert!(ready.upload_ready());
    assert!(controller.upload_ready());

    let done = controller.end_upload_window(1_500, true, &mut radio);
    assert!(done.has(ModeNotice::UploadCompleted));
    assert!(done.has(ModeNotice::MonitorResumed));
    assert_eq!(done.mode, RadioMode::Monitor);
    assert!(radio.capture_enabled);
    assert_eq!(radio.channels().last(), Some(&4));
    assert!(controller.scan_state().active);
}

#[test]
fn failing_association_returns_to_monitor_within_budget() {
    let policy = UploadPolicy::defaults();
    let mut radio = FakeRadio::always_failing_association();
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);

    let mut seen = std::vec::Vec::new();
    let back = tick_until_monitor(
        &mut controller,
        &mut radio,
        TICK_MS,
        policy.association_budget_ms(),
        &mut seen,
    );

    assert!(back <= policy.association_budget_ms());
    assert_eq!(radio.connects, usize::from(policy.connect_attempts));
    assert!(seen.contains(&ModeNotice::UploadFailed(UploadFailure::AssociationExhausted)));
    assert!(!seen.contains(&ModeNotice::UploadReady));
    assert!(radio.capture_enabled);
}

#[test]
fn hung_association_is_cut_off_at_the_deadline() {
    let policy = UploadPolicy::defaults();
    let mut radio = FakeRadio::connecting_forever();
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);

    let mut seen = std::vec::Vec::new();
    let back = tick_until_monitor(
        &mut controller,
        &mut radio,
        TICK_MS,
        policy.association_budget_ms() + TICK_MS,
        &mut seen,
    );
    assert!(back <= policy.association_budget_ms());
    assert!(seen.contains(&ModeNotice::UploadFailed(UploadFailure::AssociationExhausted)));
}

#[test]
fn retry_after_delay_can_still_succeed() {
    let mut radio = FakeRadio::associates_on(2);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);

    let first = controller.tick(20, &mut radio);
    assert!(first.has(ModeNotice::AttemptFailed { attempt: 1 }));
    assert!(controller.tick(500, &mut radio).notices.is_empty());
    controller.tick(520, &mut radio);
    assert_eq!(controller.association_attempt(), 2);
    assert!(controller.tick(540, &mut radio).upload_ready());
    assert_eq!(radio.connects, 2);
}

#[test]
fn stalled_transport_times_out() {
    let policy = UploadPolicy::defaults();
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    assert!(controller.tick(20, &mut radio).upload_ready());

    let before = u64::from(policy.transport_timeout_ms) + 20 - TICK_MS;
    assert_eq!(controller.tick(before, &mut radio).mode, RadioMode::Station);
    let output = controller.tick(before + TICK_MS, &mut radio);
    assert_eq!(
        output.upload_failure(),
        Some(UploadFailure::TransportTimeout)
    );
    assert_eq!(output.mode, RadioMode::Monitor);
}

#[test]
fn lost_link_fails_the_transport() {
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    controller.tick(20, &mut radio);

    radio.connect_succeeds_on = None;
    radio.link = Some(LinkState::Idle);
    let output = controller.tick(40, &mut radio);
    assert_eq!(output.upload_failure(), Some(UploadFailure::TransportFailed));
    assert_eq!(output.mode, RadioMode::Monitor);
}

#[test]
fn undelivered_and_early_close_are_failures() {
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    controller.tick(20, &mut radio);
    let output = controller.end_upload_window(30, false, &mut radio);
    assert_eq!(output.upload_failure(), Some(UploadFailure::TransportFailed));

    let mut radio = FakeRadio::connecting_forever();
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    let output = controller.end_upload_window(10, true, &mut radio);
    assert_eq!(output.upload_failure(), Some(UploadFailure::Aborted));
    assert_eq!(output.mode, RadioMode::Monitor);
}

#[test]
fn closing_without_a_window_is_invalid() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    assert_eq!(
        controller.end_upload_window(5, true, &mut radio).status,
        ModeApplyStatus::InvalidTransition
    );
}

#[test]
fn client_mode_failure_rolls_back_to_monitor() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    radio.fail_client_mode = true;
    let output = controller.begin_upload_window(0, &mut radio);

    assert!(output.has(ModeNotice::DriverFault(RadioStep::SetClientMode)));
    assert_eq!(output.upload_failure(), Some(UploadFailure::DriverFault));
    assert_eq!(output.mode, RadioMode::Monitor);
    assert_eq!(radio.count(RadioCall::Connect), 0);
    assert!(radio.capture_enabled);
}

#[test]
fn stop_in_monitor_is_immediate() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    let output = controller.request_stop(50, &mut radio);
    assert_eq!(output.status, ModeApplyStatus::Applied);
    assert!(output.has(ModeNotice::ScanningStopped));
    assert!(!controller.is_scanning());
    assert!(!radio.capture_enabled);
    assert_eq!(
        controller.request_stop(60, &mut radio).status,
        ModeApplyStatus::Unchanged
    );
}

#[test]
fn failed_capture_release_is_retried_each_tick() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    radio.fail_disable_capture = true;

    let output = controller.request_stop(100, &mut radio);
    assert!(output.has(ModeNotice::DriverFault(RadioStep::DisableCapture)));
    assert!(!controller.is_scanning());
    assert!(radio.capture_enabled);

    let failed_again = controller.tick(120, &mut radio);
    assert!(failed_again.has(ModeNotice::DriverFault(RadioStep::DisableCapture)));
    assert_eq!(radio.count(RadioCall::DisableCapture), 2);

    radio.fail_disable_capture = false;
    let released = controller.tick(140, &mut radio);
    assert!(released.notices.is_empty());
    assert!(!radio.capture_enabled);
    assert_eq!(radio.count(RadioCall::DisableCapture), 3);

    controller.tick(160, &mut radio);
    controller.tick(10_000, &mut radio);
    assert_eq!(radio.count(RadioCall::DisableCapture), 3);
    assert!(!controller.scan_state().active);
}

#[test]
fn restart_cancels_a_pending_capture_release() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    radio.fail_disable_capture = true;
    controller.request_stop(100, &mut radio);

    radio.fail_disable_capture = false;
    let restarted = controller.start_scanning(110, &mut radio);
    assert!(restarted.has(ModeNotice::ScanningStarted));
    controller.tick(130, &mut radio);
    assert!(radio.capture_enabled);
    assert_eq!(radio.count(RadioCall::DisableCapture), 1);
}

#[test]
fn disable_failure_when_opening_window_keeps_scanning() {
    let mut radio = FakeRadio::new();
    let mut controller = scanning_controller(&mut radio);
    radio.fail_disable_capture = true;

    let output = controller.begin_upload_window(0, &mut radio);
    assert!(output.has(ModeNotice::DriverFault(RadioStep::DisableCapture)));
    assert_eq!(output.upload_failure(), Some(UploadFailure::DriverFault));
    assert_eq!(output.mode, RadioMode::Monitor);
    assert!(controller.is_scanning());
    assert!(radio.capture_enabled);
    assert_eq!(radio.count(RadioCall::SetClientMode), 0);
}

#[test]
fn stop_during_window_waits_for_monitor() {
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);

    let deferred = controller.request_stop(10, &mut radio);
    assert_eq!(deferred.status, ModeApplyStatus::Deferred);
    assert!(deferred.has(ModeNotice::StopDeferred));
    assert!(controller.is_scanning());
    assert!(controller.stop_pending());

    controller.tick(20, &mut radio);
    let done = controller.end_upload_window(30, true, &mut radio);
    assert!(done.has(ModeNotice::UploadCompleted));
    assert!(done.has(ModeNotice::ScanningStopped));
    assert_eq!(done.mode, RadioMode::Monitor);
    assert!(!controller.is_scanning());
    assert!(!controller.stop_pending());
    assert!(!radio.capture_enabled);
    assert!(!controller.scan_state().active);
}

#[test]
fn restart_during_window_cancels_the_pending_stop() {
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    controller.request_stop(5, &mut radio);
    assert_eq!(
        controller.start_scanning(6, &mut radio).status,
        ModeApplyStatus::Applied
    );

    controller.tick(20, &mut radio);
    let done = controller.end_upload_window(30, true, &mut radio);
    assert!(done.has(ModeNotice::MonitorResumed));
    assert!(controller.is_scanning());
    assert!(radio.capture_enabled);
}

#[test]
fn failed_teardown_is_retried_then_reported_wedged() {
    let policy = UploadPolicy::defaults();
    let mut radio = FakeRadio::associates_on(1);
    let mut controller = scanning_controller(&mut radio);
    controller.begin_upload_window(0, &mut radio);
    controller.tick(20, &mut radio);

    radio.fail_enable_capture = usize::from(policy.teardown_retry_max);
    let first = controller.end_upload_window(30, true, &mut radio);
    assert!(first.has(ModeNotice::RadioRecoveryPending { failures: 1 }));
    assert_eq!(first.mode, RadioMode::TransitioningToMonitor);

    let mut now = 40;
    let mut wedged = false;
    for _ in 1..policy.teardown_retry_max {
        let output = controller.tick(now, &mut radio);
        wedged |= output.wedged();
        now += TICK_MS;
    }
    assert!(wedged);
    assert_eq!(controller.mode(), RadioMode::TransitioningToMonitor);

    let recovered = controller.tick(now, &mut radio);
    assert!(recovered.has(ModeNotice::MonitorResumed));
    assert_eq!(recovered.mode, RadioMode::Monitor);
    assert!(radio.capture_enabled);
}
