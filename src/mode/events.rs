use super::actions::RadioStep;
use crate::radio::LinkState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ModeEvent {
    SetScanning { enabled: bool },
    OpenWindow { now_ms: u64 },
    CloseWindow { now_ms: u64, delivered: bool },
    Tick { now_ms: u64, link: LinkState },
    StepsApplied { now_ms: u64 },
    StepFailed { now_ms: u64, step: RadioStep },
}
