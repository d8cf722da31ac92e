/// Driver work the controller asks for, executed strictly in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioStep {
    SuspendHopping,
    DisableCapture,
    SetClientMode,
    Connect,
    Disconnect,
    EnableCapture,
    ResumeHopping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UploadFailure {
    AssociationExhausted = 0,
    DriverFault = 1,
    TransportFailed = 2,
    TransportTimeout = 3,
    Aborted = 4,
}

impl UploadFailure {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AssociationExhausted),
            1 => Some(Self::DriverFault),
            2 => Some(Self::TransportFailed),
            3 => Some(Self::TransportTimeout),
            4 => Some(Self::Aborted),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeNotice {
    ScanningStarted,
    ScanningStopped,
    StopDeferred,
    /// Association is up; the orchestrator may send now.
    UploadReady,
    UploadCompleted,
    UploadFailed(UploadFailure),
    AttemptFailed { attempt: u8 },
    MonitorResumed,
    DriverFault(RadioStep),
    RadioRecoveryPending { failures: u8 },
    /// Teardown keeps failing; only a reset will bring capture back.
    RadioWedged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeApplyStatus {
    Applied,
    Deferred,
    Unchanged,
    InvalidTransition,
    Rejected,
}
