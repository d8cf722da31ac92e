#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BadgeEvent {
    ButtonPressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UploadError {
    NoHost,
    NoAddress,
    Dns,
    Connect,
    Write,
    Read,
    BadResponse,
    Status(u16),
    Timeout,
}
