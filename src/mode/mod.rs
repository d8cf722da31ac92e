//! Radio mode controller: monitor capture versus station upload windows.

pub mod actions;
pub mod engine;
pub(crate) mod events;
pub(crate) mod machine;
#[cfg(test)]
mod tests;

pub use actions::{ModeApplyStatus, ModeNotice, RadioStep, UploadFailure};
pub use engine::{ModeController, ModeOutput, NoticeBuffer};
