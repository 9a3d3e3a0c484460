use thiserror::Error;

/// Errors surfaced by the capture engine and the control facade.
///
/// Only `start` can fail. `stop`, `pause` and `resume` are silent no-ops in
/// the wrong state, and faults on the capture thread are never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Non-positive frame length or sample rate. Raised before any hardware
    /// interaction is attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Device open, format negotiation or buffer allocation failed.
    #[error("audio hardware error: {0}")]
    AudioHardware(String),
}

impl CaptureError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::AudioHardware(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::AudioHardware(_))
    }
}
