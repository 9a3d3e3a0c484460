use serde::Serialize;

use super::config::{CaptureConfiguration, POOL_SIZE};

/// Transport type for an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioTransportType {
    BuiltIn,
    Bluetooth,
    Usb,
    Virtual,
    Unknown,
}

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub transport_type: Option<AudioTransportType>,
}

/// Platform record-permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordPermission {
    Granted,
    Denied,
    /// The user has not been asked yet. Treated as permitted.
    Undetermined,
}

impl RecordPermission {
    pub fn allows_recording(&self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// One open hardware input stream, as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSession {
    pub id: String,
    pub sample_rate: u32,
    pub frame_length: u32,
    pub buffer_byte_size: usize,
    pub pool_size: usize,
    pub started_at: String,
}

impl CaptureSession {
    pub fn new(config: &CaptureConfiguration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
            buffer_byte_size: config.buffer_byte_size(),
            pool_size: POOL_SIZE,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureDiagnostics {
    /// Frames handed to a registered frame callback.
    pub frames_delivered: u64,
    /// Frames filled while no callback was registered; resubmitted unread.
    pub frames_without_callback: u64,
    /// Samples dropped because no buffer was enqueued with the hardware.
    pub samples_overrun: u64,
    /// Samples discarded while paused or after stop.
    pub samples_discarded: u64,
    /// Buffers allocated for the current session.
    pub buffers_allocated: usize,
}
