use std::sync::Arc;

use crate::models::audio_models::{AudioSource, RecordPermission};
use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;
use crate::processing::input_queue::InputQueue;

/// Callback invoked once per completed frame with exactly `frame_length`
/// samples.
///
/// Fires on the device thread. The slice borrows a pool buffer that is
/// resubmitted to the hardware as soon as the callback returns, so copy
/// anything that must outlive the call. The callback may query the engine
/// but must not call `start`, `stop`, `pause` or `resume`.
pub type FrameCallback = Arc<dyn Fn(&[i16]) + Send + Sync + 'static>;

/// Interface for platform-specific microphone sources.
///
/// Implemented by:
/// - `SimulatedDevice` (this crate)
/// - `CpalDevice` (voice-processor-cpal)
pub trait CaptureDevice: Send + Sync {
    type Stream: CaptureStream;

    /// Whether an input device is present.
    fn is_available(&self) -> bool;

    /// Open an input stream in `format`, bound to `queue`.
    ///
    /// The device thread pushes captured samples with [`InputQueue::ingest`].
    /// Nothing is delivered until the stream is played.
    fn open_stream(
        &self,
        format: &StreamFormat,
        queue: Arc<InputQueue>,
    ) -> Result<Self::Stream, CaptureError>;

    /// Platform record-permission state.
    fn record_permission(&self) -> RecordPermission;

    /// Information about the device backing this source.
    fn device_info(&self) -> AudioSource;
}

/// An open hardware input stream.
pub trait CaptureStream: Send {
    /// Start or restart delivery.
    fn play(&mut self) -> Result<(), CaptureError>;

    /// Suspend delivery without releasing the stream.
    fn pause(&mut self) -> Result<(), CaptureError>;

    /// Stop delivery and release the stream.
    ///
    /// Synchronous: once this returns the device thread no longer touches
    /// the queue. Calling it twice is harmless.
    fn halt(&mut self);
}
