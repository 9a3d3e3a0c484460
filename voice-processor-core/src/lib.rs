//! # voice-processor-core
//!
//! Platform-agnostic microphone capture core.
//!
//! Captures mono 16-bit PCM in fixed-size frames through a pool of three
//! reusable buffers and hands each completed frame to a consumer in near
//! real time. Platform backends implement the `CaptureDevice` trait and
//! plug into the generic `CaptureEngine`; `VoiceProcessor` is the control
//! facade hosts talk to.
//!
//! ## Architecture
//!
//! ```text
//! voice-processor-core (this crate)
//! ├── traits/       ← CaptureDevice, CaptureStream, FrameSink, InterruptionSource
//! ├── models/       ← CaptureError, EngineState, CaptureConfiguration, StreamFormat, etc.
//! ├── processing/   ← InputQueue and the PcmBuffer pool
//! ├── session/      ← CaptureEngine, VoiceProcessor
//! ├── bridge/       ← method-call dispatch, ChannelSink, InterruptionCenter
//! └── simulated     ← SimulatedDevice (caller-driven backend)
//! ```

pub mod bridge;
pub mod models;
pub mod processing;
pub mod session;
pub mod simulated;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use bridge::channel_sink::ChannelSink;
pub use bridge::dispatch::{MethodCall, MethodResponse};
pub use bridge::interruption_center::InterruptionCenter;
pub use models::audio_models::{
    AudioSource, AudioTransportType, CaptureDiagnostics, CaptureSession, RecordPermission,
};
pub use models::config::{CaptureConfiguration, MAX_FRAME_LENGTH, POOL_SIZE};
pub use models::error::CaptureError;
pub use models::format::{SampleEncoding, StreamFormat};
pub use models::state::EngineState;
pub use processing::input_queue::{BufferHandler, InputQueue, PcmBuffer};
pub use session::engine::CaptureEngine;
pub use session::voice_processor::VoiceProcessor;
pub use simulated::SimulatedDevice;
pub use traits::capture_device::{CaptureDevice, CaptureStream, FrameCallback};
pub use traits::frame_sink::FrameSink;
pub use traits::interruption::{
    InterruptionEvent, InterruptionObserver, InterruptionSource, SubscriptionId,
};
