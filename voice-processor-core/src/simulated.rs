//! In-process capture device driven by the caller.
//!
//! `SimulatedDevice` stands in for a microphone in tests and on hosts
//! without audio hardware. Samples pushed with [`SimulatedDevice::feed`] are
//! delivered to the open stream on the calling thread, which plays the role
//! of the hardware callback thread.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, AudioTransportType, RecordPermission};
use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;
use crate::processing::input_queue::InputQueue;
use crate::traits::capture_device::{CaptureDevice, CaptureStream};

struct SimulatedState {
    permission: RecordPermission,
    available: bool,
    supported_rates: Option<Vec<u32>>,
    open_error: Option<String>,
    play_error: Option<String>,
    queue: Option<Arc<InputQueue>>,
    last_queue: Option<Weak<InputQueue>>,
    last_format: Option<StreamFormat>,
    playing: bool,
    streams_opened: usize,
    live_streams: usize,
}

/// Caller-driven capture device. Clones share the same state, so a test
/// can keep a handle after moving the device into an engine.
#[derive(Clone)]
pub struct SimulatedDevice {
    shared: Arc<Mutex<SimulatedState>>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimulatedState {
                permission: RecordPermission::Granted,
                available: true,
                supported_rates: None,
                open_error: None,
                play_error: None,
                queue: None,
                last_queue: None,
                last_format: None,
                playing: false,
                streams_opened: 0,
                live_streams: 0,
            })),
        }
    }

    pub fn with_permission(self, permission: RecordPermission) -> Self {
        self.shared.lock().permission = permission;
        self
    }

    /// Restrict the sample rates `open_stream` accepts.
    pub fn with_supported_rates(self, rates: Vec<u32>) -> Self {
        self.shared.lock().supported_rates = Some(rates);
        self
    }

    /// Make `open_stream` fail as if the device could not be opened.
    pub fn failing_open(self, message: &str) -> Self {
        {
            let mut state = self.shared.lock();
            state.open_error = Some(message.to_string());
            state.available = false;
        }
        self
    }

    /// Make `play` fail after the stream has been opened.
    pub fn failing_play(self, message: &str) -> Self {
        self.shared.lock().play_error = Some(message.to_string());
        self
    }

    /// Push captured samples to the open stream. Returns `false` if no
    /// stream is playing and the samples went nowhere.
    pub fn feed(&self, samples: &[i16]) -> bool {
        let queue = {
            let state = self.shared.lock();
            if !state.playing {
                return false;
            }
            state.queue.clone()
        };
        match queue {
            Some(queue) => {
                queue.ingest(samples);
                true
            }
            None => false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().playing
    }

    /// Streams opened over the device's lifetime.
    pub fn streams_opened(&self) -> usize {
        self.shared.lock().streams_opened
    }

    /// Streams opened and not yet dropped.
    pub fn live_streams(&self) -> usize {
        self.shared.lock().live_streams
    }

    pub fn last_format(&self) -> Option<StreamFormat> {
        self.shared.lock().last_format
    }

    /// Whether the queue bound to the most recent stream has been freed.
    pub fn last_queue_released(&self) -> bool {
        self.shared
            .lock()
            .last_queue
            .as_ref()
            .map_or(true, |queue| queue.upgrade().is_none())
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for SimulatedDevice {
    type Stream = SimulatedStream;

    fn is_available(&self) -> bool {
        self.shared.lock().available
    }

    fn open_stream(
        &self,
        format: &StreamFormat,
        queue: Arc<InputQueue>,
    ) -> Result<SimulatedStream, CaptureError> {
        let mut state = self.shared.lock();
        if let Some(ref message) = state.open_error {
            return Err(CaptureError::hardware(message.clone()));
        }
        if let Some(ref rates) = state.supported_rates {
            if !rates.contains(&format.sample_rate) {
                return Err(CaptureError::hardware(format!("unsupported format: {format}")));
            }
        }

        state.last_queue = Some(Arc::downgrade(&queue));
        state.queue = Some(queue);
        state.last_format = Some(*format);
        state.playing = false;
        state.streams_opened += 1;
        state.live_streams += 1;

        Ok(SimulatedStream {
            shared: Arc::clone(&self.shared),
            halted: false,
        })
    }

    fn record_permission(&self) -> RecordPermission {
        self.shared.lock().permission
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "simulated-mic".into(),
            name: "Simulated Microphone".into(),
            is_default: true,
            transport_type: Some(AudioTransportType::Virtual),
        }
    }
}

/// Stream handed out by [`SimulatedDevice`].
pub struct SimulatedStream {
    shared: Arc<Mutex<SimulatedState>>,
    halted: bool,
}

impl CaptureStream for SimulatedStream {
    fn play(&mut self) -> Result<(), CaptureError> {
        let mut state = self.shared.lock();
        if let Some(ref message) = state.play_error {
            return Err(CaptureError::hardware(message.clone()));
        }
        if !self.halted {
            state.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), CaptureError> {
        self.shared.lock().playing = false;
        Ok(())
    }

    fn halt(&mut self) {
        if self.halted {
            return;
        }
        let mut state = self.shared.lock();
        state.playing = false;
        state.queue = None;
        self.halted = true;
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.halt();
        self.shared.lock().live_streams -= 1;
    }
}
