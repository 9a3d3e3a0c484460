use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::models::audio_models::{CaptureDiagnostics, CaptureSession};
use crate::models::config::{CaptureConfiguration, POOL_SIZE};
use crate::models::error::CaptureError;
use crate::models::state::EngineState;
use crate::processing::input_queue::{BufferHandler, CaptureCounters, InputQueue, PcmBuffer};
use crate::traits::capture_device::{CaptureDevice, CaptureStream, FrameCallback};

/// Hardware resources of one open session. Dropped only after the stream
/// has confirmed it is halted.
struct ActiveSession<S: CaptureStream> {
    session: CaptureSession,
    queue: Arc<InputQueue>,
    stream: S,
}

/// What queries see. Updated once a transition has completed.
#[derive(Default)]
struct Status {
    state: EngineState,
    session: Option<CaptureSession>,
    queue: Option<Arc<InputQueue>>,
}

/// Microphone capture engine.
///
/// Owns the hardware stream and a pool of [`POOL_SIZE`] frame buffers that
/// cycle capture → deliver → capture. Control calls (`start`, `stop`,
/// `pause`, `resume`) are serialized by the lifecycle lock, which is held
/// across hardware calls. Queries (`state`, `session`, `diagnostics`) only
/// take the status lock and never wait on the hardware, so a frame callback
/// may call them. A frame callback must not call the control methods.
///
/// ```text
/// [CaptureDevice] → [InputQueue: 3 × PcmBuffer] → frame callback
///        ▲                         │
///        └────────── resubmit ─────┘
/// ```
pub struct CaptureEngine<D: CaptureDevice> {
    device: D,
    lifecycle: Mutex<Option<ActiveSession<D::Stream>>>,
    status: Mutex<Status>,
    // The only state written by the control side and read by the device thread.
    frame_callback: Arc<RwLock<Option<FrameCallback>>>,
    counters: Arc<CaptureCounters>,
}

impl<D: CaptureDevice> CaptureEngine<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            lifecycle: Mutex::new(None),
            status: Mutex::new(Status::default()),
            frame_callback: Arc::new(RwLock::new(None)),
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> EngineState {
        self.status.lock().state
    }

    /// Descriptor of the open session, if any.
    pub fn session(&self) -> Option<CaptureSession> {
        self.status.lock().session.clone()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        let queue = self.status.lock().queue.clone();
        let allocated = queue.map_or(0, |queue| queue.allocated());
        self.counters.snapshot(allocated)
    }

    /// Replace the registered frame callback. `None` keeps the stream
    /// running but drops every frame.
    pub fn set_frame_callback(&self, callback: Option<FrameCallback>) {
        *self.frame_callback.write() = callback;
    }

    /// Open the input stream and start delivering frames to `on_frame`.
    ///
    /// A no-op returning `Ok` if a session is already open, running or
    /// paused. On failure no stream or buffer is left allocated and the
    /// engine stays idle.
    pub fn start(
        &self,
        config: &CaptureConfiguration,
        on_frame: FrameCallback,
    ) -> Result<(), CaptureError> {
        config.validate()?;

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.is_some() {
            log::debug!("Capture engine already {}, ignoring start", self.state());
            return Ok(());
        }

        self.set_frame_callback(Some(on_frame));

        match self.open_session(config) {
            Ok(active) => {
                log::info!(
                    "Capture started: session {} ({}, {} samples/frame, {} buffers)",
                    active.session.id,
                    active.queue.format(),
                    config.frame_length,
                    POOL_SIZE
                );
                *self.status.lock() = Status {
                    state: EngineState::Running,
                    session: Some(active.session.clone()),
                    queue: Some(Arc::clone(&active.queue)),
                };
                *lifecycle = Some(active);
                Ok(())
            }
            Err(e) => {
                self.set_frame_callback(None);
                log::error!("Unable to start capture: {}", e);
                Err(e)
            }
        }
    }

    /// Halt the stream, release the pool and clear the frame callback.
    ///
    /// Blocks until the device has confirmed the halt; no frame callback
    /// runs after this returns. A no-op when idle. Must not be called from
    /// a frame callback.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(mut active) = lifecycle.take() else {
            return;
        };

        let partial = active.queue.flush();
        active.stream.halt();
        let released = active.queue.stop();
        self.set_frame_callback(None);
        *self.status.lock() = Status::default();

        let session_id = active.session.id.clone();
        drop(active);

        log::info!(
            "Capture stopped: session {} ({} buffers released, {} partial samples dropped)",
            session_id,
            released,
            partial
        );
    }

    /// Suspend delivery, keeping the stream and pool. Only from `Running`.
    pub fn pause(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(active) = lifecycle.as_mut() else {
            return;
        };
        if !self.state().is_running() {
            return;
        }

        active.queue.pause();
        if let Err(e) = active.stream.pause() {
            log::warn!("Failed to pause input stream: {}", e);
        }
        self.status.lock().state = EngineState::Paused;
        log::info!("Capture paused");
    }

    /// Restart delivery after a pause. Only from `Paused`.
    ///
    /// The first frame after resuming may contain audio from both sides of
    /// the pause.
    pub fn resume(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(active) = lifecycle.as_mut() else {
            return;
        };
        if !self.state().is_paused() {
            return;
        }

        let stale = active.queue.resume();
        if stale > 0 {
            log::debug!("Discarded {} stale samples captured during pause", stale);
        }
        if let Err(e) = active.stream.play() {
            active.queue.pause();
            log::error!("Failed to resume input stream: {}", e);
            return;
        }
        self.status.lock().state = EngineState::Running;
        log::info!("Capture resumed");
    }

    fn open_session(
        &self,
        config: &CaptureConfiguration,
    ) -> Result<ActiveSession<D::Stream>, CaptureError> {
        let format = config.stream_format();
        self.counters.reset();

        let queue = InputQueue::new(
            format,
            config.frame_length as usize,
            self.buffer_handler(),
            Arc::clone(&self.counters),
        );
        for _ in 0..POOL_SIZE {
            let buffer = queue.allocate_buffer()?;
            queue.enqueue(buffer)?;
        }

        let mut stream = match self.device.open_stream(&format, Arc::clone(&queue)) {
            Ok(stream) => stream,
            Err(e) => {
                queue.stop();
                return Err(e);
            }
        };

        queue.start();
        if let Err(e) = stream.play() {
            stream.halt();
            queue.stop();
            return Err(e);
        }

        Ok(ActiveSession {
            session: CaptureSession::new(config),
            queue,
            stream,
        })
    }

    /// Per-buffer handler run on the device thread: hand the frame to the
    /// registered callback, then resubmit the buffer.
    fn buffer_handler(&self) -> BufferHandler {
        let frame_callback = Arc::clone(&self.frame_callback);
        let counters = Arc::clone(&self.counters);

        Box::new(move |buffer: PcmBuffer, queue: &InputQueue| {
            let on_frame = frame_callback.read().clone();
            match on_frame {
                Some(on_frame) => {
                    on_frame(buffer.samples());
                    counters.frames_delivered.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    counters
                        .frames_without_callback
                        .fetch_add(1, Ordering::Relaxed);
                }
            }

            if let Err(e) = queue.enqueue(buffer) {
                log::warn!("Failed to resubmit capture buffer: {}", e);
            }
        })
    }
}

impl<D: CaptureDevice> Drop for CaptureEngine<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
