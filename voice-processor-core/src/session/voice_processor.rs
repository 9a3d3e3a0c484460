use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::models::audio_models::{CaptureDiagnostics, CaptureSession};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::EngineState;
use crate::session::engine::CaptureEngine;
use crate::traits::capture_device::{CaptureDevice, FrameCallback};
use crate::traits::frame_sink::FrameSink;
use crate::traits::interruption::{
    InterruptionEvent, InterruptionObserver, InterruptionSource, SubscriptionId,
};

#[derive(Default)]
struct Listening {
    active: bool,
    subscription: Option<SubscriptionId>,
}

/// Control facade in front of a [`CaptureEngine`].
///
/// Translates external requests (start, stop, permission check) into engine
/// calls, forwards every captured frame to the installed [`FrameSink`] as an
/// owned copy, and maps platform interruptions onto pause/resume while a
/// session is open.
pub struct VoiceProcessor<D: CaptureDevice + 'static> {
    engine: Arc<CaptureEngine<D>>,
    sink: Arc<RwLock<Option<Arc<dyn FrameSink>>>>,
    interruptions: Option<Arc<dyn InterruptionSource>>,
    listening: Mutex<Listening>,
}

impl<D: CaptureDevice + 'static> VoiceProcessor<D> {
    pub fn new(device: D) -> Self {
        Self {
            engine: Arc::new(CaptureEngine::new(device)),
            sink: Arc::new(RwLock::new(None)),
            interruptions: None,
            listening: Mutex::new(Listening::default()),
        }
    }

    /// Pause and resume automatically on interruptions raised by `source`.
    pub fn with_interruptions(mut self, source: Arc<dyn InterruptionSource>) -> Self {
        self.interruptions = Some(source);
        self
    }

    pub fn engine(&self) -> &CaptureEngine<D> {
        &self.engine
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn session(&self) -> Option<CaptureSession> {
        self.engine.session()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.engine.diagnostics()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.lock().active
    }

    /// Install the consumer that receives captured frames.
    pub fn listen(&self, sink: Arc<dyn FrameSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Detach the frame consumer and the interruption observer. Capture
    /// keeps running; frames are dropped until a new sink is installed.
    pub fn cancel(&self) {
        *self.sink.write() = None;
        let mut listening = self.listening.lock();
        self.detach_interruptions(&mut listening);
    }

    /// Start capturing `frame_length`-sample frames at `sample_rate` Hz.
    ///
    /// Succeeds without side effects if already listening. Zero or negative
    /// arguments fail with `InvalidArgument` before the hardware is touched.
    pub fn request_start(&self, frame_length: i64, sample_rate: i64) -> Result<(), CaptureError> {
        let mut listening = self.listening.lock();
        if listening.active {
            log::debug!("Voice processor already listening");
            return Ok(());
        }

        let config = CaptureConfiguration::from_signed(frame_length, sample_rate)?;
        log::info!(
            "Starting voice processor: {} samples/frame at {} Hz",
            config.frame_length,
            config.sample_rate
        );

        self.engine.start(&config, self.forwarding_callback())?;

        if let Some(ref source) = self.interruptions {
            listening.subscription = Some(source.subscribe(self.interruption_observer()));
        }
        listening.active = true;
        Ok(())
    }

    /// Stop capturing. Idempotent.
    pub fn request_stop(&self) {
        let mut listening = self.listening.lock();
        self.detach_interruptions(&mut listening);
        if !listening.active {
            return;
        }
        self.engine.stop();
        listening.active = false;
        log::info!("Voice processor stopped");
    }

    /// Whether recording is permitted. An undetermined state counts as
    /// permitted; only an explicit denial returns `false`.
    pub fn query_record_permission(&self) -> bool {
        let permission = self.engine.device().record_permission();
        log::debug!("Record permission: {:?}", permission);
        permission.allows_recording()
    }

    /// Apply an interruption directly, for hosts that receive the platform
    /// notification themselves.
    pub fn handle_interruption(&self, event: &InterruptionEvent) {
        apply_interruption(&self.engine, event);
    }

    fn forwarding_callback(&self) -> FrameCallback {
        let sink = Arc::clone(&self.sink);
        Arc::new(move |samples: &[i16]| {
            let sink = sink.read().clone();
            if let Some(sink) = sink {
                sink.on_frame(samples.to_vec());
            }
        })
    }

    fn interruption_observer(&self) -> InterruptionObserver {
        let engine: Weak<CaptureEngine<D>> = Arc::downgrade(&self.engine);
        Arc::new(move |event: &InterruptionEvent| {
            if let Some(engine) = engine.upgrade() {
                apply_interruption(&engine, event);
            }
        })
    }

    fn detach_interruptions(&self, listening: &mut Listening) {
        if let (Some(source), Some(id)) = (&self.interruptions, listening.subscription.take()) {
            source.unsubscribe(id);
        }
    }
}

impl<D: CaptureDevice + 'static> Drop for VoiceProcessor<D> {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn apply_interruption<D: CaptureDevice>(engine: &CaptureEngine<D>, event: &InterruptionEvent) {
    match event {
        InterruptionEvent::Began => {
            log::info!("Audio session interrupted");
            engine.pause();
        }
        InterruptionEvent::Ended { should_resume: true } => {
            log::info!("Audio session interruption ended, resuming");
            engine.resume();
        }
        InterruptionEvent::Ended { should_resume: false } => {
            log::warn!("Audio session interruption ended without resume hint; staying paused");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bridge::channel_sink::ChannelSink;
    use crate::bridge::interruption_center::InterruptionCenter;
    use crate::models::audio_models::RecordPermission;
    use crate::simulated::SimulatedDevice;

    fn processor() -> (VoiceProcessor<SimulatedDevice>, SimulatedDevice) {
        let device = SimulatedDevice::new();
        (VoiceProcessor::new(device.clone()), device)
    }

    #[test]
    fn forwards_owned_copies_to_the_sink() {
        let (processor, device) = processor();
        let (sink, frames) = ChannelSink::unbounded();
        processor.listen(Arc::new(sink));

        processor.request_start(4, 16000).unwrap();
        assert!(processor.is_listening());
        device.feed(&[1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(frames.try_recv().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(frames.try_recv().unwrap(), vec![5, 6, 7, 8]);
        assert!(frames.try_recv().is_err());
    }

    #[test]
    fn frames_without_a_sink_are_dropped() {
        let (processor, device) = processor();
        processor.request_start(2, 16000).unwrap();
        device.feed(&[1, 2, 3, 4]);
        assert_eq!(processor.diagnostics().frames_delivered, 2);

        let (sink, frames) = ChannelSink::unbounded();
        processor.listen(Arc::new(sink));
        device.feed(&[5, 6]);
        assert_eq!(frames.try_recv().unwrap(), vec![5, 6]);
        assert!(frames.try_recv().is_err());
    }

    #[test]
    fn second_start_is_a_successful_noop() {
        let (processor, device) = processor();
        processor.request_start(512, 16000).unwrap();
        processor.request_start(256, 8000).unwrap();

        assert_eq!(device.streams_opened(), 1);
        assert_eq!(processor.session().unwrap().frame_length, 512);
    }

    #[test]
    fn invalid_arguments_are_rejected_up_front() {
        let (processor, device) = processor();
        assert!(processor
            .request_start(0, 16000)
            .unwrap_err()
            .is_invalid_argument());
        assert!(processor
            .request_start(512, -1)
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(device.streams_opened(), 0);
        assert!(!processor.is_listening());
    }

    #[test]
    fn hardware_failure_keeps_the_processor_stopped() {
        let device = SimulatedDevice::new().failing_open("no microphone");
        let center = Arc::new(InterruptionCenter::new());
        let processor = VoiceProcessor::new(device).with_interruptions(center.clone());

        assert!(processor.request_start(512, 16000).unwrap_err().is_hardware());
        assert!(!processor.is_listening());
        assert_eq!(center.observer_count(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let (processor, device) = processor();
        processor.request_stop();

        processor.request_start(512, 16000).unwrap();
        processor.request_stop();
        processor.request_stop();

        assert!(!processor.is_listening());
        assert_eq!(processor.state(), EngineState::Idle);
        assert_eq!(device.live_streams(), 0);
    }

    #[test]
    fn interruptions_pause_and_resume() {
        let device = SimulatedDevice::new();
        let center = Arc::new(InterruptionCenter::new());
        let processor = VoiceProcessor::new(device.clone()).with_interruptions(center.clone());

        // No observer until a session is open.
        center.post(InterruptionEvent::Began);
        assert_eq!(center.observer_count(), 0);

        processor.request_start(512, 16000).unwrap();
        assert_eq!(center.observer_count(), 1);

        center.post(InterruptionEvent::Began);
        assert_eq!(processor.state(), EngineState::Paused);

        center.post(InterruptionEvent::Ended {
            should_resume: true,
        });
        assert_eq!(processor.state(), EngineState::Running);

        center.post(InterruptionEvent::Began);
        center.post(InterruptionEvent::Ended {
            should_resume: false,
        });
        assert_eq!(processor.state(), EngineState::Paused);

        processor.request_stop();
        assert_eq!(center.observer_count(), 0);
        assert_eq!(processor.state(), EngineState::Idle);
    }

    #[test]
    fn start_during_an_interruption_stays_paused() {
        let device = SimulatedDevice::new();
        let center = Arc::new(InterruptionCenter::new());
        let processor = VoiceProcessor::new(device.clone()).with_interruptions(center.clone());

        processor.request_start(512, 16000).unwrap();
        center.post(InterruptionEvent::Began);
        assert_eq!(processor.state(), EngineState::Paused);

        processor.request_start(256, 8000).unwrap();
        assert_eq!(processor.state(), EngineState::Paused);
        assert_eq!(device.streams_opened(), 1);
        assert_eq!(processor.session().unwrap().frame_length, 512);
        assert_eq!(center.observer_count(), 1);

        center.post(InterruptionEvent::Ended {
            should_resume: true,
        });
        assert_eq!(processor.state(), EngineState::Running);
    }

    #[test]
    fn cancel_detaches_sink_and_observer() {
        let device = SimulatedDevice::new();
        let center = Arc::new(InterruptionCenter::new());
        let processor = VoiceProcessor::new(device.clone()).with_interruptions(center.clone());
        let (sink, frames) = ChannelSink::unbounded();
        processor.listen(Arc::new(sink));

        processor.request_start(2, 16000).unwrap();
        processor.cancel();
        assert_eq!(center.observer_count(), 0);

        device.feed(&[1, 2]);
        assert!(frames.try_recv().is_err());

        center.post(InterruptionEvent::Began);
        assert_eq!(processor.state(), EngineState::Running);
    }

    #[test]
    fn direct_interruption_handling() {
        let (processor, _device) = processor();
        processor.handle_interruption(&InterruptionEvent::Began);
        assert_eq!(processor.state(), EngineState::Idle);

        processor.request_start(512, 16000).unwrap();
        processor.handle_interruption(&InterruptionEvent::Began);
        assert_eq!(processor.state(), EngineState::Paused);
        processor.handle_interruption(&InterruptionEvent::Ended {
            should_resume: true,
        });
        assert_eq!(processor.state(), EngineState::Running);
    }

    #[test]
    fn permission_only_fails_when_denied() {
        for (permission, expected) in [
            (RecordPermission::Granted, true),
            (RecordPermission::Undetermined, true),
            (RecordPermission::Denied, false),
        ] {
            let processor = VoiceProcessor::new(SimulatedDevice::new().with_permission(permission));
            assert_eq!(processor.query_record_permission(), expected);
        }
    }

    #[test]
    fn dropping_the_processor_stops_capture() {
        let device = SimulatedDevice::new();
        let center = Arc::new(InterruptionCenter::new());
        {
            let processor =
                VoiceProcessor::new(device.clone()).with_interruptions(center.clone());
            processor.request_start(512, 16000).unwrap();
        }
        assert_eq!(device.live_streams(), 0);
        assert_eq!(center.observer_count(), 0);
    }
}
