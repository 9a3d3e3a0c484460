//! cpal microphone capture device.
//!
//! Opens a cpal input stream at the requested rate in mono and pushes
//! 16-bit samples into the engine's `InputQueue`. cpal streams are not
//! `Send`, so each stream lives on a dedicated capture thread that is
//! driven over a command channel and joined on halt.

use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use voice_processor_core::models::audio_models::{AudioSource, RecordPermission};
use voice_processor_core::models::error::CaptureError;
use voice_processor_core::models::format::StreamFormat;
use voice_processor_core::processing::input_queue::InputQueue;
use voice_processor_core::traits::capture_device::{CaptureDevice, CaptureStream};

use crate::device_enumerator::{guess_transport, DeviceEnumerator};
use crate::permissions::check_microphone_permission;

enum StreamCommand {
    Play,
    Pause,
    Halt,
}

type Reply = Result<(), CaptureError>;

/// Microphone capture through the cpal default host.
#[derive(Debug, Clone)]
pub struct CpalDevice {
    device_name: Option<String>,
}

impl CpalDevice {
    /// Capture from the system default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from the input device with this exact name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl CaptureDevice for CpalDevice {
    type Stream = CpalStream;

    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_input_device(self.device_name.as_deref())
            .is_ok()
    }

    fn open_stream(
        &self,
        format: &StreamFormat,
        queue: Arc<InputQueue>,
    ) -> Result<CpalStream, CaptureError> {
        let (command_tx, command_rx) = unbounded();
        let (reply_tx, reply_rx) = bounded(1);
        let device_name = self.device_name.clone();
        let format = *format;

        let handle = thread::Builder::new()
            .name("voice-processor-capture".into())
            .spawn(move || capture_thread(device_name, format, queue, command_rx, reply_tx))
            .map_err(|e| CaptureError::hardware(format!("failed to spawn capture thread: {e}")))?;

        match reply_rx.recv() {
            Ok(Ok(())) => Ok(CpalStream {
                commands: command_tx,
                replies: reply_rx,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::hardware("capture thread exited during setup"))
            }
        }
    }

    fn record_permission(&self) -> RecordPermission {
        check_microphone_permission(self.device_name.as_deref())
    }

    fn device_info(&self) -> AudioSource {
        let enumerator = DeviceEnumerator::new();
        let name = self
            .device_name
            .clone()
            .or_else(|| enumerator.default_capture_device_name())
            .unwrap_or_else(|| "Default Microphone".into());

        AudioSource {
            id: self.device_name.clone().unwrap_or_else(|| "default-mic".into()),
            transport_type: Some(guess_transport(&name)),
            is_default: self.device_name.is_none(),
            name,
        }
    }
}

/// Handle to a stream owned by its capture thread.
pub struct CpalStream {
    commands: Sender<StreamCommand>,
    replies: Receiver<Reply>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CpalStream {
    fn request(&self, command: StreamCommand) -> Result<(), CaptureError> {
        if self.handle.is_none() {
            return Err(CaptureError::hardware("input stream already halted"));
        }
        self.commands
            .send(command)
            .map_err(|_| CaptureError::hardware("capture thread is gone"))?;
        self.replies
            .recv()
            .map_err(|_| CaptureError::hardware("capture thread is gone"))?
    }
}

impl CaptureStream for CpalStream {
    fn play(&mut self) -> Result<(), CaptureError> {
        self.request(StreamCommand::Play)
    }

    fn pause(&mut self) -> Result<(), CaptureError> {
        self.request(StreamCommand::Pause)
    }

    fn halt(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.commands.send(StreamCommand::Halt);
        if handle.join().is_err() {
            log::error!("Capture thread panicked");
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Owns the cpal stream for its whole life. Exits on `Halt` or when the
/// command sender is dropped; the stream is dropped before returning.
fn capture_thread(
    device_name: Option<String>,
    format: StreamFormat,
    queue: Arc<InputQueue>,
    commands: Receiver<StreamCommand>,
    replies: Sender<Reply>,
) {
    let stream = match build_stream(device_name.as_deref(), &format, queue) {
        Ok(stream) => {
            let _ = replies.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = replies.send(Err(e));
            return;
        }
    };

    for command in commands.iter() {
        let reply = match command {
            StreamCommand::Play => stream
                .play()
                .map_err(|e| CaptureError::hardware(format!("failed to start input stream: {e}"))),
            StreamCommand::Pause => stream
                .pause()
                .map_err(|e| CaptureError::hardware(format!("failed to pause input stream: {e}"))),
            StreamCommand::Halt => break,
        };
        let _ = replies.send(reply);
    }

    drop(stream);
    log::debug!("Capture thread exiting");
}

fn build_stream(
    device_name: Option<&str>,
    format: &StreamFormat,
    queue: Arc<InputQueue>,
) -> Result<cpal::Stream, CaptureError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let name = device.name().unwrap_or_else(|_| "unknown".into());
    let (config, sample_format) = negotiate(&device, format)?;

    log::info!(
        "Opening input device {} ({}, device format {:?})",
        name,
        format,
        sample_format
    );

    let err_fn = |err: cpal::StreamError| log::error!("Audio input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| queue.ingest(data),
            err_fn,
            None,
        ),
        SampleFormat::F32 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| f32_to_i16(s)));
                    queue.ingest(&scratch);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::hardware(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    }
    .map_err(|e| CaptureError::hardware(format!("failed to build input stream: {e}")))?;

    Ok(stream)
}

/// Pick a device config with exactly `format`'s rate and channel count,
/// preferring native i16 over f32. No resampling or downmixing is done.
fn negotiate(
    device: &cpal::Device,
    format: &StreamFormat,
) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let rate = cpal::SampleRate(format.sample_rate);
    let candidates: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| CaptureError::hardware(format!("failed to query input configs: {e}")))?
        .filter(|range| {
            range.channels() == format.channels
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .collect();

    let range = [SampleFormat::I16, SampleFormat::F32]
        .iter()
        .find_map(|wanted| candidates.iter().find(|r| r.sample_format() == *wanted))
        .ok_or_else(|| CaptureError::hardware(format!("unsupported format: {format}")))?;

    let supported = range.clone().with_sample_rate(rate);
    Ok((supported.config(), supported.sample_format()))
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
