//! Capture from a microphone and print a level line per frame.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use voice_processor_core::{CaptureDevice, ChannelSink, VoiceProcessor};
use voice_processor_cpal::{CpalDevice, DeviceEnumerator};

/// Print per-frame peak and RMS levels from a microphone.
#[derive(Debug, Parser)]
#[command(name = "frame-monitor", author, version)]
struct Args {
    /// Samples per frame
    #[arg(long, default_value_t = 512)]
    frame_length: i64,

    /// Capture rate in Hz
    #[arg(long, default_value_t = 16000)]
    sample_rate: i64,

    /// How long to capture, in seconds
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// Input device name (defaults to the system default microphone)
    #[arg(long)]
    device: Option<String>,

    /// Print detected input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    list_input_devices: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_input_devices {
        for source in DeviceEnumerator::new().list_capture_devices()? {
            let marker = if source.is_default { " (default)" } else { "" };
            println!("{}{}", source.name, marker);
        }
        return Ok(());
    }

    let device = match args.device {
        Some(name) => CpalDevice::with_device(name),
        None => CpalDevice::default_device(),
    };
    let processor = VoiceProcessor::new(device);

    if !processor.engine().device().is_available() {
        return Err("no matching input device".into());
    }
    if !processor.query_record_permission() {
        return Err("microphone access denied".into());
    }

    let (sink, frames) = ChannelSink::unbounded();
    let sink = Arc::new(sink);
    processor.listen(sink.clone());
    processor.request_start(args.frame_length, args.sample_rate)?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut index: u64 = 0;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match frames.recv_timeout(remaining) {
            Ok(frame) => {
                let (peak, rms) = levels(&frame);
                println!("frame {:>6}  peak {:>6}  rms {:>9.1}", index, peak, rms);
                index += 1;
            }
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    processor.request_stop();
    let diagnostics = processor.diagnostics();
    log::info!(
        "Captured {} frames ({} samples overrun, {} discarded, {} frames dropped by the sink)",
        index,
        diagnostics.samples_overrun,
        diagnostics.samples_discarded,
        sink.dropped()
    );
    Ok(())
}

fn levels(frame: &[i16]) -> (i32, f64) {
    if frame.is_empty() {
        return (0, 0.0);
    }
    let peak = frame.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    let energy: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (peak, (energy / frame.len() as f64).sqrt())
}
