//! # voice-processor-cpal
//!
//! Cross-platform microphone backend for voice-processor, built on cpal.
//!
//! Provides:
//! - `CpalDevice`: microphone capture at the exact requested rate, mono
//! - `DeviceEnumerator`: input device listing on the default host
//! - `permissions`: best-effort microphone access check
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use voice_processor_core::{ChannelSink, VoiceProcessor};
//! use voice_processor_cpal::CpalDevice;
//!
//! let processor = VoiceProcessor::new(CpalDevice::default_device());
//! let (sink, frames) = ChannelSink::unbounded();
//! processor.listen(Arc::new(sink));
//! processor.request_start(512, 16000)?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;
pub mod permissions;

pub use cpal_input::{CpalDevice, CpalStream};
pub use device_enumerator::DeviceEnumerator;
