//! Method-call dispatch for hosts that drive the processor by name.
//!
//! Calls arrive as `{"method": "...", "arguments": {...}}` and are answered
//! with a [`MethodResponse`]:
//!
//! | method                     | arguments                      | success value |
//! |----------------------------|--------------------------------|---------------|
//! | `start`                    | `{frameLength, sampleRate}`    | `true`        |
//! | `stop`                     | none                           | `true`        |
//! | `hasRecordAudioPermission` | none                           | bool          |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::error::CaptureError;
use crate::session::voice_processor::VoiceProcessor;
use crate::traits::capture_device::CaptureDevice;

pub const METHOD_CHANNEL: &str = "flutter_voice_processor_methods";
pub const EVENT_CHANNEL: &str = "flutter_voice_processor_events";

pub const INVALID_ARGUMENT_CODE: &str = "PV_INVALID_ARGUMENT";
pub const RECORDER_ERROR_CODE: &str = "PV_AUDIO_RECORDER_ERROR";

/// A named request from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success { value: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartArguments {
    frame_length: i64,
    sample_rate: i64,
}

/// Route `call` to the matching facade operation.
pub fn handle<D: CaptureDevice + 'static>(
    processor: &VoiceProcessor<D>,
    call: &MethodCall,
) -> MethodResponse {
    match call.method.as_str() {
        "start" => start(processor, &call.arguments),
        "stop" => {
            processor.request_stop();
            MethodResponse::success(true)
        }
        "hasRecordAudioPermission" => {
            MethodResponse::success(processor.query_record_permission())
        }
        other => {
            log::debug!("Method not implemented: {}", other);
            MethodResponse::NotImplemented
        }
    }
}

fn start<D: CaptureDevice + 'static>(
    processor: &VoiceProcessor<D>,
    arguments: &Value,
) -> MethodResponse {
    let args: StartArguments = match serde_json::from_value(arguments.clone()) {
        Ok(args) => args,
        Err(e) => {
            log::warn!("Rejected start arguments {}: {}", arguments, e);
            return MethodResponse::error(
                INVALID_ARGUMENT_CODE,
                "Invalid argument provided to VoiceProcessor.start",
            );
        }
    };

    match processor.request_start(args.frame_length, args.sample_rate) {
        Ok(()) => MethodResponse::success(true),
        Err(CaptureError::InvalidArgument(message)) => MethodResponse::error(
            INVALID_ARGUMENT_CODE,
            format!("Invalid argument provided to VoiceProcessor.start: {message}"),
        ),
        Err(e @ CaptureError::AudioHardware(_)) => MethodResponse::error(
            RECORDER_ERROR_CODE,
            format!("Unable to start audio engine: {e}"),
        ),
    }
}
