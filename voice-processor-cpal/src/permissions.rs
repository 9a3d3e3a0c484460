//! Microphone permission probe.
//!
//! cpal has no permission API. Where the OS gates the microphone (macOS
//! TCC, Windows privacy settings, Android), a refused device shows up as
//! a missing default device or a failed config query.

use cpal::traits::DeviceTrait;

use voice_processor_core::models::audio_models::RecordPermission;

use crate::device_enumerator::DeviceEnumerator;

/// Probe the default (or named) input device.
///
/// - no device at all → `Denied`
/// - the device refuses a config query → `Denied`
/// - otherwise → `Granted`
pub fn check_microphone_permission(device_name: Option<&str>) -> RecordPermission {
    let device = match DeviceEnumerator::new().find_input_device(device_name) {
        Ok(device) => device,
        Err(e) => {
            log::info!("{}; reporting record permission denied", e);
            return RecordPermission::Denied;
        }
    };

    match device.default_input_config() {
        Ok(_) => RecordPermission::Granted,
        Err(e) => {
            log::warn!("Input device refused config query: {}", e);
            RecordPermission::Denied
        }
    }
}
