//! Input device enumeration via the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};

use voice_processor_core::models::audio_models::{AudioSource, AudioTransportType};
use voice_processor_core::models::error::CaptureError;

/// Lists microphones on the default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input (microphone) devices. The default device is flagged.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::hardware(format!("failed to enumerate input devices: {e}")))?;

        let mut sources = Vec::new();
        for device in devices {
            let Ok(name) = device.name() else {
                continue;
            };
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                transport_type: Some(guess_transport(&name)),
                name,
            });
        }
        Ok(sources)
    }

    /// Name of the system default input device, if there is one.
    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host
            .default_input_device()
            .and_then(|device| device.name().ok())
    }

    /// Find an input device by its exact name, or the default when `None`.
    pub(crate) fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        match name {
            Some(name) => self
                .host
                .input_devices()
                .map_err(|e| {
                    CaptureError::hardware(format!("failed to enumerate input devices: {e}"))
                })?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::hardware(format!("input device not found: {name}"))),
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::hardware("no default input device available")),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// cpal exposes no transport metadata; infer it from the device name.
pub(crate) fn guess_transport(name: &str) -> AudioTransportType {
    let lower = name.to_lowercase();
    if lower.contains("bluetooth") || lower.contains("airpods") || lower.contains("hands-free") {
        AudioTransportType::Bluetooth
    } else if lower.contains("usb") {
        AudioTransportType::Usb
    } else if lower.contains("built-in") || lower.contains("internal") || lower.contains("macbook")
    {
        AudioTransportType::BuiltIn
    } else if lower.contains("virtual") || lower.contains("loopback") || lower.contains("monitor") {
        AudioTransportType::Virtual
    } else {
        AudioTransportType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_from_name() {
        assert_eq!(guess_transport("AirPods Pro"), AudioTransportType::Bluetooth);
        assert_eq!(
            guess_transport("Headset (Hands-Free AG Audio)"),
            AudioTransportType::Bluetooth
        );
        assert_eq!(guess_transport("Blue Yeti USB"), AudioTransportType::Usb);
        assert_eq!(
            guess_transport("MacBook Pro Microphone"),
            AudioTransportType::BuiltIn
        );
        assert_eq!(guess_transport("BlackHole Virtual"), AudioTransportType::Virtual);
        assert_eq!(guess_transport("default"), AudioTransportType::Unknown);
    }
}
