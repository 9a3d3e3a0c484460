use super::error::CaptureError;
use super::format::StreamFormat;

/// Number of reusable buffers cycled through the hardware queue.
pub const POOL_SIZE: usize = 3;

/// Largest accepted frame, in samples (2 MiB per pool buffer).
pub const MAX_FRAME_LENGTH: u32 = 1 << 20;

/// Configuration for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Samples per delivered frame (default: 512).
    pub frame_length: u32,

    /// Capture sample rate in Hz (default: 16000).
    pub sample_rate: u32,
}

impl CaptureConfiguration {
    pub fn new(frame_length: u32, sample_rate: u32) -> Result<Self, CaptureError> {
        let config = Self {
            frame_length,
            sample_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from signed values as they arrive from an
    /// external caller. Zero, negative and out-of-range values are rejected.
    pub fn from_signed(frame_length: i64, sample_rate: i64) -> Result<Self, CaptureError> {
        let frame_length = u32::try_from(frame_length)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                CaptureError::invalid_argument(format!(
                    "frame length must be a positive integer, got {frame_length}"
                ))
            })?;
        let sample_rate = u32::try_from(sample_rate)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                CaptureError::invalid_argument(format!(
                    "sample rate must be a positive integer, got {sample_rate}"
                ))
            })?;
        Self::new(frame_length, sample_rate)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.frame_length == 0 {
            return Err(CaptureError::invalid_argument("frame length must be positive"));
        }
        if self.frame_length > MAX_FRAME_LENGTH {
            return Err(CaptureError::invalid_argument(format!(
                "frame length {} exceeds the maximum of {MAX_FRAME_LENGTH} samples",
                self.frame_length
            )));
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::invalid_argument("sample rate must be positive"));
        }
        Ok(())
    }

    /// Bytes held by one pool buffer.
    pub fn buffer_byte_size(&self) -> usize {
        self.frame_length as usize * StreamFormat::BYTES_PER_SAMPLE
    }

    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat::mono_pcm16(self.sample_rate)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            frame_length: 512,
            sample_rate: 16000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = CaptureConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_byte_size(), 1024);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(CaptureConfiguration::new(0, 16000)
            .unwrap_err()
            .is_invalid_argument());
        assert!(CaptureConfiguration::new(512, 0)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn rejects_oversized_frames() {
        assert!(CaptureConfiguration::new(MAX_FRAME_LENGTH, 16000).is_ok());
        assert!(CaptureConfiguration::new(MAX_FRAME_LENGTH + 1, 16000)
            .unwrap_err()
            .is_invalid_argument());
        assert!(CaptureConfiguration::from_signed(i64::from(u32::MAX), 16000)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn from_signed_rejects_negative_and_overflow() {
        assert!(CaptureConfiguration::from_signed(512, -1)
            .unwrap_err()
            .is_invalid_argument());
        assert!(CaptureConfiguration::from_signed(-512, 16000)
            .unwrap_err()
            .is_invalid_argument());
        assert!(CaptureConfiguration::from_signed(i64::from(u32::MAX) + 1, 16000)
            .unwrap_err()
            .is_invalid_argument());

        let config = CaptureConfiguration::from_signed(256, 44100).unwrap();
        assert_eq!(config.frame_length, 256);
        assert_eq!(config.sample_rate, 44100);
    }
}
