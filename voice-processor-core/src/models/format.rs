use std::fmt;

/// PCM sample encoding requested from the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// Signed 16-bit integers, packed, native endian.
    SignedInt16,
}

/// Hardware stream description handed to a `CaptureDevice` when opening
/// an input stream.
///
/// Always linear PCM: one packet per frame, one sample per frame for mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_channel: u16,
    pub encoding: SampleEncoding,
}

impl StreamFormat {
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Single-channel, 16-bit signed, packed linear PCM at `sample_rate`.
    pub fn mono_pcm16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_channel: 16,
            encoding: SampleEncoding::SignedInt16,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_channel as usize / 8)
    }

    pub fn bytes_per_packet(&self) -> usize {
        self.bytes_per_frame()
    }

    pub fn frames_per_packet(&self) -> usize {
        1
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit signed PCM",
            self.sample_rate, self.channels, self.bits_per_channel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_pcm16_layout() {
        let format = StreamFormat::mono_pcm16(16000);
        assert_eq!(format.bytes_per_frame(), 2);
        assert_eq!(format.bytes_per_packet(), 2);
        assert_eq!(format.frames_per_packet(), 1);
        assert_eq!(format.to_string(), "16000 Hz, 1 ch, 16-bit signed PCM");
    }
}
