//! Outbound audio framing
//!
//! Input chunks of arbitrary length are cut into fixed-size frames of mono
//! 16-bit samples. Each frame goes on the wire as base64 of its
//! little-endian bytes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::{BufMut, BytesMut};

/// Convert a float sample in [-1.0, 1.0] to 16-bit PCM.
///
/// Scales by 32768 and saturates, so 1.0 maps to `i16::MAX`. Non-finite
/// input becomes silence.
pub fn f32_to_i16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Mime type announced for raw PCM at `sample_rate`
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}

/// One fixed-size block of samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Little-endian PCM bytes
    pub fn to_le_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.samples.len() * 2);
        for &sample in &self.samples {
            buf.put_i16_le(sample);
        }
        buf
    }

    /// Base64 of the little-endian PCM bytes
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_le_bytes())
    }
}

/// Accumulates samples and emits frames of exactly `frame_samples`
#[derive(Debug)]
pub struct Framer {
    frame_samples: usize,
    pending: Vec<i16>,
}

impl Framer {
    pub fn new(frame_samples: usize) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
        }
    }

    /// Buffer `samples`, returning every frame that is now complete
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);
        let mut frames = Vec::with_capacity(self.pending.len() / self.frame_samples);
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            frames.push(AudioFrame::new(std::mem::replace(&mut self.pending, rest)));
        }
        frames
    }

    /// Pad the remainder with silence into a final frame, if any is buffered
    pub fn flush(&mut self) -> Option<AudioFrame> {
        if self.pending.is_empty() {
            return None;
        }
        let mut samples = std::mem::take(&mut self.pending);
        samples.resize(self.frame_samples, 0);
        Some(AudioFrame::new(samples))
    }

    /// Samples waiting for a full frame
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_conversion() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(0.5), 16384);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(3.0), i16::MAX);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_frame_encoding_is_little_endian() {
        let frame = AudioFrame::new(vec![1, -2, 0x0102]);
        assert_eq!(&frame.to_le_bytes()[..], &[0x01, 0x00, 0xFE, 0xFF, 0x02, 0x01]);
        assert_eq!(frame.to_base64(), BASE64.encode([0x01, 0x00, 0xFE, 0xFF, 0x02, 0x01]));
    }

    #[test]
    fn test_framer_emits_fixed_frames() {
        let mut framer = Framer::new(4);
        assert!(framer.push(&[1, 2, 3]).is_empty());
        let frames = framer.push(&[4, 5, 6, 7, 8, 9]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].samples(), &[1, 2, 3, 4]);
        assert_eq!(frames[1].samples(), &[5, 6, 7, 8]);
        assert_eq!(framer.buffered(), 1);

        let last = framer.flush().unwrap();
        assert_eq!(last.samples(), &[9, 0, 0, 0]);
        assert!(framer.flush().is_none());
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(pcm_mime_type(16000), "audio/pcm;rate=16000");
    }
}
