//! Audio input streams for the live bridge
//!
//! The bridge does not talk to sound hardware. It reads mono PCM at the
//! configured rate from any [`AudioInput`]; the CLI pipes stdin through
//! [`PcmReader`] so a recorder such as `arecord` or `ffmpeg` can feed it.

use super::frame::f32_to_i16;
use crate::config::SampleFormat;
use crate::error::Result;
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK_BYTES: usize = 8192;

/// Source of mono 16-bit samples
#[async_trait]
pub trait AudioInput: Send {
    /// Next chunk of samples, or `None` once the stream has ended.
    async fn read_chunk(&mut self) -> Result<Option<Vec<i16>>>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

/// Raw PCM decoder over an async byte stream
pub struct PcmReader<R> {
    reader: R,
    format: SampleFormat,
    buf: BytesMut,
    name: String,
}

impl<R> PcmReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, format: SampleFormat, name: impl Into<String>) -> Self {
        Self {
            reader,
            format,
            buf: BytesMut::with_capacity(READ_CHUNK_BYTES),
            name: name.into(),
        }
    }

    fn sample_width(&self) -> usize {
        match self.format {
            SampleFormat::S16le => 2,
            SampleFormat::F32le => 4,
        }
    }

    /// Decode every complete sample currently buffered
    fn drain_samples(&mut self) -> Vec<i16> {
        let width = self.sample_width();
        let count = self.buf.len() / width;
        let mut block = self.buf.split_to(count * width);
        let mut samples = Vec::with_capacity(count);
        while block.has_remaining() {
            samples.push(match self.format {
                SampleFormat::S16le => block.get_i16_le(),
                SampleFormat::F32le => f32_to_i16(block.get_f32_le()),
            });
        }
        samples
    }
}

#[async_trait]
impl<R> AudioInput for PcmReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self) -> Result<Option<Vec<i16>>> {
        loop {
            self.buf.reserve(READ_CHUNK_BYTES);
            let read = self.reader.read_buf(&mut self.buf).await?;
            if read == 0 {
                if !self.buf.is_empty() {
                    tracing::debug!(input = %self.name, bytes = self.buf.len(), "Dropping partial trailing sample");
                    self.buf.clear();
                }
                return Ok(None);
            }
            let samples = self.drain_samples();
            if !samples.is_empty() {
                return Ok(Some(samples));
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
