//! Synthetic audio sources for testing without hardware.

use std::io::{self, Cursor, Read};
use std::time::Duration;

use crate::{AudioConfig, AudioSource};

/// Builds a deterministic PCM byte stream.
///
/// Samples are encoded the way a WAV payload expects them: 8-bit samples are
/// unsigned (silence is `0x80`), wider samples are signed little-endian.
///
/// # Example
///
/// ```
/// use media_exchange::source::MockSource;
///
/// let mut mock = MockSource::new();
///
/// // 100ms of silence, then 100ms of a 440Hz tone
/// mock.generate_silence(100);
/// mock.generate_sine(440.0, 100);
///
/// assert_eq!(mock.bytes().len(), 1600);
/// let reader = mock.into_reader();
/// ```
#[derive(Debug, Clone)]
pub struct MockSource {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    bytes: Vec<u8>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Creates an empty 8kHz 8-bit mono source, matching [`AudioConfig::default()`].
    pub fn new() -> Self {
        Self::for_config(&AudioConfig::default())
    }

    /// Creates an empty source in the sample layout of `config`.
    pub fn for_config(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels(),
            bits_per_sample: config.bits_per_sample,
            bytes: Vec::new(),
        }
    }

    /// Appends silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        for _ in 0..self.frames_for_duration(duration_ms) {
            for _ in 0..self.channels {
                self.push_sample(0.0);
            }
        }
    }

    /// Appends a sine wave at the given frequency.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        let sample_rate = f64::from(self.sample_rate);
        for i in 0..self.frames_for_duration(duration_ms) {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
            for _ in 0..self.channels {
                self.push_sample(value);
            }
        }
    }

    /// Appends raw bytes.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends raw bytes, builder style.
    #[must_use]
    pub fn with_bytes(mut self, bytes: &[u8]) -> Self {
        self.add_bytes(bytes);
        self
    }

    /// Returns the accumulated bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Takes the accumulated bytes, clearing the source.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Returns the playing time of the accumulated bytes.
    pub fn duration(&self) -> Duration {
        let frame_len = usize::from(self.channels) * usize::from(self.bits_per_sample / 8);
        let frames = self.bytes.len() / frame_len.max(1);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Returns a reader that yields the accumulated bytes, then end of stream.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    /// Wraps the accumulated bytes as an [`AudioSource`].
    pub fn into_source(self) -> AudioSource {
        AudioSource::reader(self.into_reader())
    }

    fn frames_for_duration(&self, duration_ms: u64) -> u64 {
        u64::from(self.sample_rate) * duration_ms / 1000
    }

    /// Encodes one sample in `[-1.0, 1.0]`.
    fn push_sample(&mut self, value: f64) {
        let value = value.clamp(-1.0, 1.0);
        let width = usize::from(self.bits_per_sample / 8);
        if width == 1 {
            self.bytes.push((value * 127.0 + 128.0) as u8);
            return;
        }

        // Scale to 32 bits, then keep the most significant bytes.
        let full = ((value * f64::from(i32::MAX)) as i32).to_le_bytes();
        if width >= full.len() {
            self.bytes
                .extend(std::iter::repeat(0u8).take(width - full.len()));
            self.bytes.extend_from_slice(&full);
        } else {
            self.bytes.extend_from_slice(&full[full.len() - width..]);
        }
    }
}

/// Endless stream of clips stamped with their sequence number.
///
/// The payload of the n-th clip (counting from 1) is `n` as a little-endian
/// `u64`, repeated. Since a ring numbers clips from 1 in read order, every
/// clip read from this source carries its own id, so readers can verify that
/// a snapshot's bytes belong to the id it reports.
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use media_exchange::source::SequenceSource;
///
/// let mut source = SequenceSource::new(16);
/// let mut clip = [0u8; 16];
/// source.read_exact(&mut clip).unwrap();
/// assert_eq!(SequenceSource::stamp_of(&clip), Some(1));
/// source.read_exact(&mut clip).unwrap();
/// assert_eq!(SequenceSource::stamp_of(&clip), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct SequenceSource {
    clip_len: usize,
    clip: u64,
    offset: usize,
    limit: Option<u64>,
}

impl SequenceSource {
    /// Creates a source producing clips of `clip_len` payload bytes.
    pub fn new(clip_len: usize) -> Self {
        Self {
            clip_len: clip_len.max(1),
            clip: 1,
            offset: 0,
            limit: None,
        }
    }

    /// Ends the stream after `clips` whole clips.
    #[must_use]
    pub fn with_limit(mut self, clips: u64) -> Self {
        self.limit = Some(clips);
        self
    }

    /// Decodes the stamp at the start of a payload.
    ///
    /// Returns `None` if the payload is shorter than the stamp or is not one
    /// stamp repeated throughout.
    pub fn stamp_of(payload: &[u8]) -> Option<u64> {
        let stamp = payload.get(..8)?;
        let consistent = payload
            .iter()
            .enumerate()
            .all(|(i, &b)| b == stamp[i % 8]);
        if !consistent {
            return None;
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(stamp);
        Some(u64::from_le_bytes(bytes))
    }
}

impl Read for SequenceSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        for byte in buf.iter_mut() {
            if self.limit.is_some_and(|limit| self.clip > limit) {
                break;
            }
            *byte = self.clip.to_le_bytes()[self.offset % 8];
            written += 1;
            self.offset += 1;
            if self.offset == self.clip_len {
                self.offset = 0;
                self.clip += 1;
            }
        }
        Ok(written)
    }
}
