//! Configuration types for frame and clip buffers.

use std::time::Duration;

use crate::wav::WAV_HEADER_SIZE;
use crate::MediaError;

/// Slot count used when a configuration asks for fewer than [`MIN_SLOT_COUNT`].
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Smallest slot count a ring is built with.
///
/// One slot is always claimed by the producer for the read in flight, so a
/// ring of `n` slots keeps `n - 1` clips fetchable.
pub const MIN_SLOT_COUNT: usize = 3;

/// Frame rate used when the requested one is out of range.
pub const DEFAULT_FPS: u32 = 5;

/// Highest frame rate accepted by [`FrameConfig`].
pub const MAX_FPS: u32 = 30;

/// How the producer paces rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Wait at least one cadence between the starts of consecutive rotations.
    ///
    /// Suited to live sources that deliver audio in real time.
    #[default]
    Cadence,

    /// Start the next read as soon as the previous clip is published.
    ///
    /// The blocking read alone paces rotations. Useful for pre-recorded
    /// sources and tests.
    SourcePaced,
}

/// Configuration for an [`AudioRing`](crate::AudioRing).
///
/// Use [`AudioConfig::default()`] for 1 second 8kHz 8-bit mono clips in a ring
/// of 8 slots, or customize as needed.
///
/// # Example
///
/// ```
/// use media_exchange::AudioConfig;
///
/// let config = AudioConfig {
///     sample_rate: 16000,
///     bits_per_sample: 16,
///     ..Default::default()
/// };
/// assert_eq!(config.payload_len().unwrap(), 32000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    /// Clip length and rotation interval in whole seconds.
    ///
    /// Zero is treated as one second.
    /// Default: 1
    pub cadence_secs: u32,

    /// Number of preallocated clip slots.
    ///
    /// Values below [`MIN_SLOT_COUNT`] are replaced by [`DEFAULT_SLOT_COUNT`].
    /// Default: 8
    pub slot_count: usize,

    /// Sample rate in Hz.
    ///
    /// Default: 8000
    pub sample_rate: u32,

    /// Bits per sample, a multiple of 8.
    ///
    /// Default: 8
    pub bits_per_sample: u16,

    /// Two interleaved channels instead of one.
    ///
    /// Default: false
    pub stereo: bool,

    /// Rotation pacing.
    ///
    /// Default: [`Pacing::Cadence`]
    pub pacing: Pacing,

    /// How long `stop()` waits past one cadence for the in-flight read before
    /// terminating the source.
    ///
    /// Default: 2 seconds
    pub stop_grace: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            cadence_secs: 1,
            slot_count: DEFAULT_SLOT_COUNT,
            sample_rate: 8000,
            bits_per_sample: 8,
            stereo: false,
            pacing: Pacing::Cadence,
            stop_grace: Duration::from_secs(2),
        }
    }
}

impl AudioConfig {
    /// Returns the channel count (1 or 2).
    #[must_use]
    pub fn channels(&self) -> u16 {
        if self.stereo {
            2
        } else {
            1
        }
    }

    /// Returns the cadence actually used, with zero coerced to one second.
    #[must_use]
    pub fn effective_cadence_secs(&self) -> u32 {
        self.cadence_secs.max(1)
    }

    /// Returns the slot count actually used.
    ///
    /// Requests below [`MIN_SLOT_COUNT`] fall back to [`DEFAULT_SLOT_COUNT`]
    /// rather than being rejected.
    #[must_use]
    pub fn effective_slot_count(&self) -> usize {
        if self.slot_count < MIN_SLOT_COUNT {
            DEFAULT_SLOT_COUNT
        } else {
            self.slot_count
        }
    }

    /// Returns the rotation interval.
    #[must_use]
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(u64::from(self.effective_cadence_secs()))
    }

    /// Returns a copy with cadence and slot count coerced to their effective values.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            cadence_secs: self.effective_cadence_secs(),
            slot_count: self.effective_slot_count(),
            ..self.clone()
        }
    }

    /// Computes the PCM payload length of one clip in bytes.
    ///
    /// `cadence_secs x sample_rate x (bits_per_sample / 8) x channels`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bit depth is not a non-zero
    /// multiple of 8, the sample rate is zero, or the clip (payload plus
    /// container header) does not fit in 32 bits.
    pub fn payload_len(&self) -> Result<u32, MediaError> {
        let bits = self.bits_per_sample;
        if bits == 0 || bits % 8 != 0 {
            return Err(MediaError::InvalidBitDepth { bits });
        }
        if self.sample_rate == 0 {
            return Err(MediaError::InvalidSampleRate);
        }

        let too_large = || MediaError::PayloadTooLarge {
            seconds: self.effective_cadence_secs(),
            sample_rate: self.sample_rate,
            bits_per_sample: bits,
            channels: self.channels(),
        };

        let payload = self
            .effective_cadence_secs()
            .checked_mul(self.sample_rate)
            .and_then(|n| n.checked_mul(u32::from(bits / 8)))
            .and_then(|n| n.checked_mul(u32::from(self.channels())))
            .ok_or_else(too_large)?;

        // The RIFF size fields must hold the whole clip.
        payload
            .checked_add(WAV_HEADER_SIZE as u32)
            .ok_or_else(too_large)?;

        Ok(payload)
    }

    /// Computes the full clip length (container header plus payload) in bytes.
    ///
    /// # Errors
    ///
    /// Same as [`payload_len()`](Self::payload_len).
    pub fn clip_len(&self) -> Result<usize, MediaError> {
        Ok(self.payload_len()? as usize + WAV_HEADER_SIZE)
    }
}

/// Frame capture rate hint for the capture pipeline feeding a
/// [`FrameSlot`](crate::FrameSlot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Frames per second. Zero or more than [`MAX_FPS`] falls back to [`DEFAULT_FPS`].
    ///
    /// Default: 5
    pub fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

impl FrameConfig {
    /// Returns the frame rate actually used.
    #[must_use]
    pub fn effective_fps(&self) -> u32 {
        if self.fps == 0 || self.fps > MAX_FPS {
            DEFAULT_FPS
        } else {
            self.fps
        }
    }

    /// Returns the interval between captures.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / self.effective_fps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_config_defaults() {
        let config = AudioConfig::default();
        assert_eq!(config.cadence_secs, 1);
        assert_eq!(config.slot_count, 8);
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.bits_per_sample, 8);
        assert!(!config.stereo);
        assert_eq!(config.pacing, Pacing::Cadence);
        assert_eq!(config.payload_len().unwrap(), 8000);
        assert_eq!(config.clip_len().unwrap(), 8044);
    }

    #[test]
    fn test_payload_len_formula() {
        for (secs, rate, bits, stereo) in [
            (1, 8000, 8, false),
            (2, 44100, 16, true),
            (3, 16000, 24, false),
            (5, 48000, 32, true),
        ] {
            let config = AudioConfig {
                cadence_secs: secs,
                sample_rate: rate,
                bits_per_sample: bits,
                stereo,
                ..Default::default()
            };
            let channels = if stereo { 2 } else { 1 };
            let expected = secs * rate * u32::from(bits / 8) * channels;
            assert_eq!(config.payload_len().unwrap(), expected);
        }
    }

    #[test]
    fn test_invalid_bit_depth() {
        for bits in [0, 4, 12, 20] {
            let config = AudioConfig {
                bits_per_sample: bits,
                ..Default::default()
            };
            let err = config.payload_len().unwrap_err();
            assert!(matches!(err, MediaError::InvalidBitDepth { bits: b } if b == bits));
            assert!(err.is_config());
        }
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = AudioConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.payload_len(),
            Err(MediaError::InvalidSampleRate)
        ));
    }

    #[test]
    fn test_payload_overflow_rejected() {
        let config = AudioConfig {
            cadence_secs: 100_000,
            sample_rate: 192_000,
            bits_per_sample: 32,
            stereo: true,
            ..Default::default()
        };
        let err = config.payload_len().unwrap_err();
        assert!(matches!(err, MediaError::PayloadTooLarge { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn test_payload_overflow_by_header_rejected() {
        // Payload itself fits in u32 but payload + header does not.
        let config = AudioConfig {
            cadence_secs: 1,
            sample_rate: u32::MAX,
            bits_per_sample: 8,
            stereo: false,
            ..Default::default()
        };
        assert!(matches!(
            config.payload_len(),
            Err(MediaError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_zero_cadence_coerced_to_one_second() {
        let config = AudioConfig {
            cadence_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_cadence_secs(), 1);
        assert_eq!(config.cadence(), Duration::from_secs(1));
        assert_eq!(config.payload_len().unwrap(), 8000);
    }

    // Slot counts below the minimum are coerced to 8, not clamped to 3.
    #[test]
    fn test_small_slot_count_coerced_to_default() {
        for requested in [0, 1, 2] {
            let config = AudioConfig {
                slot_count: requested,
                ..Default::default()
            };
            assert_eq!(config.effective_slot_count(), DEFAULT_SLOT_COUNT);
        }

        let config = AudioConfig {
            slot_count: 3,
            ..Default::default()
        };
        assert_eq!(config.effective_slot_count(), 3);
    }

    #[test]
    fn test_normalized() {
        let config = AudioConfig {
            cadence_secs: 0,
            slot_count: 1,
            stereo: true,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.cadence_secs, 1);
        assert_eq!(config.slot_count, DEFAULT_SLOT_COUNT);
        assert!(config.stereo);
    }

    #[test]
    fn test_frame_config_clamp() {
        assert_eq!(FrameConfig { fps: 0 }.effective_fps(), DEFAULT_FPS);
        assert_eq!(FrameConfig { fps: 31 }.effective_fps(), DEFAULT_FPS);
        assert_eq!(FrameConfig { fps: 30 }.effective_fps(), 30);
        assert_eq!(FrameConfig { fps: 10 }.interval(), Duration::from_millis(100));
        assert_eq!(FrameConfig::default().interval(), Duration::from_millis(200));
    }
}
