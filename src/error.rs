//! Error types for media-exchange.
//!
//! Errors are split into two categories:
//! - **Call errors** ([`MediaError`]): returned from `open`, `fetch` and `snapshot`
//! - **Source failures** ([`SourceError`]): recorded on a running ring when its
//!   audio source breaks, surfaced via [`ClipReader::source_error()`] and the
//!   [`EventCallback`](crate::EventCallback)
//!
//! [`ClipReader::source_error()`]: crate::ClipReader::source_error

use std::io;

/// Errors returned by buffer operations.
///
/// Configuration and resource errors are fatal and only come out of
/// [`AudioRing::open()`]. [`MediaError::NotReady`] is a normal transient state
/// that readers see until the first clip or frame has been published.
///
/// [`AudioRing::open()`]: crate::AudioRing::open
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Bits per sample must be a non-zero multiple of 8.
    #[error("unsupported bit depth: {bits} (must be a non-zero multiple of 8)")]
    InvalidBitDepth {
        /// The requested bit depth.
        bits: u16,
    },

    /// The sample rate must be non-zero.
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,

    /// The clip payload size does not fit the 32-bit container size fields.
    #[error(
        "clip payload too large: {seconds}s x {sample_rate}Hz x {bits_per_sample}bit x {channels}ch overflows 32 bits"
    )]
    PayloadTooLarge {
        /// Clip length in seconds.
        seconds: u32,
        /// Sample rate in Hz.
        sample_rate: u32,
        /// Bits per sample.
        bits_per_sample: u16,
        /// Channel count.
        channels: u16,
    },

    /// Preallocating the slot buffers failed.
    #[error("failed to allocate {bytes} bytes of clip storage")]
    AllocationFailed {
        /// Size of the allocation that failed.
        bytes: usize,
    },

    /// The source command could not be started.
    #[error("failed to start audio source `{command}`: {source}")]
    SourceSpawnFailed {
        /// The command line that was executed.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The source started but cannot be read from.
    #[error("audio source unavailable: {reason}")]
    SourceUnavailable {
        /// Why the source is unusable.
        reason: String,
    },

    /// The producer thread could not be created.
    #[error("failed to spawn producer thread: {0}")]
    ThreadSpawnFailed(#[source] io::Error),

    /// Nothing has been published yet.
    #[error("no media published yet")]
    NotReady,

    /// The ring was stopped and its storage released.
    #[error("audio ring has been stopped")]
    Closed,
}

impl MediaError {
    /// Returns `true` for errors caused by an invalid configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidBitDepth { .. } | Self::InvalidSampleRate | Self::PayloadTooLarge { .. }
        )
    }

    /// Returns `true` for errors caused by allocation, spawn or thread failures.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. }
                | Self::SourceSpawnFailed { .. }
                | Self::SourceUnavailable { .. }
                | Self::ThreadSpawnFailed(_)
        )
    }

    /// Creates a source unavailable error with the given reason.
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }
}

/// Why the audio source stopped delivering clips.
///
/// Source errors are sticky: once recorded, the ring keeps serving the clips it
/// already holds but never rotates again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source reached end of stream in the middle of a clip.
    #[error("source closed after {read} of {expected} bytes")]
    Closed {
        /// Bytes of the clip that were read before the stream ended.
        read: usize,
        /// Bytes the clip needed.
        expected: usize,
    },

    /// Reading from the source failed.
    #[error("source read failed after {read} of {expected} bytes: {message}")]
    Io {
        /// The kind of I/O error.
        kind: io::ErrorKind,
        /// The error message.
        message: String,
        /// Bytes of the clip that were read before the failure.
        read: usize,
        /// Bytes the clip needed.
        expected: usize,
    },
}

impl SourceError {
    /// Creates an I/O source error from the underlying error.
    pub fn io(err: &io::Error, read: usize, expected: usize) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            read,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_display() {
        let err = MediaError::InvalidBitDepth { bits: 12 };
        assert_eq!(
            err.to_string(),
            "unsupported bit depth: 12 (must be a non-zero multiple of 8)"
        );
    }

    #[test]
    fn test_media_error_classification() {
        assert!(MediaError::InvalidSampleRate.is_config());
        assert!(!MediaError::InvalidSampleRate.is_resource());

        let err = MediaError::AllocationFailed { bytes: 1024 };
        assert!(err.is_resource());
        assert!(!err.is_config());

        assert!(!MediaError::NotReady.is_config());
        assert!(!MediaError::NotReady.is_resource());
    }

    #[test]
    fn test_spawn_error_includes_command() {
        let err = MediaError::SourceSpawnFailed {
            command: "arecord -f U8".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("arecord -f U8"));
        assert!(err.is_resource());
    }

    #[test]
    fn test_source_error_closed_display() {
        let err = SourceError::Closed {
            read: 100,
            expected: 8000,
        };
        assert_eq!(err.to_string(), "source closed after 100 of 8000 bytes");
    }

    #[test]
    fn test_source_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe gone");
        let err = SourceError::io(&io_err, 0, 16);
        assert!(matches!(
            err,
            SourceError::Io {
                kind: io::ErrorKind::BrokenPipe,
                ..
            }
        ));
        assert!(err.to_string().contains("pipe gone"));
    }
}
