//! Owned, immutable views of published media.

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::wav::{WavHeader, WAV_HEADER_SIZE};

/// An owned copy of a clip or frame, taken atomically.
///
/// A `Snapshot` never aliases memory the producer can still write to: clip
/// snapshots are copied out of the ring while its lock is held, and frame
/// snapshots share an immutable buffer that the slot only ever replaces.
/// It stays valid however long the caller keeps it.
///
/// Bytes are stored in an `Arc<[u8]>`, so cloning a snapshot is cheap.
///
/// # Example
///
/// ```
/// use media_exchange::FrameSlot;
///
/// let slot = FrameSlot::new();
/// slot.publish(vec![0xFF, 0xD8, 0xFF, 0xD9]);
///
/// let snapshot = slot.snapshot().unwrap();
/// assert_eq!(snapshot.id(), 1);
/// assert_eq!(&snapshot[..2], &[0xFF, 0xD8]);
/// ```
#[derive(Debug, Clone)]
pub struct Snapshot {
    id: u64,
    bytes: Arc<[u8]>,
    produced_at: Instant,
}

impl Snapshot {
    pub(crate) fn new(id: u64, bytes: Arc<[u8]>, produced_at: Instant) -> Self {
        Self {
            id,
            bytes,
            produced_at,
        }
    }

    /// Returns the clip id or frame generation this snapshot was taken from.
    ///
    /// For clips this may differ from the id that was asked for.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the snapshot bytes, ready to be written out verbatim.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the shared buffer behind this snapshot.
    pub fn to_arc(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the snapshot holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns when the content was produced (clip published or frame published).
    pub fn produced_at(&self) -> Instant {
        self.produced_at
    }

    /// Returns how long ago the content was produced.
    pub fn age(&self) -> Duration {
        self.produced_at.elapsed()
    }

    /// Decodes the WAV header of a clip snapshot.
    ///
    /// Returns `None` for frame snapshots or anything without a canonical header.
    pub fn wav_header(&self) -> Option<WavHeader> {
        WavHeader::parse(&self.bytes)
    }

    /// Returns the PCM samples of a clip snapshot (everything after the header).
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(WAV_HEADER_SIZE..).unwrap_or_default()
    }
}

impl Deref for Snapshot {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Snapshot {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
