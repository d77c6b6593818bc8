//! Latest-value cache for encoded video frames.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::{MediaError, Snapshot};

/// Media type of the frames held by a [`FrameSlot`].
pub const FRAME_MEDIA_TYPE: &str = "image/jpeg";

struct Frame {
    bytes: Arc<[u8]>,
    generation: u64,
    published_at: Instant,
}

/// Single-slot cache holding the most recently encoded frame.
///
/// One writer (whatever thread completes a capture) publishes whole frames;
/// any number of readers take [`Snapshot`]s. Frames are immutable once
/// published: `publish` swaps in a new buffer under a short lock, and the
/// previous buffer is freed once the last snapshot sharing it is dropped.
///
/// # Example
///
/// ```
/// use media_exchange::{FrameSlot, MediaError};
///
/// let slot = FrameSlot::new();
/// assert!(matches!(slot.snapshot(), Err(MediaError::NotReady)));
///
/// slot.publish(b"first".to_vec());
/// let held = slot.snapshot().unwrap();
/// slot.publish(b"second".to_vec());
///
/// // The earlier snapshot is unaffected by the new frame.
/// assert_eq!(held.bytes(), b"first");
/// assert_eq!(slot.snapshot().unwrap().bytes(), b"second");
/// ```
#[derive(Default)]
pub struct FrameSlot {
    current: Mutex<Option<Frame>>,
}

impl FrameSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame and returns its generation.
    ///
    /// Generations start at 1 and increase by one per publish. There is no
    /// length constraint; an empty frame is stored like any other.
    pub fn publish(&self, bytes: impl Into<Arc<[u8]>>) -> u64 {
        let bytes = bytes.into();
        let len = bytes.len();

        let (generation, previous) = {
            let mut current = self.current.lock();
            let generation = current.as_ref().map_or(0, |f| f.generation) + 1;
            let previous = current.replace(Frame {
                bytes,
                generation,
                published_at: Instant::now(),
            });
            (generation, previous)
        };

        // The old buffer is released here, outside the lock.
        drop(previous);

        tracing::trace!(generation, len, "frame published");
        generation
    }

    /// Returns the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotReady`] until the first frame is published.
    pub fn snapshot(&self) -> Result<Snapshot, MediaError> {
        let current = self.current.lock();
        let frame = current.as_ref().ok_or(MediaError::NotReady)?;
        Ok(Snapshot::new(
            frame.generation,
            Arc::clone(&frame.bytes),
            frame.published_at,
        ))
    }

    /// Returns the generation of the current frame, or 0 if none was published.
    pub fn generation(&self) -> u64 {
        self.current.lock().as_ref().map_or(0, |f| f.generation)
    }

    /// Returns `true` once a frame has been published.
    pub fn is_ready(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.lock();
        f.debug_struct("FrameSlot")
            .field("generation", &current.as_ref().map_or(0, |f| f.generation))
            .field("len", &current.as_ref().map(|f| f.bytes.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_frame_slot_not_ready() {
        let slot = FrameSlot::new();
        assert!(!slot.is_ready());
        assert_eq!(slot.generation(), 0);
        assert!(matches!(slot.snapshot(), Err(MediaError::NotReady)));
    }

    #[test]
    fn test_frame_slot_publish_and_snapshot() {
        let slot = FrameSlot::new();
        assert_eq!(slot.publish(vec![1u8, 2, 3]), 1);
        assert_eq!(slot.publish(vec![4u8, 5]), 2);

        let snapshot = slot.snapshot().unwrap();
        assert_eq!(snapshot.id(), 2);
        assert_eq!(snapshot.bytes(), &[4, 5]);
        assert!(slot.is_ready());
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn test_frame_slot_accepts_any_length() {
        let slot = FrameSlot::new();
        slot.publish(Vec::<u8>::new());
        assert!(slot.snapshot().unwrap().is_empty());

        slot.publish(vec![0xAB; 1 << 20]);
        assert_eq!(slot.snapshot().unwrap().len(), 1 << 20);
    }

    #[test]
    fn test_previous_frame_released_after_last_snapshot() {
        let slot = FrameSlot::new();
        let first: Arc<[u8]> = Arc::from(vec![7u8; 16]);
        slot.publish(Arc::clone(&first));

        let held = slot.snapshot().unwrap();
        slot.publish(vec![8u8; 16]);

        // Test handle + held snapshot
        assert_eq!(Arc::strong_count(&first), 2);
        drop(held);
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn test_concurrent_publish_and_snapshot() {
        let slot = Arc::new(FrameSlot::new());

        let writer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 1..=2000u32 {
                    // Every frame is filled with its own generation's low byte.
                    let len = (i % 97 + 1) as usize;
                    slot.publish(vec![(i & 0xFF) as u8; len]);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..2000 {
                        if let Ok(snapshot) = slot.snapshot() {
                            assert!(snapshot.id() >= last);
                            last = snapshot.id();
                            let expected = (snapshot.id() & 0xFF) as u8;
                            assert!(snapshot.bytes().iter().all(|&b| b == expected));
                            assert_eq!(snapshot.len() as u64, snapshot.id() % 97 + 1);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(slot.generation(), 2000);
    }
}
