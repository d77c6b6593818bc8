//! Fixed pool of clip slots shared between the producer and readers.
//!
//! All metadata (ids, cursor, flags) and the slot buffers live behind one
//! short-held lock. The producer never writes into a buffer while it sits in
//! the pool: it *claims* the slot after the cursor (evicting that slot's clip
//! and taking its buffer out), fills the buffer without holding the lock, and
//! hands it back on publish. Readers therefore only ever copy from complete,
//! published clips.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::wav::{header_bytes, WavFormat, WAV_HEADER_SIZE};
use crate::{AudioConfig, MediaError, Snapshot, SourceError};

/// One reusable storage location.
struct Slot {
    /// Clip id, 0 when the slot holds no published clip.
    id: u64,
    /// Container header followed by the payload. Empty while claimed.
    buf: Vec<u8>,
    produced_at: Instant,
}

struct RingState {
    slots: Vec<Slot>,
    /// Index of the most recently published slot.
    cursor: usize,
    /// Slot whose buffer is currently out with the producer.
    claimed: Option<usize>,
    /// Id of the most recently published clip, 0 before the first rotation.
    last_id: u64,
    stop_requested: bool,
    producer_running: bool,
    source_error: Option<SourceError>,
    closed: bool,
}

/// Outcome of handing a filled buffer back to the ring.
pub(crate) enum Publish {
    /// The clip is now current; `next` is the buffer to fill for the next rotation.
    Committed { id: u64, slot: usize, next: Vec<u8> },
    /// A stop was requested; the clip was discarded and the buffer returned.
    Stopped,
}

/// Statistics about a clip ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Clips published so far.
    pub rotations: u64,
    /// Successful fetches.
    pub fetches: u64,
    /// Fetches that fell back to the current clip because the requested id
    /// was unknown or evicted.
    pub fallbacks: u64,
    /// Id of the current clip, 0 before the first rotation.
    pub current_id: u64,
    /// Whether the source has failed.
    pub source_failed: bool,
}

/// Slot pool plus the synchronization shared with the producer thread.
pub(crate) struct ClipRing {
    state: Mutex<RingState>,
    /// Signals stop requests to the producer and producer exit to `stop()`.
    wake: Condvar,
    format: WavFormat,
    payload_len: usize,
    fetches: AtomicU64,
    fallbacks: AtomicU64,
}

impl ClipRing {
    /// Validates the configuration and preallocates every slot with its header.
    pub fn allocate(config: &AudioConfig) -> Result<Self, MediaError> {
        let payload_len = config.payload_len()?;
        let slot_count = config.effective_slot_count();
        let clip_len = payload_len as usize + WAV_HEADER_SIZE;

        let total = clip_len
            .checked_mul(slot_count)
            .ok_or(MediaError::AllocationFailed { bytes: usize::MAX })?;

        let format = WavFormat {
            sample_rate: config.sample_rate,
            channels: config.channels(),
            bits_per_sample: config.bits_per_sample,
        };
        let header = header_bytes(&format, payload_len);

        let now = Instant::now();
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(slot_count)
            .map_err(|_| MediaError::AllocationFailed { bytes: total })?;

        for _ in 0..slot_count {
            let mut buf = Vec::new();
            buf.try_reserve_exact(clip_len)
                .map_err(|_| MediaError::AllocationFailed { bytes: total })?;
            buf.extend_from_slice(&header);
            buf.resize(clip_len, 0);
            slots.push(Slot {
                id: 0,
                buf,
                produced_at: now,
            });
        }

        tracing::debug!(slot_count, clip_len, total, "clip slots allocated");

        Ok(Self {
            state: Mutex::new(RingState {
                slots,
                cursor: 0,
                claimed: None,
                last_id: 0,
                stop_requested: false,
                producer_running: true,
                source_error: None,
                closed: false,
            }),
            wake: Condvar::new(),
            format,
            payload_len: payload_len as usize,
            fetches: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        })
    }

    /// Returns the sample layout of every clip.
    pub fn format(&self) -> WavFormat {
        self.format
    }

    /// Returns the payload length of every clip.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Copies out the clip with `id`, or the current clip if `id` is not resident.
    pub fn fetch(&self, id: u64) -> Result<Snapshot, MediaError> {
        let state = self.state.lock();
        if state.closed {
            return Err(MediaError::Closed);
        }
        if state.last_id == 0 {
            return Err(MediaError::NotReady);
        }

        let found = if id == 0 {
            None
        } else {
            state.slots.iter().find(|slot| slot.id == id)
        };
        let slot = found.unwrap_or_else(|| {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
            &state.slots[state.cursor]
        });
        self.fetches.fetch_add(1, Ordering::Relaxed);

        // The copy is taken before the lock is released.
        Ok(Snapshot::new(
            slot.id,
            Arc::from(slot.buf.as_slice()),
            slot.produced_at,
        ))
    }

    /// Returns the id of the current clip, or 0 before the first rotation.
    pub fn current_id(&self) -> u64 {
        self.state.lock().last_id
    }

    /// Claims the slot after the cursor for the first read.
    ///
    /// Returns `None` if a stop was already requested.
    pub fn claim_first(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        if state.stop_requested || state.closed {
            return None;
        }
        Some(Self::claim_next(&mut state))
    }

    /// Publishes a filled buffer into the claimed slot and claims the next one.
    pub fn publish(&self, buf: Vec<u8>) -> Publish {
        let mut state = self.state.lock();
        let Some(slot) = state.claimed.take() else {
            return Publish::Stopped;
        };

        if state.stop_requested || state.closed {
            // Keep the pool intact; the claimed slot stays empty (id 0).
            if !state.closed {
                state.slots[slot].buf = buf;
            }
            return Publish::Stopped;
        }

        let id = state.last_id + 1;
        let entry = &mut state.slots[slot];
        entry.buf = buf;
        entry.id = id;
        entry.produced_at = Instant::now();
        state.cursor = slot;
        state.last_id = id;

        let next = Self::claim_next(&mut state);
        Publish::Committed { id, slot, next }
    }

    /// Evicts the slot after the cursor and takes its buffer.
    fn claim_next(state: &mut RingState) -> Vec<u8> {
        let index = (state.cursor + 1) % state.slots.len();
        let slot = &mut state.slots[index];
        slot.id = 0;
        state.claimed = Some(index);
        std::mem::take(&mut state.slots[index].buf)
    }

    /// Returns `true` once a stop was requested.
    pub fn stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    /// Blocks until `deadline` or a stop request.
    ///
    /// Returns `false` if the producer should stop.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while !state.stop_requested {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        !state.stop_requested
    }

    /// Records a sticky source failure.
    pub fn record_source_error(&self, error: SourceError) {
        let mut state = self.state.lock();
        if state.source_error.is_none() {
            state.source_error = Some(error);
        }
    }

    /// Returns the recorded source failure, if any.
    pub fn source_error(&self) -> Option<SourceError> {
        self.state.lock().source_error.clone()
    }

    /// Asks the producer to stop and wakes it if it is waiting.
    pub fn request_stop(&self) {
        self.state.lock().stop_requested = true;
        self.wake.notify_all();
    }

    /// Called by the producer as its last action.
    pub fn mark_producer_exited(&self) {
        self.state.lock().producer_running = false;
        self.wake.notify_all();
    }

    /// Returns `true` while the producer loop is running.
    pub fn producer_running(&self) -> bool {
        self.state.lock().producer_running
    }

    /// Waits until the producer has exited or `deadline` passes.
    ///
    /// `None` waits without a deadline. Returns `true` if the producer exited.
    pub fn wait_producer_exit(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        while state.producer_running {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.wake.wait(&mut state),
            }
        }
        !state.producer_running
    }

    /// Frees every slot buffer. Later fetches return [`MediaError::Closed`].
    pub fn release(&self) {
        let slots = {
            let mut state = self.state.lock();
            state.closed = true;
            state.claimed = None;
            std::mem::take(&mut state.slots)
        };
        drop(slots);
    }

    /// Returns current statistics.
    pub fn stats(&self) -> RingStats {
        let state = self.state.lock();
        RingStats {
            rotations: state.last_id,
            fetches: self.fetches.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            current_id: state.last_id,
            source_failed: state.source_error.is_some(),
        }
    }
}
