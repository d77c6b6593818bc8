//! Rotating ring of fixed-length audio clips fed by a background producer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::event::EventCallback;
use crate::ring::{ClipRing, Producer, RingStats};
use crate::source::{OpenSource, SourceProcess};
use crate::wav::WavFormat;
use crate::{AudioConfig, AudioSource, MediaError, Snapshot, SourceError};

/// Media type of the clips served by an [`AudioRing`].
pub const CLIP_MEDIA_TYPE: &str = "audio/wave";

/// Name of the producer thread.
const PRODUCER_THREAD_NAME: &str = "audio-ring-producer";

/// Handle to a running clip ring.
///
/// Opening a ring preallocates every slot with a WAV header and starts a
/// producer thread that reads one cadence of audio at a time from the source
/// and rotates it in as the current clip. Each clip gets the next id, starting
/// at 1. Readers fetch clips by id and always get a complete, self-contained
/// WAV file.
///
/// # Lifecycle
///
/// 1. Created by [`AudioRing::open()`]
/// 2. The producer rotates a clip in every cadence
/// 3. [`stop()`](AudioRing::stop) stops the producer, closes the source and
///    releases the slots
/// 4. Dropping the `AudioRing` also stops it (blocking until the producer exits)
///
/// # Example
///
/// ```no_run
/// use media_exchange::{AudioConfig, AudioRing, AudioSource, MediaError};
///
/// # fn main() -> Result<(), MediaError> {
/// let mut ring = AudioRing::open(
///     AudioSource::command("arecord -q -t raw -f U8 -r 8000 -c 1"),
///     AudioConfig::default(),
/// )?;
///
/// // Clients poll with the last id they played; 0 means "whatever is current".
/// let clip = ring.fetch(0)?;
/// let next = ring.fetch(clip.id() + 1)?;
///
/// ring.stop();
/// # Ok(())
/// # }
/// ```
pub struct AudioRing {
    ring: Arc<ClipRing>,
    config: AudioConfig,
    producer: Option<JoinHandle<()>>,
    process: Option<SourceProcess>,
    source: String,
}

impl AudioRing {
    /// Validates `config`, allocates the slots, starts the source and spawns
    /// the producer.
    ///
    /// Cadence and slot count are coerced (see [`AudioConfig`]); nothing is
    /// published until the first cadence of audio has been read.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid bit depth, a zero sample
    /// rate or an oversized clip, and a resource error if allocation, source
    /// startup or thread creation fails. On error nothing is left running.
    pub fn open(source: AudioSource, config: AudioConfig) -> Result<Self, MediaError> {
        Self::start(source, config, None)
    }

    /// Like [`open()`](Self::open), with a callback for producer events.
    ///
    /// # Errors
    ///
    /// Same as [`open()`](Self::open).
    pub fn open_with_events(
        source: AudioSource,
        config: AudioConfig,
        callback: EventCallback,
    ) -> Result<Self, MediaError> {
        Self::start(source, config, Some(callback))
    }

    fn start(
        source: AudioSource,
        config: AudioConfig,
        event_callback: Option<EventCallback>,
    ) -> Result<Self, MediaError> {
        let config = config.normalized();
        let ring = Arc::new(ClipRing::allocate(&config)?);

        let description = source.describe();
        let OpenSource { reader, process } = source.open()?;

        let producer = Producer::new(
            Arc::clone(&ring),
            reader,
            config.cadence(),
            config.pacing,
            event_callback,
        );
        let spawned = thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.to_string())
            .spawn(move || producer.run());

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(process) = process {
                    process.close();
                }
                return Err(MediaError::ThreadSpawnFailed(e));
            }
        };

        tracing::info!(
            source = %description,
            cadence_secs = config.cadence_secs,
            slot_count = config.slot_count,
            sample_rate = config.sample_rate,
            bits_per_sample = config.bits_per_sample,
            channels = config.channels(),
            pacing = ?config.pacing,
            payload_len = ring.payload_len(),
            "audio ring started"
        );

        Ok(Self {
            ring,
            config,
            producer: Some(handle),
            process,
            source: description,
        })
    }

    /// Returns the clip with `id`, or the current clip if `id` is 0, unknown
    /// or already evicted.
    ///
    /// The returned snapshot's [`id()`](Snapshot::id) is the id actually served.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotReady`] before the first rotation and
    /// [`MediaError::Closed`] after [`stop()`](Self::stop).
    pub fn fetch(&self, id: u64) -> Result<Snapshot, MediaError> {
        self.ring.fetch(id)
    }

    /// Returns the id of the current clip, or 0 before the first rotation.
    pub fn current_id(&self) -> u64 {
        self.ring.current_id()
    }

    /// Returns a cloneable read handle for other threads.
    pub fn reader(&self) -> ClipReader {
        ClipReader {
            ring: Arc::clone(&self.ring),
        }
    }

    /// Returns `true` while the producer is rotating clips.
    pub fn is_running(&self) -> bool {
        self.producer.is_some() && self.ring.producer_running()
    }

    /// Returns the source failure, if the source has stopped delivering.
    pub fn source_error(&self) -> Option<SourceError> {
        self.ring.source_error()
    }

    /// Returns current statistics.
    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    /// Returns the effective configuration (cadence and slot count coerced).
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Returns the sample layout of every clip.
    pub fn format(&self) -> WavFormat {
        self.ring.format()
    }

    /// Returns the PCM payload length of every clip in bytes.
    pub fn payload_len(&self) -> usize {
        self.ring.payload_len()
    }

    /// Stops the producer, closes the source and releases the slots.
    ///
    /// This will:
    /// 1. Ask the producer to stop, waking it if it is waiting for the next cadence
    /// 2. Wait up to one cadence plus [`AudioConfig::stop_grace`] for the read
    ///    in flight, then terminate a command source to unblock it
    /// 3. Join the producer thread
    /// 4. Close the source and free every slot
    ///
    /// A clip whose read completes after the stop request is discarded.
    /// Calling `stop()` again is a no-op. Outstanding [`ClipReader`]s get
    /// [`MediaError::Closed`] afterwards; snapshots already taken stay valid.
    ///
    /// An in-process reader source cannot be interrupted, so stopping waits
    /// for its current read to return.
    pub fn stop(&mut self) {
        let Some(handle) = self.producer.take() else {
            return;
        };

        tracing::debug!(source = %self.source, "stopping audio ring");
        self.ring.request_stop();

        let patience = self.config.cadence().saturating_add(self.config.stop_grace);
        let deadline = Instant::now().checked_add(patience);
        if !self.ring.wait_producer_exit(deadline) {
            match self.process.as_mut() {
                Some(process) => {
                    tracing::warn!(
                        source = %self.source,
                        waited_ms = patience.as_millis() as u64,
                        "audio source did not deliver in time, terminating it"
                    );
                    process.terminate();
                }
                None => {
                    tracing::warn!(
                        source = %self.source,
                        "audio source read still blocked, waiting for it to return"
                    );
                }
            }
        }

        if handle.join().is_err() {
            tracing::error!(source = %self.source, "audio ring producer thread panicked");
        }

        if let Some(process) = self.process.take() {
            process.close();
        }
        self.ring.release();

        tracing::info!(
            source = %self.source,
            rotations = self.ring.stats().rotations,
            "audio ring stopped"
        );
    }
}

impl Drop for AudioRing {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AudioRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRing")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("current_id", &self.current_id())
            .finish_non_exhaustive()
    }
}

/// Cloneable, thread-safe read handle to an [`AudioRing`].
///
/// A reader never keeps the producer alive: once the ring is stopped, every
/// fetch returns [`MediaError::Closed`].
#[derive(Clone)]
pub struct ClipReader {
    ring: Arc<ClipRing>,
}

impl ClipReader {
    /// Same as [`AudioRing::fetch()`].
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotReady`] before the first rotation and
    /// [`MediaError::Closed`] once the ring is stopped.
    pub fn fetch(&self, id: u64) -> Result<Snapshot, MediaError> {
        self.ring.fetch(id)
    }

    /// Returns the id of the current clip, or 0 before the first rotation.
    pub fn current_id(&self) -> u64 {
        self.ring.current_id()
    }

    /// Returns `true` once the source has failed.
    pub fn is_source_failed(&self) -> bool {
        self.ring.source_error().is_some()
    }

    /// Returns the source failure, if any.
    pub fn source_error(&self) -> Option<SourceError> {
        self.ring.source_error()
    }

    /// Returns current statistics.
    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    /// Returns the PCM payload length of every clip in bytes.
    pub fn payload_len(&self) -> usize {
        self.ring.payload_len()
    }
}

impl std::fmt::Debug for ClipReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipReader")
            .field("current_id", &self.current_id())
            .finish_non_exhaustive()
    }
}
