//! Producer loop: reads clips from the source and rotates them into the ring.
//!
//! Each rotation walks the same states:
//! - **Waiting**: sleep until one cadence after the previous read started
//!   (skipped with [`Pacing::SourcePaced`])
//! - **Reading**: fill the claimed buffer's payload from the source, without
//!   holding the ring lock
//! - **Publishing**: hand the buffer back under the lock, which makes it the
//!   current clip and claims the next slot
//!
//! A stop request ends the loop at the next state boundary. A short read or
//! I/O error records a sticky [`SourceError`] and ends the loop.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::event::EventCallback;
use crate::ring::slots::{ClipRing, Publish};
use crate::source::read_clip;
use crate::wav::WAV_HEADER_SIZE;
use crate::{Pacing, RingEvent, SourceError};

/// Log a progress line every this many rotations.
const ROTATION_LOG_INTERVAL: u64 = 50;

/// A read is reported as late once it takes this many cadences.
const LATE_READ_FACTOR: u32 = 2;

/// How one run of the loop ended.
enum Exit {
    Stopped,
    Failed(SourceError),
}

/// Background clip producer. Owns the source reader for its whole life.
pub(crate) struct Producer {
    ring: Arc<ClipRing>,
    reader: Box<dyn Read + Send>,
    cadence: Duration,
    pacing: Pacing,
    event_callback: Option<EventCallback>,
    rotations: u64,
}

impl Producer {
    pub fn new(
        ring: Arc<ClipRing>,
        reader: Box<dyn Read + Send>,
        cadence: Duration,
        pacing: Pacing,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            ring,
            reader,
            cadence,
            pacing,
            event_callback,
            rotations: 0,
        }
    }

    /// Runs until stopped or until the source fails.
    pub fn run(mut self) {
        tracing::debug!(cadence = ?self.cadence, pacing = ?self.pacing, "producer started");

        match self.rotate_until_exit() {
            Exit::Stopped => {
                tracing::debug!(rotations = self.rotations, "producer stopping on request");
            }
            Exit::Failed(error) => {
                tracing::warn!(
                    error = %error,
                    rotations = self.rotations,
                    "audio source failed, no further clips will be published"
                );
                self.ring.record_source_error(error.clone());
                self.emit_event(RingEvent::SourceFailed { error });
            }
        }

        self.emit_event(RingEvent::ProducerStopped {
            rotations: self.rotations,
        });
        self.ring.mark_producer_exited();
    }

    fn rotate_until_exit(&mut self) -> Exit {
        let Some(mut buf) = self.ring.claim_first() else {
            return Exit::Stopped;
        };
        let mut read_started = Instant::now();

        loop {
            // Waiting
            if !self.wait_for_next_rotation(read_started) {
                return Exit::Stopped;
            }

            // Reading
            read_started = Instant::now();
            if let Err(error) = read_clip(&mut self.reader, &mut buf[WAV_HEADER_SIZE..]) {
                // Terminating the source to unblock a stop surfaces as a read error.
                if self.ring.stop_requested() {
                    return Exit::Stopped;
                }
                return Exit::Failed(error);
            }
            self.check_read_duration(read_started.elapsed());

            // Publishing
            match self.ring.publish(buf) {
                Publish::Committed { id, slot, next } => {
                    buf = next;
                    self.rotations += 1;
                    if self.rotations % ROTATION_LOG_INTERVAL == 0 {
                        tracing::debug!(id, slot, rotations = self.rotations, "clip rotated");
                    } else {
                        tracing::trace!(id, slot, "clip rotated");
                    }
                    self.emit_event(RingEvent::ClipRotated { id, slot });
                }
                Publish::Stopped => return Exit::Stopped,
            }
        }
    }

    /// Blocks until the next rotation is due. Returns `false` on stop.
    fn wait_for_next_rotation(&self, previous_start: Instant) -> bool {
        match self.pacing {
            Pacing::Cadence => self.ring.wait_until(previous_start + self.cadence),
            Pacing::SourcePaced => !self.ring.stop_requested(),
        }
    }

    /// Warns when a live source delivers slower than real time.
    fn check_read_duration(&self, elapsed: Duration) {
        if self.pacing == Pacing::Cadence && elapsed > self.cadence * LATE_READ_FACTOR {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                cadence_ms = self.cadence.as_millis() as u64,
                "audio source is falling behind"
            );
        }
    }

    fn emit_event(&self, event: RingEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{MockSource, SequenceSource};
    use crate::AudioConfig;
    use parking_lot::Mutex;
    use std::io;

    fn config(slot_count: usize) -> AudioConfig {
        AudioConfig {
            sample_rate: 64,
            slot_count,
            pacing: Pacing::SourcePaced,
            ..Default::default()
        }
    }

    fn collect_events() -> (EventCallback, Arc<Mutex<Vec<RingEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: EventCallback = Arc::new(move |event: RingEvent| sink.lock().push(event));
        (callback, events)
    }

    #[test]
    fn test_producer_publishes_until_source_ends() {
        let config = config(4);
        let ring = Arc::new(ClipRing::allocate(&config).unwrap());
        let source = MockSource::new().with_bytes(&[1u8; 64 * 3]).with_bytes(&[9u8; 10]);
        let (callback, events) = collect_events();

        let producer = Producer::new(
            Arc::clone(&ring),
            Box::new(source.into_reader()),
            config.cadence(),
            config.pacing,
            Some(callback),
        );
        producer.run();

        assert_eq!(ring.current_id(), 3);
        assert!(!ring.producer_running());
        assert_eq!(
            ring.source_error(),
            Some(SourceError::Closed {
                read: 10,
                expected: 64
            })
        );

        let events = events.lock();
        let rotated = events
            .iter()
            .filter(|e| matches!(e, RingEvent::ClipRotated { .. }))
            .count();
        assert_eq!(rotated, 3);
        assert!(matches!(
            events.last(),
            Some(RingEvent::ProducerStopped { rotations: 3 })
        ));
    }

    #[test]
    fn test_producer_exits_immediately_when_stopped_first() {
        let config = config(3);
        let ring = Arc::new(ClipRing::allocate(&config).unwrap());
        ring.request_stop();

        let producer = Producer::new(
            Arc::clone(&ring),
            Box::new(SequenceSource::new(64)),
            config.cadence(),
            config.pacing,
            None,
        );
        producer.run();

        assert_eq!(ring.current_id(), 0);
        assert!(ring.source_error().is_none());
        assert!(!ring.producer_running());
    }

    #[test]
    fn test_producer_stamps_follow_ids() {
        let config = config(5);
        let ring = Arc::new(ClipRing::allocate(&config).unwrap());
        let (callback, _events) = collect_events();

        let handle = {
            let ring = Arc::clone(&ring);
            let producer = Producer::new(
                ring,
                Box::new(SequenceSource::new(64)),
                config.cadence(),
                config.pacing,
                Some(callback),
            );
            std::thread::spawn(move || producer.run())
        };

        while ring.current_id() < 20 {
            std::thread::yield_now();
        }
        ring.request_stop();
        handle.join().unwrap();

        let snapshot = ring.fetch(0).unwrap();
        let stamp = u64::from_le_bytes(snapshot.payload()[..8].try_into().unwrap());
        assert_eq!(stamp, snapshot.id());
        assert!(ring.source_error().is_none());
    }

    #[test]
    fn test_read_error_after_stop_is_not_a_failure() {
        struct StopThenFail {
            ring: Arc<ClipRing>,
        }
        impl Read for StopThenFail {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                self.ring.request_stop();
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminated"))
            }
        }

        let config = config(3);
        let ring = Arc::new(ClipRing::allocate(&config).unwrap());
        let reader = StopThenFail {
            ring: Arc::clone(&ring),
        };
        Producer::new(
            Arc::clone(&ring),
            Box::new(reader),
            config.cadence(),
            config.pacing,
            None,
        )
        .run();

        assert!(ring.source_error().is_none());
        assert!(!ring.producer_running());
    }

    #[test]
    fn test_cadence_wait_is_interrupted_by_stop() {
        let config = AudioConfig {
            cadence_secs: 60,
            sample_rate: 8,
            pacing: Pacing::Cadence,
            ..Default::default()
        };
        let ring = Arc::new(ClipRing::allocate(&config).unwrap());
        let producer = Producer::new(
            Arc::clone(&ring),
            Box::new(SequenceSource::new(8 * 60)),
            config.cadence(),
            config.pacing,
            None,
        );

        let started = Instant::now();
        let handle = std::thread::spawn(move || producer.run());
        std::thread::sleep(Duration::from_millis(20));
        ring.request_stop();
        handle.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(ring.current_id(), 0);
    }
}
