//! Runtime events for monitoring clip production.
//!
//! Events are non-fatal notifications about the producer. They're for
//! logging and metrics, not error handling: readers keep working whatever
//! the producer reports.

use std::sync::Arc;

use crate::SourceError;

/// Runtime events emitted by an [`AudioRing`](crate::AudioRing) producer.
///
/// Events are delivered on the producer thread, never while the ring's lock
/// is held, so a callback may call back into the ring.
///
/// # Example
///
/// ```
/// use media_exchange::RingEvent;
///
/// fn handle_event(event: RingEvent) {
///     match event {
///         RingEvent::ClipRotated { id, slot } => {
///             println!("clip {id} published in slot {slot}");
///         }
///         RingEvent::SourceFailed { error } => {
///             eprintln!("audio source failed: {error}");
///         }
///         RingEvent::ProducerStopped { rotations } => {
///             println!("producer stopped after {rotations} clips");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum RingEvent {
    /// A new clip became the current one.
    ClipRotated {
        /// Id assigned to the clip.
        id: u64,
        /// Slot index the clip lives in.
        slot: usize,
    },

    /// The source stopped delivering full clips.
    ///
    /// Already published clips remain fetchable, but no further rotations
    /// will happen.
    SourceFailed {
        /// What went wrong.
        error: SourceError,
    },

    /// The producer loop exited, either on request or after a source failure.
    ProducerStopped {
        /// Number of clips published over the producer's lifetime.
        rotations: u64,
    },
}

/// Callback type for receiving producer events.
///
/// Pass one to [`AudioRing::open_with_events()`] or
/// [`MediaHubBuilder::on_event()`].
///
/// [`AudioRing::open_with_events()`]: crate::AudioRing::open_with_events
/// [`MediaHubBuilder::on_event()`]: crate::MediaHubBuilder::on_event
pub type EventCallback = Arc<dyn Fn(RingEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use media_exchange::{event_callback, RingEvent};
///
/// let callback = event_callback(|event: RingEvent| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RingEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
