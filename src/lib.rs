//! # media-exchange
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Concurrent buffers that hand live media from capture producers to many
//! network readers.
//!
//! `media-exchange` holds two kinds of media:
//!
//! - **Frames** ([`FrameSlot`]): the most recently encoded video frame. One
//!   writer replaces it whole; readers take snapshots.
//! - **Clips** ([`AudioRing`]): a ring of fixed-length, self-contained WAV
//!   clips, rotated once per cadence by a background producer reading raw PCM
//!   from a source process or stream. Readers fetch clips by id.
//!
//! Every read returns an owned [`Snapshot`] that can be written to a network
//! connection without holding any lock, and is never modified afterwards.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_exchange::{AudioConfig, AudioSource, MediaHub};
//!
//! # fn main() -> Result<(), media_exchange::MediaError> {
//! let hub = MediaHub::builder()
//!     .audio(
//!         AudioSource::command("arecord -q -t raw -f U8 -r 8000 -c 1"),
//!         AudioConfig::default(),
//!     )
//!     .on_event(|e| tracing::debug!(?e, "ring event"))
//!     .start()?;
//!
//! // Capture side
//! hub.frames().publish(vec![0xFF, 0xD8, /* ... */ 0xFF, 0xD9]);
//!
//! // Request handlers
//! let frame = hub.frames().snapshot()?;
//! if let Some(audio) = hub.audio() {
//!     let clip = audio.fetch(0)?;
//!     // serve clip.bytes() as audio/wave, remember clip.id()
//! }
//!
//! hub.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Producer thread**: one per ring, blocks on the source and never holds
//!   the ring lock while reading
//! - **Slot pool**: preallocated buffers with their WAV header written once;
//!   publishing a clip is an index update under a short lock
//! - **Readers**: any number of threads, each copying a complete clip out
//!   under the same short lock

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// Sample and size arithmetic casts between integer widths on purpose
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]
#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

mod audio_ring;
mod config;
mod error;
mod event;
mod frame;
mod hub;
mod ring;
mod snapshot;
pub mod source;
pub mod wav;

pub use audio_ring::{AudioRing, ClipReader, CLIP_MEDIA_TYPE};
pub use config::{
    AudioConfig, FrameConfig, Pacing, DEFAULT_FPS, DEFAULT_SLOT_COUNT, MAX_FPS, MIN_SLOT_COUNT,
};
pub use error::{MediaError, SourceError};
pub use event::{event_callback, EventCallback, RingEvent};
pub use frame::{FrameSlot, FRAME_MEDIA_TYPE};
pub use hub::{MediaHub, MediaHubBuilder};
pub use ring::RingStats;
pub use snapshot::Snapshot;
pub use source::{AudioSource, MockSource, SequenceSource};
