//! Clip ring internals: slot storage and the producer loop that fills it.

pub(crate) mod producer;
pub(crate) mod slots;

pub(crate) use producer::Producer;
pub(crate) use slots::ClipRing;
pub use slots::RingStats;
