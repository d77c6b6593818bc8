//! Builder and handle bundling the frame slot with an optional clip ring.

use std::sync::Arc;

use crate::{
    event_callback, AudioConfig, AudioRing, AudioSource, ClipReader, EventCallback, FrameConfig,
    FrameSlot, MediaError, RingEvent,
};

/// Shared buffers behind a streaming endpoint: the latest video frame and,
/// when audio is enabled, the clip ring.
///
/// Handlers take what they need through [`frames()`](MediaHub::frames) and
/// [`audio()`](MediaHub::audio); both are cheap cloneable handles.
///
/// # Example
///
/// ```
/// use media_exchange::{AudioConfig, MediaHub, MockSource};
///
/// # fn main() -> Result<(), media_exchange::MediaError> {
/// let hub = MediaHub::builder()
///     .audio(MockSource::new().into_source(), AudioConfig::default())
///     .start()?;
///
/// hub.frames().publish(vec![0xFF, 0xD8, 0xFF, 0xD9]);
/// assert!(hub.audio_enabled());
///
/// hub.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct MediaHub {
    frames: Arc<FrameSlot>,
    audio: Option<AudioRing>,
    frame_config: FrameConfig,
}

impl MediaHub {
    /// Creates a new builder.
    pub fn builder() -> MediaHubBuilder {
        MediaHubBuilder::new()
    }

    /// Returns the frame slot, for both the capture writer and readers.
    pub fn frames(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.frames)
    }

    /// Returns a clip reader, or `None` when audio is disabled.
    pub fn audio(&self) -> Option<ClipReader> {
        self.audio.as_ref().map(AudioRing::reader)
    }

    /// Returns `true` if clips are being served.
    pub fn audio_enabled(&self) -> bool {
        self.audio.is_some()
    }

    /// Returns the frame pacing the capture side should follow.
    pub fn frame_config(&self) -> FrameConfig {
        self.frame_config
    }

    /// Stops audio, if any. Frames stay readable through outstanding handles.
    pub fn shutdown(mut self) {
        self.stop_audio();
    }

    fn stop_audio(&mut self) {
        if let Some(mut ring) = self.audio.take() {
            ring.stop();
        }
    }
}

impl Drop for MediaHub {
    fn drop(&mut self) {
        self.stop_audio();
    }
}

impl std::fmt::Debug for MediaHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHub")
            .field("frames", &self.frames)
            .field("audio", &self.audio)
            .field("frame_config", &self.frame_config)
            .finish()
    }
}

/// Builder for a [`MediaHub`].
///
/// Audio is optional. If an audio source is configured but cannot be opened,
/// `start()` logs a warning and the hub serves video only, unless
/// [`require_audio(true)`](Self::require_audio) was set.
#[must_use]
pub struct MediaHubBuilder {
    audio: Option<(AudioSource, AudioConfig)>,
    audio_required: bool,
    frame_config: FrameConfig,
    event_callback: Option<EventCallback>,
}

impl Default for MediaHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaHubBuilder {
    /// Creates a builder for a video-only hub.
    pub fn new() -> Self {
        Self {
            audio: None,
            audio_required: false,
            frame_config: FrameConfig::default(),
            event_callback: None,
        }
    }

    /// Enables audio with the given source and configuration.
    pub fn audio(mut self, source: AudioSource, config: AudioConfig) -> Self {
        self.audio = Some((source, config));
        self
    }

    /// Makes `start()` fail instead of falling back to video only.
    pub fn require_audio(mut self, required: bool) -> Self {
        self.audio_required = required;
        self
    }

    /// Sets the frame pacing hint.
    pub fn frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Registers a callback for clip ring events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(RingEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Opens the audio ring (if configured) and returns the hub.
    ///
    /// # Errors
    ///
    /// Returns the audio ring's error only when audio is required.
    pub fn start(self) -> Result<MediaHub, MediaError> {
        let audio = match self.audio {
            None => None,
            Some((source, config)) => {
                let opened = match self.event_callback {
                    Some(callback) => AudioRing::open_with_events(source, config, callback),
                    None => AudioRing::open(source, config),
                };
                match opened {
                    Ok(ring) => Some(ring),
                    Err(e) if self.audio_required => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "can't open audio source, serving video only");
                        None
                    }
                }
            }
        };

        tracing::info!(
            audio = audio.is_some(),
            fps = self.frame_config.effective_fps(),
            "media hub started"
        );

        Ok(MediaHub {
            frames: Arc::new(FrameSlot::new()),
            audio,
            frame_config: self.frame_config,
        })
    }
}
