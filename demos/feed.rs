//! Feeds a media hub the way a webcam server would and polls it like its clients.
//!
//! A capture thread publishes a fake JPEG frame at the configured frame rate
//! while the audio ring rotates one clip per second. The main thread plays
//! the part of the HTTP handlers, fetching frames and clips and saving the
//! last clip to a WAV file.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic audio
//! cargo run --example feed
//!
//! # Live audio from ALSA
//! cargo run --example feed -- "arecord -q -t raw -f U8 -r 8000 -c 1"
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use media_exchange::{
    AudioConfig, AudioSource, FrameConfig, MediaHub, SequenceSource, CLIP_MEDIA_TYPE,
    FRAME_MEDIA_TYPE,
};
use tracing_subscriber::EnvFilter;

const RUN_FOR: Duration = Duration::from_secs(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AudioConfig::default();
    let source = match std::env::args().nth(1) {
        Some(cmdline) => AudioSource::command(cmdline),
        None => AudioSource::reader(SequenceSource::new(config.payload_len()? as usize)),
    };

    let hub = MediaHub::builder()
        .audio(source, config)
        .frame_config(FrameConfig { fps: 10 })
        .on_event(|event| tracing::debug!(?event, "ring event"))
        .start()?;

    println!("Media hub running for {RUN_FOR:?}");
    println!("  audio enabled: {}", hub.audio_enabled());

    // Capture side: stand-in JPEG markers around a frame counter.
    let running = Arc::new(AtomicBool::new(true));
    let capture = {
        let frames = hub.frames();
        let interval = hub.frame_config().interval();
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut count = 0u32;
            while running.load(Ordering::Relaxed) {
                let mut jpeg = vec![0xFF, 0xD8];
                jpeg.extend_from_slice(&count.to_be_bytes());
                jpeg.extend_from_slice(&[0xFF, 0xD9]);
                frames.publish(jpeg);
                count += 1;
                thread::sleep(interval);
            }
        })
    };

    // Client side: poll once per second like a browser would.
    let mut last_clip = None;
    for _ in 0..RUN_FOR.as_secs() {
        thread::sleep(Duration::from_secs(1));

        match hub.frames().snapshot() {
            Ok(frame) => println!(
                "{FRAME_MEDIA_TYPE}: frame #{} ({} bytes, {:?} old)",
                frame.id(),
                frame.len(),
                frame.age()
            ),
            Err(e) => println!("{FRAME_MEDIA_TYPE}: {e}"),
        }

        let Some(audio) = hub.audio() else {
            continue;
        };
        let wanted = last_clip.as_ref().map_or(0, |c: &media_exchange::Snapshot| c.id() + 1);
        match audio.fetch(wanted) {
            Ok(clip) => {
                println!(
                    "{CLIP_MEDIA_TYPE}: asked for {wanted}, got clip {} ({} bytes)",
                    clip.id(),
                    clip.len()
                );
                last_clip = Some(clip);
            }
            Err(e) => println!("{CLIP_MEDIA_TYPE}: {e}"),
        }
    }

    running.store(false, Ordering::Relaxed);
    if capture.join().is_err() {
        eprintln!("capture thread panicked");
    }

    if let Some(audio) = hub.audio() {
        let stats = audio.stats();
        println!();
        println!("Stats:");
        println!("  Rotations: {}", stats.rotations);
        println!("  Fetches: {}", stats.fetches);
        println!("  Fallbacks: {}", stats.fallbacks);
        println!("  Source failed: {}", stats.source_failed);
    }
    hub.shutdown();

    if let Some(clip) = last_clip {
        std::fs::write("last_clip.wav", clip.bytes())?;
        println!();
        println!("Saved clip {} to: last_clip.wav", clip.id());
    }

    Ok(())
}
