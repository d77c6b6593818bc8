//! Audio sources: anything that yields a continuous stream of raw PCM bytes.
//!
//! A source is either a shell command line whose standard output carries the
//! samples (for example `arecord -q -t raw -f U8 -r 8000 -c 1`), or any
//! in-process [`Read`] implementation.

pub mod mock;

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};

use crate::{MediaError, SourceError};

pub use mock::{MockSource, SequenceSource};

/// Where an [`AudioRing`](crate::AudioRing) reads its samples from.
///
/// The byte layout must match the ring's [`AudioConfig`](crate::AudioConfig):
/// interleaved samples at the configured rate, depth and channel count.
pub enum AudioSource {
    /// A command line run through the platform shell with stdout piped.
    Command(String),
    /// An in-process byte stream.
    Reader(Box<dyn Read + Send>),
}

impl AudioSource {
    /// Creates a source that runs `cmdline` through the shell.
    pub fn command(cmdline: impl Into<String>) -> Self {
        Self::Command(cmdline.into())
    }

    /// Creates a source from any byte stream.
    pub fn reader<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::Reader(Box::new(reader))
    }

    /// Returns a short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Command(cmdline) => format!("command `{cmdline}`"),
            Self::Reader(_) => "in-process reader".to_string(),
        }
    }

    /// Starts the source.
    pub(crate) fn open(self) -> Result<OpenSource, MediaError> {
        match self {
            Self::Command(cmdline) => spawn_command(cmdline),
            Self::Reader(reader) => Ok(OpenSource {
                reader,
                process: None,
            }),
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmdline) => f.debug_tuple("Command").field(cmdline).finish(),
            Self::Reader(_) => f.debug_tuple("Reader").field(&"..").finish(),
        }
    }
}

/// A started source, split into the stream the producer reads and the child
/// process (if any) the ring tears down on stop.
pub(crate) struct OpenSource {
    pub reader: Box<dyn Read + Send>,
    pub process: Option<SourceProcess>,
}

/// A running source command.
pub(crate) struct SourceProcess {
    child: Child,
    cmdline: String,
}

impl SourceProcess {
    /// Kills the command, and everything it started, so a blocked read returns.
    pub fn terminate(&mut self) {
        if self.kill_group() {
            return;
        }
        // InvalidInput means the process already exited.
        if let Err(e) = self.child.kill() {
            if e.kind() != io::ErrorKind::InvalidInput {
                tracing::warn!(command = %self.cmdline, error = %e, "failed to kill audio source");
            }
        }
    }

    /// Signals the shell's process group. Pipelines and forked children hold
    /// the pipe open too, so killing the shell alone would not end the read.
    ///
    /// Returns `false` if the group could not be signalled.
    #[cfg(unix)]
    fn kill_group(&self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Ok(pid) = i32::try_from(self.child.id()) else {
            return false;
        };
        match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            // ESRCH: every member already exited.
            Ok(()) | Err(Errno::ESRCH) => true,
            Err(e) => {
                tracing::warn!(command = %self.cmdline, error = %e, "failed to signal audio source group");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) -> bool {
        false
    }

    /// Terminates the command and reaps it.
    pub fn close(mut self) {
        self.terminate();
        match self.child.wait() {
            Ok(status) => {
                tracing::debug!(command = %self.cmdline, %status, "audio source exited");
            }
            Err(e) => {
                tracing::warn!(command = %self.cmdline, error = %e, "failed to reap audio source");
            }
        }
    }
}

fn spawn_command(cmdline: String) -> Result<OpenSource, MediaError> {
    if cmdline.trim().is_empty() {
        return Err(MediaError::source_unavailable("empty command line"));
    }

    let mut child = shell(&cmdline)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| MediaError::SourceSpawnFailed {
            command: cmdline.clone(),
            source,
        })?;

    let Some(stdout) = child.stdout.take() else {
        let process = SourceProcess { child, cmdline };
        process.close();
        return Err(MediaError::source_unavailable("command stdout was not captured"));
    };

    tracing::debug!(command = %cmdline, pid = child.id(), "audio source started");

    Ok(OpenSource {
        reader: Box::new(stdout),
        process: Some(SourceProcess { child, cmdline }),
    })
}

/// Runs `cmdline` under `sh`, as the leader of a new process group.
#[cfg(unix)]
fn shell(cmdline: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut command = Command::new("sh");
    command.arg("-c").arg(cmdline).process_group(0);
    command
}

#[cfg(windows)]
fn shell(cmdline: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmdline);
    command
}

/// Fills `buf` completely from `reader`.
///
/// A stream that ends early yields [`SourceError::Closed`] with the number of
/// bytes that did arrive.
pub(crate) fn read_clip<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), SourceError>
where
    R: Read + ?Sized,
{
    let expected = buf.len();
    let mut read = 0;
    while read < expected {
        match reader.read(&mut buf[read..]) {
            Ok(0) => return Err(SourceError::Closed { read, expected }),
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(SourceError::io(&e, read, expected)),
        }
    }
    Ok(())
}
