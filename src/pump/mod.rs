//! Concurrent stream pumping.
//!
//! A child's stdout and stderr pipes have a finite OS buffer. If the parent
//! drains only one of them, a child that fills the other blocks forever. Each
//! stream therefore gets its own [`StreamPump`] running on its own thread,
//! and a [`StreamRouter`] owns the set of pumps for one execution.
//!
//! I/O errors inside a pump never cross the thread boundary directly: they
//! are captured and surfaced by [`PumpHandle::wait`] once the pump finished.

mod copy;
mod router;
mod sinks;


pub use copy::{Available, Chunk, NonBlockingSource, copy, copy_available, copy_non_blocking};
pub use router::{DEFAULT_BUFFER_SIZE, DEFAULT_POLL_INTERVAL, StdinSource, StreamRouter};
pub use sinks::{CaptureBuffer, ChannelReader, LineSink, log_lines};

use crate::error::{ExecError, Result, StreamKind};
use std::io::{self, Read, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Where a pump reads from, and how.
pub enum PumpSource {
    /// Read until end-of-stream, blocking as needed.
    Blocking(Box<dyn Read + Send>),
    /// Poll without blocking, sleeping `interval` when idle. Can be stopped.
    Polling {
        source: Box<dyn NonBlockingSource + Send>,
        interval: Duration,
    },
}

#[derive(Default)]
struct PumpState {
    finished: bool,
    bytes: u64,
    error: Option<io::Error>,
}

struct PumpShared {
    state: Mutex<PumpState>,
    done: Condvar,
    stop: AtomicBool,
}

impl PumpShared {
    fn lock(&self) -> MutexGuard<'_, PumpState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn finish(&self, result: io::Result<u64>) {
        let mut state = self.lock();
        if state.finished {
            return;
        }
        state.finished = true;
        match result {
            Ok(bytes) => state.bytes = bytes,
            Err(e) => state.error = Some(e),
        }
        self.done.notify_all();
    }
}

/// Copies one source into one destination.
pub struct StreamPump {
    stream: StreamKind,
    source: PumpSource,
    destination: Box<dyn Write + Send>,
    buffer: Vec<u8>,
    shared: Arc<PumpShared>,
}

impl StreamPump {
    /// `buffer_size` is clamped to at least one byte.
    pub fn new(
        stream: StreamKind,
        source: PumpSource,
        destination: Box<dyn Write + Send>,
        buffer_size: usize,
    ) -> Self {
        Self {
            stream,
            source,
            destination,
            buffer: vec![0; buffer_size.max(1)],
            shared: Arc::new(PumpShared {
                state: Mutex::new(PumpState::default()),
                done: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
        }
    }

    /// Run the copy on the current thread and return the copied byte count.
    pub fn run(self) -> Result<u64> {
        let stream = self.stream;
        let shared = Arc::clone(&self.shared);
        self.execute();

        let mut state = shared.lock();
        match state.error.take() {
            Some(source) => Err(ExecError::Stream { stream, source }),
            None => Ok(state.bytes),
        }
    }

    /// The destination is flushed and then dropped, which closes it when the
    /// pump owns the only handle (a child's stdin, for example). A broken
    /// pipe on stdin means the child stopped reading and counts as normal
    /// completion.
    fn execute(self) {
        let Self {
            stream,
            mut source,
            mut destination,
            mut buffer,
            shared,
        } = self;

        let copied = match &mut source {
            PumpSource::Blocking(reader) => copy(reader, &mut destination, &mut buffer),
            PumpSource::Polling { source, interval } => copy_non_blocking(
                source,
                &mut destination,
                &mut buffer,
                *interval,
                &shared.stop,
            ),
        };
        let result = copied.and_then(|n| destination.flush().map(|()| n));
        drop(destination);

        let result = match result {
            Err(e) if stream == StreamKind::Stdin && e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(stream = %stream, "child closed stdin");
                Ok(0)
            }
            other => other,
        };

        match &result {
            Ok(bytes) => debug!(stream = %stream, bytes, "pump finished"),
            Err(e) => warn!(stream = %stream, error = %e, "pump failed"),
        }
        shared.finish(result);
    }

    /// Run the copy on a dedicated thread.
    pub fn spawn(self) -> Result<PumpHandle> {
        let stream = self.stream;
        let shared = Arc::clone(&self.shared);
        let guard = Arc::clone(&self.shared);

        let thread = thread::Builder::new()
            .name(format!("runexec-{}", stream))
            .spawn(move || {
                if catch_unwind(AssertUnwindSafe(|| self.execute())).is_err() {
                    guard.finish(Err(io::Error::other("pump thread panicked")));
                }
            })
            .map_err(|source| ExecError::Spawn {
                name: "stream pump",
                source,
            })?;

        Ok(PumpHandle {
            stream,
            shared,
            thread: Some(thread),
        })
    }
}

/// Handle to a pump running on its own thread.
pub struct PumpHandle {
    stream: StreamKind,
    shared: Arc<PumpShared>,
    thread: Option<JoinHandle<()>>,
}

impl PumpHandle {
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn is_finished(&self) -> bool {
        self.shared.lock().finished
    }

    /// Ask a polling pump to drain once more and finish.
    ///
    /// Blocking pumps finish only at end-of-stream.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Wait for the pump to finish and return the copied byte count.
    ///
    /// With a `timeout`, a pump still running afterwards is abandoned and
    /// reported as [`ExecError::StreamStopTimeout`].
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<u64> {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.wait_until(deadline, timeout)
    }

    /// Wait until `deadline`; `timeout` is what a timeout error reports.
    pub(crate) fn wait_until(
        &mut self,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<u64> {
        let mut state = self.shared.lock();

        while !state.finished {
            state = match deadline {
                None => self
                    .shared
                    .done
                    .wait(state)
                    .unwrap_or_else(|poison| poison.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ExecError::StreamStopTimeout {
                            stream: self.stream,
                            timeout: timeout.unwrap_or_default(),
                        });
                    }
                    self.shared
                        .done
                        .wait_timeout(state, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poison| poison.into_inner().0)
                }
            };
        }

        let bytes = state.bytes;
        let error = state.error.take();
        drop(state);

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }

        match error {
            Some(source) => Err(ExecError::Stream {
                stream: self.stream,
                source,
            }),
            None => Ok(bytes),
        }
    }
}
