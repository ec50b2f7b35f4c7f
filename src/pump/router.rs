//! Wires pumps to a child's standard streams.

use super::sinks::SharedWriter;
use super::{NonBlockingSource, PumpHandle, PumpSource, StreamPump};
use crate::error::{ExecError, Result, StreamKind};
use crate::process::ProcessStreams;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// Pump buffer size used unless configured otherwise.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Sleep between polls of a non-blocking stdin source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What to feed into the child's stdin.
pub enum StdinSource {
    /// Copied until end-of-stream, then the child's stdin is closed.
    Blocking(Box<dyn Read + Send>),
    /// Polled without blocking; stopped (after a final drain) once the child
    /// exits.
    Polled(Box<dyn NonBlockingSource + Send>),
}

/// Owns the stdout, stderr, and stdin pumps of one execution.
///
/// Without a stdin source the child's stdin is closed right away.
pub struct StreamRouter {
    stdout: Option<Box<dyn Write + Send>>,
    stderr: Option<Box<dyn Write + Send>>,
    stdin: Option<StdinSource>,
    buffer_size: usize,
    poll_interval: Duration,
    stop_timeout: Option<Duration>,
    pumps: Vec<PumpHandle>,
}

impl StreamRouter {
    /// Route stdout and stderr to the given writers.
    pub fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Self {
            stdout: Some(Box::new(stdout)),
            stderr: Some(Box::new(stderr)),
            stdin: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: None,
            pumps: Vec::new(),
        }
    }

    /// Route to this process's own stdout and stderr.
    pub fn inherit() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Drain both streams and drop the data.
    pub fn discard() -> Self {
        Self::new(io::sink(), io::sink())
    }

    /// Route stdout and stderr into one writer.
    pub fn merged<W: Write + Send + 'static>(output: W) -> Self {
        let shared = SharedWriter::new(output);
        Self::new(shared.clone(), shared)
    }

    /// Feed a blocking reader into the child's stdin.
    pub fn with_stdin<R: Read + Send + 'static>(mut self, input: R) -> Self {
        self.stdin = Some(StdinSource::Blocking(Box::new(input)));
        self
    }

    /// Feed a polled source into the child's stdin.
    pub fn with_polled_stdin<S: NonBlockingSource + Send + 'static>(mut self, input: S) -> Self {
        self.stdin = Some(StdinSource::Polled(Box::new(input)));
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound how long [`await_completion`](Self::await_completion) waits for
    /// each pump.
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout
    }

    /// Start one pump per available stream.
    ///
    /// Destinations and the stdin source are consumed; streams the child
    /// does not expose are skipped.
    pub fn start(&mut self, streams: ProcessStreams) -> Result<()> {
        let ProcessStreams {
            stdin,
            stdout,
            stderr,
        } = streams;

        if let Some(stdout) = stdout {
            let sink = self.stdout.take().unwrap_or_else(|| Box::new(io::sink()));
            self.spawn(StreamKind::Stdout, PumpSource::Blocking(Box::new(stdout)), sink)?;
        }

        if let Some(stderr) = stderr {
            let sink = self.stderr.take().unwrap_or_else(|| Box::new(io::sink()));
            self.spawn(StreamKind::Stderr, PumpSource::Blocking(Box::new(stderr)), sink)?;
        }

        match (stdin, self.stdin.take()) {
            (Some(child_stdin), Some(StdinSource::Blocking(input))) => {
                self.spawn(
                    StreamKind::Stdin,
                    PumpSource::Blocking(input),
                    Box::new(child_stdin),
                )?;
            }
            (Some(child_stdin), Some(StdinSource::Polled(source))) => {
                let source = PumpSource::Polling {
                    source,
                    interval: self.poll_interval,
                };
                self.spawn(StreamKind::Stdin, source, Box::new(child_stdin))?;
            }
            (Some(child_stdin), None) => {
                debug!("no stdin source; closing child stdin");
                drop(child_stdin);
            }
            (None, _) => {}
        }

        Ok(())
    }

    fn spawn(
        &mut self,
        stream: StreamKind,
        source: PumpSource,
        destination: Box<dyn Write + Send>,
    ) -> Result<()> {
        let pump = StreamPump::new(stream, source, destination, self.buffer_size);
        self.pumps.push(pump.spawn()?);
        Ok(())
    }

    /// Whether every started pump has finished.
    pub fn is_finished(&self) -> bool {
        self.pumps.iter().all(PumpHandle::is_finished)
    }

    /// Stop the polled stdin pump (after a final drain) and wait for all
    /// pumps.
    pub fn stop(&mut self) -> Result<()> {
        for pump in &self.pumps {
            if pump.stream() == StreamKind::Stdin {
                pump.stop();
            }
        }
        self.await_completion()
    }

    /// Wait until every pump has finished.
    ///
    /// All pumps are waited for even when one fails; the first failure is
    /// returned. The stop timeout bounds the wait for all pumps together.
    pub fn await_completion(&mut self) -> Result<()> {
        let timeout = self.stop_timeout;
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut first_error: Option<ExecError> = None;

        for mut pump in self.pumps.drain(..) {
            if let Err(e) = pump.wait_until(deadline, timeout) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for StreamRouter {
    fn default() -> Self {
        Self::inherit()
    }
}
