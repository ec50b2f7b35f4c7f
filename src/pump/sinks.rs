//! Sources and sinks commonly wired to a [`super::StreamRouter`].

use super::copy::{Available, NonBlockingSource};
use crate::error::StreamKind;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Cloneable in-memory sink; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer shared by several pumps (stdout and stderr merged).
pub(crate) struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> SharedWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // Hold the lock for the whole chunk so merged output never interleaves
        // mid-chunk.
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .flush()
    }
}

/// Splits written bytes into lines and hands each one to a callback.
///
/// Trailing `\r` is stripped. An unterminated last line is delivered on
/// flush or drop.
pub struct LineSink<F: FnMut(&str)> {
    buffer: Vec<u8>,
    on_line: F,
}

impl<F: FnMut(&str)> LineSink<F> {
    pub fn new(on_line: F) -> Self {
        Self {
            buffer: Vec::new(),
            on_line,
        }
    }

    fn emit(&mut self) {
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        (self.on_line)(&line);
    }
}

/// A [`LineSink`] that logs each line through `tracing` at info level.
pub fn log_lines(stream: StreamKind) -> LineSink<impl FnMut(&str) + Send> {
    LineSink::new(move |line: &str| info!(stream = %stream, "{}", line))
}

impl<F: FnMut(&str)> Write for LineSink<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                self.emit();
            } else {
                self.buffer.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.emit();
        }
        Ok(())
    }
}

impl<F: FnMut(&str)> Drop for LineSink<F> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.emit();
        }
    }
}

/// A source fed by chunks sent over a channel.
///
/// Reports end-of-stream once every sender is dropped and all sent bytes have
/// been read. Suitable for feeding a child's stdin while it runs.
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl ChannelReader {
    /// Create a reader and the sender that feeds it.
    pub fn channel() -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::from_receiver(rx))
    }

    pub fn from_receiver(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            pos: 0,
            closed: false,
        }
    }

    fn remaining(&self) -> usize {
        self.pending.len() - self.pos
    }

    fn refill(&mut self, chunk: Vec<u8>) {
        self.pending = chunk;
        self.pos = 0;
    }

    fn take(&mut self, buf: &mut [u8]) -> usize {
        let n = self.remaining().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.remaining() == 0 {
            if self.closed {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(chunk) => self.refill(chunk),
                Err(_) => self.closed = true,
            }
        }
        Ok(self.take(buf))
    }
}

impl NonBlockingSource for ChannelReader {
    fn available(&mut self) -> io::Result<Available> {
        while self.remaining() == 0 && !self.closed {
            match self.rx.try_recv() {
                Ok(chunk) => self.refill(chunk),
                Err(TryRecvError::Empty) => return Ok(Available::Bytes(0)),
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }

        Ok(match self.remaining() {
            0 => Available::Eof,
            n => Available::Bytes(n),
        })
    }
}
