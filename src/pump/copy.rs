//! Copy disciplines used by stream pumps.
//!
//! - [`copy`]: blocking copy until end-of-stream.
//! - [`copy_available`]: copy only what the source can hand over without
//!   blocking, once.
//! - [`copy_non_blocking`]: repeat [`copy_available`] until end-of-stream or
//!   until asked to stop, then drain once more.

use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// How much a source can deliver without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Available {
    /// This many bytes are ready. Zero means "nothing right now".
    Bytes(usize),
    /// The source cannot tell; a single read of up to one buffer is done.
    Unknown,
    /// The source is exhausted and will never produce more data.
    Eof,
}

/// A readable source that can report buffered bytes without blocking.
pub trait NonBlockingSource: Read {
    fn available(&mut self) -> io::Result<Available>;
}

impl NonBlockingSource for &[u8] {
    fn available(&mut self) -> io::Result<Available> {
        Ok(if self.is_empty() {
            Available::Eof
        } else {
            Available::Bytes(self.len())
        })
    }
}

impl<T: AsRef<[u8]>> NonBlockingSource for Cursor<T> {
    fn available(&mut self) -> io::Result<Available> {
        let len = self.get_ref().as_ref().len() as u64;
        let remaining = len.saturating_sub(self.position());
        Ok(if remaining == 0 {
            Available::Eof
        } else {
            Available::Bytes(remaining as usize)
        })
    }
}

impl<S: NonBlockingSource + ?Sized> NonBlockingSource for Box<S> {
    fn available(&mut self) -> io::Result<Available> {
        (**self).available()
    }
}

/// Result of one [`copy_available`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// This many bytes were copied.
    Copied(usize),
    /// Nothing was available.
    Empty,
    /// The source reached end-of-stream.
    Eof,
}

fn read_retrying<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match input.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Copy `input` to `output` until end-of-stream. Returns the byte count.
///
/// `buffer` must not be empty.
pub fn copy<R, W>(input: &mut R, output: &mut W, buffer: &mut [u8]) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut count = 0u64;
    loop {
        let n = read_retrying(input, buffer)?;
        if n == 0 {
            return Ok(count);
        }
        output.write_all(&buffer[..n])?;
        count += n as u64;
    }
}

/// Copy the bytes `input` has ready right now.
pub fn copy_available<R, W>(input: &mut R, output: &mut W, buffer: &mut [u8]) -> io::Result<Chunk>
where
    R: NonBlockingSource + ?Sized,
    W: Write + ?Sized,
{
    let limit = match input.available()? {
        Available::Eof => return Ok(Chunk::Eof),
        Available::Bytes(0) => return Ok(Chunk::Empty),
        Available::Bytes(n) => Some(n),
        Available::Unknown => None,
    };

    let mut count = 0usize;
    let mut to_read = limit.map_or(buffer.len(), |n| n.min(buffer.len()));

    while to_read > 0 {
        let n = read_retrying(input, &mut buffer[..to_read])?;
        if n == 0 {
            return Ok(Chunk::Eof);
        }
        output.write_all(&buffer[..n])?;
        count += n;

        to_read = match limit {
            Some(available) => available.saturating_sub(count).min(buffer.len()),
            None => 0,
        };
    }

    Ok(Chunk::Copied(count))
}

/// Poll `input` until end-of-stream, sleeping `interval` whenever nothing is
/// ready.
///
/// When `stop` is raised the loop drains whatever is ready once more and
/// returns, so the final buffered chunk is not lost.
pub fn copy_non_blocking<R, W>(
    input: &mut R,
    output: &mut W,
    buffer: &mut [u8],
    interval: Duration,
    stop: &AtomicBool,
) -> io::Result<u64>
where
    R: NonBlockingSource + ?Sized,
    W: Write + ?Sized,
{
    let mut total = 0u64;
    loop {
        let chunk = copy_available(input, output, buffer)?;
        match chunk {
            Chunk::Eof => return Ok(total),
            Chunk::Copied(n) => total += n as u64,
            Chunk::Empty => {}
        }

        if stop.load(Ordering::Acquire) {
            if let Chunk::Copied(n) = copy_available(input, output, buffer)? {
                total += n as u64;
            }
            return Ok(total);
        }

        if chunk == Chunk::Empty {
            thread::sleep(interval);
        }
    }
}
