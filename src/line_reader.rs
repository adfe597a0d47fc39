//! Reading command lines into a growable, NUL-terminated byte buffer.

use crate::error::LineError;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::os::fd::AsFd;

/// Result of a single [`LineBuffer::read_line`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome<'a> {
    /// One line with the trailing newline removed, as raw bytes. Borrowed
    /// from the buffer and therefore only valid until the next read.
    Line(&'a [u8]),
    /// Input ended before any byte of a new line was read.
    Eof,
}

/// The interpreter's input buffer.
///
/// The backing region always holds at least `len + 1` bytes so the line can be
/// NUL-terminated in place. When the write position reaches the end of the
/// region a region twice as large is allocated, the bytes read so far are
/// copied over and the old region is released.
#[derive(Debug)]
pub struct LineBuffer {
    data: Vec<u8>,
    len: usize,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Content of the current line, without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Read bytes one at a time until a newline or end of input.
    ///
    /// A final line without a newline is returned as a regular line; the
    /// following call reports [`ReadOutcome::Eof`]. On any error the partial
    /// line is discarded.
    pub fn read_line<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
    ) -> Result<ReadOutcome<'_>, LineError> {
        self.len = 0;
        let mut got_bytes = false;

        loop {
            let mut byte = [0u8; 1];
            match input.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.discard();
                    return Err(e.into());
                }
            }
            got_bytes = true;
            if byte[0] == b'\n' {
                break;
            }
            if let Err(e) = self.push(byte[0]) {
                self.discard();
                return Err(e);
            }
        }

        self.data[self.len] = 0;
        if !got_bytes {
            return Ok(ReadOutcome::Eof);
        }
        Ok(ReadOutcome::Line(&self.data[..self.len]))
    }

    fn push(&mut self, byte: u8) -> Result<(), LineError> {
        self.data[self.len] = byte;
        self.len += 1;
        if self.len >= self.capacity() {
            self.grow()?;
        }
        Ok(())
    }

    fn grow(&mut self) -> Result<(), LineError> {
        let requested = self.capacity().saturating_mul(2);
        let mut grown = Vec::new();
        grown
            .try_reserve_exact(requested)
            .map_err(|source| LineError::Grow { requested, source })?;
        grown.extend_from_slice(&self.data[..self.len]);
        grown.resize(requested, 0);
        self.data = grown;
        tracing::trace!(capacity = requested, "line buffer grown");
        Ok(())
    }

    fn discard(&mut self) {
        self.len = 0;
        self.data[0] = 0;
    }
}

/// Unbuffered handle on standard input.
///
/// Reading through a duplicate of fd 0 instead of [`std::io::Stdin`] keeps
/// bytes after the current newline in the kernel, where launched programs
/// can still read them.
pub fn raw_stdin() -> io::Result<File> {
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(File::from(fd))
}
