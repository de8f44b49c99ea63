//! Bounds-checked cursor over an untrusted byte slice.
//!
//! Every read either returns data that lies fully inside the slice or an
//! [`OutOfBounds`] error; the cursor never moves on a failed read.

/// A read that would run past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("read of {wanted} bytes at offset {offset} exceeds buffer ({available} bytes left)")]
pub struct OutOfBounds {
    pub offset: usize,
    pub wanted: usize,
    pub available: usize,
}

/// Width of a string terminator, which depends on the text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// A single `0x00` byte.
    Single,
    /// A `0x00 0x00` pair aligned to the start of the string.
    Double,
}

/// Forward-only reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the underlying slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn out_of_bounds(&self, wanted: usize) -> OutOfBounds {
        OutOfBounds {
            offset: self.pos,
            wanted,
            available: self.remaining(),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
        if n > self.remaining() {
            return Err(self.out_of_bounds(n));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], OutOfBounds> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, OutOfBounds> {
        self.read_array::<4>().map(u32::from_be_bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), OutOfBounds> {
        self.read_bytes(n).map(|_| ())
    }

    /// Consume and return everything up to the end of the slice.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    /// Read a terminated string, returning the bytes before the terminator.
    ///
    /// The terminator itself is consumed. For [`Terminator::Double`] only
    /// pairs starting at an even distance from the cursor are matched, so a
    /// UTF-16 code unit ending in `0x00` followed by one starting with `0x00`
    /// is not mistaken for the end of the string.
    pub fn read_terminated(&mut self, terminator: Terminator) -> Result<&'a [u8], OutOfBounds> {
        let tail = &self.buf[self.pos..];
        let end = match terminator {
            Terminator::Single => tail.iter().position(|&b| b == 0),
            Terminator::Double => tail
                .chunks_exact(2)
                .position(|pair| pair == [0, 0])
                .map(|i| i * 2),
        };
        let Some(end) = end else {
            return Err(self.out_of_bounds(tail.len() + 1));
        };
        let width = match terminator {
            Terminator::Single => 1,
            Terminator::Double => 2,
        };
        let text = &tail[..end];
        self.pos += end + width;
        Ok(text)
    }
}
