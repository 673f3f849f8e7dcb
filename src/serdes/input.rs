use crate::error::{CodecError, Result};

/// Borrowed input cursor with check-and-advance semantics.
///
/// Every read is bounds-checked against the remaining slice; a read past the
/// end fails with [`CodecError::Truncated`] and never touches bytes beyond
/// the buffer.
#[derive(Clone, Copy, Debug)]
pub struct Input<'a> {
    bytes: &'a [u8],
}

impl<'a> Input<'a> {
    /// Position a cursor at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the cursor has been fully consumed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume exactly `n` bytes, returning them as a borrowed slice.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    /// Read a `u32` length prefix, then that many raw bytes.
    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed frame, returning a sub-cursor over its body.
    ///
    /// The parent cursor advances past the whole frame, so callers may skip
    /// a frame in O(1) without understanding its contents.
    pub fn read_frame(&mut self) -> Result<Input<'a>> {
        Ok(Input::new(self.read_blob()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }
}
