//! Byte-stream primitives: little-endian fixed-width integers, length-prefixed
//! blobs, and length-prefixed frames over a borrowed input cursor.
//!
//! Frames carry their own byte length so readers can skip unknown trailing
//! data, which keeps the wire format forward compatible and localizes
//! corruption to a single frame.

mod bytes;
mod input;
mod num;
mod option;

use ::bytes::BufMut;
pub use input::Input;

use crate::error::Result;

/// Serialization into a growable in-memory buffer.
///
/// `size` must return the exact number of bytes `encode` writes; enclosing
/// frames rely on it to emit their length prefix up front.
pub trait Encode {
    /// Append the wire form of `self` to `writer`.
    fn encode<W: BufMut>(&self, writer: &mut W);

    /// Exact encoded size in bytes, including any length prefix.
    fn size(&self) -> usize;
}

impl<T: Encode> Encode for &T {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        Encode::encode(*self, writer)
    }

    fn size(&self) -> usize {
        Encode::size(*self)
    }
}

/// Deserialization from a borrowed input cursor.
pub trait Decode<'a>: Sized {
    /// Read one value, advancing `input` past its wire form.
    fn decode(input: &mut Input<'a>) -> Result<Self>;
}

/// Write a length-prefixed frame: a `u32` byte length followed by the body.
pub fn encode_frame<W: BufMut>(writer: &mut W, body: &impl Encode) {
    writer.put_u32_le(body.size() as u32);
    body.encode(writer);
}
