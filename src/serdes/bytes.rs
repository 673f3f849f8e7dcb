use bytes::{BufMut, Bytes};

use crate::{
    error::Result,
    serdes::{Decode, Encode, Input},
};

impl Encode for &[u8] {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        (self.len() as u32).encode(writer);
        writer.put_slice(self);
    }

    fn size(&self) -> usize {
        4 + self.len()
    }
}

impl Encode for Bytes {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.as_ref().encode(writer)
    }

    fn size(&self) -> usize {
        4 + self.len()
    }
}

impl<'a> Decode<'a> for Bytes {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        Ok(Bytes::copy_from_slice(input.read_blob()?))
    }
}
