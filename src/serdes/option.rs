use bytes::BufMut;

use crate::{
    error::{CodecError, Result},
    serdes::{Decode, Encode, Input},
};

impl<V: Encode> Encode for Option<V> {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        match self {
            None => 0u8.encode(writer),
            Some(v) => {
                1u8.encode(writer);
                v.encode(writer);
            }
        }
    }

    fn size(&self) -> usize {
        match self {
            None => 1,
            Some(v) => 1 + v.size(),
        }
    }
}

impl<'a, V: Decode<'a>> Decode<'a> for Option<V> {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        match u8::decode(input)? {
            0 => Ok(None),
            1 => Ok(Some(V::decode(input)?)),
            _ => Err(CodecError::Malformed("option tag out of range")),
        }
    }
}
