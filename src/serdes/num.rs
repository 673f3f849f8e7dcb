use std::mem::size_of;

use bytes::BufMut;

use crate::{
    error::Result,
    serdes::{Decode, Encode, Input},
};

macro_rules! implement_encode_decode {
    ($integer:ident) => {
        impl Encode for $integer {
            fn encode<W: BufMut>(&self, writer: &mut W) {
                writer.put_slice(&self.to_le_bytes());
            }

            fn size(&self) -> usize {
                size_of::<Self>()
            }
        }

        impl<'a> Decode<'a> for $integer {
            fn decode(input: &mut Input<'a>) -> Result<Self> {
                let bytes = input.take(size_of::<$integer>())?;
                let mut raw = [0u8; size_of::<$integer>()];
                raw.copy_from_slice(bytes);
                Ok(Self::from_le_bytes(raw))
            }
        }
    };
}

implement_encode_decode!(u8);
implement_encode_decode!(u16);
implement_encode_decode!(u32);
implement_encode_decode!(u64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn little_endian_layout() {
        let mut buf = Vec::new();
        0x0102_0304u32.encode(&mut buf);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn round_trip_each_width() {
        let mut buf = Vec::new();
        0xabu8.encode(&mut buf);
        0xbeefu16.encode(&mut buf);
        0xdead_beefu32.encode(&mut buf);
        u64::MAX.encode(&mut buf);

        let mut input = Input::new(&buf);
        assert_eq!(u8::decode(&mut input).unwrap(), 0xab);
        assert_eq!(u16::decode(&mut input).unwrap(), 0xbeef);
        assert_eq!(u32::decode(&mut input).unwrap(), 0xdead_beef);
        assert_eq!(u64::decode(&mut input).unwrap(), u64::MAX);
        assert!(input.is_empty());
    }

    #[test]
    fn short_input_is_truncated() {
        let mut input = Input::new(&[1, 2, 3]);
        assert_eq!(
            u64::decode(&mut input),
            Err(CodecError::Truncated {
                needed: 8,
                remaining: 3
            })
        );
    }
}
