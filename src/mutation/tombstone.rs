use bytes::BufMut;

use crate::{
    error::{CodecError, Result},
    serdes::{Decode, Encode, Input},
};

/// A timestamped deletion marker.
///
/// "No tombstone" is represented by the [`Tombstone::NONE`] sentinel, both
/// fields all-ones; the wire form always carries the 16 bytes so the reader
/// never needs a separate presence flag. A half-set sentinel is rejected as
/// malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tombstone {
    /// Write timestamp the deletion applies at.
    pub timestamp: u64,
    /// Wall-clock deletion time, used for purging.
    pub deletion_time: u64,
}

impl Tombstone {
    /// The absent-tombstone sentinel.
    pub const NONE: Tombstone = Tombstone {
        timestamp: u64::MAX,
        deletion_time: u64::MAX,
    };

    /// A live tombstone at `timestamp` / `deletion_time`.
    pub fn new(timestamp: u64, deletion_time: u64) -> Self {
        let t = Self {
            timestamp,
            deletion_time,
        };
        debug_assert!(!t.is_none(), "use Tombstone::NONE for the absent marker");
        t
    }

    /// Whether this is the absent sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Encode for Tombstone {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.timestamp.encode(writer);
        self.deletion_time.encode(writer);
    }

    fn size(&self) -> usize {
        16
    }
}

impl<'a> Decode<'a> for Tombstone {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        let timestamp = u64::decode(input)?;
        let deletion_time = u64::decode(input)?;
        if (timestamp == u64::MAX) != (deletion_time == u64::MAX) {
            return Err(CodecError::Malformed("half-set tombstone sentinel"));
        }
        Ok(Self {
            timestamp,
            deletion_time,
        })
    }
}
