use bytes::{BufMut, Bytes};

use crate::{
    error::{CodecError, Result},
    serdes::{Decode, Encode, Input},
};

fn composite_body_size(components: &[Bytes]) -> usize {
    components.iter().map(Encode::size).sum()
}

fn encode_composite<W: BufMut>(components: &[Bytes], writer: &mut W) {
    (composite_body_size(components) as u32).encode(writer);
    for component in components {
        component.encode(writer);
    }
}

fn decode_composite(input: &mut Input<'_>) -> Result<Vec<Bytes>> {
    let mut body = input.read_frame()?;
    let mut components = Vec::new();
    while !body.is_empty() {
        components.push(Bytes::decode(&mut body)?);
    }
    Ok(components)
}

/// Composite partition key: one or more opaque, length-prefixed components.
///
/// The wire form is a single blob whose body is the concatenation of the
/// length-prefixed components, so routing code can skip the key without
/// knowing its arity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey(Vec<Bytes>);

impl PartitionKey {
    /// Build a key from its components. Panics on an empty component list;
    /// a partition key always has at least one component.
    pub fn new(components: impl IntoIterator<Item = impl Into<Bytes>>) -> Self {
        let components: Vec<Bytes> = components.into_iter().map(Into::into).collect();
        assert!(!components.is_empty(), "partition key must not be empty");
        Self(components)
    }

    /// The key's components in order.
    pub fn components(&self) -> &[Bytes] {
        &self.0
    }
}

impl Encode for PartitionKey {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        encode_composite(&self.0, writer)
    }

    fn size(&self) -> usize {
        4 + composite_body_size(&self.0)
    }
}

impl<'a> Decode<'a> for PartitionKey {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        let components = decode_composite(input)?;
        if components.is_empty() {
            return Err(CodecError::Malformed("empty partition key"));
        }
        Ok(Self(components))
    }
}

/// Composite clustering key, or a prefix of one when used inside a range
/// tombstone bound. May be empty (a bound covering the whole partition).
///
/// Ordering is the schema's clustering comparator: lexicographic over the
/// component sequence, shorter prefixes first.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusteringKey(Vec<Bytes>);

impl ClusteringKey {
    /// Build a key from its components.
    pub fn new(components: impl IntoIterator<Item = impl Into<Bytes>>) -> Self {
        Self(components.into_iter().map(Into::into).collect())
    }

    /// The empty prefix.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// The key's components in order.
    pub fn components(&self) -> &[Bytes] {
        &self.0
    }
}

impl Encode for ClusteringKey {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        encode_composite(&self.0, writer)
    }

    fn size(&self) -> usize {
        4 + composite_body_size(&self.0)
    }
}

impl<'a> Decode<'a> for ClusteringKey {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        Ok(Self(decode_composite(input)?))
    }
}

/// Which side of a clustering interval a bound closes, and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundKind {
    /// Start of the interval, key included.
    IncStart,
    /// Start of the interval, key excluded.
    ExcStart,
    /// End of the interval, key included.
    IncEnd,
    /// End of the interval, key excluded.
    ExcEnd,
}

impl BoundKind {
    /// The wire tag for this kind.
    pub const fn as_u8(self) -> u8 {
        match self {
            BoundKind::IncStart => 0,
            BoundKind::ExcStart => 1,
            BoundKind::IncEnd => 2,
            BoundKind::ExcEnd => 3,
        }
    }

    /// Whether this kind may open an interval.
    pub const fn is_start(self) -> bool {
        matches!(self, BoundKind::IncStart | BoundKind::ExcStart)
    }

    pub(crate) fn from_wire(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => BoundKind::IncStart,
            1 => BoundKind::ExcStart,
            2 => BoundKind::IncEnd,
            3 => BoundKind::ExcEnd,
            _ => return Err(CodecError::Malformed("bound kind out of range")),
        })
    }
}

/// One bound of a range tombstone: a clustering prefix plus a kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeBound {
    /// Clustering prefix the bound compares at.
    pub prefix: ClusteringKey,
    /// Inclusive/exclusive, start/end.
    pub kind: BoundKind,
}

impl RangeBound {
    /// Inclusive start at `prefix`.
    pub fn inc_start(prefix: ClusteringKey) -> Self {
        Self {
            prefix,
            kind: BoundKind::IncStart,
        }
    }

    /// Exclusive start at `prefix`.
    pub fn exc_start(prefix: ClusteringKey) -> Self {
        Self {
            prefix,
            kind: BoundKind::ExcStart,
        }
    }

    /// Inclusive end at `prefix`.
    pub fn inc_end(prefix: ClusteringKey) -> Self {
        Self {
            prefix,
            kind: BoundKind::IncEnd,
        }
    }

    /// Exclusive end at `prefix`.
    pub fn exc_end(prefix: ClusteringKey) -> Self {
        Self {
            prefix,
            kind: BoundKind::ExcEnd,
        }
    }
}

impl Encode for RangeBound {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.prefix.encode(writer);
        self.kind.as_u8().encode(writer);
    }

    fn size(&self) -> usize {
        self.prefix.size() + 1
    }
}

impl<'a> Decode<'a> for RangeBound {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        let prefix = ClusteringKey::decode(input)?;
        let kind = BoundKind::from_wire(u8::decode(input)?)?;
        Ok(Self { prefix, kind })
    }
}
