use std::collections::BTreeMap;

use bytes::{BufMut, Bytes};

use crate::{
    error::{CodecError, Result},
    mutation::Tombstone,
    serdes::{Decode, Encode, Input},
};

/// Time-to-live attached to a live cell or row marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellTtl {
    /// TTL duration in seconds.
    pub ttl_secs: u32,
    /// Absolute expiry point derived from the write time.
    pub expiry: u64,
}

impl Encode for CellTtl {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.ttl_secs.encode(writer);
        self.expiry.encode(writer);
    }

    fn size(&self) -> usize {
        12
    }
}

impl<'a> Decode<'a> for CellTtl {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        Ok(Self {
            ttl_secs: u32::decode(input)?,
            expiry: u64::decode(input)?,
        })
    }
}

pub(crate) const CELL_LIVE: u8 = 0;
pub(crate) const CELL_DEAD: u8 = 1;
pub(crate) const CELL_COLLECTION: u8 = 2;

/// One cell of a row: an atomic value, an atomic tombstone, or a collection
/// of sub-elements with per-element timestamps and tombstones.
///
/// Value bytes are opaque to the codec; interpreting them is the job of the
/// schema-driven cell codec upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Live atomic value.
    Live {
        /// Write timestamp.
        timestamp: u64,
        /// Optional expiry.
        ttl: Option<CellTtl>,
        /// Opaque value bytes.
        value: Bytes,
    },
    /// Deleted atomic cell.
    Dead {
        /// Write timestamp of the deletion.
        timestamp: u64,
        /// Wall-clock deletion time.
        deletion_time: u64,
    },
    /// Live collection: sub-element path to atomic cell, plus a tombstone
    /// covering elements written before it.
    Collection {
        /// Deletion marker for the collection as a whole.
        tombstone: Tombstone,
        /// Sub-elements keyed by opaque path, in path order.
        elements: BTreeMap<Bytes, Cell>,
    },
}

impl Cell {
    /// A live cell without TTL.
    pub fn live(timestamp: u64, value: impl Into<Bytes>) -> Self {
        Cell::Live {
            timestamp,
            ttl: None,
            value: value.into(),
        }
    }

    /// A live cell expiring after `ttl`.
    pub fn live_with_ttl(timestamp: u64, ttl: CellTtl, value: impl Into<Bytes>) -> Self {
        Cell::Live {
            timestamp,
            ttl: Some(ttl),
            value: value.into(),
        }
    }

    /// A dead atomic cell.
    pub fn dead(timestamp: u64, deletion_time: u64) -> Self {
        Cell::Dead {
            timestamp,
            deletion_time,
        }
    }

    fn is_atomic(&self) -> bool {
        !matches!(self, Cell::Collection { .. })
    }

    fn decode_with_depth(input: &mut Input<'_>, allow_collection: bool) -> Result<Self> {
        Ok(match u8::decode(input)? {
            CELL_LIVE => Cell::Live {
                timestamp: u64::decode(input)?,
                ttl: Option::<CellTtl>::decode(input)?,
                value: Bytes::decode(input)?,
            },
            CELL_DEAD => Cell::Dead {
                timestamp: u64::decode(input)?,
                deletion_time: u64::decode(input)?,
            },
            CELL_COLLECTION if allow_collection => {
                let tombstone = Tombstone::decode(input)?;
                let count = u32::decode(input)?;
                let mut elements = BTreeMap::new();
                for _ in 0..count {
                    let path = Bytes::decode(input)?;
                    let cell = Cell::decode_with_depth(input, false)?;
                    elements.insert(path, cell);
                }
                Cell::Collection {
                    tombstone,
                    elements,
                }
            }
            CELL_COLLECTION => return Err(CodecError::Malformed("nested collection cell")),
            _ => return Err(CodecError::Malformed("cell kind out of range")),
        })
    }
}

impl Encode for Cell {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        match self {
            Cell::Live {
                timestamp,
                ttl,
                value,
            } => {
                CELL_LIVE.encode(writer);
                timestamp.encode(writer);
                ttl.encode(writer);
                value.encode(writer);
            }
            Cell::Dead {
                timestamp,
                deletion_time,
            } => {
                CELL_DEAD.encode(writer);
                timestamp.encode(writer);
                deletion_time.encode(writer);
            }
            Cell::Collection {
                tombstone,
                elements,
            } => {
                CELL_COLLECTION.encode(writer);
                tombstone.encode(writer);
                (elements.len() as u32).encode(writer);
                for (path, cell) in elements {
                    debug_assert!(cell.is_atomic(), "collection elements must be atomic");
                    path.encode(writer);
                    cell.encode(writer);
                }
            }
        }
    }

    fn size(&self) -> usize {
        1 + match self {
            Cell::Live { ttl, value, .. } => 8 + ttl.size() + value.size(),
            Cell::Dead { .. } => 16,
            Cell::Collection { elements, .. } => {
                16 + 4
                    + elements
                        .iter()
                        .map(|(path, cell)| path.size() + cell.size())
                        .sum::<usize>()
            }
        }
    }
}

impl<'a> Decode<'a> for Cell {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        Cell::decode_with_depth(input, true)
    }
}

const MARKER_NONE: u8 = 0;
const MARKER_LIVE: u8 = 1;
const MARKER_DEAD: u8 = 2;

/// Liveness marker of a clustering row, independent of its cells.
///
/// A row inserted without any columns still carries a live marker; a row that
/// only ever received cell writes carries none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowMarker {
    /// No marker; the row exists only through its cells.
    #[default]
    None,
    /// Row created by an insert at `timestamp`.
    Live {
        /// Insert timestamp.
        timestamp: u64,
        /// Optional expiry of the whole row.
        ttl: Option<CellTtl>,
    },
    /// Row-level deletion marker.
    Dead(Tombstone),
}

impl Encode for RowMarker {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        match self {
            RowMarker::None => MARKER_NONE.encode(writer),
            RowMarker::Live { timestamp, ttl } => {
                MARKER_LIVE.encode(writer);
                timestamp.encode(writer);
                ttl.encode(writer);
            }
            RowMarker::Dead(t) => {
                MARKER_DEAD.encode(writer);
                t.encode(writer);
            }
        }
    }

    fn size(&self) -> usize {
        1 + match self {
            RowMarker::None => 0,
            RowMarker::Live { ttl, .. } => 8 + ttl.size(),
            RowMarker::Dead(_) => 16,
        }
    }
}

impl<'a> Decode<'a> for RowMarker {
    fn decode(input: &mut Input<'a>) -> Result<Self> {
        Ok(match u8::decode(input)? {
            MARKER_NONE => RowMarker::None,
            MARKER_LIVE => RowMarker::Live {
                timestamp: u64::decode(input)?,
                ttl: Option::<CellTtl>::decode(input)?,
            },
            MARKER_DEAD => RowMarker::Dead(Tombstone::decode(input)?),
            _ => return Err(CodecError::Malformed("row marker kind out of range")),
        })
    }
}
