//! Read-only parser over a frozen partition frame.
//!
//! [`PartitionView::accept`] drives a caller-supplied [`PartitionConsumer`]
//! across the frame's fragments in emission order. View arguments borrow the
//! underlying buffer and are valid only for the duration of the callback;
//! consumers that need to retain data copy it into owned form, as
//! [`crate::mutation::PartitionBuilder`] does.

use bytes::Bytes;

use crate::{
    error::{CodecError, Result},
    mutation::{
        BoundKind, Cell, CellTtl, ClusteringKey, RangeBound, RowMarker, Tombstone,
        CELL_COLLECTION, CELL_DEAD, CELL_LIVE,
    },
    schema::ColumnId,
    serdes::{Decode, Input},
};

/// Borrowed view of a composite clustering key or bound prefix.
///
/// Construction validates the component framing once, so iteration is
/// infallible afterwards.
#[derive(Clone, Copy, Debug)]
pub struct ClusteringKeyView<'a> {
    body: &'a [u8],
}

impl<'a> ClusteringKeyView<'a> {
    pub(crate) fn parse(input: &mut Input<'a>) -> Result<Self> {
        let body = input.read_blob()?;
        let mut check = Input::new(body);
        while !check.is_empty() {
            check.read_blob()?;
        }
        Ok(Self { body })
    }

    /// The key's components in order, borrowed from the frozen buffer.
    pub fn components(&self) -> Components<'a> {
        Components {
            input: Input::new(self.body),
        }
    }

    /// Copy into an owned [`ClusteringKey`].
    pub fn to_key(&self) -> ClusteringKey {
        ClusteringKey::new(self.components().map(Bytes::copy_from_slice))
    }
}

/// Iterator over the components of a [`ClusteringKeyView`].
pub struct Components<'a> {
    input: Input<'a>,
}

impl<'a> Iterator for Components<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.input.is_empty() {
            return None;
        }
        // Framing was validated at construction.
        self.input.read_blob().ok()
    }
}

/// Borrowed view of one range-tombstone bound.
#[derive(Clone, Copy, Debug)]
pub struct BoundView<'a> {
    /// The clustering prefix the bound compares at.
    pub prefix: ClusteringKeyView<'a>,
    /// Inclusive/exclusive, start/end.
    pub kind: BoundKind,
}

impl<'a> BoundView<'a> {
    fn parse(input: &mut Input<'a>) -> Result<Self> {
        let prefix = ClusteringKeyView::parse(input)?;
        let kind = BoundKind::from_wire(u8::decode(input)?)?;
        Ok(Self { prefix, kind })
    }

    /// Copy into an owned [`RangeBound`].
    pub fn to_bound(&self) -> RangeBound {
        RangeBound {
            prefix: self.prefix.to_key(),
            kind: self.kind,
        }
    }
}

/// Borrowed view of one cell. Value bytes alias the frozen buffer.
#[derive(Clone, Debug)]
pub enum CellView<'a> {
    /// Live atomic value.
    Live {
        /// Write timestamp.
        timestamp: u64,
        /// Optional expiry.
        ttl: Option<CellTtl>,
        /// Opaque value bytes.
        value: &'a [u8],
    },
    /// Deleted atomic cell.
    Dead {
        /// Write timestamp of the deletion.
        timestamp: u64,
        /// Wall-clock deletion time.
        deletion_time: u64,
    },
    /// Live collection with per-element cells.
    Collection {
        /// Deletion marker for the collection as a whole.
        tombstone: Tombstone,
        /// Sub-elements in path order.
        elements: Vec<(&'a [u8], CellView<'a>)>,
    },
}

impl<'a> CellView<'a> {
    fn parse(input: &mut Input<'a>, allow_collection: bool) -> Result<Self> {
        Ok(match u8::decode(input)? {
            CELL_LIVE => CellView::Live {
                timestamp: u64::decode(input)?,
                ttl: Option::<CellTtl>::decode(input)?,
                value: input.read_blob()?,
            },
            CELL_DEAD => CellView::Dead {
                timestamp: u64::decode(input)?,
                deletion_time: u64::decode(input)?,
            },
            CELL_COLLECTION if allow_collection => {
                let tombstone = Tombstone::decode(input)?;
                let count = u32::decode(input)?;
                // Reserve no more than the input could possibly hold; a lying
                // count then fails Truncated on the first short read.
                let mut elements = Vec::with_capacity((count as usize).min(input.remaining()));
                for _ in 0..count {
                    let path = input.read_blob()?;
                    let cell = CellView::parse(input, false)?;
                    elements.push((path, cell));
                }
                CellView::Collection {
                    tombstone,
                    elements,
                }
            }
            CELL_COLLECTION => return Err(CodecError::Malformed("nested collection cell")),
            _ => return Err(CodecError::Malformed("cell kind out of range")),
        })
    }

    /// Copy into an owned [`Cell`].
    pub fn to_cell(&self) -> Cell {
        match self {
            CellView::Live {
                timestamp,
                ttl,
                value,
            } => Cell::Live {
                timestamp: *timestamp,
                ttl: *ttl,
                value: Bytes::copy_from_slice(value),
            },
            CellView::Dead {
                timestamp,
                deletion_time,
            } => Cell::Dead {
                timestamp: *timestamp,
                deletion_time: *deletion_time,
            },
            CellView::Collection {
                tombstone,
                elements,
            } => Cell::Collection {
                tombstone: *tombstone,
                elements: elements
                    .iter()
                    .map(|(path, cell)| (Bytes::copy_from_slice(path), cell.to_cell()))
                    .collect(),
            },
        }
    }
}

/// Borrowed view of one row: marker, row tombstone, and cells in column-id
/// order.
#[derive(Debug)]
pub struct RowView<'a> {
    /// Row liveness marker.
    pub marker: RowMarker,
    /// Row-level tombstone, [`Tombstone::NONE`] when absent.
    pub tombstone: Tombstone,
    cells: Vec<(ColumnId, CellView<'a>)>,
}

impl<'a> RowView<'a> {
    fn parse(input: &mut Input<'a>) -> Result<Self> {
        let marker = RowMarker::decode(input)?;
        let tombstone = Tombstone::decode(input)?;
        let count = u32::decode(input)?;
        let mut cells = Vec::with_capacity((count as usize).min(input.remaining()));
        for _ in 0..count {
            let column = ColumnId::decode(input)?;
            let cell = CellView::parse(input, true)?;
            cells.push((column, cell));
        }
        Ok(Self {
            marker,
            tombstone,
            cells,
        })
    }

    /// The row's cells in column-id order.
    pub fn cells(&self) -> &[(ColumnId, CellView<'a>)] {
        &self.cells
    }
}

/// Callbacks driven by [`PartitionView::accept`], in emission order:
/// partition tombstone, static row, range tombstones, clustering rows.
pub trait PartitionConsumer {
    /// Always invoked first, with [`Tombstone::NONE`] when the partition
    /// carries no partition-level deletion.
    fn accept_partition_tombstone(&mut self, tombstone: Tombstone);

    /// Invoked once if a static row is present.
    fn accept_static_row(&mut self, row: RowView<'_>) -> Result<()>;

    /// Invoked once per clustering row, in clustering order.
    fn accept_row(&mut self, key: ClusteringKeyView<'_>, row: RowView<'_>) -> Result<()>;

    /// Invoked once per range tombstone, in start-bound order.
    fn accept_range_tombstone(
        &mut self,
        start: BoundView<'_>,
        end: BoundView<'_>,
        tombstone: Tombstone,
    ) -> Result<()>;
}

/// Cursor positioned at a frozen partition frame.
#[derive(Clone, Copy, Debug)]
pub struct PartitionView<'a> {
    input: Input<'a>,
}

impl<'a> PartitionView<'a> {
    pub(crate) fn new(input: Input<'a>) -> Self {
        Self { input }
    }

    /// Drive `consumer` across the frame's fragments.
    ///
    /// Unknown bytes after the last known field are skipped, so frames
    /// produced by newer writers still parse.
    pub fn accept<C: PartitionConsumer>(&self, consumer: &mut C) -> Result<()> {
        let mut input = self.input;

        let tombstone = Tombstone::decode(&mut input)?;
        consumer.accept_partition_tombstone(tombstone);

        match u8::decode(&mut input)? {
            0 => {}
            1 => {
                let row = RowView::parse(&mut input)?;
                consumer.accept_static_row(row)?;
            }
            _ => return Err(CodecError::Malformed("static row flag out of range")),
        }

        let rt_count = u32::decode(&mut input)?;
        for _ in 0..rt_count {
            let start = BoundView::parse(&mut input)?;
            let end = BoundView::parse(&mut input)?;
            let tombstone = Tombstone::decode(&mut input)?;
            consumer.accept_range_tombstone(start, end, tombstone)?;
        }

        let row_count = u32::decode(&mut input)?;
        for _ in 0..row_count {
            let key = ClusteringKeyView::parse(&mut input)?;
            let row = RowView::parse(&mut input)?;
            consumer.accept_row(key, row)?;
        }

        Ok(())
    }
}
