use std::collections::BTreeMap;

use bytes::BufMut;

use crate::{
    error::{CodecError, Result},
    frozen::view::{BoundView, CellView, ClusteringKeyView, PartitionConsumer, RowView},
    mutation::{Cell, ClusteringKey, RangeBound, RowMarker, Tombstone},
    schema::{ColumnId, Schema},
    serdes::Encode,
};

/// One row of cells: a liveness marker, a row-level tombstone, and cells in
/// column-id order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// Row liveness marker.
    pub marker: RowMarker,
    /// Row-level deletion marker, [`Tombstone::NONE`] when absent.
    pub tombstone: Tombstone,
    /// Cells keyed by column id; the map order is the canonical wire order.
    pub cells: BTreeMap<ColumnId, Cell>,
}

impl Row {
    /// An empty row with no marker and no tombstone.
    pub fn new() -> Self {
        Self {
            marker: RowMarker::None,
            tombstone: Tombstone::NONE,
            cells: BTreeMap::new(),
        }
    }

    /// Set the cell of `column`, replacing any previous write.
    pub fn set_cell(&mut self, column: ColumnId, cell: Cell) -> &mut Self {
        self.cells.insert(column, cell);
        self
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

impl Encode for Row {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.marker.encode(writer);
        self.tombstone.encode(writer);
        (self.cells.len() as u32).encode(writer);
        for (column, cell) in &self.cells {
            column.encode(writer);
            cell.encode(writer);
        }
    }

    fn size(&self) -> usize {
        self.marker.size()
            + self.tombstone.size()
            + 4
            + self
                .cells
                .iter()
                .map(|(_, cell)| 4 + cell.size())
                .sum::<usize>()
    }
}

/// Deletion marker covering a contiguous clustering-key interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeTombstone {
    /// Where the interval opens.
    pub start: RangeBound,
    /// Where the interval closes.
    pub end: RangeBound,
    /// The deletion itself.
    pub tombstone: Tombstone,
}

impl Encode for RangeTombstone {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        self.start.encode(writer);
        self.end.encode(writer);
        self.tombstone.encode(writer);
    }

    fn size(&self) -> usize {
        self.start.size() + self.end.size() + self.tombstone.size()
    }
}

/// Insert `rt` keeping the list sorted by start bound. Equal starts keep
/// arrival order; overlap is allowed, the read path resolves it.
pub(crate) fn insert_range_tombstone(list: &mut Vec<RangeTombstone>, rt: RangeTombstone) {
    let at = list.partition_point(|existing| existing.start <= rt.start);
    list.insert(at, rt);
}

/// The delta applied to one partition: a partition-level tombstone, an
/// optional static row, range tombstones in start-bound order, and clustering
/// rows in clustering order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    tombstone: Tombstone,
    static_row: Option<Row>,
    range_tombstones: Vec<RangeTombstone>,
    rows: BTreeMap<ClusteringKey, Row>,
}

impl Partition {
    /// An empty partition delta.
    pub fn new() -> Self {
        Self {
            tombstone: Tombstone::NONE,
            static_row: None,
            range_tombstones: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    /// The partition-level tombstone, [`Tombstone::NONE`] when absent.
    pub fn tombstone(&self) -> Tombstone {
        self.tombstone
    }

    /// The static row, if any cells were written to it.
    pub fn static_row(&self) -> Option<&Row> {
        self.static_row.as_ref()
    }

    /// Range tombstones in start-bound order.
    pub fn range_tombstones(&self) -> &[RangeTombstone] {
        &self.range_tombstones
    }

    /// Clustering rows in clustering order.
    pub fn rows(&self) -> &BTreeMap<ClusteringKey, Row> {
        &self.rows
    }

    /// Whether the delta carries no writes at all.
    pub fn is_empty(&self) -> bool {
        self.tombstone.is_none()
            && self.static_row.is_none()
            && self.range_tombstones.is_empty()
            && self.rows.is_empty()
    }

    /// Apply a partition-level deletion.
    pub fn apply_tombstone(&mut self, tombstone: Tombstone) {
        self.tombstone = tombstone;
    }

    /// Replace the static row.
    pub fn set_static_row(&mut self, row: Row) {
        self.static_row = Some(row);
    }

    /// Mutable access to the row at `key`, inserting an empty one if absent.
    pub fn row_mut(&mut self, key: ClusteringKey) -> &mut Row {
        self.rows.entry(key).or_default()
    }

    /// Insert a full row at `key`. Duplicate keys are a caller error.
    pub fn insert_row(&mut self, key: ClusteringKey, row: Row) {
        let previous = self.rows.insert(key, row);
        debug_assert!(previous.is_none(), "duplicate clustering row");
    }

    /// Apply a range deletion, keeping start-bound order.
    pub fn apply_range_tombstone(&mut self, rt: RangeTombstone) {
        debug_assert!(rt.start.kind.is_start() && !rt.end.kind.is_start());
        insert_range_tombstone(&mut self.range_tombstones, rt);
    }
}

// Not derived: the absent tombstone is the all-ones sentinel, not zero.
impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}

/// [`PartitionConsumer`] that rebuilds a live [`Partition`] from the frozen
/// form, copying every borrowed view into owned cells.
///
/// The builder owns the column-id policy: ids missing from its schema fail
/// with [`CodecError::SchemaMismatch`]. A consumer that tolerates dropped
/// columns can skip them instead.
pub struct PartitionBuilder<'a> {
    schema: &'a Schema,
    partition: &'a mut Partition,
}

impl<'a> PartitionBuilder<'a> {
    /// Bind a builder to the partition it fills.
    pub fn new(schema: &'a Schema, partition: &'a mut Partition) -> Self {
        Self { schema, partition }
    }

    fn build_row(&self, view: &RowView<'_>) -> Result<Row> {
        let mut row = Row::new();
        row.marker = view.marker;
        row.tombstone = view.tombstone;
        for (column, cell) in view.cells() {
            if self.schema.column_by_id(*column).is_none() {
                return Err(CodecError::SchemaMismatch { column_id: *column });
            }
            row.cells.insert(*column, cell.to_cell());
        }
        Ok(row)
    }
}

impl PartitionConsumer for PartitionBuilder<'_> {
    fn accept_partition_tombstone(&mut self, tombstone: Tombstone) {
        self.partition.tombstone = tombstone;
    }

    fn accept_static_row(&mut self, row: RowView<'_>) -> Result<()> {
        let row = self.build_row(&row)?;
        self.partition.static_row = Some(row);
        Ok(())
    }

    fn accept_row(&mut self, key: ClusteringKeyView<'_>, row: RowView<'_>) -> Result<()> {
        let row = self.build_row(&row)?;
        self.partition.rows.insert(key.to_key(), row);
        Ok(())
    }

    fn accept_range_tombstone(
        &mut self,
        start: BoundView<'_>,
        end: BoundView<'_>,
        tombstone: Tombstone,
    ) -> Result<()> {
        insert_range_tombstone(
            &mut self.partition.range_tombstones,
            RangeTombstone {
                start: start.to_bound(),
                end: end.to_bound(),
                tombstone,
            },
        );
        Ok(())
    }
}

// CellView -> Cell conversion lives with the view type in `frozen::view`;
// the builder only decides the column-id policy above.
