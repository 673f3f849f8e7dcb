//! Canonical serialization of a partition delta into a frozen partition
//! frame.
//!
//! Both the direct freeze path and the streamed freezer funnel through
//! [`encode_partition_body`], which is what guarantees that the two paths
//! produce byte-equal buffers for equal content.

use bytes::BufMut;

use crate::{
    mutation::{ClusteringKey, Partition, RangeTombstone, Row, Tombstone},
    schema::Schema,
    serdes::Encode,
};

pub(crate) fn partition_body_size<'a, I>(
    static_row: Option<&Row>,
    range_tombstones: &[RangeTombstone],
    rows: I,
) -> usize
where
    I: Iterator<Item = (&'a ClusteringKey, &'a Row)>,
{
    let mut size = 16; // partition tombstone, sentinel included
    size += 1 + static_row.map_or(0, Encode::size);
    size += 4 + range_tombstones.iter().map(Encode::size).sum::<usize>();
    size += 4 + rows
        .map(|(key, row)| key.size() + row.size())
        .sum::<usize>();
    size
}

pub(crate) fn encode_partition_body<'a, W, I>(
    writer: &mut W,
    tombstone: Tombstone,
    static_row: Option<&Row>,
    range_tombstones: &[RangeTombstone],
    rows: I,
) where
    W: BufMut,
    I: ExactSizeIterator<Item = (&'a ClusteringKey, &'a Row)>,
{
    tombstone.encode(writer);

    match static_row {
        None => 0u8.encode(writer),
        Some(row) => {
            1u8.encode(writer);
            row.encode(writer);
        }
    }

    debug_assert!(
        range_tombstones
            .windows(2)
            .all(|pair| pair[0].start <= pair[1].start),
        "range tombstones out of start-bound order"
    );
    (range_tombstones.len() as u32).encode(writer);
    for rt in range_tombstones {
        rt.encode(writer);
    }

    (rows.len() as u32).encode(writer);
    let mut last: Option<&ClusteringKey> = None;
    for (key, row) in rows {
        debug_assert!(
            last.map_or(true, |previous| previous < key),
            "clustering rows out of order or duplicated"
        );
        last = Some(key);
        key.encode(writer);
        row.encode(writer);
    }
}

pub(crate) fn row_columns_known(schema: &Schema, row: &Row) -> bool {
    row.cells
        .keys()
        .all(|column| schema.column_by_id(*column).is_some())
}

/// Walks a live [`Partition`] and emits its fragments in canonical order:
/// partition tombstone, static row, range tombstones, clustering rows.
pub struct PartitionSerializer<'a> {
    schema: &'a Schema,
    partition: &'a Partition,
}

impl<'a> PartitionSerializer<'a> {
    /// Bind a serializer to the partition it walks.
    pub fn new(schema: &'a Schema, partition: &'a Partition) -> Self {
        Self { schema, partition }
    }
}

impl Encode for PartitionSerializer<'_> {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        debug_assert!(
            self.partition
                .static_row()
                .map_or(true, |row| row_columns_known(self.schema, row))
                && self
                    .partition
                    .rows()
                    .values()
                    .all(|row| row_columns_known(self.schema, row)),
            "live mutation references columns missing from its schema"
        );
        encode_partition_body(
            writer,
            self.partition.tombstone(),
            self.partition.static_row(),
            self.partition.range_tombstones(),
            self.partition.rows().iter(),
        );
    }

    fn size(&self) -> usize {
        partition_body_size(
            self.partition.static_row(),
            self.partition.range_tombstones(),
            self.partition.rows().iter(),
        )
    }
}
