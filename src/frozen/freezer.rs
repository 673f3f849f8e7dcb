//! Incremental freezing of a fragment stream, without materializing a live
//! partition first.
//!
//! The upstream source yields fragments in canonical order: partition
//! tombstone, static row, then clustering rows interleaved with
//! range-tombstone begin/end pairs. The freezer accumulates them and emits
//! exactly one [`FrozenMutation`] at end-of-stream. Protocol violations
//! (an unmatched range-tombstone end, a stream ending inside an open range)
//! are programmer errors and abort via assertion rather than surfacing as
//! wire errors.

use std::sync::Arc;

use bytes::BufMut;
use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tracing::debug;

use crate::{
    frozen::{
        serializer::{encode_partition_body, partition_body_size},
        write_envelope, FrozenMutation,
    },
    mutation::{
        insert_range_tombstone, ClusteringKey, PartitionKey, RangeBound, RangeTombstone, Row,
        Tombstone,
    },
    schema::Schema,
    serdes::Encode,
};

/// One element of a streamed partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationFragment {
    /// Partition-level deletion; arrives first when present.
    PartitionTombstone(Tombstone),
    /// The static row; arrives before any clustering row.
    StaticRow(Row),
    /// One clustering row; rows arrive in clustering order.
    ClusteringRow {
        /// The row's clustering key.
        key: ClusteringKey,
        /// The row contents.
        row: Row,
    },
    /// Opens a range tombstone; at most one may be open at a time.
    RangeTombstoneBegin {
        /// The start bound.
        bound: RangeBound,
        /// The deletion the range carries.
        tombstone: Tombstone,
    },
    /// Closes the currently open range tombstone.
    RangeTombstoneEnd {
        /// The end bound.
        bound: RangeBound,
    },
}

/// Signal returned by each `consume` call: whether the upstream source
/// should keep feeding fragments. The freezer always continues until
/// end-of-stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consume {
    /// Keep feeding fragments.
    Continue,
    /// Stop feeding fragments; end-of-stream then freezes whatever was
    /// consumed so far.
    Stop,
}

/// Accumulates a fragment stream into one frozen mutation.
///
/// A short-lived local: the partition key is captured at construction, the
/// open range-tombstone begin is the only cross-fragment state, and dropping
/// the freezer before [`consume_end_of_stream`](Self::consume_end_of_stream)
/// abandons the partial state with nothing to clean up.
pub struct StreamedMutationFreezer {
    schema: Arc<Schema>,
    key: PartitionKey,
    partition_tombstone: Tombstone,
    static_row: Option<Row>,
    rows: Vec<(ClusteringKey, Row)>,
    range_tombstones: Vec<RangeTombstone>,
    open_begin: Option<(RangeBound, Tombstone)>,
}

impl StreamedMutationFreezer {
    /// A freezer for one partition of `schema` at `key`.
    pub fn new(schema: Arc<Schema>, key: PartitionKey) -> Self {
        Self {
            schema,
            key,
            partition_tombstone: Tombstone::NONE,
            static_row: None,
            rows: Vec::new(),
            range_tombstones: Vec::new(),
            open_begin: None,
        }
    }

    /// Feed one fragment.
    pub fn consume(&mut self, fragment: MutationFragment) -> Consume {
        match fragment {
            MutationFragment::PartitionTombstone(tombstone) => {
                debug_assert!(
                    self.static_row.is_none() && self.rows.is_empty(),
                    "partition tombstone must arrive first"
                );
                self.partition_tombstone = tombstone;
            }
            MutationFragment::StaticRow(row) => {
                debug_assert!(
                    self.rows.is_empty(),
                    "static row must precede clustering rows"
                );
                self.static_row = Some(row);
            }
            MutationFragment::ClusteringRow { key, row } => {
                debug_assert!(
                    self.rows.last().map_or(true, |(last, _)| *last < key),
                    "clustering rows out of order or duplicated"
                );
                self.rows.push((key, row));
            }
            MutationFragment::RangeTombstoneBegin { bound, tombstone } => {
                assert!(
                    self.open_begin.is_none(),
                    "range tombstone begin while another range is open"
                );
                self.open_begin = Some((bound, tombstone));
            }
            MutationFragment::RangeTombstoneEnd { bound } => {
                let (start, tombstone) = self
                    .open_begin
                    .take()
                    .expect("range tombstone end without an open begin");
                insert_range_tombstone(
                    &mut self.range_tombstones,
                    RangeTombstone {
                        start,
                        end: bound,
                        tombstone,
                    },
                );
            }
        }
        Consume::Continue
    }

    /// Emit the frozen mutation. The stream must not end inside an open
    /// range tombstone.
    pub fn consume_end_of_stream(self) -> FrozenMutation {
        assert!(
            self.open_begin.is_none(),
            "fragment stream ended inside an open range tombstone"
        );
        debug!(
            rows = self.rows.len(),
            range_tombstones = self.range_tombstones.len(),
            "freezing streamed mutation"
        );
        let body = FragmentBody {
            tombstone: self.partition_tombstone,
            static_row: self.static_row.as_ref(),
            range_tombstones: &self.range_tombstones,
            rows: &self.rows,
        };
        let bytes = write_envelope(self.schema.id(), self.schema.version(), &self.key, &body);
        FrozenMutation::from_wire(bytes, self.key)
    }
}

/// Serializes the freezer's accumulators through the same body writer the
/// direct freeze path uses.
struct FragmentBody<'a> {
    tombstone: Tombstone,
    static_row: Option<&'a Row>,
    range_tombstones: &'a [RangeTombstone],
    rows: &'a [(ClusteringKey, Row)],
}

impl Encode for FragmentBody<'_> {
    fn encode<W: BufMut>(&self, writer: &mut W) {
        encode_partition_body(
            writer,
            self.tombstone,
            self.static_row,
            self.range_tombstones,
            self.rows.iter().map(|(key, row)| (key, row)),
        );
    }

    fn size(&self) -> usize {
        partition_body_size(
            self.static_row,
            self.range_tombstones,
            self.rows.iter().map(|(key, row)| (key, row)),
        )
    }
}

/// Freeze a streamed mutation: drive a [`StreamedMutationFreezer`] over
/// `fragments` and emit one frozen mutation at end-of-stream. A
/// [`Consume::Stop`] from the freezer ends the drive early and freezes the
/// fragments consumed up to that point.
///
/// The only suspension points are the fragment boundaries; cancelling the
/// stream before it ends abandons the partial state and emits nothing.
pub async fn freeze_stream<S>(
    schema: Arc<Schema>,
    key: PartitionKey,
    fragments: S,
) -> FrozenMutation
where
    S: Stream<Item = MutationFragment>,
{
    let mut freezer = StreamedMutationFreezer::new(schema, key);
    pin_mut!(fragments);
    while let Some(fragment) = fragments.next().await {
        if let Consume::Stop = freezer.consume(fragment) {
            break;
        }
    }
    freezer.consume_end_of_stream()
}
