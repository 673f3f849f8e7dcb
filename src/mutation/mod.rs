//! The live, in-memory partition model: keys, tombstones, cells, rows, and
//! the [`Mutation`] that binds them to a schema and partition key.

mod cell;
mod key;
mod partition;
mod tombstone;

use std::{fmt, sync::Arc};

pub use cell::{Cell, CellTtl, RowMarker};
pub(crate) use cell::{CELL_COLLECTION, CELL_DEAD, CELL_LIVE};
pub use key::{BoundKind, ClusteringKey, PartitionKey, RangeBound};
pub use partition::{Partition, PartitionBuilder, RangeTombstone, Row};
pub(crate) use partition::insert_range_tombstone;
pub use tombstone::Tombstone;

use crate::schema::{DecoratedKey, Partitioner, Schema};

/// A single-partition write: one table, one partition key, and the delta to
/// apply.
///
/// Mutations are the unit of write replication and durable log entry; the
/// frozen counterpart is [`crate::frozen::FrozenMutation`].
#[derive(Clone, Debug)]
pub struct Mutation {
    schema: Arc<Schema>,
    key: PartitionKey,
    partition: Partition,
}

impl Mutation {
    /// An empty mutation against `key` under `schema`.
    pub fn new(key: PartitionKey, schema: Arc<Schema>) -> Self {
        Self {
            schema,
            key,
            partition: Partition::new(),
        }
    }

    /// The schema the mutation was produced under.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The partition key the delta applies to.
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// The partition delta.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Mutable access to the partition delta.
    pub fn partition_mut(&mut self) -> &mut Partition {
        &mut self.partition
    }

    /// The key decorated with its ring token under `partitioner`.
    pub fn decorated_key(&self, partitioner: &dyn Partitioner) -> DecoratedKey {
        partitioner.decorate_key(&self.schema, &self.key)
    }

    fn fmt_row(&self, f: &mut fmt::Formatter<'_>, row: &Row) -> fmt::Result {
        write!(f, "marker={:?} tombstone=", row.marker)?;
        fmt_tombstone(f, row.tombstone)?;
        for (column, cell) in &row.cells {
            match self.schema.column_by_id(*column) {
                Some(meta) => write!(f, " {}={cell:?}", meta.name)?,
                None => write!(f, " #{column}={cell:?}")?,
            }
        }
        Ok(())
    }
}

fn fmt_tombstone(f: &mut fmt::Formatter<'_>, t: Tombstone) -> fmt::Result {
    if t.is_none() {
        write!(f, "none")
    } else {
        write!(f, "{{ts={}, deletion_time={}}}", t.timestamp, t.deletion_time)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mutation table={} schema={} key={:?}",
            self.schema.id(),
            self.schema.version(),
            self.key.components()
        )?;
        write!(f, "  tombstone: ")?;
        fmt_tombstone(f, self.partition.tombstone())?;
        writeln!(f)?;
        if let Some(row) = self.partition.static_row() {
            write!(f, "  static row: ")?;
            self.fmt_row(f, row)?;
            writeln!(f)?;
        }
        for rt in self.partition.range_tombstones() {
            write!(
                f,
                "  range tombstone: {:?}/{:?} .. {:?}/{:?} ",
                rt.start.prefix.components(),
                rt.start.kind,
                rt.end.prefix.components(),
                rt.end.kind,
            )?;
            fmt_tombstone(f, rt.tombstone)?;
            writeln!(f)?;
        }
        for (key, row) in self.partition.rows() {
            write!(f, "  row {:?}: ", key.components())?;
            self.fmt_row(f, row)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl PartialEq for Mutation {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id() == other.schema.id()
            && self.schema.version() == other.schema.version()
            && self.key == other.key
            && self.partition == other.partition
    }
}

impl Eq for Mutation {}
