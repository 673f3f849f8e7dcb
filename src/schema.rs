//! Schema collaborator surface: table and schema-version identifiers, column
//! metadata, and the partitioner seam.
//!
//! The codec treats the schema as read-only shared state (`Arc<Schema>`); the
//! catalog that resolves a version to a schema lives outside this crate.

use std::{collections::BTreeMap, fmt};

use bytes::BufMut;
use ulid::Ulid;

use crate::{
    error::Result,
    mutation::PartitionKey,
    serdes::{Decode, Encode, Input},
};

/// Identifier of a column within one schema version.
pub type ColumnId = u32;

macro_rules! implement_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Rebuild an identifier from its 16-byte wire form.
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Ulid::from_bytes(bytes))
            }

            /// The 16-byte wire form.
            pub fn to_bytes(self) -> [u8; 16] {
                self.0.to_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl Encode for $name {
            fn encode<W: BufMut>(&self, writer: &mut W) {
                writer.put_slice(&self.to_bytes());
            }

            fn size(&self) -> usize {
                16
            }
        }

        impl<'a> Decode<'a> for $name {
            fn decode(input: &mut Input<'a>) -> Result<Self> {
                let bytes = input.take(16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                Ok(Self::from_bytes(raw))
            }
        }
    };
}

implement_id!(TableId, "16-byte identifier naming a table.");
implement_id!(
    SchemaVersion,
    "16-byte identifier naming one exact column layout of a table."
);

/// Whether a column lives in the static row or under clustering keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Partition-level column, not under any clustering key.
    Static,
    /// Regular column addressed by clustering key.
    Regular,
}

/// Metadata for a single column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Human-readable column name.
    pub name: String,
    /// Static or regular placement.
    pub kind: ColumnKind,
}

impl ColumnMeta {
    /// A regular column named `name`.
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Regular,
        }
    }

    /// A static column named `name`.
    pub fn statik(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Static,
        }
    }
}

/// One exact column layout of one table.
///
/// Clustering keys compare lexicographically over their components, so the
/// schema carries no explicit comparator state.
#[derive(Debug)]
pub struct Schema {
    id: TableId,
    version: SchemaVersion,
    columns: BTreeMap<ColumnId, ColumnMeta>,
}

impl Schema {
    /// Build a schema from its identifiers and column set.
    pub fn new(
        id: TableId,
        version: SchemaVersion,
        columns: impl IntoIterator<Item = (ColumnId, ColumnMeta)>,
    ) -> Self {
        Self {
            id,
            version,
            columns: columns.into_iter().collect(),
        }
    }

    /// Identifier of the table this schema describes.
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Identifier of this exact column layout.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Look up column metadata by wire id.
    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnMeta> {
        self.columns.get(&id)
    }
}

/// Token assigned to a partition key by a partitioner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u64);

/// Partition key augmented with its token under the cluster's partitioner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoratedKey {
    /// Ring position of the key.
    pub token: Token,
    /// The key itself.
    pub key: PartitionKey,
}

/// Token assignment for partition keys. Implemented outside this crate.
pub trait Partitioner {
    /// Assign `key` its ring token under `schema`.
    fn decorate_key(&self, schema: &Schema, key: &PartitionKey) -> DecoratedKey;
}
