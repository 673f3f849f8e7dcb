//! The frozen mutation: a single-partition write flattened into an opaque,
//! immutable byte buffer, ready for the replication wire, the commit log, or
//! a hint queue.
//!
//! Layout: `u32 total_len | table_id | schema_version | partition_key |
//! partition frame`. The outer length and the partition frame length let
//! readers skip unknown trailing data, so newer writers stay readable.

pub(crate) mod freezer;
pub(crate) mod serializer;
pub mod view;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use bytes::{Bytes, BytesMut};
use tracing::trace;

pub use freezer::{freeze_stream, Consume, MutationFragment, StreamedMutationFreezer};
pub use serializer::PartitionSerializer;

use crate::{
    error::{CodecError, Result},
    frozen::view::PartitionView,
    mutation::{Mutation, PartitionBuilder, PartitionKey},
    schema::{DecoratedKey, Partitioner, Schema, SchemaVersion, TableId},
    serdes::{encode_frame, Decode, Encode, Input},
};

pub(crate) fn write_envelope(
    table_id: TableId,
    schema_version: SchemaVersion,
    key: &PartitionKey,
    partition_body: &impl Encode,
) -> Bytes {
    let body_size = 16 + 16 + key.size() + 4 + partition_body.size();
    let mut buf = BytesMut::with_capacity(4 + body_size);
    (body_size as u32).encode(&mut buf);
    table_id.encode(&mut buf);
    schema_version.encode(&mut buf);
    key.encode(&mut buf);
    encode_frame(&mut buf, partition_body);
    buf.freeze()
}

/// A mutation flattened into its canonical byte form.
///
/// The envelope owns its buffer and a pre-parsed copy of the partition key;
/// key access is O(1) because routing touches it on every replica-side
/// dispatch, while the uuid accessors stay lazy cursor reads. The buffer is
/// immutable after construction; share an envelope by `Arc` or by cloning
/// the cheap [`Bytes`] handle, never by aliasing raw bytes.
#[derive(Clone, Debug)]
pub struct FrozenMutation {
    bytes: Bytes,
    key: PartitionKey,
}

impl FrozenMutation {
    /// Freeze a live mutation. See also the [`freeze`] free function.
    pub fn from_mutation(mutation: &Mutation) -> Self {
        let schema = mutation.schema();
        let serializer = PartitionSerializer::new(schema, mutation.partition());
        let bytes = write_envelope(schema.id(), schema.version(), mutation.key(), &serializer);
        trace!(len = bytes.len(), table = %schema.id(), "froze mutation");
        Self {
            bytes,
            key: mutation.key().clone(),
        }
    }

    /// Adopt a received buffer whose partition key the caller already decoded
    /// for routing. No parsing happens here.
    pub fn from_wire(bytes: Bytes, key: PartitionKey) -> Self {
        Self { bytes, key }
    }

    /// Adopt a received buffer, parsing the envelope just far enough to
    /// extract and cache the partition key.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut input = Input::new(&bytes).read_frame()?;
        input.take(32)?; // table id + schema version
        let key = PartitionKey::decode(&mut input)?;
        Ok(Self { bytes, key })
    }

    /// The raw frozen buffer.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    fn header(&self) -> Result<Input<'_>> {
        Input::new(&self.bytes).read_frame()
    }

    /// The table the mutation targets. Lazy cursor read, no allocation.
    pub fn table_id(&self) -> Result<TableId> {
        TableId::decode(&mut self.header()?)
    }

    /// The schema version the mutation was produced under. Lazy cursor read.
    pub fn schema_version(&self) -> Result<SchemaVersion> {
        let mut input = self.header()?;
        input.take(16)?;
        SchemaVersion::decode(&mut input)
    }

    /// The partition key, backed by the cached copy. O(1).
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// The key decorated with its ring token under `partitioner`.
    pub fn decorated_key(&self, schema: &Schema, partitioner: &dyn Partitioner) -> DecoratedKey {
        partitioner.decorate_key(schema, &self.key)
    }

    /// A read-only view positioned at the partition frame.
    pub fn partition(&self) -> Result<PartitionView<'_>> {
        let mut input = self.header()?;
        input.take(32)?;
        input.read_blob()?; // partition key, already cached
        Ok(PartitionView::new(input.read_frame()?))
    }

    /// Rebuild the live mutation under `schema`.
    ///
    /// Fails with [`CodecError::SchemaVersionMissing`] when `schema` is not
    /// the version the buffer was frozen under; the caller decides whether to
    /// refetch the schema and retry.
    pub fn unfreeze(&self, schema: Arc<Schema>) -> Result<Mutation> {
        let version = self.schema_version()?;
        if version != schema.version() {
            return Err(CodecError::SchemaVersionMissing { version });
        }
        let view = self.partition()?;
        let mut mutation = Mutation::new(self.key.clone(), Arc::clone(&schema));
        let mut builder = PartitionBuilder::new(&schema, mutation.partition_mut());
        view.accept(&mut builder)?;
        trace!(len = self.bytes.len(), "thawed mutation");
        Ok(mutation)
    }

    /// A debug renderer that thaws the envelope and defers to the live
    /// mutation's formatter.
    pub fn pretty(&self, schema: Arc<Schema>) -> Printer<'_> {
        Printer {
            frozen: self,
            schema,
        }
    }
}

/// Two envelopes are equal iff their buffers are byte-for-byte equal; the
/// canonical ordering of the inner sequences is what makes this meaningful.
impl PartialEq for FrozenMutation {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for FrozenMutation {}

impl Hash for FrozenMutation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state)
    }
}

/// Freeze a live mutation into its canonical byte form.
pub fn freeze(mutation: &Mutation) -> FrozenMutation {
    FrozenMutation::from_mutation(mutation)
}

/// Debug renderer for a [`FrozenMutation`]; not performance sensitive.
pub struct Printer<'a> {
    frozen: &'a FrozenMutation,
    schema: Arc<Schema>,
}

impl fmt::Display for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frozen.unfreeze(Arc::clone(&self.schema)) {
            Ok(mutation) => fmt::Display::fmt(&mutation, f),
            Err(error) => write!(f, "<frozen mutation unprintable: {error}>"),
        }
    }
}
