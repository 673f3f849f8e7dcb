//! Frozen mutation codec for a partitioned, schema-ful wide-column store.
//!
//! A mutation is the unit of write replication and durable log entry: one
//! table, one partition, and the delta to apply. This crate provides the
//! compact, self-describing binary form of that delta, plus the adapters
//! between it and the live in-memory partition model:
//!
//! - [`freeze`] walks a live [`mutation::Mutation`] and emits the canonical
//!   byte buffer.
//! - [`freeze_stream`] consumes an ordered stream of
//!   [`frozen::MutationFragment`]s and emits the same buffer without ever
//!   materializing a live partition.
//! - [`frozen::FrozenMutation::unfreeze`] rebuilds the live mutation by
//!   driving a visitor over the buffer.
//! - The envelope accessors answer metadata queries (table id, schema
//!   version, partition key) straight from the buffer, without allocating.
//!
//! The codec performs no I/O and never suspends mid-operation; equal
//! mutations freeze to byte-equal buffers, so frozen buffers can be compared
//! and hashed between replicas directly.

pub mod error;

/// The frozen byte form: envelope, serializer, view/visitor, and the
/// streaming freezer.
pub mod frozen;

/// The live, in-memory partition model.
pub mod mutation;

/// Schema, identifier, and partitioner collaborator surface.
pub mod schema;

/// Byte-stream primitives: little-endian framing over borrowed cursors.
pub mod serdes;

pub use crate::{
    error::CodecError,
    frozen::{freeze, freeze_stream, FrozenMutation},
    mutation::Mutation,
    schema::Schema,
};
