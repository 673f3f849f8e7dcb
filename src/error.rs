use thiserror::Error;

use crate::schema::SchemaVersion;

/// Errors surfaced by the codec.
///
/// The codec never retries, logs, or swallows a failure; every variant is
/// returned to the caller, which owns the recovery policy (drop the message,
/// request a resend, quarantine the log segment).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before a declared length was satisfied.
    #[error("truncated input: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the current read required.
        needed: usize,
        /// Bytes left in the input when the read was attempted.
        remaining: usize,
    },
    /// A tag byte or sentinel was out of range. Indicates wire corruption.
    #[error("malformed input: {0}")]
    Malformed(&'static str),
    /// A serialized column id is absent from the supplied schema.
    #[error("column {column_id} is not present in the schema")]
    SchemaMismatch {
        /// The unresolvable column id.
        column_id: u32,
    },
    /// The frozen buffer was produced under a schema version the caller
    /// cannot resolve.
    #[error("schema version {version} cannot be resolved")]
    SchemaVersionMissing {
        /// The version recorded in the frozen envelope.
        version: SchemaVersion,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
