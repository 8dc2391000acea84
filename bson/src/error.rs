/*!
The error type shared by the decode and encode engines.

Raising accessors such as `get` return these directly; `lookup`, `contains`
and `validate` never produce them.
*/

use super::tag::Tag;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No entry exists for the requested key or index.
    #[error("Key or index not present in document")]
    OutOfRange,

    /// The entry exists, but its wire tag is not the one the requested type targets.
    #[error("Incorrect type: expected {expected}, found tag {found:#04x}")]
    BadCast { expected: Tag, found: u8 },

    /// A node has an unsupported tag, an inconsistent length or truncated data.
    #[error("Malformed document")]
    MalformedDocument,

    /// The serialization target is not exactly the computed size.
    #[error("Target capacity {actual} does not match computed size {expected}")]
    CapacityMismatch { expected: usize, actual: usize },

    /// A builder key is empty or contains the `0x00` terminator.
    #[error("Key is empty or contains a terminator byte")]
    InvalidKey,

    /// The document cannot be framed by an `i32` length field.
    #[error("Document of {0} bytes exceeds the maximum encodable size")]
    DocumentTooLarge(usize),
}
