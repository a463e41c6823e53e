//! Error types for the Tradfri codec

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec error types
#[derive(Error, Debug)]
pub enum Error {
    /// Reference array and value array differ in length
    #[error("cannot serialize {property}: reference has {expected} items, value has {actual}")]
    ArrayLengthMismatch {
        property: String,
        expected: usize,
        actual: usize,
    },

    /// Reference value for an array property is not an array
    #[error("cannot serialize {property}: reference value is not an array")]
    ReferenceNotArray { property: String },

    /// Payload decoded to something other than a map
    #[error("payload is not a wire object")]
    NotAnObject,

    /// JSON encoding error
    #[error("encode error: {0}")]
    EncodeError(String),

    /// JSON decoding error
    #[error("decode error: {0}")]
    DecodeError(String),
}
