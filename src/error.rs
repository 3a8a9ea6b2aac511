//! Error types for the codec layer

use thiserror::Error;

/// Main error type returned by the public entry points
#[derive(Error, Debug)]
pub enum Error {
    /// Encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error from a reader or writer entry point
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec errors
///
/// Every decode-time variant describes structural corruption of the encoded
/// buffer. None of them is transient, so callers should not retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A value exceeds the simple8b maximum of 2^60 - 1
    ///
    /// The integer and timestamp encoders fall back to the uncompressed format
    /// before this can happen, so seeing it from them is an internal bug.
    #[error("Value out of bounds: {value} exceeds the simple8b maximum of 2^60 - 1")]
    ValueOutOfBounds {
        /// The offending value
        value: u64,
    },

    /// Payload length is not a multiple of 8 bytes
    #[error("Invalid length: {len} bytes is not a multiple of 8")]
    InvalidLength {
        /// Length of the offending payload
        len: usize,
    },

    /// Buffer is too short to hold the header or the first value
    #[error("Short buffer: need at least {needed} bytes, got {actual}")]
    ShortBuffer {
        /// Minimum number of bytes required
        needed: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// A varint or element count is malformed or too large
    #[error("Length overflow: {0}")]
    LengthOverflow(String),

    /// A simple8b selector code outside the table
    #[error("Invalid selector: {0}")]
    InvalidSelector(u8),

    /// The packed payload decoded to a different number of values than announced
    #[error("Count mismatch: expected {expected} values, decoded {actual}")]
    CountMismatch {
        /// Number of values the destination was sized for
        expected: usize,
        /// Number of values actually produced
        actual: usize,
    },

    /// Header format tag is not valid for this codec
    #[error("Unknown encoding: format tag {tag}")]
    UnknownEncoding {
        /// The format tag found in the header
        tag: u8,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_converts_into_error() {
        let err: Error = CodecError::UnknownEncoding { tag: 7 }.into();
        assert!(matches!(
            err,
            Error::Codec(CodecError::UnknownEncoding { tag: 7 })
        ));
        assert_eq!(err.to_string(), "Codec error: Unknown encoding: format tag 7");
    }

    #[test]
    fn test_short_buffer_message() {
        let err = CodecError::ShortBuffer {
            needed: 9,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Short buffer: need at least 9 bytes, got 2");
    }
}
