/// Errors from container decoding.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid magic bytes: expected {expected:?}, got {got:02X?}")]
    InvalidMagic { expected: &'static str, got: [u8; 4] },

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown cipher suite id: {0}")]
    UnknownCipher(u8),

    #[error("unknown address algorithm id: {0}")]
    UnknownAddressAlgo(u8),

    #[error("container truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("{0} trailing bytes after container end")]
    TrailingBytes(usize),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("field too large for its length prefix: {0} bytes")]
    FieldTooLarge(usize),
}

/// Top-level error type for the crate.
///
/// The taxonomy is deliberately closed: configuration problems surface at
/// construction, type mismatches before any cryptographic call, and every
/// authentication outcome that is not a clean success is `Security`. No
/// operation reports a failed verification as a boolean.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key material is malformed or unusable for the selected cipher suite.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// A secret, counterparty, or argument is incompatible with the current
    /// operation. Raised before any cryptographic work happens.
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),

    /// Signature or MAC verification failed, or an inbound asymmetric payload
    /// matched no known record type. Terminal for the current call.
    #[error("security failure: {0}")]
    Security(&'static str),

    /// Malformed container bytes.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
