//! Definitions of error related things.

use thiserror::Error;

/// Errors of the LZF block codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LzfError {
    /// The compressed stream ended in the middle of an instruction
    #[error("compressed stream truncated at byte {position}")]
    TruncatedInput { position: usize },
    /// An instruction would write past the declared output length
    #[error("output overflow: {needed} bytes needed but only {capacity} declared")]
    OutputOverflow { needed: usize, capacity: usize },
    /// A back-reference points before the start of the output
    #[error("back-reference of offset {offset} at output position {position}")]
    InvalidBackReference { offset: usize, position: usize },
    /// The stream decoded fine but not to the declared length
    #[error("decompressed {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    /// The output buffer cannot hold even a literal copy of the input
    #[error("output buffer of {capacity} bytes too small for {input_len} input bytes")]
    OutputTooSmall { input_len: usize, capacity: usize },
    /// Block lengths are stored on 32 bits
    #[error("block of {0} bytes does not fit a 32 bit length prefix")]
    InputTooLarge(usize),
}

/// Errors of this crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PcdError {
    /// Wrapper around an io error from the std lib
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The header could not be parsed, or has no DATA line
    #[error("malformed header: {0}")]
    HeaderMalformed(String),
    /// The DATA line names an encoding that is not known
    #[error("unsupported encoding: {0:?}")]
    UnsupportedEncoding(String),
    /// The binary_compressed block is corrupt
    #[error("LZF decompression failed: {0}")]
    DecompressionFailed(#[source] LzfError),
    /// The binary_compressed block could not be produced
    #[error("LZF compression failed: {0}")]
    CompressionFailed(#[source] LzfError),
    /// The decompressed block is smaller than what the header describes
    #[error("payload holds {actual} bytes but the header requires {expected}")]
    PayloadSizeMismatch { expected: usize, actual: usize },
    /// Columns do not agree with the fields or with each other
    #[error("inconsistent columns: {0}")]
    InconsistentColumns(String),
}
