use thiserror::Error;

/// Result type used throughout the decoder.
pub type Result<T> = core::result::Result<T, Error>;

/// The category of an [`Error`], without its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Truncated`].
    Truncated,
    /// See [`Error::UnexpectedMarker`].
    UnexpectedMarker,
    /// See [`Error::OutOfRange`].
    OutOfRange,
    /// See [`Error::SegmentLengthMismatch`].
    SegmentLengthMismatch,
    /// See [`Error::MalformedHuffmanTable`].
    MalformedHuffmanTable,
    /// See [`Error::MalformedBlock`].
    MalformedBlock,
    /// See [`Error::Io`].
    Io,
}

/// Describes an error encountered while reading an image.
///
/// Every error is fatal for the decode that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bytes are available than a field or segment declares.
    #[error("Expecting {expected} bytes but {available} was found: index {position}")]
    Truncated {
        /// Bytes the field needed.
        expected: usize,
        /// Bytes left in the input.
        available: usize,
        /// Byte index where the read started.
        position: usize,
    },
    /// A marker that is unknown, or not allowed in the current parser state.
    #[error("Unexpected marker 0x{marker:04x} ({reason}): index {position}")]
    UnexpectedMarker {
        /// The two marker bytes as a big-endian word.
        marker: u16,
        /// Why the marker is rejected here.
        reason: &'static str,
        /// Byte index of the marker.
        position: usize,
    },
    /// A decoded field violates its legal domain.
    #[error("{field} out of range: {value}: index {position}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The value that was read.
        value: u32,
        /// Byte index of the field.
        position: usize,
    },
    /// A segment's declared length differs from what its contents take.
    #[error(
        "Segment {segment} declares {declared} payload bytes but {consumed} were consumed: index {position}"
    )]
    SegmentLengthMismatch {
        /// Marker name of the segment.
        segment: &'static str,
        /// Payload length from the length field.
        declared: usize,
        /// Payload bytes the segment syntax consumed or tried to consume.
        consumed: usize,
        /// Byte index of the segment payload.
        position: usize,
    },
    /// Code-length counts that do not describe a valid canonical code.
    #[error("Malformed Huffman table: {reason}: index {position}")]
    MalformedHuffmanTable {
        /// What is wrong with the table.
        reason: &'static str,
        /// Byte index of the table specification.
        position: usize,
    },
    /// Entropy decoding of one 8x8 block went wrong.
    #[error("Malformed block: {reason}: bit {bit_position}")]
    MalformedBlock {
        /// What is wrong with the block.
        reason: &'static str,
        /// Bit index into the destuffed entropy-coded segment.
        bit_position: usize,
    },
    /// There was an error writing or reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Truncated { .. } => ErrorKind::Truncated,
            Error::UnexpectedMarker { .. } => ErrorKind::UnexpectedMarker,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::SegmentLengthMismatch { .. } => ErrorKind::SegmentLengthMismatch,
            Error::MalformedHuffmanTable { .. } => ErrorKind::MalformedHuffmanTable,
            Error::MalformedBlock { .. } => ErrorKind::MalformedBlock,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns where the error happened. Byte index for parse errors, bit index for
    /// [`Error::MalformedBlock`].
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Truncated { position, .. }
            | Error::UnexpectedMarker { position, .. }
            | Error::OutOfRange { position, .. }
            | Error::SegmentLengthMismatch { position, .. }
            | Error::MalformedHuffmanTable { position, .. } => Some(*position),
            Error::MalformedBlock { bit_position, .. } => Some(*bit_position),
            Error::Io(_) => None,
        }
    }
}
