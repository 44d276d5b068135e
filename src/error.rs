//! Errors produced while building, decoding or mutating a PIU.

/// Everything that can go wrong when touching a frame.
///
/// No variant is ever returned after a partial write: every operation
/// validates its input before the buffer is modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PiuError {
    /// A buffer handed to a decoder was not exactly one PIU long.
    #[error("invalid PIU length (expected {expected} bytes, got {actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// A byte-range write was given the wrong number of bytes.
    #[error("byte range holds {expected} bytes, got {actual}")]
    InvalidRangeLength { expected: usize, actual: usize },

    /// A scalar does not fit in the field it is written to.
    #[error("value {value:#x} does not fit in {width} bits")]
    InvalidFieldValue { value: u64, width: u32 },

    /// The field name is not part of this frame's layout.
    #[error("{kind} has no field named `{name}`")]
    UnknownField { kind: &'static str, name: String },

    /// A byte offset or range falls outside the 32 byte frame.
    #[error("byte range {start}..{end} is outside the frame")]
    OutOfBounds { start: usize, end: usize },

    /// Sub-byte geometry that cannot describe a field.
    #[error("bit field at offset {bit_offset} with width {width} does not fit in a byte")]
    InvalidBitRange { bit_offset: u8, width: u8 },

    /// A scalar was written to a byte-range field, or the reverse.
    #[error("value has the wrong shape for field `{name}`")]
    FieldTypeMismatch { name: &'static str },

    /// The field is pinned by the CDB kind the command frame was built as.
    #[error("`{name}` is fixed for {kind} command frames")]
    FixedField { kind: &'static str, name: &'static str },

    /// The CDB opcode does not match the command kind it was decoded as.
    #[error("CDB opcode {actual:#04x} does not match expected {expected:#04x}")]
    CdbOpcodeMismatch { expected: u8, actual: u8 },
}

pub type Result<T> = std::result::Result<T, PiuError>;
