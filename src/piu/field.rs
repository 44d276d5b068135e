//! Closed field tables.
//!
//! Each frame kind describes its logical fields with a static slice of
//! [`FieldSpec`]s. An entry never stores a value; it only knows where in the
//! [`FrameBuffer`] the value lives and how wide it is, and reads or writes
//! it on demand.
//!
//! The typed field descriptors ([`ByteField`], [`BitField`], ...) can only
//! be built through `const fn` constructors that assert their geometry, so
//! a table that compiles can never address a byte outside the frame.

use tracing::trace;

use super::buffer::{FrameBuffer, PIU_SIZE};
use crate::error::{PiuError, Result};

/// A whole byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteField(usize);

impl ByteField {
    pub const fn new(offset: usize) -> Self {
        assert!(offset < PIU_SIZE, "byte field outside the frame");
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0
    }

    pub fn get(self, buffer: &FrameBuffer) -> u8 {
        buffer.bytes()[self.0]
    }

    pub fn set(self, buffer: &mut FrameBuffer, value: u8) {
        buffer.bytes_mut()[self.0] = value;
    }
}

/// `width` bits of one byte, starting at `bit_offset` (bit 0 is the LSB).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    byte: usize,
    bit_offset: u8,
    width: u8,
}

impl BitField {
    pub const fn new(byte: usize, bit_offset: u8, width: u8) -> Self {
        assert!(byte < PIU_SIZE, "bit field outside the frame");
        assert!(width >= 1 && width <= 8, "bit field width must be 1..=8");
        assert!(bit_offset + width <= 8, "bit field crosses a byte boundary");
        Self {
            byte,
            bit_offset,
            width,
        }
    }

    pub const fn width(self) -> u8 {
        self.width
    }

    /// The largest value the field can hold.
    pub const fn max(self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    pub fn get(self, buffer: &FrameBuffer) -> u8 {
        (buffer.bytes()[self.byte] >> self.bit_offset) & self.max()
    }

    /// Fails with [`PiuError::InvalidFieldValue`] if `value` needs more than
    /// `width` bits; the buffer is untouched in that case.
    pub fn set(self, buffer: &mut FrameBuffer, value: u8) -> Result<()> {
        buffer.set_bits(self.byte, self.bit_offset, self.width, value)
    }
}

/// A big-endian `u16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U16Field(usize);

impl U16Field {
    pub const fn new(offset: usize) -> Self {
        assert!(offset + 2 <= PIU_SIZE, "u16 field outside the frame");
        Self(offset)
    }

    pub fn get(self, buffer: &FrameBuffer) -> u16 {
        let b = buffer.bytes();
        u16::from_be_bytes([b[self.0], b[self.0 + 1]])
    }

    pub fn set(self, buffer: &mut FrameBuffer, value: u16) {
        buffer.bytes_mut()[self.0..self.0 + 2].copy_from_slice(&value.to_be_bytes());
    }
}

/// A big-endian `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U32Field(usize);

impl U32Field {
    pub const fn new(offset: usize) -> Self {
        assert!(offset + 4 <= PIU_SIZE, "u32 field outside the frame");
        Self(offset)
    }

    pub fn get(self, buffer: &FrameBuffer) -> u32 {
        let b = buffer.bytes();
        u32::from_be_bytes([b[self.0], b[self.0 + 1], b[self.0 + 2], b[self.0 + 3]])
    }

    pub fn set(self, buffer: &mut FrameBuffer, value: u32) {
        buffer.bytes_mut()[self.0..self.0 + 4].copy_from_slice(&value.to_be_bytes());
    }
}

/// A raw run of bytes, `start..end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeField {
    start: usize,
    end: usize,
}

impl RangeField {
    pub const fn new(start: usize, end: usize) -> Self {
        assert!(start < end && end <= PIU_SIZE, "range field outside the frame");
        Self { start, end }
    }

    pub fn get(self, buffer: &FrameBuffer) -> &[u8] {
        &buffer.bytes()[self.start..self.end]
    }

    /// Fails with [`PiuError::InvalidRangeLength`] unless `bytes` exactly
    /// covers the range.
    pub fn set(self, buffer: &mut FrameBuffer, bytes: &[u8]) -> Result<()> {
        buffer.set_range(self.start, self.end, bytes)
    }
}

/// Where a field lives in the frame, and what shape it has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Byte(ByteField),
    Bits(BitField),
    U16(U16Field),
    U32(U32Field),
    Range(RangeField),
}

/// The value of a field, as read from or written to a frame by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Int(_) => None,
            FieldValue::Bytes(b) => Some(b),
        }
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::Bytes(value.to_vec())
    }
}

/// One named entry of a frame's field table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub location: Location,
}

impl FieldSpec {
    pub const fn new(name: &'static str, location: Location) -> Self {
        Self { name, location }
    }

    pub fn read(&self, buffer: &FrameBuffer) -> FieldValue {
        match self.location {
            Location::Byte(f) => f.get(buffer).into(),
            Location::Bits(f) => f.get(buffer).into(),
            Location::U16(f) => f.get(buffer).into(),
            Location::U32(f) => f.get(buffer).into(),
            Location::Range(f) => FieldValue::Bytes(f.get(buffer).to_vec()),
        }
    }

    /// Writes `value` into exactly the bits this field occupies.
    pub fn write(&self, buffer: &mut FrameBuffer, value: &FieldValue) -> Result<()> {
        trace!(field = self.name, ?value, "writing field");
        match (self.location, value) {
            (Location::Byte(f), FieldValue::Int(v)) => f.set(buffer, narrow(*v, 8)?),
            (Location::Bits(f), FieldValue::Int(v)) => f.set(buffer, narrow(*v, f.width().into())?)?,
            (Location::U16(f), FieldValue::Int(v)) => f.set(buffer, narrow(*v, 16)?),
            (Location::U32(f), FieldValue::Int(v)) => f.set(buffer, narrow(*v, 32)?),
            (Location::Range(f), FieldValue::Bytes(b)) => f.set(buffer, b)?,
            _ => return Err(PiuError::FieldTypeMismatch { name: self.name }),
        }
        Ok(())
    }
}

/// Checks that `value` fits in `width` bits and converts it.
fn narrow<T: TryFrom<u64>>(value: u64, width: u32) -> Result<T> {
    let fits = width >= 64 || value >> width == 0;
    let err = PiuError::InvalidFieldValue { value, width };
    if !fits {
        return Err(err);
    }
    T::try_from(value).map_err(|_| err)
}

pub fn find(table: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    table.iter().find(|spec| spec.name == name)
}

// Header fields shared by every frame kind except the NOPs.

pub const OPCODE: ByteField = ByteField::new(0);
/// Kind-specific "type" in bits 6–7 of byte 1.
pub const TYPE: BitField = BitField::new(1, 6, 2);
pub const CID: U16Field = U16Field::new(2);
pub const LUN: ByteField = ByteField::new(4);
pub const DATA_TRANSFER_LENGTH: U32Field = U32Field::new(8);
/// Bytes 16..32: CDB, sense data or query data depending on the kind.
pub const PAYLOAD: RangeField = RangeField::new(16, PIU_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[FieldSpec] = &[
        FieldSpec::new("opcode", Location::Byte(OPCODE)),
        FieldSpec::new("kind", Location::Bits(TYPE)),
        FieldSpec::new("cid", Location::U16(CID)),
        FieldSpec::new("payload", Location::Range(PAYLOAD)),
    ];

    #[test]
    fn lookup_by_name() {
        assert_eq!(find(TABLE, "cid").map(|s| s.location), Some(Location::U16(CID)));
        assert!(find(TABLE, "lun").is_none());
    }

    #[test]
    fn scalar_writes_are_width_checked() {
        let mut buffer = FrameBuffer::new();
        let opcode = find(TABLE, "opcode").unwrap();
        assert_eq!(
            opcode.write(&mut buffer, &FieldValue::Int(256)),
            Err(PiuError::InvalidFieldValue { value: 256, width: 8 })
        );
        let kind = find(TABLE, "kind").unwrap();
        assert_eq!(
            kind.write(&mut buffer, &FieldValue::Int(4)),
            Err(PiuError::InvalidFieldValue { value: 4, width: 2 })
        );
        let cid = find(TABLE, "cid").unwrap();
        assert!(cid.write(&mut buffer, &FieldValue::Int(0x1_0000)).is_err());
        assert_eq!(buffer, FrameBuffer::new());

        cid.write(&mut buffer, &FieldValue::Int(0xbeef)).unwrap();
        assert_eq!(cid.read(&buffer), FieldValue::Int(0xbeef));
    }

    #[test]
    fn shape_mismatch() {
        let mut buffer = FrameBuffer::new();
        let payload = find(TABLE, "payload").unwrap();
        assert_eq!(
            payload.write(&mut buffer, &FieldValue::Int(0)),
            Err(PiuError::FieldTypeMismatch { name: "payload" })
        );
        let opcode = find(TABLE, "opcode").unwrap();
        assert_eq!(
            opcode.write(&mut buffer, &FieldValue::Bytes(vec![1])),
            Err(PiuError::FieldTypeMismatch { name: "opcode" })
        );
    }

    #[test]
    fn bit_field_max() {
        assert_eq!(TYPE.max(), 0b11);
        assert_eq!(BitField::new(0, 0, 8).max(), 0xff);
        assert_eq!(BitField::new(7, 7, 1).max(), 1);
    }
}
