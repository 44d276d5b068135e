//! The fixed-size byte buffer every PIU is built on.
//!
//! A [`FrameBuffer`] is the only storage a frame has. Typed fields on the
//! frame structs are computed from it on read and written into it on set,
//! so there is never a second copy of the state to drift out of sync.

use crate::error::{PiuError, Result};

/// Every PIU is *always* 32 bytes on the wire.
pub const PIU_SIZE: usize = 32;

/// 32 bytes of frame state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameBuffer([u8; PIU_SIZE]);

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// A zeroed buffer.
    pub const fn new() -> Self {
        Self([0; PIU_SIZE])
    }

    /// Copies `bytes` into a new buffer.
    ///
    /// Fails with [`PiuError::InvalidLength`] unless exactly [`PIU_SIZE`]
    /// bytes are provided.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: [u8; PIU_SIZE] = bytes.try_into().map_err(|_| PiuError::InvalidLength {
            expected: PIU_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(data))
    }

    /// Returns an independent copy of the frame.
    pub fn to_bytes(&self) -> [u8; PIU_SIZE] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn bytes(&self) -> &[u8; PIU_SIZE] {
        &self.0
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8; PIU_SIZE] {
        &mut self.0
    }

    pub fn get_byte(&self, offset: usize) -> Result<u8> {
        check_range(offset, offset.saturating_add(1))?;
        Ok(self.0[offset])
    }

    pub fn set_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        check_range(offset, offset.saturating_add(1))?;
        self.0[offset] = value;
        Ok(())
    }

    /// Reads `width` bits starting at `bit_offset` (0 is the least
    /// significant bit) of the byte at `byte_offset`.
    pub fn get_bits(&self, byte_offset: usize, bit_offset: u8, width: u8) -> Result<u8> {
        let mask = bit_mask(bit_offset, width)?;
        let byte = self.get_byte(byte_offset)?;
        Ok((byte >> bit_offset) & mask)
    }

    /// Read-modify-write of a sub-byte field.
    ///
    /// Only the `width` target bits change; the rest of the byte is kept.
    pub fn set_bits(&mut self, byte_offset: usize, bit_offset: u8, width: u8, value: u8) -> Result<()> {
        let mask = bit_mask(bit_offset, width)?;
        if value & !mask != 0 {
            return Err(PiuError::InvalidFieldValue {
                value: value.into(),
                width: width.into(),
            });
        }
        let byte = self.get_byte(byte_offset)?;
        let cleared = byte & !(mask << bit_offset);
        self.0[byte_offset] = cleared | ((value & mask) << bit_offset);
        Ok(())
    }

    pub fn get_range(&self, start: usize, end: usize) -> Result<&[u8]> {
        check_range(start, end)?;
        Ok(&self.0[start..end])
    }

    /// Overwrites `start..end` with `bytes`, which must be exactly as long
    /// as the range.
    pub fn set_range(&mut self, start: usize, end: usize, bytes: &[u8]) -> Result<()> {
        check_range(start, end)?;
        if end - start != bytes.len() {
            return Err(PiuError::InvalidRangeLength {
                expected: end - start,
                actual: bytes.len(),
            });
        }
        self.0[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn get_u16_be(&self, offset: usize) -> Result<u16> {
        let bytes = self.get_range(offset, offset.saturating_add(2))?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn set_u16_be(&mut self, offset: usize, value: u16) -> Result<()> {
        self.set_range(offset, offset.saturating_add(2), &value.to_be_bytes())
    }

    pub fn get_u32_be(&self, offset: usize) -> Result<u32> {
        let bytes = self.get_range(offset, offset.saturating_add(4))?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn set_u32_be(&mut self, offset: usize, value: u32) -> Result<()> {
        self.set_range(offset, offset.saturating_add(4), &value.to_be_bytes())
    }
}

/// `end` saturates rather than wraps, so a huge offset still lands past the
/// frame.
fn check_range(start: usize, end: usize) -> Result<()> {
    if start > end || end > PIU_SIZE {
        return Err(PiuError::OutOfBounds { start, end });
    }
    Ok(())
}

/// Unshifted mask of `width` ones, after validating the geometry.
fn bit_mask(bit_offset: u8, width: u8) -> Result<u8> {
    if !(1..=8).contains(&width) || u16::from(bit_offset) + u16::from(width) > 8 {
        return Err(PiuError::InvalidBitRange { bit_offset, width });
    }
    Ok(((1u16 << width) - 1) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_sized_input() {
        for len in [0, 31, 33, 64] {
            let bytes = vec![0u8; len];
            let e = FrameBuffer::from_bytes(&bytes).expect_err("length must be 32");
            assert_eq!(
                e,
                PiuError::InvalidLength {
                    expected: PIU_SIZE,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn copies_are_independent() {
        let mut source = [0u8; PIU_SIZE];
        let buffer = FrameBuffer::from_bytes(&source).unwrap();
        source[0] = 0xff;
        assert_eq!(buffer.get_byte(0).unwrap(), 0);

        let mut out = buffer.to_bytes();
        out[1] = 0xff;
        assert_eq!(buffer.get_byte(1).unwrap(), 0);
    }

    #[test]
    fn set_bits_keeps_neighbouring_bits() {
        for background in 0..=u8::MAX {
            for value in 0..4u8 {
                let mut buffer = FrameBuffer::new();
                buffer.set_byte(1, background).unwrap();
                buffer.set_bits(1, 6, 2, value).unwrap();
                let byte = buffer.get_byte(1).unwrap();
                assert_eq!(byte & 0x3f, background & 0x3f);
                assert_eq!(byte >> 6, value);
                assert_eq!(buffer.get_bits(1, 6, 2).unwrap(), value);
            }
        }
    }

    #[test]
    fn set_bits_rejects_oversized_value() {
        let mut buffer = FrameBuffer::new();
        buffer.set_byte(7, 0b0101_0101).unwrap();
        let e = buffer.set_bits(7, 7, 1, 2).unwrap_err();
        assert_eq!(e, PiuError::InvalidFieldValue { value: 2, width: 1 });
        assert_eq!(buffer.get_byte(7).unwrap(), 0b0101_0101);
    }

    #[test]
    fn bad_bit_geometry() {
        let mut buffer = FrameBuffer::new();
        assert!(matches!(
            buffer.set_bits(0, 6, 3, 0),
            Err(PiuError::InvalidBitRange { bit_offset: 6, width: 3 })
        ));
        assert!(matches!(
            buffer.get_bits(0, 0, 0),
            Err(PiuError::InvalidBitRange { .. })
        ));
        // full-byte bit field is legal
        buffer.set_bits(3, 0, 8, 0xa5).unwrap();
        assert_eq!(buffer.get_byte(3).unwrap(), 0xa5);
    }

    #[test]
    fn out_of_bounds_access() {
        let mut buffer = FrameBuffer::new();
        assert!(matches!(buffer.get_byte(32), Err(PiuError::OutOfBounds { .. })));
        assert!(matches!(buffer.set_byte(40, 1), Err(PiuError::OutOfBounds { .. })));
        assert!(matches!(
            buffer.get_range(16, 33),
            Err(PiuError::OutOfBounds { start: 16, end: 33 })
        ));
    }

    #[test]
    fn huge_offsets_are_errors() {
        let mut buffer = FrameBuffer::new();
        for offset in [usize::MAX, usize::MAX - 1, usize::MAX - 3] {
            assert!(matches!(buffer.get_byte(offset), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.set_byte(offset, 1), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.get_bits(offset, 0, 1), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.set_bits(offset, 0, 1, 1), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.get_u16_be(offset), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.set_u16_be(offset, 1), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.get_u32_be(offset), Err(PiuError::OutOfBounds { .. })));
            assert!(matches!(buffer.set_u32_be(offset, 1), Err(PiuError::OutOfBounds { .. })));
        }
        assert!(matches!(
            buffer.get_range(usize::MAX, usize::MAX),
            Err(PiuError::OutOfBounds { .. })
        ));
        assert_eq!(buffer, FrameBuffer::new());
    }

    #[test]
    fn set_range_length_mismatch_leaves_buffer_alone() {
        let mut buffer = FrameBuffer::new();
        let e = buffer.set_range(16, 32, &[0xaa; 15]).unwrap_err();
        assert_eq!(
            e,
            PiuError::InvalidRangeLength {
                expected: 16,
                actual: 15
            }
        );
        assert_eq!(buffer, FrameBuffer::new());
    }

    #[test]
    fn multi_byte_values_are_big_endian() {
        let mut buffer = FrameBuffer::new();
        buffer.set_u16_be(2, 0x1234).unwrap();
        buffer.set_u32_be(8, 0x1000).unwrap();
        let bytes = buffer.to_bytes();
        assert_eq!(&bytes[2..4], &[0x12, 0x34]);
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x10, 0x00]);
        assert_eq!(buffer.get_u16_be(2).unwrap(), 0x1234);
        assert_eq!(buffer.get_u32_be(8).unwrap(), 0x1000);
    }
}
