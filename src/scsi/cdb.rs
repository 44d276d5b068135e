//! The 16 byte command descriptor block carried in bytes 16..32 of a
//! command PIU.
//!
//! A [`CdbKind`] is picked when the command frame is built and decides which
//! SCSI fields can be reached through that frame. Every kind-specific field
//! is a plain [`FieldSpec`] over the parent frame's buffer at `16 + k`, so
//! there is no separate CDB copy to keep in sync.

use super::command_descriptor::{OpCode, X6CommandDescriptor, X10CommandDescriptor, rw10_flags};
use crate::piu::field::{BitField, ByteField, FieldSpec, Location, U16Field, U32Field};

/// Offset of the CDB inside a command PIU.
pub const CDB_OFFSET: usize = 16;

/// A CDB region is *always* 16 bytes, shorter CDBs are zero padded.
pub const CDB_SIZE: usize = 16;

/// `TRANSFER LENGTH` in READ(10)/WRITE(10) counts blocks of this many bytes.
pub const BLOCK_SIZE: u32 = 512;

/// Direction of the data phase, as carried in bit 7 of byte 7.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferDirection {
    /// Data-In: from the device to the host. Also used when there is no
    /// data phase at all.
    DeviceToHost = 0,
    /// Data-Out: from host to the device
    HostToDevice = 1,
}

impl TransferDirection {
    pub const fn bit(self) -> u8 {
        self as u8
    }

    pub const fn from_bit(bit: u8) -> Self {
        if bit & 1 == 1 {
            TransferDirection::HostToDevice
        } else {
            TransferDirection::DeviceToHost
        }
    }
}

/// Which SCSI command a command PIU carries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CdbKind {
    /// Unspecified contents; only the raw 16 bytes are reachable.
    #[default]
    Raw,
    Write10,
    Read10,
    TestUnitReady,
}

const fn cdb(local: usize) -> usize {
    CDB_OFFSET + local
}

pub(crate) const CDB_OPCODE: ByteField = ByteField::new(cdb(0));
pub(crate) const CDB_LUN: ByteField = ByteField::new(cdb(1));
pub(crate) const DPO: BitField = BitField::new(cdb(1), rw10_flags::DPO_BIT, 1);
pub(crate) const FUA: BitField = BitField::new(cdb(1), rw10_flags::FUA_BIT, 1);
pub(crate) const LOGICAL_BLOCK_ADDRESS: U32Field = U32Field::new(cdb(2));
pub(crate) const TRANSFER_LENGTH_BLOCKS: U16Field = U16Field::new(cdb(7));

const RW10_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("cdb_opcode", Location::Byte(CDB_OPCODE)),
    FieldSpec::new("dpo", Location::Bits(DPO)),
    FieldSpec::new("fua", Location::Bits(FUA)),
    FieldSpec::new("logical_block_address", Location::U32(LOGICAL_BLOCK_ADDRESS)),
    FieldSpec::new("transfer_length_blocks", Location::U16(TRANSFER_LENGTH_BLOCKS)),
];

const TEST_UNIT_READY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("cdb_opcode", Location::Byte(CDB_OPCODE)),
    FieldSpec::new("cdb_lun", Location::Byte(CDB_LUN)),
];

impl CdbKind {
    pub const fn name(self) -> &'static str {
        match self {
            CdbKind::Raw => "Raw",
            CdbKind::Write10 => "Write10",
            CdbKind::Read10 => "Read10",
            CdbKind::TestUnitReady => "TestUnitReady",
        }
    }

    pub const fn opcode(self) -> Option<OpCode> {
        match self {
            CdbKind::Raw => None,
            CdbKind::Write10 => Some(OpCode::Write10),
            CdbKind::Read10 => Some(OpCode::Read10),
            CdbKind::TestUnitReady => Some(OpCode::TestUnitReady),
        }
    }

    /// The `cdb_length` the parent frame is pinned to.
    pub const fn cdb_length(self) -> Option<u8> {
        match self {
            CdbKind::Raw => None,
            CdbKind::Write10 | CdbKind::Read10 => Some(X10CommandDescriptor::LEN as u8),
            CdbKind::TestUnitReady => Some(X6CommandDescriptor::LEN as u8),
        }
    }

    /// The direction the parent frame is pinned to.
    pub const fn direction(self) -> Option<TransferDirection> {
        match self {
            CdbKind::Raw => None,
            CdbKind::Write10 => Some(TransferDirection::HostToDevice),
            CdbKind::Read10 | CdbKind::TestUnitReady => Some(TransferDirection::DeviceToHost),
        }
    }

    /// Fields reachable only through this kind, at absolute frame offsets.
    pub const fn layout(self) -> &'static [FieldSpec] {
        match self {
            CdbKind::Raw => &[],
            CdbKind::Write10 | CdbKind::Read10 => RW10_FIELDS,
            CdbKind::TestUnitReady => TEST_UNIT_READY_FIELDS,
        }
    }

    /// Names of frame and CDB fields that the command identity fixes.
    pub const fn fixed_fields(self) -> &'static [&'static str] {
        match self {
            CdbKind::Raw => &[],
            CdbKind::Write10 | CdbKind::Read10 => {
                &["cdb", "cdb_opcode", "cdb_length", "transfer_direction"]
            }
            CdbKind::TestUnitReady => &[
                "cdb",
                "cdb_opcode",
                "cdb_lun",
                "cdb_length",
                "transfer_direction",
            ],
        }
    }
}

/// Parameters for a READ(10) or WRITE(10) command frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadWrite10 {
    pub logical_block_address: u32,
    /// Length of the data phase in bytes. The CDB carries it in
    /// [`BLOCK_SIZE`] units; a partial trailing block is dropped.
    pub transfer_length_bytes: u32,
    pub dpo: bool,
    pub fua: bool,
}

impl ReadWrite10 {
    /// Builds the 10 byte descriptor for `opcode`.
    ///
    /// Returns `None` if the block count does not fit the 16-bit
    /// `TRANSFER LENGTH` field.
    pub fn descriptor(&self, opcode: OpCode) -> Option<X10CommandDescriptor> {
        let blocks = u16::try_from(self.transfer_length_bytes / BLOCK_SIZE).ok()?;
        let flags = (u8::from(self.dpo) << rw10_flags::DPO_BIT) | (u8::from(self.fua) << rw10_flags::FUA_BIT);
        Some(X10CommandDescriptor {
            operation_code: opcode.code(),
            flags,
            logical_block_address: self.logical_block_address.to_be_bytes(),
            group_number: 0,
            transfer_length: blocks.to_be_bytes(),
            control: 0,
        })
    }
}

/// Lays a shorter descriptor into a zero padded 16 byte CDB.
pub fn pad(descriptor: &[u8]) -> [u8; CDB_SIZE] {
    let mut out = [0u8; CDB_SIZE];
    let (head, _) = out.split_at_mut(descriptor.len().min(CDB_SIZE));
    head.copy_from_slice(&descriptor[..head.len()]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_geometry() {
        assert_eq!(CdbKind::Write10.cdb_length(), Some(10));
        assert_eq!(CdbKind::Read10.cdb_length(), Some(10));
        assert_eq!(CdbKind::TestUnitReady.cdb_length(), Some(6));
        assert_eq!(CdbKind::Raw.cdb_length(), None);
        assert_eq!(
            CdbKind::Write10.direction(),
            Some(TransferDirection::HostToDevice)
        );
        assert_eq!(
            CdbKind::Read10.direction(),
            Some(TransferDirection::DeviceToHost)
        );
    }

    #[test]
    fn partial_blocks_are_truncated() {
        let params = ReadWrite10 {
            transfer_length_bytes: 1023,
            ..Default::default()
        };
        let cdb = params.descriptor(OpCode::Read10).unwrap();
        assert_eq!(cdb.transfer_length, [0, 1]);
    }

    #[test]
    fn too_many_blocks() {
        let params = ReadWrite10 {
            transfer_length_bytes: 0x1_0000 * BLOCK_SIZE,
            ..Default::default()
        };
        assert!(params.descriptor(OpCode::Write10).is_none());
    }

    #[test]
    fn validate_padding() {
        // Ensures that a single byte is packed successfully
        let mut padded = pad(&[1]).into_iter();
        assert!(padded.next() == Some(1));
        assert!(padded.all(|b| b == 0));
    }
}
