//! Underlying structures that commands are issued in

/// Operation codes for a Command Descriptor Block, specifying what operation you want
/// to do as described in 7.1 of SPC-2.
///
/// Only the commands a command PIU knows how to lay out are listed here.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// SPC-2 7.25
    TestUnitReady = 0x00,
    /// SBC-2 5.1.6
    Read10 = 0x28,
    /// SBC-2 5.1.19
    Write10 = 0x2A,
}

impl OpCode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// As described in SPC-2 4.3.2 table 1, a typical CDB for 6 byte commands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct X6CommandDescriptor {
    /// "The `OPERATION CODE` field contains the code value identifying the operation
    /// being requested by the CDB."
    pub operation_code: u8,
    /// Byte 1. Older SCSI revisions carry the LUN here; TEST UNIT READY
    /// frames still mirror the frame LUN into it.
    pub misc_info: u8,
    /// The low 16 bits of the 21-bit `LOGICAL BLOCK ADDRESS`.
    pub logical_block_address: [u8; 2],
    /// `TRANSFER LENGTH`, `PARAMETER LIST LENGTH` or `ALLOCATION LENGTH`
    /// depending on the opcode.
    pub misc_len: u8,
    /// "The contents of the `CONTROL` field are defined in SAM-2."
    pub control: u8,
}

impl X6CommandDescriptor {
    pub const LEN: usize = 6;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let [lba_hi, lba_lo] = self.logical_block_address;
        [
            self.operation_code,
            self.misc_info,
            lba_hi,
            lba_lo,
            self.misc_len,
            self.control,
        ]
    }
}

/// As described in SPC-2 4.3.2 table 2, a typical CDB for 10 byte commands.
///
/// All multi-byte fields are big endian.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct X10CommandDescriptor {
    pub operation_code: u8,
    /// Service action, or for READ(10)/WRITE(10) the DPO (bit 4) and FUA
    /// (bit 3) cache control bits.
    pub flags: u8,
    pub logical_block_address: [u8; 4],
    /// Bits 0..5 hold the group number; unused here.
    pub group_number: u8,
    /// `TRANSFER LENGTH` in logical blocks.
    pub transfer_length: [u8; 2],
    pub control: u8,
}

impl X10CommandDescriptor {
    pub const LEN: usize = 10;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = self.operation_code;
        out[1] = self.flags;
        out[2..6].copy_from_slice(&self.logical_block_address);
        out[6] = self.group_number;
        out[7..9].copy_from_slice(&self.transfer_length);
        out[9] = self.control;
        out
    }
}

/// Bit positions inside byte 1 of a READ(10)/WRITE(10) CDB.
pub mod rw10_flags {
    /// Disable page out.
    pub const DPO_BIT: u8 = 4;
    /// Force unit access.
    pub const FUA_BIT: u8 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x10_layout() {
        let cdb = X10CommandDescriptor {
            operation_code: OpCode::Write10.code(),
            flags: 1 << rw10_flags::FUA_BIT,
            logical_block_address: 0x0000_0100_u32.to_be_bytes(),
            group_number: 0,
            transfer_length: 10_u16.to_be_bytes(),
            control: 0,
        };
        assert_eq!(
            cdb.to_bytes(),
            [0x2A, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00]
        );
    }

    #[test]
    fn x6_layout() {
        let cdb = X6CommandDescriptor {
            operation_code: OpCode::TestUnitReady.code(),
            misc_info: 3,
            ..Default::default()
        };
        assert_eq!(cdb.to_bytes(), [0x00, 0x03, 0, 0, 0, 0]);
    }
}
