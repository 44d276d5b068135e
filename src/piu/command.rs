//! The command PIU: a SCSI command sent from host to device.
//!
//! Bytes 16..32 carry the CDB. A frame built as one of the [`CdbKind`]s
//! (WRITE(10), READ(10), TEST UNIT READY) keeps that kind for its whole
//! life, which pins the fields the command identity decides (`cdb_length`,
//! `transfer_direction`, the CDB opcode) and unlocks the kind's own fields.
//! A frame decoded from raw bytes is [`CdbKind::Raw`] until it is
//! explicitly redecoded with [`CommandPiu::redecode_as`].

use tracing::debug;

use super::buffer::FrameBuffer;
use super::field::{self, BitField, FieldSpec, FieldValue, Location};
use super::sealed::FrameStorage;
use super::{PiuFrame, PiuHeader, PiuKind};
use crate::error::{PiuError, Result};
use crate::scsi::cdb::{self, BLOCK_SIZE, CDB_OFFSET, CDB_SIZE, CdbKind, ReadWrite10, TransferDirection};
use crate::scsi::command_descriptor::{OpCode, X6CommandDescriptor};

const COMMAND_TYPE: BitField = field::TYPE;
const DME: BitField = BitField::new(1, 5, 1);
const CDB_LENGTH: BitField = BitField::new(6, 4, 4);
const TRANSFER_DIRECTION: BitField = BitField::new(7, 7, 1);
const DPB: BitField = BitField::new(7, 6, 1);

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("command_type", Location::Bits(COMMAND_TYPE)),
    FieldSpec::new("dme", Location::Bits(DME)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
    FieldSpec::new("cdb_length", Location::Bits(CDB_LENGTH)),
    FieldSpec::new("transfer_direction", Location::Bits(TRANSFER_DIRECTION)),
    FieldSpec::new("dpb", Location::Bits(DPB)),
    FieldSpec::new("data_transfer_length", Location::U32(field::DATA_TRANSFER_LENGTH)),
    FieldSpec::new("cdb", Location::Range(field::PAYLOAD)),
];

/// Field values for building a [`CommandPiu`]. Omitted fields default to
/// zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandFields {
    pub opcode: u8,
    /// 2 bits.
    pub command_type: u8,
    /// 1 bit.
    pub dme: u8,
    pub cid: u16,
    pub lun: u8,
    /// 4 bits.
    pub cdb_length: u8,
    /// 1 bit, see [`TransferDirection`].
    pub transfer_direction: u8,
    /// 1 bit.
    pub dpb: u8,
    pub data_transfer_length: u32,
    pub cdb: [u8; CDB_SIZE],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPiu {
    buffer: FrameBuffer,
    cdb_kind: CdbKind,
}

impl CommandPiu {
    /// Builds a raw command frame.
    ///
    /// Fails with [`PiuError::InvalidFieldValue`] if a sub-byte field is
    /// given a value wider than the field.
    pub fn new(fields: CommandFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
            cdb_kind: CdbKind::Raw,
        };
        piu.set_opcode(fields.opcode);
        piu.set_command_type(fields.command_type)?;
        piu.set_dme(fields.dme)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        piu.set_cdb_length(fields.cdb_length)?;
        piu.set_transfer_direction(fields.transfer_direction)?;
        piu.set_dpb(fields.dpb)?;
        piu.set_data_transfer_length(fields.data_transfer_length);
        piu.set_cdb(&fields.cdb)?;
        Ok(piu)
    }

    /// A WRITE(10) command frame; data flows host to device.
    pub fn write10(cid: u16, lun: u8, params: ReadWrite10) -> Result<Self> {
        Self::read_write10(CdbKind::Write10, OpCode::Write10, cid, lun, params)
    }

    /// A READ(10) command frame; data flows device to host.
    pub fn read10(cid: u16, lun: u8, params: ReadWrite10) -> Result<Self> {
        Self::read_write10(CdbKind::Read10, OpCode::Read10, cid, lun, params)
    }

    fn read_write10(kind: CdbKind, opcode: OpCode, cid: u16, lun: u8, params: ReadWrite10) -> Result<Self> {
        let descriptor = params
            .descriptor(opcode)
            .ok_or_else(|| too_many_blocks(params.transfer_length_bytes))?;
        Self::with_kind(
            kind,
            CommandFields {
                opcode: opcode.code(),
                cid,
                lun,
                data_transfer_length: params.transfer_length_bytes,
                cdb: cdb::pad(&descriptor.to_bytes()),
                ..Default::default()
            },
        )
    }

    /// A TEST UNIT READY command frame. There is no data phase; the LUN is
    /// mirrored into byte 1 of the CDB.
    pub fn test_unit_ready(cid: u16, lun: u8) -> Result<Self> {
        let descriptor = X6CommandDescriptor {
            operation_code: OpCode::TestUnitReady.code(),
            misc_info: lun,
            ..Default::default()
        };
        Self::with_kind(
            CdbKind::TestUnitReady,
            CommandFields {
                opcode: OpCode::TestUnitReady.code(),
                cid,
                lun,
                cdb: cdb::pad(&descriptor.to_bytes()),
                ..Default::default()
            },
        )
    }

    fn with_kind(kind: CdbKind, mut fields: CommandFields) -> Result<Self> {
        fields.cdb_length = kind.cdb_length().unwrap_or_default();
        fields.transfer_direction = kind.direction().map_or(0, TransferDirection::bit);
        let mut piu = Self::new(fields)?;
        piu.cdb_kind = kind;
        debug!(kind = kind.name(), cid = piu.cid(), "built command PIU");
        Ok(piu)
    }

    pub fn cdb_kind(&self) -> CdbKind {
        self.cdb_kind
    }

    /// Reinterprets the CDB as `kind`.
    ///
    /// Fails with [`PiuError::CdbOpcodeMismatch`] if the CDB opcode byte is
    /// not the one `kind` uses. Redecoding as [`CdbKind::Raw`] always works.
    pub fn redecode_as(self, kind: CdbKind) -> Result<Self> {
        if let Some(opcode) = kind.opcode() {
            let actual = cdb::CDB_OPCODE.get(&self.buffer);
            if actual != opcode.code() {
                return Err(PiuError::CdbOpcodeMismatch {
                    expected: opcode.code(),
                    actual,
                });
            }
        }
        debug!(from = self.cdb_kind.name(), to = kind.name(), "redecoding CDB");
        Ok(Self {
            buffer: self.buffer,
            cdb_kind: kind,
        })
    }

    /// Drops the CDB kind, unpinning every field. The bytes are unchanged.
    pub fn into_raw(self) -> Self {
        Self {
            buffer: self.buffer,
            cdb_kind: CdbKind::Raw,
        }
    }

    pub fn command_type(&self) -> u8 {
        COMMAND_TYPE.get(&self.buffer)
    }

    pub fn set_command_type(&mut self, command_type: u8) -> Result<()> {
        COMMAND_TYPE.set(&mut self.buffer, command_type)
    }

    pub fn dme(&self) -> u8 {
        DME.get(&self.buffer)
    }

    pub fn set_dme(&mut self, dme: u8) -> Result<()> {
        DME.set(&mut self.buffer, dme)
    }

    pub fn cdb_length(&self) -> u8 {
        CDB_LENGTH.get(&self.buffer)
    }

    pub fn set_cdb_length(&mut self, cdb_length: u8) -> Result<()> {
        self.check_writable("cdb_length")?;
        CDB_LENGTH.set(&mut self.buffer, cdb_length)
    }

    /// The raw direction bit.
    pub fn transfer_direction(&self) -> u8 {
        TRANSFER_DIRECTION.get(&self.buffer)
    }

    pub fn set_transfer_direction(&mut self, bit: u8) -> Result<()> {
        self.check_writable("transfer_direction")?;
        TRANSFER_DIRECTION.set(&mut self.buffer, bit)
    }

    pub fn direction(&self) -> TransferDirection {
        TransferDirection::from_bit(self.transfer_direction())
    }

    pub fn set_direction(&mut self, direction: TransferDirection) -> Result<()> {
        self.set_transfer_direction(direction.bit())
    }

    pub fn dpb(&self) -> u8 {
        DPB.get(&self.buffer)
    }

    pub fn set_dpb(&mut self, dpb: u8) -> Result<()> {
        DPB.set(&mut self.buffer, dpb)
    }

    /// Length of the data phase in bytes.
    pub fn data_transfer_length(&self) -> u32 {
        field::DATA_TRANSFER_LENGTH.get(&self.buffer)
    }

    pub fn set_data_transfer_length(&mut self, length: u32) {
        field::DATA_TRANSFER_LENGTH.set(&mut self.buffer, length);
    }

    /// The raw 16 CDB bytes, whatever the kind.
    pub fn cdb(&self) -> &[u8] {
        field::PAYLOAD.get(&self.buffer)
    }

    /// Replaces the whole CDB. Only raw frames allow this.
    pub fn set_cdb(&mut self, cdb: &[u8]) -> Result<()> {
        self.check_writable("cdb")?;
        field::PAYLOAD.set(&mut self.buffer, cdb)
    }

    /// Byte `index` of the CDB, i.e. frame byte `16 + index`.
    pub fn cdb_byte(&self, index: usize) -> Result<u8> {
        self.buffer.get_byte(CDB_OFFSET.saturating_add(index))
    }

    /// Writes byte `index` of the CDB through to the frame.
    ///
    /// The CDB opcode can only be rewritten with the value it already
    /// holds. For TEST UNIT READY, byte 1 only accepts the frame's `lun`.
    pub fn set_cdb_byte(&mut self, index: usize, value: u8) -> Result<()> {
        let offset = CDB_OFFSET.saturating_add(index);
        let current = self.buffer.get_byte(offset)?;
        if current != value {
            let pinned = match (self.cdb_kind, index) {
                (CdbKind::Raw, _) => None,
                (_, 0) => Some("cdb_opcode"),
                (CdbKind::TestUnitReady, 1) if value != self.lun() => Some("cdb_lun"),
                _ => None,
            };
            if let Some(name) = pinned {
                self.check_writable(name)?;
            }
        }
        self.buffer.set_byte(offset, value)
    }

    pub fn logical_block_address(&self) -> Result<u32> {
        self.require_rw10("logical_block_address")?;
        Ok(cdb::LOGICAL_BLOCK_ADDRESS.get(&self.buffer))
    }

    pub fn set_logical_block_address(&mut self, lba: u32) -> Result<()> {
        self.require_rw10("logical_block_address")?;
        cdb::LOGICAL_BLOCK_ADDRESS.set(&mut self.buffer, lba);
        Ok(())
    }

    /// `TRANSFER LENGTH` in 512 byte blocks.
    pub fn transfer_length_blocks(&self) -> Result<u16> {
        self.require_rw10("transfer_length_blocks")?;
        Ok(cdb::TRANSFER_LENGTH_BLOCKS.get(&self.buffer))
    }

    pub fn set_transfer_length_blocks(&mut self, blocks: u16) -> Result<()> {
        self.require_rw10("transfer_length_blocks")?;
        cdb::TRANSFER_LENGTH_BLOCKS.set(&mut self.buffer, blocks);
        Ok(())
    }

    /// Sets the data phase length in bytes: the frame's
    /// `data_transfer_length` gets `bytes`, the CDB gets `bytes / 512`
    /// blocks with any partial block dropped.
    pub fn set_transfer_length(&mut self, bytes: u32) -> Result<()> {
        self.require_rw10("transfer_length_blocks")?;
        let blocks = u16::try_from(bytes / BLOCK_SIZE).map_err(|_| too_many_blocks(bytes))?;
        cdb::TRANSFER_LENGTH_BLOCKS.set(&mut self.buffer, blocks);
        self.set_data_transfer_length(bytes);
        Ok(())
    }

    pub fn dpo(&self) -> Result<bool> {
        self.require_rw10("dpo")?;
        Ok(cdb::DPO.get(&self.buffer) == 1)
    }

    pub fn set_dpo(&mut self, dpo: bool) -> Result<()> {
        self.require_rw10("dpo")?;
        cdb::DPO.set(&mut self.buffer, dpo.into())
    }

    pub fn fua(&self) -> Result<bool> {
        self.require_rw10("fua")?;
        Ok(cdb::FUA.get(&self.buffer) == 1)
    }

    pub fn set_fua(&mut self, fua: bool) -> Result<()> {
        self.require_rw10("fua")?;
        cdb::FUA.set(&mut self.buffer, fua.into())
    }

    fn require_rw10(&self, name: &str) -> Result<()> {
        match self.cdb_kind {
            CdbKind::Write10 | CdbKind::Read10 => Ok(()),
            _ => Err(PiuError::UnknownField {
                kind: self.kind_name(),
                name: name.to_owned(),
            }),
        }
    }

    fn mirror_lun(&mut self) {
        if self.cdb_kind == CdbKind::TestUnitReady {
            let lun = field::LUN.get(&self.buffer);
            cdb::CDB_LUN.set(&mut self.buffer, lun);
        }
    }
}

fn too_many_blocks(bytes: u32) -> PiuError {
    PiuError::InvalidFieldValue {
        value: (bytes / BLOCK_SIZE).into(),
        width: 16,
    }
}

impl FrameStorage for CommandPiu {
    fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer,
            cdb_kind: CdbKind::Raw,
        }
    }
}

impl PiuFrame for CommandPiu {
    const KIND: PiuKind = PiuKind::Command;
    const FIELDS: &'static [FieldSpec] = FIELDS;

    fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    fn extra_fields(&self) -> &'static [FieldSpec] {
        self.cdb_kind.layout()
    }

    fn kind_name(&self) -> &'static str {
        match self.cdb_kind {
            CdbKind::Raw => "Command",
            CdbKind::Write10 => "Command(Write10)",
            CdbKind::Read10 => "Command(Read10)",
            CdbKind::TestUnitReady => "Command(TestUnitReady)",
        }
    }

    fn check_writable(&self, name: &'static str) -> Result<()> {
        if self.cdb_kind.fixed_fields().contains(&name) {
            return Err(PiuError::FixedField {
                kind: self.cdb_kind.name(),
                name,
            });
        }
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let spec = self.field_spec(name)?;
        self.check_writable(spec.name)?;
        spec.write(&mut self.buffer, &value)?;
        if spec.name == "lun" {
            self.mirror_lun();
        }
        Ok(())
    }
}

impl PiuHeader for CommandPiu {
    fn set_lun(&mut self, lun: u8) {
        field::LUN.set(&mut self.buffer, lun);
        self.mirror_lun();
    }
}
