//! The response PIU, sent by the device when a command completes.

use super::buffer::FrameBuffer;
use super::field::{self, BitField, FieldSpec, Location};
use super::{PiuHeader, PiuKind};
use crate::error::Result;

const RESPONSE_TYPE: BitField = field::TYPE;

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("response_type", Location::Bits(RESPONSE_TYPE)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
    FieldSpec::new("data_transfer_length", Location::U32(field::DATA_TRANSFER_LENGTH)),
    FieldSpec::new("sense_data", Location::Range(field::PAYLOAD)),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseFields {
    pub opcode: u8,
    /// 2 bits.
    pub response_type: u8,
    pub cid: u16,
    pub lun: u8,
    pub data_transfer_length: u32,
    pub sense_data: [u8; 16],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponsePiu {
    buffer: FrameBuffer,
}

impl ResponsePiu {
    pub fn new(fields: ResponseFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
        };
        piu.set_opcode(fields.opcode);
        piu.set_response_type(fields.response_type)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        piu.set_data_transfer_length(fields.data_transfer_length);
        piu.set_sense_data(&fields.sense_data)?;
        Ok(piu)
    }

    pub fn response_type(&self) -> u8 {
        RESPONSE_TYPE.get(&self.buffer)
    }

    pub fn set_response_type(&mut self, response_type: u8) -> Result<()> {
        RESPONSE_TYPE.set(&mut self.buffer, response_type)
    }

    /// Residual data length reported by the device.
    pub fn data_transfer_length(&self) -> u32 {
        field::DATA_TRANSFER_LENGTH.get(&self.buffer)
    }

    pub fn set_data_transfer_length(&mut self, length: u32) {
        field::DATA_TRANSFER_LENGTH.set(&mut self.buffer, length);
    }

    pub fn sense_data(&self) -> &[u8] {
        field::PAYLOAD.get(&self.buffer)
    }

    /// Fails unless `sense_data` is exactly 16 bytes.
    pub fn set_sense_data(&mut self, sense_data: &[u8]) -> Result<()> {
        field::PAYLOAD.set(&mut self.buffer, sense_data)
    }
}

buffer_frame!(ResponsePiu, PiuKind::Response, FIELDS);

impl PiuHeader for ResponsePiu {}
