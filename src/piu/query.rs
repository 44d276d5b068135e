//! Query request and response PIUs, used to read and write device
//! descriptors, attributes and flags.
//!
//! The 16 bytes at 16..32 are opaque here: request parameters on the way
//! in, response data on the way out.

use super::buffer::FrameBuffer;
use super::field::{self, BitField, FieldSpec, Location};
use super::{PiuHeader, PiuKind};
use crate::error::Result;

const QUERY_TYPE: BitField = field::TYPE;

const REQUEST_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("query_type", Location::Bits(QUERY_TYPE)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
    FieldSpec::new("query_parameter", Location::Range(field::PAYLOAD)),
];

const RESPONSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("query_response_type", Location::Bits(QUERY_TYPE)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
    FieldSpec::new("query_response_data", Location::Range(field::PAYLOAD)),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequestFields {
    pub opcode: u8,
    /// 2 bits.
    pub query_type: u8,
    pub cid: u16,
    pub lun: u8,
    pub query_parameter: [u8; 16],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequestPiu {
    buffer: FrameBuffer,
}

impl QueryRequestPiu {
    pub fn new(fields: QueryRequestFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
        };
        piu.set_opcode(fields.opcode);
        piu.set_query_type(fields.query_type)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        piu.set_query_parameter(&fields.query_parameter)?;
        Ok(piu)
    }

    pub fn query_type(&self) -> u8 {
        QUERY_TYPE.get(&self.buffer)
    }

    pub fn set_query_type(&mut self, value: u8) -> Result<()> {
        QUERY_TYPE.set(&mut self.buffer, value)
    }

    pub fn query_parameter(&self) -> &[u8] {
        field::PAYLOAD.get(&self.buffer)
    }

    pub fn set_query_parameter(&mut self, parameter: &[u8]) -> Result<()> {
        field::PAYLOAD.set(&mut self.buffer, parameter)
    }
}

buffer_frame!(QueryRequestPiu, PiuKind::QueryRequest, REQUEST_FIELDS);

impl PiuHeader for QueryRequestPiu {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResponseFields {
    pub opcode: u8,
    /// 2 bits.
    pub query_response_type: u8,
    pub cid: u16,
    pub lun: u8,
    pub query_response_data: [u8; 16],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponsePiu {
    buffer: FrameBuffer,
}

impl QueryResponsePiu {
    pub fn new(fields: QueryResponseFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
        };
        piu.set_opcode(fields.opcode);
        piu.set_query_response_type(fields.query_response_type)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        piu.set_query_response_data(&fields.query_response_data)?;
        Ok(piu)
    }

    pub fn query_response_type(&self) -> u8 {
        QUERY_TYPE.get(&self.buffer)
    }

    pub fn set_query_response_type(&mut self, value: u8) -> Result<()> {
        QUERY_TYPE.set(&mut self.buffer, value)
    }

    pub fn query_response_data(&self) -> &[u8] {
        field::PAYLOAD.get(&self.buffer)
    }

    pub fn set_query_response_data(&mut self, data: &[u8]) -> Result<()> {
        field::PAYLOAD.set(&mut self.buffer, data)
    }
}

buffer_frame!(QueryResponsePiu, PiuKind::QueryResponse, RESPONSE_FIELDS);

impl PiuHeader for QueryResponsePiu {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PiuError;
    use crate::piu::{FieldValue, PiuFrame};

    #[test]
    fn request_carries_parameters() {
        let parameter: [u8; 16] = std::array::from_fn(|i| i as u8 + 1);
        let piu = QueryRequestPiu::new(QueryRequestFields {
            opcode: 0x16,
            query_type: 1,
            cid: 0x0a0b,
            lun: 0xd0,
            query_parameter: parameter,
        })
        .unwrap();
        let bytes = piu.to_bytes();
        assert_eq!(&bytes[..5], &[0x16, 0x40, 0x0a, 0x0b, 0xd0]);
        assert_eq!(&bytes[16..], &parameter);
        assert_eq!(piu.query_parameter(), &parameter);
    }

    #[test]
    fn response_fields_by_name() {
        let mut piu = QueryResponsePiu::new(Default::default()).unwrap();
        piu.set_field("query_response_data", FieldValue::Bytes(vec![0xee; 16]))
            .unwrap();
        piu.set_field("query_response_type", FieldValue::Int(2)).unwrap();
        assert_eq!(piu.query_response_data(), &[0xee; 16]);
        assert_eq!(piu.field("query_response_type").unwrap(), FieldValue::Int(2));
        assert_eq!(
            piu.field("query_parameter"),
            Err(PiuError::UnknownField {
                kind: "QueryResponse",
                name: "query_parameter".to_owned()
            })
        );
    }

    #[test]
    fn short_parameter_is_rejected() {
        let mut piu = QueryRequestPiu::new(Default::default()).unwrap();
        assert_eq!(
            piu.set_query_parameter(&[1, 2, 3]),
            Err(PiuError::InvalidRangeLength { expected: 16, actual: 3 })
        );
        assert_eq!(piu.to_bytes(), [0u8; 32]);
    }
}
