//! Task management request and response PIUs, used to abort or query
//! outstanding commands on a logical unit.

use super::buffer::FrameBuffer;
use super::field::{self, BitField, FieldSpec, Location};
use super::{PiuHeader, PiuKind};
use crate::error::Result;

const FUNCTION_TYPE: BitField = field::TYPE;

const REQUEST_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("task_management_type", Location::Bits(FUNCTION_TYPE)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
];

const RESPONSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("opcode", Location::Byte(field::OPCODE)),
    FieldSpec::new("task_management_response_type", Location::Bits(FUNCTION_TYPE)),
    FieldSpec::new("cid", Location::U16(field::CID)),
    FieldSpec::new("lun", Location::Byte(field::LUN)),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskManagementRequestFields {
    pub opcode: u8,
    /// 2 bits.
    pub task_management_type: u8,
    pub cid: u16,
    pub lun: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskManagementRequestPiu {
    buffer: FrameBuffer,
}

impl TaskManagementRequestPiu {
    pub fn new(fields: TaskManagementRequestFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
        };
        piu.set_opcode(fields.opcode);
        piu.set_task_management_type(fields.task_management_type)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        Ok(piu)
    }

    pub fn task_management_type(&self) -> u8 {
        FUNCTION_TYPE.get(&self.buffer)
    }

    pub fn set_task_management_type(&mut self, value: u8) -> Result<()> {
        FUNCTION_TYPE.set(&mut self.buffer, value)
    }
}

buffer_frame!(
    TaskManagementRequestPiu,
    PiuKind::TaskManagementRequest,
    REQUEST_FIELDS
);

impl PiuHeader for TaskManagementRequestPiu {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskManagementResponseFields {
    pub opcode: u8,
    /// 2 bits.
    pub task_management_response_type: u8,
    pub cid: u16,
    pub lun: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskManagementResponsePiu {
    buffer: FrameBuffer,
}

impl TaskManagementResponsePiu {
    pub fn new(fields: TaskManagementResponseFields) -> Result<Self> {
        let mut piu = Self {
            buffer: FrameBuffer::new(),
        };
        piu.set_opcode(fields.opcode);
        piu.set_task_management_response_type(fields.task_management_response_type)?;
        piu.set_cid(fields.cid);
        piu.set_lun(fields.lun);
        Ok(piu)
    }

    pub fn task_management_response_type(&self) -> u8 {
        FUNCTION_TYPE.get(&self.buffer)
    }

    pub fn set_task_management_response_type(&mut self, value: u8) -> Result<()> {
        FUNCTION_TYPE.set(&mut self.buffer, value)
    }
}

buffer_frame!(
    TaskManagementResponsePiu,
    PiuKind::TaskManagementResponse,
    RESPONSE_FIELDS
);

impl PiuHeader for TaskManagementResponsePiu {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PiuError;
    use crate::piu::{FieldValue, PiuFrame};

    #[test]
    fn request_layout() {
        let piu = TaskManagementRequestPiu::new(TaskManagementRequestFields {
            opcode: 0x04,
            task_management_type: 3,
            cid: 0x0102,
            lun: 7,
        })
        .unwrap();
        let mut expected = [0u8; 32];
        expected[..5].copy_from_slice(&[0x04, 0xc0, 0x01, 0x02, 0x07]);
        assert_eq!(piu.to_bytes(), expected);
    }

    #[test]
    fn response_round_trip() {
        let piu = TaskManagementResponsePiu::new(TaskManagementResponseFields {
            opcode: 0x24,
            task_management_response_type: 1,
            cid: 0xfffe,
            lun: 0,
        })
        .unwrap();
        let decoded = TaskManagementResponsePiu::from_bytes(&piu.to_bytes()).unwrap();
        assert_eq!(decoded.task_management_response_type(), 1);
        assert_eq!(decoded.cid(), 0xfffe);
        assert_eq!(decoded, piu);
    }

    #[test]
    fn closed_schema() {
        let mut piu = TaskManagementRequestPiu::new(Default::default()).unwrap();
        for name in ["data_transfer_length", "cdb", "task_management_response_type"] {
            assert!(matches!(
                piu.set_field(name, FieldValue::Int(0)),
                Err(PiuError::UnknownField { kind: "TaskManagementRequest", .. })
            ));
        }
        assert_eq!(
            TaskManagementRequestPiu::new(TaskManagementRequestFields {
                task_management_type: 4,
                ..Default::default()
            }),
            Err(PiuError::InvalidFieldValue { value: 4, width: 2 })
        );
    }
}
