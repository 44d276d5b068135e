//! Protocol Information Units: the fixed 32 byte frames exchanged between a
//! host and a storage device.
//!
//! Every frame kind owns one [`FrameBuffer`] and a closed table of
//! [`FieldSpec`]s describing where its logical fields live. The buffer is
//! the only state; typed accessors and the by-name [`PiuFrame::field`]
//! interface are both views over it.
//!
//! All multi-byte integers are big endian:
//!
//! ```text
//! byte  0        1         2..4     4     5   6        7        8..12        12..16  16..32
//!     ┌────────┬─────────┬────────┬─────┬───┬────────┬────────┬────────────┬──────┬──────────────┐
//!     │ opcode │ type|.. │ cid BE │ lun │   │ cdblen │ dir|.. │ length BE  │      │ CDB / data   │
//!     └────────┴─────────┴────────┴─────┴───┴────────┴────────┴────────────┴──────┴──────────────┘
//! ```

/// Implements [`PiuFrame`] for a frame struct whose only state is its
/// `buffer`.
macro_rules! buffer_frame {
    ($frame:ident, $kind:expr, $fields:expr) => {
        impl $crate::piu::sealed::FrameStorage for $frame {
            fn buffer_mut(&mut self) -> &mut $crate::piu::buffer::FrameBuffer {
                &mut self.buffer
            }

            fn from_buffer(buffer: $crate::piu::buffer::FrameBuffer) -> Self {
                Self { buffer }
            }
        }

        impl $crate::piu::PiuFrame for $frame {
            const KIND: $crate::piu::PiuKind = $kind;
            const FIELDS: &'static [$crate::piu::field::FieldSpec] = $fields;

            fn buffer(&self) -> &$crate::piu::buffer::FrameBuffer {
                &self.buffer
            }
        }
    };
}

pub mod buffer;
pub mod command;
pub mod field;
pub mod nop;
pub mod query;
pub mod response;
pub mod tag;
pub mod task;

use tracing::debug;

pub use buffer::{FrameBuffer, PIU_SIZE};
pub use command::{CommandFields, CommandPiu};
pub use field::{FieldSpec, FieldValue};
pub use nop::{NopInPiu, NopOutPiu};
pub use query::{QueryRequestFields, QueryRequestPiu, QueryResponseFields, QueryResponsePiu};
pub use response::{ResponseFields, ResponsePiu};
pub use tag::TagGenerator;
pub use task::{
    TaskManagementRequestFields, TaskManagementRequestPiu, TaskManagementResponseFields,
    TaskManagementResponsePiu,
};

use crate::error::{PiuError, Result};
use sealed::FrameStorage;

/// Mutable access to a frame's bytes stays inside the crate: callers go
/// through the frame's setters, which is where pinned fields are enforced.
pub(crate) mod sealed {
    use super::FrameBuffer;

    pub trait FrameStorage: Sized {
        fn buffer_mut(&mut self) -> &mut FrameBuffer;

        fn from_buffer(buffer: FrameBuffer) -> Self;
    }
}

/// The frame kinds this codec understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PiuKind {
    Command,
    Response,
    TaskManagementRequest,
    TaskManagementResponse,
    QueryRequest,
    QueryResponse,
    NopOut,
    NopIn,
}

impl PiuKind {
    pub const ALL: [PiuKind; 8] = [
        PiuKind::Command,
        PiuKind::Response,
        PiuKind::TaskManagementRequest,
        PiuKind::TaskManagementResponse,
        PiuKind::QueryRequest,
        PiuKind::QueryResponse,
        PiuKind::NopOut,
        PiuKind::NopIn,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PiuKind::Command => "Command",
            PiuKind::Response => "Response",
            PiuKind::TaskManagementRequest => "TaskManagementRequest",
            PiuKind::TaskManagementResponse => "TaskManagementResponse",
            PiuKind::QueryRequest => "QueryRequest",
            PiuKind::QueryResponse => "QueryResponse",
            PiuKind::NopOut => "NopOut",
            PiuKind::NopIn => "NopIn",
        }
    }
}

/// Behaviour shared by every frame kind.
///
/// Implementors only say how to reach their buffer and which fields they
/// have; decoding, encoding and by-name access come for free.
///
/// Outside this crate the buffer is read-only, so a typed command frame
/// cannot be rewritten behind its setters:
///
/// ```compile_fail
/// use upiu::piu::{CommandPiu, PiuFrame};
/// use upiu::scsi::ReadWrite10;
///
/// let mut write = CommandPiu::write10(1, 0, ReadWrite10::default())?;
/// write.buffer_mut().set_byte(16, 0x28)?;
/// # Ok::<(), upiu::PiuError>(())
/// ```
pub trait PiuFrame: FrameStorage {
    const KIND: PiuKind;

    /// The kind's closed field table.
    const FIELDS: &'static [FieldSpec];

    /// Read-only view of the frame's bytes.
    fn buffer(&self) -> &FrameBuffer;

    /// Fields beyond [`Self::FIELDS`] that this particular frame exposes.
    fn extra_fields(&self) -> &'static [FieldSpec] {
        &[]
    }

    /// Name used in error messages.
    fn kind_name(&self) -> &'static str {
        Self::KIND.name()
    }

    /// Called before any by-name write.
    fn check_writable(&self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    /// Decodes a frame, failing unless `bytes` is exactly [`PIU_SIZE`] long.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_buffer(FrameBuffer::from_bytes(bytes)?))
    }

    fn to_bytes(&self) -> [u8; PIU_SIZE] {
        self.buffer().to_bytes()
    }

    fn field_spec(&self, name: &str) -> Result<&'static FieldSpec> {
        field::find(Self::FIELDS, name)
            .or_else(|| field::find(self.extra_fields(), name))
            .ok_or_else(|| PiuError::UnknownField {
                kind: self.kind_name(),
                name: name.to_owned(),
            })
    }

    fn field(&self, name: &str) -> Result<FieldValue> {
        Ok(self.field_spec(name)?.read(self.buffer()))
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let spec = self.field_spec(name)?;
        self.check_writable(spec.name)?;
        spec.write(self.buffer_mut(), &value)
    }

    /// Every field with its current value, in table order.
    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        Self::FIELDS
            .iter()
            .chain(self.extra_fields())
            .map(|spec| (spec.name, spec.read(self.buffer())))
            .collect()
    }
}

/// The opcode, tag and LUN header shared by all non-NOP frames.
pub trait PiuHeader: PiuFrame {
    fn opcode(&self) -> u8 {
        field::OPCODE.get(self.buffer())
    }

    fn set_opcode(&mut self, opcode: u8) {
        field::OPCODE.set(self.buffer_mut(), opcode);
    }

    /// Correlation tag matching requests to responses.
    fn cid(&self) -> u16 {
        field::CID.get(self.buffer())
    }

    fn set_cid(&mut self, cid: u16) {
        field::CID.set(self.buffer_mut(), cid);
    }

    fn lun(&self) -> u8 {
        field::LUN.get(self.buffer())
    }

    fn set_lun(&mut self, lun: u8) {
        field::LUN.set(self.buffer_mut(), lun);
    }
}

/// Any frame, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Piu {
    Command(CommandPiu),
    Response(ResponsePiu),
    TaskManagementRequest(TaskManagementRequestPiu),
    TaskManagementResponse(TaskManagementResponsePiu),
    QueryRequest(QueryRequestPiu),
    QueryResponse(QueryResponsePiu),
    NopOut(NopOutPiu),
    NopIn(NopInPiu),
}

macro_rules! each_frame {
    ($piu:expr, $frame:ident => $body:expr) => {
        match $piu {
            Piu::Command($frame) => $body,
            Piu::Response($frame) => $body,
            Piu::TaskManagementRequest($frame) => $body,
            Piu::TaskManagementResponse($frame) => $body,
            Piu::QueryRequest($frame) => $body,
            Piu::QueryResponse($frame) => $body,
            Piu::NopOut($frame) => $body,
            Piu::NopIn($frame) => $body,
        }
    };
}

impl Piu {
    /// Decodes `bytes` as a frame of the given kind.
    ///
    /// Byte 0 holds an opcode rather than a kind discriminator, so the
    /// caller has to know what it received.
    pub fn decode(kind: PiuKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            PiuKind::Command => Piu::Command(CommandPiu::from_bytes(bytes)?),
            PiuKind::Response => Piu::Response(ResponsePiu::from_bytes(bytes)?),
            PiuKind::TaskManagementRequest => {
                Piu::TaskManagementRequest(TaskManagementRequestPiu::from_bytes(bytes)?)
            }
            PiuKind::TaskManagementResponse => {
                Piu::TaskManagementResponse(TaskManagementResponsePiu::from_bytes(bytes)?)
            }
            PiuKind::QueryRequest => Piu::QueryRequest(QueryRequestPiu::from_bytes(bytes)?),
            PiuKind::QueryResponse => Piu::QueryResponse(QueryResponsePiu::from_bytes(bytes)?),
            PiuKind::NopOut => Piu::NopOut(NopOutPiu::from_bytes(bytes)?),
            PiuKind::NopIn => Piu::NopIn(NopInPiu::from_bytes(bytes)?),
        })
    }

    pub fn kind(&self) -> PiuKind {
        match self {
            Piu::Command(_) => PiuKind::Command,
            Piu::Response(_) => PiuKind::Response,
            Piu::TaskManagementRequest(_) => PiuKind::TaskManagementRequest,
            Piu::TaskManagementResponse(_) => PiuKind::TaskManagementResponse,
            Piu::QueryRequest(_) => PiuKind::QueryRequest,
            Piu::QueryResponse(_) => PiuKind::QueryResponse,
            Piu::NopOut(_) => PiuKind::NopOut,
            Piu::NopIn(_) => PiuKind::NopIn,
        }
    }

    pub fn to_bytes(&self) -> [u8; PIU_SIZE] {
        each_frame!(self, frame => frame.to_bytes())
    }

    pub fn field(&self, name: &str) -> Result<FieldValue> {
        each_frame!(self, frame => frame.field(name))
    }

    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        each_frame!(self, frame => frame.set_field(name, value))
    }

    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        each_frame!(self, frame => frame.fields())
    }
}

/// Decodes a received frame of a known kind.
#[tracing::instrument(level = "debug", skip(bytes), fields(len = bytes.len()))]
pub fn decode(kind: PiuKind, bytes: &[u8]) -> Result<Piu> {
    let piu = Piu::decode(kind, bytes)?;
    debug!("decoded {} PIU", kind.name());
    Ok(piu)
}

/// Encodes a frame for transmission. A constructed frame is always valid,
/// so this cannot fail.
pub fn encode(piu: &Piu) -> [u8; PIU_SIZE] {
    piu.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_rejects_short_and_long_buffers() {
        for kind in PiuKind::ALL {
            for len in [31, 33] {
                let e = decode(kind, &vec![0u8; len]).expect_err("length must be 32");
                assert_eq!(
                    e,
                    PiuError::InvalidLength {
                        expected: PIU_SIZE,
                        actual: len
                    }
                );
            }
        }
    }

    #[test]
    fn every_kind_round_trips_arbitrary_bytes() {
        let bytes: [u8; PIU_SIZE] = std::array::from_fn(|i| (i as u8).wrapping_mul(37) ^ 0x5a);
        for kind in PiuKind::ALL {
            let piu = decode(kind, &bytes).unwrap();
            assert_eq!(piu.kind(), kind);
            assert_eq!(encode(&piu), bytes);
        }
    }

    #[test]
    fn unknown_field_names_the_kind() {
        let piu = decode(PiuKind::NopIn, &[0u8; PIU_SIZE]).unwrap();
        assert_eq!(
            piu.field("opcode"),
            Err(PiuError::UnknownField {
                kind: "NopIn",
                name: "opcode".to_owned()
            })
        );
        assert!(piu.fields().is_empty());
    }

    #[test]
    fn dynamic_writes_through_the_enum() {
        let mut piu = decode(PiuKind::Response, &[0u8; PIU_SIZE]).unwrap();
        piu.set_field("cid", FieldValue::Int(0xabcd)).unwrap();
        piu.set_field("response_type", FieldValue::Int(3)).unwrap();
        let bytes = piu.to_bytes();
        assert_eq!(&bytes[2..4], &[0xab, 0xcd]);
        assert_eq!(bytes[1], 0xc0);
    }
}
