//! SCSI command descriptor blocks as carried inside command PIUs,
//! following:
//! - SCSI Primary Commands – 2 (SPC-2):
//!   <https://www.rockbox.org/wiki/pub/Main/DataSheets/spc2r20.pdf>
//!   for the generic 6 and 10 byte CDB layouts and TEST UNIT READY.
//! - SCSI Block Commands – 2 (SBC-2)
//!   <https://raw.githubusercontent.com/carmark/papers/master/storage/scsi/sbc2r16.pdf>
//!   for READ(10) and WRITE(10).
//!
//! This module uses the term "command descriptor" for the struct describing
//! a CDB layout, and [`CdbKind`] for the choice of layout a command frame is
//! built with.

pub mod cdb;
pub mod command_descriptor;

pub use cdb::{BLOCK_SIZE, CDB_OFFSET, CDB_SIZE, CdbKind, ReadWrite10, TransferDirection};
pub use command_descriptor::OpCode;
