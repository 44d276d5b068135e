//! Encoding and decoding of the fixed 32 byte Protocol Information Units
//! (PIUs) exchanged between a host and a block storage device.
//!
//! A PIU is a command, response, task management, query or NOP frame. Each
//! kind is a struct wrapping one [`piu::FrameBuffer`]; its fields are views
//! over that buffer, so decoding is a copy and encoding is a copy back.
//!
//! ```
//! use upiu::piu::{CommandPiu, PiuFrame, PiuHeader};
//! use upiu::scsi::{ReadWrite10, TransferDirection};
//!
//! let write = CommandPiu::write10(
//!     0x1234,
//!     0,
//!     ReadWrite10 {
//!         logical_block_address: 0x100,
//!         transfer_length_bytes: 5120,
//!         ..Default::default()
//!     },
//! )?;
//! assert_eq!(write.direction(), TransferDirection::HostToDevice);
//!
//! let bytes = write.to_bytes();
//! assert_eq!(&bytes[23..25], &[0x00, 0x0A]);
//! assert_eq!(CommandPiu::from_bytes(&bytes)?.cid(), 0x1234);
//! # Ok::<(), upiu::PiuError>(())
//! ```
//!
//! Moving frames between the host and the device is left to the caller.

pub mod error;
pub mod piu;
pub mod scsi;

pub use error::{PiuError, Result};
pub use piu::{Piu, PiuFrame, PiuHeader, PiuKind, decode, encode};
